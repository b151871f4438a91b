//! Runtime type identity for failures and the values they carry.
//!
//! A [`TypeInfo`] is a cheap, cloneable handle describing one type:
//!
//! - its name,
//! - its generic arity and, for closed instantiations, its type arguments,
//! - its declared parent type (failure types only).
//!
//! Identity is structural: two handles are equal when their names, arities
//! and arguments are equal. The parent link describes the type but does not
//! take part in identity, so a type can be looked up with a handle that was
//! built without knowledge of its ancestry.

use alloc::{borrow::Cow, vec::Vec};
use core::{
    fmt,
    hash::{Hash, Hasher},
    iter::FusedIterator,
};

use triomphe::Arc;

/// Name of the universal failure type every failure type descends from.
const ROOT_NAME: &str = "Failure";

/// Name of the nullable wrapper shape, rendered as a `?` suffix.
const NULLABLE_NAME: &str = "Nullable";

/// Runtime identity of a type, possibly parameterized.
///
/// # Examples
///
/// ```
/// use faultline_internals::TypeInfo;
///
/// let customer = TypeInfo::subtype_of("CustomerFailure", &TypeInfo::failure());
/// let not_found = TypeInfo::subtype_of("CustomerNotFoundFailure", &customer);
///
/// assert!(not_found.is_assignable_to(&customer));
/// assert!(not_found.is_assignable_to(&TypeInfo::failure()));
/// assert!(!customer.is_assignable_to(&not_found));
///
/// let fault = TypeInfo::generic("Fault", 1).with_base(TypeInfo::failure());
/// let closed = fault.instantiate([TypeInfo::new("CalculationError")]);
/// assert_eq!(closed.to_string(), "Fault<CalculationError>");
/// assert_eq!(closed.definition(), Some(fault));
/// ```
#[derive(Clone)]
pub struct TypeInfo(Arc<TypeData>);

/// Shared payload of a [`TypeInfo`] handle.
#[derive(Clone)]
struct TypeData {
    /// Unqualified type name, without generic arguments.
    name: Cow<'static, str>,
    /// Number of generic parameters of the type's shape.
    arity: usize,
    /// Type arguments; empty for non-generic types and open shapes.
    arguments: Vec<TypeInfo>,
    /// Declared parent type.
    base: Option<TypeInfo>,
}

impl TypeInfo {
    /// Creates a handle from its parts.
    fn from_parts(
        name: Cow<'static, str>,
        arity: usize,
        arguments: Vec<TypeInfo>,
        base: Option<TypeInfo>,
    ) -> Self {
        Self(Arc::new(TypeData {
            name,
            arity,
            arguments,
            base,
        }))
    }

    /// The universal failure type. Every failure type is assignable to it.
    #[must_use]
    pub fn failure() -> Self {
        Self::from_parts(Cow::Borrowed(ROOT_NAME), 0, Vec::new(), None)
    }

    /// A plain, non-generic type without a parent.
    ///
    /// Such a type is not a failure type; it is suitable for describing
    /// payloads and type arguments.
    ///
    /// The name `Failure` is reserved: identity is structural, so a plain
    /// type named `Failure` is the universal failure type. Name payload types
    /// differently.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_parts(name.into(), 0, Vec::new(), None)
    }

    /// A non-generic type declared as a subtype of `base`.
    #[must_use]
    pub fn subtype_of(name: impl Into<Cow<'static, str>>, base: &TypeInfo) -> Self {
        Self::from_parts(name.into(), 0, Vec::new(), Some(base.clone()))
    }

    /// An open generic shape such as `Fault<_>` with `arity` parameters.
    #[must_use]
    pub fn generic(name: impl Into<Cow<'static, str>>, arity: usize) -> Self {
        Self::from_parts(name.into(), arity, Vec::new(), None)
    }

    /// The nullable wrapper around `inner`, rendered as `inner?`.
    #[must_use]
    pub fn nullable(inner: TypeInfo) -> Self {
        Self::generic(NULLABLE_NAME, 1).instantiate([inner])
    }

    /// Returns a copy of this type with its parent set to `base`.
    #[must_use]
    pub fn with_base(self, base: TypeInfo) -> Self {
        let mut data = TypeData::clone(&self.0);
        data.base = Some(base);
        Self(Arc::new(data))
    }

    /// Closes this generic shape over `arguments`.
    ///
    /// The instantiation keeps the shape's name and parent; its arity is the
    /// number of arguments supplied.
    #[must_use]
    pub fn instantiate(&self, arguments: impl IntoIterator<Item = TypeInfo>) -> Self {
        let arguments: Vec<TypeInfo> = arguments.into_iter().collect();
        Self::from_parts(
            self.0.name.clone(),
            arguments.len(),
            arguments,
            self.0.base.clone(),
        )
    }

    /// The unqualified name, without generic arguments.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The number of generic parameters of this type's shape.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.arity
    }

    /// The type arguments of a closed instantiation.
    #[must_use]
    pub fn arguments(&self) -> &[TypeInfo] {
        &self.0.arguments
    }

    /// The declared parent type, if any.
    #[must_use]
    pub fn base(&self) -> Option<&TypeInfo> {
        self.0.base.as_ref()
    }

    /// Iterates over the declared ancestors, nearest first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: self.base() }
    }

    /// Whether this is the universal failure type.
    ///
    /// Any non-generic type named `Failure` qualifies; see [`TypeInfo::new`].
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.arity == 0 && self.0.name == ROOT_NAME
    }

    /// Whether this type has generic parameters, open or closed.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.0.arity > 0
    }

    /// Whether this is an open generic shape.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.arity > 0 && self.0.arguments.is_empty()
    }

    /// The open shape this closed instantiation was built from.
    ///
    /// Returns `None` for non-generic types and for shapes that are already
    /// open.
    #[must_use]
    pub fn definition(&self) -> Option<TypeInfo> {
        if self.is_generic() && !self.is_open() {
            Some(Self::from_parts(
                self.0.name.clone(),
                self.0.arity,
                Vec::new(),
                self.0.base.clone(),
            ))
        } else {
            None
        }
    }

    /// Whether this type is the universal failure type or descends from it.
    #[must_use]
    pub fn is_failure_type(&self) -> bool {
        self.is_root() || self.ancestors().any(TypeInfo::is_root)
    }

    /// Whether a value of this type can be used where `other` is expected.
    #[must_use]
    pub fn is_assignable_to(&self, other: &TypeInfo) -> bool {
        if self == other {
            true
        } else if other.is_root() {
            self.is_failure_type()
        } else {
            self.ancestors().any(|ancestor| ancestor == other)
        }
    }

    /// The inner type of a nullable wrapper.
    fn nullable_inner(&self) -> Option<&TypeInfo> {
        match self.arguments() {
            [inner] if self.0.name == NULLABLE_NAME => Some(inner),
            _ => None,
        }
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.arity == other.0.arity
                && self.0.name == other.0.name
                && self.0.arguments == other.0.arguments)
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.arity.hash(state);
        self.0.arguments.hash(state);
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(inner) = self.nullable_inner() {
            return write!(f, "{inner}?");
        }

        f.write_str(&self.0.name)?;
        if self.0.arity == 0 {
            return Ok(());
        }

        f.write_str("<")?;
        for slot in 0..self.0.arity {
            if slot > 0 {
                f.write_str(", ")?;
            }
            match self.0.arguments.get(slot) {
                Some(argument) => fmt::Display::fmt(argument, f)?,
                None => f.write_str("_")?,
            }
        }
        f.write_str(">")
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeInfo")
            .field(&format_args!("{self}"))
            .finish()
    }
}

/// Iterator over the declared ancestors of a [`TypeInfo`], nearest first.
///
/// Created by [`TypeInfo::ancestors`].
#[derive(Clone, Copy)]
#[must_use]
pub struct Ancestors<'a> {
    /// The next ancestor to yield.
    next: Option<&'a TypeInfo>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TypeInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.base();
        Some(current)
    }
}

impl FusedIterator for Ancestors<'_> {}
