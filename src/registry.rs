//! Rule registration and resolution.
//!
//! The [`RuleRegistry`] maps declared failure types to rendering rules and
//! answers, for any runtime failure type, which rule renders it. Resolution
//! picks the first match of:
//!
//! 1. a rule registered for exactly the runtime type;
//! 2. for a closed generic type such as `Fault<Timeout>`, a rule registered
//!    for its open shape `Fault<_>`, or a [`RuleTemplate`] registered for the
//!    shape, instantiated for `Fault<Timeout>` and cached;
//! 3. steps 1 and 2 applied to each declared ancestor, nearest first,
//!    excluding the universal failure type;
//! 4. the default rule.
//!
//! Rules discovered outside the crate can be fed in as [`RuleDescriptor`]s.

use alloc::{borrow::Cow, vec, vec::Vec};
use core::{any::type_name, fmt};

use hashbrown::HashMap;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use spin::RwLock;

use crate::{
    TypeInfo,
    rule::{DefaultRule, RenderingRule, RuleRef, RuleTemplate, TemplateRef, rule_ref, template_ref},
};

enum Entry {
    Rule(RuleRef),
    Template(TemplateRef),
}

impl Entry {
    fn name(&self) -> Cow<'static, str> {
        match self {
            Self::Rule(rule) => rule.name(),
            Self::Template(template) => template.name(),
        }
    }
}

/// The set of registered rendering rules.
///
/// A registry always holds a default rule bound to the universal failure
/// type. Registering another rule for that type replaces the default; it can
/// never be removed.
///
/// # Examples
///
/// ```
/// use faultline::{
///     Failure, RuleRegistry, TypeInfo,
///     rule::{RenderingRule, RuleError},
///     template::TemplateEngine,
/// };
///
/// struct OrderRule;
///
/// impl RenderingRule for OrderRule {
///     fn failure_type(&self) -> TypeInfo {
///         TypeInfo::subtype_of("OrderFailure", &TypeInfo::failure())
///     }
///
///     fn render(&self, engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError> {
///         Ok(engine.render(failure, Some("check the order id")))
///     }
/// }
///
/// let mut registry = RuleRegistry::new();
/// registry.add_rule(OrderRule).unwrap();
///
/// let order = TypeInfo::subtype_of("OrderFailure", &TypeInfo::failure());
/// let late_order = TypeInfo::subtype_of("LateOrderFailure", &order);
/// assert!(registry.resolve(&late_order).name().ends_with("OrderRule"));
/// ```
pub struct RuleRegistry {
    default: RuleRef,
    entries: IndexMap<TypeInfo, Entry, FxBuildHasher>,
    instantiated: RwLock<HashMap<TypeInfo, RuleRef, FxBuildHasher>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    /// Creates a registry holding only the default rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default: rule_ref(DefaultRule),
            entries: IndexMap::with_hasher(FxBuildHasher),
            instantiated: RwLock::new(HashMap::with_hasher(FxBuildHasher)),
        }
    }

    /// Registers a rule for the failure type it declares.
    ///
    /// A rule already registered for that type is replaced.
    pub fn add_rule<R: RenderingRule>(&mut self, rule: R) -> Result<&mut Self, RegistrationError> {
        self.add_rule_ref(rule_ref(rule))
    }

    /// Registers a default-constructed rule of type `R`.
    pub fn add_rule_type<R: RenderingRule + Default>(
        &mut self,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_rule(R::default())
    }

    /// Registers an already shared rule.
    pub fn add_rule_ref(&mut self, rule: RuleRef) -> Result<&mut Self, RegistrationError> {
        let failure_type = rule.failure_type();
        if !failure_type.is_failure_type() {
            return Err(RegistrationError::NotAFailureType {
                rule: rule.name(),
                failure_type,
            });
        }

        tracing::debug!(failure_type = %failure_type, rule = %rule.name(), "registered rendering rule");
        if failure_type.is_root() {
            self.default = rule;
        } else {
            self.insert(failure_type, Entry::Rule(rule));
        }
        self.instantiated.get_mut().clear();
        Ok(self)
    }

    /// Registers a template for the open generic shape it declares.
    ///
    /// A rule or template already registered for that shape is replaced.
    pub fn add_template<T: RuleTemplate>(
        &mut self,
        template: T,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_template_ref(template_ref(template))
    }

    /// Registers a default-constructed template of type `T`.
    pub fn add_template_type<T: RuleTemplate + Default>(
        &mut self,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_template(T::default())
    }

    /// Registers an already shared template.
    pub fn add_template_ref(
        &mut self,
        template: TemplateRef,
    ) -> Result<&mut Self, RegistrationError> {
        let shape = template.shape();
        if !shape.is_open() {
            return Err(RegistrationError::NotAGenericShape {
                template: template.name(),
                shape,
            });
        }
        if !shape.is_failure_type() {
            return Err(RegistrationError::NotAFailureType {
                rule: template.name(),
                failure_type: shape,
            });
        }

        tracing::debug!(shape = %shape, template = %template.name(), "registered rule template");
        self.insert(shape, Entry::Template(template));
        self.instantiated.get_mut().clear();
        Ok(self)
    }

    /// Registers a rule described by a [`RuleDescriptor`].
    pub fn register(&mut self, descriptor: RuleDescriptor) -> Result<&mut Self, RegistrationError> {
        let RuleDescriptor {
            name,
            failure_type,
            constructor,
        } = descriptor;

        if !failure_type.is_failure_type() {
            return Err(RegistrationError::NotAFailureType {
                rule: name,
                failure_type,
            });
        }

        match constructor {
            None => Err(RegistrationError::NotInstantiable { rule: name }),
            Some(RuleConstructor::Rule(construct)) => {
                let rule = construct();
                let actual = rule.failure_type();
                if actual != failure_type {
                    return Err(RegistrationError::DeclaredTypeMismatch {
                        rule: name,
                        declared: failure_type,
                        actual,
                    });
                }
                self.add_rule_ref(rule)
            }
            Some(RuleConstructor::Template(instantiate)) => self.add_template(FnTemplate {
                name,
                shape: failure_type,
                instantiate,
            }),
        }
    }

    /// Registers every descriptor in order, stopping at the first error.
    pub fn register_all<I>(&mut self, descriptors: I) -> Result<&mut Self, RegistrationError>
    where
        I: IntoIterator<Item = RuleDescriptor>,
    {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(self)
    }

    /// The rule bound to the universal failure type.
    #[must_use]
    pub fn default_rule(&self) -> &RuleRef {
        &self.default
    }

    /// Returns the rule rendering failures of the runtime type `failure_type`.
    ///
    /// Falls back to the default rule when nothing more specific is
    /// registered.
    #[must_use]
    pub fn resolve(&self, failure_type: &TypeInfo) -> RuleRef {
        let candidates = core::iter::once(failure_type)
            .chain(failure_type.ancestors().take_while(|ancestor| !ancestor.is_root()));

        for candidate in candidates {
            if let Some(rule) = self.lookup(candidate) {
                tracing::trace!(
                    failure_type = %failure_type,
                    matched = %candidate,
                    rule = %rule.name(),
                    "resolved rendering rule"
                );
                return rule;
            }
        }

        tracing::trace!(failure_type = %failure_type, "resolved default rendering rule");
        self.default.clone()
    }

    /// All registered rules: the default rule first, then in registration
    /// order.
    ///
    /// Templates are listed as their instantiation over the universal failure
    /// type.
    #[must_use]
    pub fn rules(&self) -> Vec<RuleRef> {
        let mut rules = Vec::with_capacity(self.entries.len() + 1);
        rules.push(self.default.clone());
        for entry in self.entries.values() {
            rules.push(match entry {
                Entry::Rule(rule) => rule.clone(),
                Entry::Template(template) => {
                    template.instantiate(&vec![TypeInfo::failure(); template.shape().arity()])
                }
            });
        }
        rules
    }

    fn insert(&mut self, failure_type: TypeInfo, entry: Entry) {
        if let Some(replaced) = self.entries.shift_remove(&failure_type) {
            tracing::debug!(
                failure_type = %failure_type,
                replaced = %replaced.name(),
                "replaced rendering rule"
            );
        }
        self.entries.insert(failure_type, entry);
    }

    fn lookup(&self, failure_type: &TypeInfo) -> Option<RuleRef> {
        if let Some(Entry::Rule(rule)) = self.entries.get(failure_type) {
            return Some(rule.clone());
        }

        let definition = failure_type.definition()?;
        match self.entries.get(&definition)? {
            Entry::Rule(rule) => Some(rule.clone()),
            Entry::Template(template) => Some(self.instantiate(template, failure_type)),
        }
    }

    fn instantiate(&self, template: &TemplateRef, failure_type: &TypeInfo) -> RuleRef {
        if let Some(rule) = self.instantiated.read().get(failure_type) {
            return rule.clone();
        }

        let rule = template.instantiate(failure_type.arguments());
        tracing::trace!(
            failure_type = %failure_type,
            template = %template.name(),
            rule = %rule.name(),
            "instantiated rule template"
        );
        self.instantiated
            .write()
            .entry(failure_type.clone())
            .or_insert(rule)
            .clone()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entries<'a>(&'a IndexMap<TypeInfo, Entry, FxBuildHasher>);

        impl fmt::Debug for Entries<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(
                        self.0
                            .iter()
                            .map(|(failure_type, entry)| (failure_type, entry.name())),
                    )
                    .finish()
            }
        }

        f.debug_struct("RuleRegistry")
            .field("default", &self.default.name())
            .field("entries", &Entries(&self.entries))
            .finish_non_exhaustive()
    }
}

/// How a [`RuleDescriptor`] creates its rule.
#[derive(Copy, Clone, Debug)]
pub enum RuleConstructor {
    /// Creates a rule for a non-generic type or an open shape.
    Rule(fn() -> RuleRef),
    /// Creates a rule for one instantiation of an open shape, given its type
    /// arguments.
    Template(fn(&[TypeInfo]) -> RuleRef),
}

/// A rule discovered outside the crate, described by name, declared type and
/// constructor.
#[derive(Clone, Debug)]
pub struct RuleDescriptor {
    name: Cow<'static, str>,
    failure_type: TypeInfo,
    constructor: Option<RuleConstructor>,
}

impl RuleDescriptor {
    /// Describes a rule from its parts.
    ///
    /// A descriptor without a constructor is rejected on registration.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        failure_type: TypeInfo,
        constructor: Option<RuleConstructor>,
    ) -> Self {
        Self {
            name: name.into(),
            failure_type,
            constructor,
        }
    }

    /// Describes a rule created by a parameterless constructor.
    pub fn rule(
        name: impl Into<Cow<'static, str>>,
        failure_type: TypeInfo,
        construct: fn() -> RuleRef,
    ) -> Self {
        Self::new(name, failure_type, Some(RuleConstructor::Rule(construct)))
    }

    /// Describes a template for an open generic shape.
    pub fn template(
        name: impl Into<Cow<'static, str>>,
        shape: TypeInfo,
        instantiate: fn(&[TypeInfo]) -> RuleRef,
    ) -> Self {
        Self::new(name, shape, Some(RuleConstructor::Template(instantiate)))
    }

    /// Describes the default-constructed rule of type `R`.
    #[must_use]
    pub fn of<R: RenderingRule + Default>() -> Self {
        fn construct<R: RenderingRule + Default>() -> RuleRef {
            rule_ref(R::default())
        }

        Self::rule(
            type_name::<R>(),
            R::default().failure_type(),
            construct::<R>,
        )
    }

    /// The rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared failure type.
    #[must_use]
    pub fn failure_type(&self) -> &TypeInfo {
        &self.failure_type
    }
}

struct FnTemplate {
    name: Cow<'static, str>,
    shape: TypeInfo,
    instantiate: fn(&[TypeInfo]) -> RuleRef,
}

impl RuleTemplate for FnTemplate {
    fn shape(&self) -> TypeInfo {
        self.shape.clone()
    }

    fn instantiate(&self, arguments: &[TypeInfo]) -> RuleRef {
        (self.instantiate)(arguments)
    }

    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

/// The reason a rule could not be registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationError {
    /// The declared type does not descend from the universal failure type.
    NotAFailureType {
        /// The rule name.
        rule: Cow<'static, str>,
        /// The declared type.
        failure_type: TypeInfo,
    },
    /// A template was declared for something other than an open generic
    /// shape.
    NotAGenericShape {
        /// The template name.
        template: Cow<'static, str>,
        /// The declared shape.
        shape: TypeInfo,
    },
    /// A descriptor has no way to create its rule.
    NotInstantiable {
        /// The rule name.
        rule: Cow<'static, str>,
    },
    /// A descriptor's rule declares a different type than the descriptor.
    DeclaredTypeMismatch {
        /// The rule name.
        rule: Cow<'static, str>,
        /// The type named by the descriptor.
        declared: TypeInfo,
        /// The type declared by the created rule.
        actual: TypeInfo,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAFailureType { rule, failure_type } => write!(
                f,
                "rule '{rule}' is declared for {failure_type}, which is not a failure type"
            ),
            Self::NotAGenericShape { template, shape } => write!(
                f,
                "template '{template}' is declared for {shape}, which is not an open generic shape"
            ),
            Self::NotInstantiable { rule } => {
                write!(f, "rule '{rule}' has no constructor")
            }
            Self::DeclaredTypeMismatch {
                rule,
                declared,
                actual,
            } => write!(
                f,
                "rule '{rule}' is described for {declared} but declares {actual}"
            ),
        }
    }
}

impl core::error::Error for RegistrationError {}
