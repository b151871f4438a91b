//! The abstract failure handle.

use alloc::{borrow::Cow, vec::Vec};
use core::any::{Any, TypeId};

use serde_json::{Map, Value};

use crate::TypeInfo;

/// Arbitrary key/value side data attached to a failure.
pub type ExtraData = Map<alloc::string::String, Value>;

/// One error occurrence, as seen by the formatter.
///
/// Implementors describe their runtime type through [`failure_type`] and
/// expose their nested causes through [`cause`] and, for fan-out kinds that
/// wrap several independent failures, [`children`]. Everything except the
/// type and the message has a default implementation.
///
/// Failures are read-only to the formatter. They form a tree rooted at the
/// outermost failure; see [`related`] for how the two child accessors are
/// combined.
///
/// # Examples
///
/// ```
/// use std::borrow::Cow;
///
/// use faultline_internals::{Failure, TypeInfo};
///
/// struct Timeout {
///     seconds: u64,
/// }
///
/// impl Failure for Timeout {
///     fn failure_type(&self) -> TypeInfo {
///         TypeInfo::subtype_of("Timeout", &TypeInfo::failure())
///     }
///
///     fn message(&self) -> Cow<'_, str> {
///         Cow::Owned(format!("timed out after {}s", self.seconds))
///     }
/// }
///
/// let failure: &dyn Failure = &Timeout { seconds: 30 };
/// assert_eq!(failure.message(), "timed out after 30s");
/// assert_eq!(failure.downcast_ref::<Timeout>().map(|t| t.seconds), Some(30));
/// ```
///
/// [`failure_type`]: Failure::failure_type
/// [`cause`]: Failure::cause
/// [`children`]: Failure::children
/// [`related`]: trait.Failure.html#method.related
pub trait Failure: Any {
    /// The runtime type identity of this failure.
    fn failure_type(&self) -> TypeInfo;

    /// The human-readable message.
    fn message(&self) -> Cow<'_, str>;

    /// The stack or trace text captured with this failure.
    fn stacktrace(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Key/value side data attached to this failure.
    fn extra_data(&self) -> Option<&ExtraData> {
        None
    }

    /// The structured detail carried by failure kinds that wrap a typed
    /// payload, such as instantiations of a generic failure shape.
    fn payload(&self) -> Option<Value> {
        None
    }

    /// The single failure that caused this one.
    fn cause(&self) -> Option<&dyn Failure> {
        None
    }

    /// The independent child failures of a fan-out failure kind, in order.
    fn children(&self) -> Vec<&dyn Failure> {
        Vec::new()
    }
}

impl dyn Failure {
    /// All nested failures directly below this one, in order.
    ///
    /// This is the union of [`children`](Failure::children) followed by
    /// [`cause`](Failure::cause), where the cause is skipped if it is already
    /// one of the children (compared by [`FailureId`]).
    #[must_use]
    pub fn related(&self) -> Vec<&dyn Failure> {
        let mut related = self.children();
        if let Some(cause) = self.cause()
            && !related.iter().any(|child| same_failure(*child, cause))
        {
            related.push(cause);
        }
        related
    }

    /// Returns `true` if the concrete type of this failure is `T`.
    #[must_use]
    pub fn is<T: Failure>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }

    /// Returns a reference to the concrete failure if it is of type `T`.
    #[must_use]
    pub fn downcast_ref<T: Failure>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

/// Identity of a failure object: its address together with its concrete
/// type.
///
/// A failure may store its cause inline as its first field, in which case
/// both share an address. They still differ in type, since no type contains
/// itself inline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FailureId {
    /// Address of the failure's data.
    address: usize,
    /// Concrete type of the failure.
    type_id: TypeId,
}

impl FailureId {
    /// The identity of `failure`.
    #[must_use]
    pub fn of(failure: &dyn Failure) -> Self {
        let any: &dyn Any = failure;
        Self {
            address: core::ptr::from_ref::<dyn Failure>(failure)
                .cast::<()>()
                .addr(),
            type_id: <dyn Any>::type_id(any),
        }
    }
}

/// Whether two failure handles refer to the same failure object.
#[must_use]
pub fn same_failure(left: &dyn Failure, right: &dyn Failure) -> bool {
    FailureId::of(left) == FailureId::of(right)
}
