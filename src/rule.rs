//! Rendering rules and the error type they report.
//!
//! A rendering rule turns one [`Failure`] into a string. Two shapes exist:
//!
//! - [`RenderingRule`]: bound to one declared failure type, exact or open
//!   generic, and instantiated once.
//! - [`RuleTemplate`]: bound to an open generic failure shape such as
//!   `Fault<_>` and instantiated lazily for every closed type encountered at
//!   resolution time, e.g. once for `Fault<Timeout>` and once for
//!   `Fault<Refused>`.
//!
//! Rules are shared as [`RuleRef`] handles.
//!
//! # Examples
//!
//! ```
//! use faultline::{
//!     Failure, TypeInfo,
//!     rule::{RenderingRule, RuleError},
//!     template::TemplateEngine,
//! };
//!
//! struct ShoutingRule;
//!
//! impl RenderingRule for ShoutingRule {
//!     fn failure_type(&self) -> TypeInfo {
//!         TypeInfo::failure()
//!     }
//!
//!     fn render(&self, _engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError> {
//!         Ok(failure.message().to_uppercase())
//!     }
//! }
//! ```

use alloc::{
    borrow::Cow,
    string::{String, ToString},
};
use core::{any::type_name, fmt};

use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{Failure, TypeInfo, template::TemplateEngine};

/// A shared handle to a rendering rule.
pub type RuleRef = Arc<dyn RenderingRule>;

/// A shared handle to a generic rule template.
pub type TemplateRef = Arc<dyn RuleTemplate>;

/// A function rendering failures of one declared type.
///
/// The rule receives every failure whose runtime type resolved to it: failures
/// of the declared type itself, of its subtypes, and for open generic shapes,
/// of every instantiation of the shape. Use
/// [`downcast_ref`](trait.Failure.html#method.downcast_ref) for typed access
/// to a concrete failure.
///
/// Returning an error does not abort the report; the formatter substitutes
/// the default rendering of both the error and the failure.
pub trait RenderingRule: 'static + Send + Sync {
    /// The failure type this rule is declared for.
    fn failure_type(&self) -> TypeInfo;

    /// Renders one failure.
    fn render(&self, engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError>;

    /// The name used for this rule in fallback annotations and logs.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_name::<Self>())
    }
}

/// A factory producing rendering rules for instantiations of a generic
/// failure shape.
///
/// Instances are created once per closed type and cached by the registry.
pub trait RuleTemplate: 'static + Send + Sync {
    /// The open generic failure shape this template is declared for.
    fn shape(&self) -> TypeInfo;

    /// Creates the rule specialized for the given type arguments.
    fn instantiate(&self, arguments: &[TypeInfo]) -> RuleRef;

    /// The name used for this template in logs.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_name::<Self>())
    }
}

/// Wraps a rule into a shared [`RuleRef`].
pub fn rule_ref<R: RenderingRule>(rule: R) -> RuleRef {
    Arc::new(rule).unsize(unsize::Coercion!(to dyn RenderingRule))
}

/// Wraps a template into a shared [`TemplateRef`].
pub fn template_ref<T: RuleTemplate>(template: T) -> TemplateRef {
    Arc::new(template).unsize(unsize::Coercion!(to dyn RuleTemplate))
}

/// The rule bound to the universal failure type.
///
/// Renders the failure through the template engine without additional
/// information.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultRule;

impl RenderingRule for DefaultRule {
    fn failure_type(&self) -> TypeInfo {
        TypeInfo::failure()
    }

    fn render(&self, engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError> {
        Ok(engine.render(failure, None))
    }
}

/// The error a rendering rule reports.
///
/// Any [`core::error::Error`] converts into a `RuleError`, so rules can use
/// `?` freely. A `RuleError` is itself a [`Failure`]: the formatter renders it
/// with the default rule when a rule fails.
pub struct RuleError {
    failure_type: TypeInfo,
    message: String,
}

impl RuleError {
    /// Creates an error with the given message.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            failure_type: TypeInfo::subtype_of("RuleError", &TypeInfo::failure()),
            message: message.to_string(),
        }
    }

    #[cfg(feature = "std")]
    pub(crate) fn from_panic(payload: &(dyn core::any::Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            String::from("rendering rule panicked")
        };

        Self {
            failure_type: TypeInfo::subtype_of("Panic", &TypeInfo::failure()),
            message,
        }
    }
}

impl<E> From<E> for RuleError
where
    E: core::error::Error + 'static,
{
    fn from(error: E) -> Self {
        Self {
            failure_type: TypeInfo::subtype_of(type_name::<E>(), &TypeInfo::failure()),
            message: error.to_string(),
        }
    }
}

impl Failure for RuleError {
    fn failure_type(&self) -> TypeInfo {
        self.failure_type.clone()
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.message.as_str())
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleError")
            .field("failure_type", &self.failure_type)
            .field("message", &self.message)
            .finish()
    }
}
