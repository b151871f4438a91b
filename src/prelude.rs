//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use faultline::prelude::*;
//!
//! struct QuietRule;
//!
//! impl RenderingRule for QuietRule {
//!     fn failure_type(&self) -> TypeInfo {
//!         TypeInfo::failure()
//!     }
//!
//!     fn render(&self, _engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError> {
//!         Ok(failure.message().into_owned())
//!     }
//! }
//!
//! let formatter = ChainFormatter::new().add_rule(QuietRule).unwrap();
//! assert_eq!(formatter.format(&BasicFailure::new("quiet")), "quiet");
//! ```

pub use crate::{
    ChainFormatter, Failure, RenderingRule, RuleError, RuleTemplate, TemplateEngine, TypeInfo,
    failures::{AggregateFailure, BasicFailure},
    rule::{RuleRef, rule_ref},
};
