#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Render nested failure chains into readable reports.
//!
//! ## Overview
//!
//! A failure rarely travels alone: a failed checkout is caused by a failed
//! payment, which is caused by a timed out connection, and a batch job may
//! fail because several of its items failed independently. This crate turns
//! such a tree of failures into one report, innermost failure first, with
//! each failure rendered by the most specific rendering rule registered for
//! its type.
//!
//! ## Quick Example
//!
//! ```
//! use faultline::{
//!     ChainFormatter, Failure, TypeInfo,
//!     failures::BasicFailure,
//!     rule::{RenderingRule, RuleError},
//!     template::TemplateEngine,
//! };
//!
//! fn payment_failure() -> TypeInfo {
//!     TypeInfo::subtype_of("PaymentFailure", &TypeInfo::failure())
//! }
//!
//! struct PaymentRule;
//!
//! impl RenderingRule for PaymentRule {
//!     fn failure_type(&self) -> TypeInfo {
//!         payment_failure()
//!     }
//!
//!     fn render(&self, engine: &TemplateEngine, failure: &dyn Failure) -> Result<String, RuleError> {
//!         Ok(engine.render(failure, Some("The card was not charged.")))
//!     }
//! }
//!
//! let formatter = ChainFormatter::new().add_rule(PaymentRule).unwrap();
//!
//! let failure = BasicFailure::new("checkout failed")
//!     .with_cause(BasicFailure::of_type(payment_failure(), "card declined"));
//!
//! let report = formatter.format(&failure);
//! assert!(report.starts_with("[PaymentFailure: card declined]\nThe card was not charged."));
//! assert!(report.ends_with("[Failure: checkout failed]"));
//! ```
//!
//! ## Core Concepts
//!
//! - A [`Failure`] is one error occurrence. It reports its runtime type as a
//!   [`TypeInfo`], its message, optional stack trace and extra data, and the
//!   failures nested below it: a single cause, or several independent
//!   children for fan-out kinds such as
//!   [`AggregateFailure`](failures::AggregateFailure).
//! - The [`ChainExtractor`] flattens the tree innermost first.
//! - The [`RuleRegistry`] picks the rule for each failure: an exact match, a
//!   rule or [`RuleTemplate`](rule::RuleTemplate) for the open generic shape,
//!   the nearest registered ancestor, or finally the default rule.
//! - The [`TemplateEngine`] fills a `${keyword}` template from a failure and
//!   the text its rule supplies.
//! - The [`ChainFormatter`] ties the three together. A rule that returns an
//!   error, or panics when the `std` feature is enabled, is replaced by an
//!   annotated default rendering instead of aborting the report.
//!
//! For the data model, see the [`faultline-internals`] crate.
//!
//! [`faultline-internals`]: faultline_internals
//!
//! ## Logging
//!
//! Registration, resolution and rule fallbacks are reported through
//! [`tracing`] events; install a subscriber to see them.
//!
//! ## Features
//!
//! - `std` (default): isolates panicking rendering rules. Without it the
//!   crate is `no_std` and only errors returned by rules are isolated.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod extractor;
pub mod failures;
pub mod formatter;
pub mod prelude;
pub mod registry;
pub mod rule;
pub mod template;

pub use faultline_internals::{Ancestors, ExtraData, Failure, FailureId, TypeInfo, same_failure};

pub use self::{
    extractor::{ChainExtractor, ExtractionError},
    formatter::ChainFormatter,
    registry::{RegistrationError, RuleDescriptor, RuleRegistry},
    rule::{RenderingRule, RuleError, RuleRef, RuleTemplate},
    template::{TemplateEngine, TemplateError},
};

/// The separator placed between the entries of a report.
pub(crate) const NEWLINE: &str = if cfg!(windows) { "\r\n" } else { "\n" };
