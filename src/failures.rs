//! Built-in failure kinds.
//!
//! Any type implementing [`Failure`] can be formatted. This module provides
//! two ready-made kinds covering the common cases:
//!
//! - [`BasicFailure`]: a failure with a single optional cause, built from its
//!   parts or snapshotted from a [`core::error::Error`] source chain.
//! - [`AggregateFailure`]: a fan-out failure wrapping several independent
//!   child failures.
//!
//! # Examples
//!
//! ```
//! use faultline::{
//!     ChainFormatter,
//!     failures::{AggregateFailure, BasicFailure},
//! };
//!
//! let batch = AggregateFailure::new(
//!     "2 of 3 uploads failed",
//!     [BasicFailure::new("a.txt: timed out"), BasicFailure::new("c.txt: refused")],
//! );
//!
//! let report = ChainFormatter::new().format(&batch);
//! assert!(report.find("a.txt").unwrap() < report.find("c.txt").unwrap());
//! assert!(report.find("c.txt").unwrap() < report.find("2 of 3").unwrap());
//! ```

use alloc::{
    borrow::Cow,
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};

use serde_json::Value;

use crate::{ExtraData, Failure, TypeInfo};

/// A failure with an optional single cause.
pub struct BasicFailure {
    failure_type: TypeInfo,
    message: String,
    stacktrace: Option<String>,
    extra_data: ExtraData,
    payload: Option<Value>,
    cause: Option<Box<dyn Failure>>,
}

impl BasicFailure {
    /// Creates a failure of the universal failure type.
    pub fn new(message: impl Into<String>) -> Self {
        Self::of_type(TypeInfo::failure(), message)
    }

    /// Creates a failure of the given runtime type.
    pub fn of_type(failure_type: TypeInfo, message: impl Into<String>) -> Self {
        Self {
            failure_type,
            message: message.into(),
            stacktrace: None,
            extra_data: ExtraData::new(),
            payload: None,
            cause: None,
        }
    }

    /// Snapshots an error and its [`source`](core::error::Error::source)
    /// chain into a chain of failures.
    ///
    /// Every link is typed as `Error`, a direct subtype of the universal
    /// failure type, since the concrete error types are not known.
    pub fn from_error(error: &(dyn core::error::Error + 'static)) -> Self {
        let error_type = TypeInfo::subtype_of("Error", &TypeInfo::failure());
        let mut messages = Vec::new();
        let mut current = Some(error);
        while let Some(link) = current {
            messages.push(link.to_string());
            current = link.source();
        }

        let mut chain: Option<Self> = None;
        for message in messages.into_iter().rev() {
            let mut failure = Self::of_type(error_type.clone(), message);
            failure.cause = chain.map(|cause| Box::new(cause) as Box<dyn Failure>);
            chain = Some(failure);
        }
        chain.unwrap_or_else(|| Self::of_type(error_type, String::new()))
    }

    /// Sets the single cause.
    #[must_use]
    pub fn with_cause(self, cause: impl Failure) -> Self {
        self.with_boxed_cause(Box::new(cause))
    }

    /// Sets the single cause from an already boxed failure.
    #[must_use]
    pub fn with_boxed_cause(mut self, cause: Box<dyn Failure>) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Sets the stack trace text.
    #[must_use]
    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    /// Adds one entry of extra data, replacing any previous value for `key`.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_data.insert(key.into(), value.into());
        self
    }

    /// Sets the structured payload.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Mutable access to the extra data.
    pub fn extra_data_mut(&mut self) -> &mut ExtraData {
        &mut self.extra_data
    }
}

impl Failure for BasicFailure {
    fn failure_type(&self) -> TypeInfo {
        self.failure_type.clone()
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.message.as_str())
    }

    fn stacktrace(&self) -> Option<Cow<'_, str>> {
        self.stacktrace.as_deref().map(Cow::Borrowed)
    }

    fn extra_data(&self) -> Option<&ExtraData> {
        Some(&self.extra_data)
    }

    fn payload(&self) -> Option<Value> {
        self.payload.clone()
    }

    fn cause(&self) -> Option<&dyn Failure> {
        self.cause.as_deref()
    }
}

impl core::fmt::Debug for BasicFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BasicFailure")
            .field("failure_type", &self.failure_type)
            .field("message", &self.message)
            .field("has_cause", &self.cause.is_some())
            .finish_non_exhaustive()
    }
}

/// A fan-out failure wrapping several independent child failures.
///
/// Its single cause is its first child, so traversals that combine children
/// and cause visit every child exactly once.
pub struct AggregateFailure {
    failure_type: TypeInfo,
    message: String,
    children: Vec<Box<dyn Failure>>,
}

impl AggregateFailure {
    /// The runtime type of aggregate failures.
    #[must_use]
    pub fn type_info() -> TypeInfo {
        TypeInfo::subtype_of("AggregateFailure", &TypeInfo::failure())
    }

    /// Creates an aggregate over `children`, preserving their order.
    pub fn new<I, F>(message: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Failure,
    {
        Self::from_boxed(
            message,
            children
                .into_iter()
                .map(|child| Box::new(child) as Box<dyn Failure>),
        )
    }

    /// Creates an aggregate over already boxed children.
    pub fn from_boxed(
        message: impl Into<String>,
        children: impl IntoIterator<Item = Box<dyn Failure>>,
    ) -> Self {
        Self {
            failure_type: Self::type_info(),
            message: message.into(),
            children: children.into_iter().collect(),
        }
    }

    /// Appends a child failure.
    pub fn push(&mut self, child: impl Failure) {
        self.children.push(Box::new(child));
    }

    /// The number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the aggregate has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Failure for AggregateFailure {
    fn failure_type(&self) -> TypeInfo {
        self.failure_type.clone()
    }

    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.message.as_str())
    }

    fn cause(&self) -> Option<&dyn Failure> {
        self.children.first().map(|child| &**child)
    }

    fn children(&self) -> Vec<&dyn Failure> {
        self.children.iter().map(|child| &**child).collect()
    }
}

impl core::fmt::Debug for AggregateFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AggregateFailure")
            .field("message", &self.message)
            .field("children", &self.children.len())
            .finish()
    }
}
