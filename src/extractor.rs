//! Flattening of failure trees into render order.
//!
//! The [`ChainExtractor`] walks a failure and everything nested below it and
//! returns the failures innermost first: every failure appears after all of
//! its descendants, and siblings are expanded left to right, each one fully
//! before the next.
//!
//! For a failure `F1` caused by `F2`, itself caused by `F3`, the order is
//! `[F3, F2, F1]`. For an aggregate `A` with children `C1` and `C2`, the order
//! is `[C1, C2, A]`.

use alloc::{vec, vec::Vec};
use core::fmt;

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;

use crate::{Failure, FailureId, TypeInfo};

/// Flattens a failure tree into innermost-first order.
///
/// # Examples
///
/// ```
/// use faultline::{ChainExtractor, Failure, failures::BasicFailure};
///
/// let failure = BasicFailure::new("F1")
///     .with_cause(BasicFailure::new("F2").with_cause(BasicFailure::new("F3")));
///
/// let order: Vec<String> = ChainExtractor::new()
///     .extract(Some(&failure))
///     .unwrap()
///     .into_iter()
///     .map(|failure| failure.message().into_owned())
///     .collect();
/// assert_eq!(order, ["F3", "F2", "F1"]);
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainExtractor {
    max_depth: Option<usize>,
}

/// One failure on the current traversal path, with its unvisited relatives.
struct Frame<'a> {
    failure: &'a dyn Failure,
    related: vec::IntoIter<&'a dyn Failure>,
}

impl ChainExtractor {
    /// Creates an extractor without a depth bound.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_depth: None }
    }

    /// Creates an extractor refusing failure trees nested deeper than
    /// `max_depth` levels, the outermost failure counting as level one.
    #[must_use]
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }

    /// The depth bound, if any.
    #[must_use]
    pub const fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Returns `failure` and all failures nested below it, innermost first.
    ///
    /// `None` yields an empty sequence. A failure nested below itself is
    /// reported as [`ExtractionError::Cycle`]. The same failure reached
    /// through two different branches is not a cycle and is listed once per
    /// branch.
    ///
    /// Failures are told apart by [`FailureId`], so a failure holding its
    /// cause inline is not mistaken for that cause. Two distinct zero-sized
    /// failures of the same type may still be mistaken for one another.
    pub fn extract<'a>(
        &self,
        failure: Option<&'a dyn Failure>,
    ) -> Result<Vec<&'a dyn Failure>, ExtractionError> {
        let Some(root) = failure else {
            return Ok(Vec::new());
        };

        let mut ordered = Vec::new();
        let mut path: HashSet<FailureId, FxBuildHasher> = HashSet::default();
        let mut stack: Vec<Frame<'a>> = Vec::new();
        self.enter(root, &mut stack, &mut path)?;

        while let Some(frame) = stack.last_mut() {
            if let Some(next) = frame.related.next() {
                self.enter(next, &mut stack, &mut path)?;
            } else if let Some(done) = stack.pop() {
                path.remove(&FailureId::of(done.failure));
                ordered.push(done.failure);
            }
        }

        tracing::trace!(failures = ordered.len(), "extracted failure chain");
        Ok(ordered)
    }

    fn enter<'a>(
        &self,
        failure: &'a dyn Failure,
        stack: &mut Vec<Frame<'a>>,
        path: &mut HashSet<FailureId, FxBuildHasher>,
    ) -> Result<(), ExtractionError> {
        if let Some(max_depth) = self.max_depth
            && stack.len() >= max_depth
        {
            return Err(ExtractionError::TooDeep { max_depth });
        }
        if !path.insert(FailureId::of(failure)) {
            return Err(ExtractionError::Cycle {
                failure_type: failure.failure_type(),
            });
        }

        stack.push(Frame {
            failure,
            related: failure.related().into_iter(),
        });
        Ok(())
    }
}

/// The reason a failure tree could not be flattened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    /// A failure is nested below itself.
    Cycle {
        /// The runtime type of the failure that reappeared.
        failure_type: TypeInfo,
    },
    /// The tree is nested deeper than the configured bound.
    TooDeep {
        /// The configured bound.
        max_depth: usize,
    },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle { failure_type } => {
                write!(f, "failure of type {failure_type} is nested below itself")
            }
            Self::TooDeep { max_depth } => {
                write!(f, "failure chain is nested deeper than {max_depth} levels")
            }
        }
    }
}

impl core::error::Error for ExtractionError {}
