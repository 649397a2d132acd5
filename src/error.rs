//! Crate-wide error type.
//!
//! Every fallible entry point in this crate (operator construction,
//! `process`, pipeline scheduling) returns `Result<T, HdrCoreError>`. Per
//! the pipeline's error model, all variants are fatal at the point they are
//! raised: there is no partial-frame recovery and no retry policy.

use thiserror::Error;

/// Errors that may occur while constructing or running an operator.
///
/// This enum may be added to in the future and should not be assumed to be
/// exhaustive.
#[derive(Debug, Error)]
pub enum HdrCoreError {
    /// Operator inputs disagree on `isFloat`, `bitDepth`, or plane sizes
    /// where equality is required.
    #[error("type mismatch: {reason}")]
    TypeMismatch {
        #[doc(hidden)]
        reason: String,
    },
    /// A `pixelFormat` or `chromaLocation` combination no configured
    /// operator can satisfy.
    #[error("unsupported format: {reason}")]
    UnsupportedFormat {
        #[doc(hidden)]
        reason: String,
    },
    /// A working buffer could not be sized.
    #[error("allocation failure: {reason}")]
    AllocationFailure {
        #[doc(hidden)]
        reason: String,
    },
    /// A numeric input fell outside the documented domain of a transfer
    /// function and clipping was disabled.
    #[error("domain error: {reason}")]
    DomainError {
        #[doc(hidden)]
        reason: String,
    },
    /// Propagated verbatim from an external `FrameReader`/`FrameWriter`.
    #[error("I/O failure: {reason}")]
    IoFailure {
        #[doc(hidden)]
        reason: String,
    },
    /// Placeholder for forward compatibility.
    #[doc(hidden)]
    #[error("unreachable")]
    NonExhaustive,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HdrCoreError>;

impl HdrCoreError {
    pub(crate) fn type_mismatch(reason: impl Into<String>) -> Self {
        HdrCoreError::TypeMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        HdrCoreError::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn domain(reason: impl Into<String>) -> Self {
        HdrCoreError::DomainError {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[inline(always)]
pub(crate) fn assert_metric_eq(expected: f64, value: f64) {
    assert!(
        (expected - value).abs() < 0.01,
        "Expected {}, got {}",
        expected,
        value
    );
}
