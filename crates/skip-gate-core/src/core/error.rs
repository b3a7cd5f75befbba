// crates/skip-gate-core/src/core/error.rs
// ============================================================================
// Module: Skip Gate Errors
// Description: Error taxonomy for gate declaration and evaluation.
// Purpose: Separate declaration faults from backend faults and test failures.
// Dependencies: thiserror, crate::interfaces
// ============================================================================

//! ## Overview
//! Declaration errors (bad version patterns, empty reasons) surface when a gate
//! is built, never at test run time. Backend errors that are not an expected
//! "capability absent" condition propagate unchanged to the test runner.

use thiserror::Error;

use crate::interfaces::BackendError;

// ============================================================================
// SECTION: Gate Errors
// ============================================================================

/// Errors produced while declaring or evaluating gates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Version-constraint text does not match `OP MAJOR[.MINOR[.PATCH]]`.
    #[error("bad version pattern '{pattern}': should be 'OP MAJOR[.MINOR[.PATCH]]'")]
    MalformedVersionSpec {
        /// Offending pattern text.
        pattern: String,
    },
    /// The backend reported a version banner without a `vX.Y.Z` component.
    #[error("can't parse backend version from '{banner}'")]
    VersionBannerUnparsable {
        /// Banner text reported by the backend.
        banner: String,
    },
    /// A skip reason was empty or otherwise unusable.
    #[error("invalid skip reason: {0}")]
    InvalidReason(String),
    /// Backend failure that is not an expected capability-absent condition.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Assertion failure reported by a test body.
    #[error("test failed: {0}")]
    Failed(String),
}

impl GateError {
    /// Builds a malformed-pattern error for the given text.
    pub fn malformed(pattern: impl Into<String>) -> Self {
        Self::MalformedVersionSpec {
            pattern: pattern.into(),
        }
    }

    /// Builds a test failure with a custom message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Returns the backend error when this is a backend failure.
    #[must_use]
    pub const fn as_backend(&self) -> Option<&BackendError> {
        match self {
            Self::Backend(error) => Some(error),
            _ => None,
        }
    }
}

/// Validates a skip reason and returns it as an owned string.
///
/// # Errors
///
/// Returns [`GateError::InvalidReason`] when the reason is blank.
pub fn validate_reason(reason: impl Into<String>) -> Result<String, GateError> {
    let reason = reason.into();
    if reason.trim().is_empty() {
        return Err(GateError::InvalidReason("reason must be non-empty".to_string()));
    }
    Ok(reason)
}
