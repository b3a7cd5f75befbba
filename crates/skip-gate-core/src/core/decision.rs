// crates/skip-gate-core/src/core/decision.rs
// ============================================================================
// Module: Skip Decisions
// Description: Skip-or-run decisions and per-test outcomes.
// Purpose: Model skipping as a value instead of an unwinding signal.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A gate predicate yields a [`SkipDecision`]. A gated test body yields a
//! [`TestOutcome`], which is the boundary value handed to the surrounding test
//! runner. Neither is persisted.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Skip Decision
// ============================================================================

/// Decision produced by a gate predicate for one test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipDecision {
    /// Whether the test must be skipped.
    pub skip: bool,
    /// Human-readable reason (empty when the test runs).
    pub reason: String,
}

impl SkipDecision {
    /// Decision to run the test body.
    #[must_use]
    pub const fn run() -> Self {
        Self {
            skip: false,
            reason: String::new(),
        }
    }

    /// Decision to skip with the given reason.
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            skip: true,
            reason: reason.into(),
        }
    }

    /// Skips with `reason` when `condition` holds, otherwise runs.
    pub fn skip_if(condition: bool, reason: impl Into<String>) -> Self {
        if condition { Self::skip(reason) } else { Self::run() }
    }
}

// ============================================================================
// SECTION: Test Outcome
// ============================================================================

/// Outcome of a test body that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    /// The body ran to completion.
    Passed,
    /// The body was not run, or skipped itself.
    Skipped {
        /// Reason reported to the test runner.
        reason: String,
    },
}

impl TestOutcome {
    /// Builds a skipped outcome.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Returns true when the test was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Returns the skip reason when skipped.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Skipped {
                reason,
            } => Some(reason),
        }
    }
}

impl From<SkipDecision> for TestOutcome {
    fn from(decision: SkipDecision) -> Self {
        if decision.skip { Self::skipped(decision.reason) } else { Self::Passed }
    }
}
