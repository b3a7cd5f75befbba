// crates/skip-gate-core/src/runtime/capability.rs
// ============================================================================
// Module: Capability Probing
// Description: Scoped backend queries with guaranteed rollback.
// Purpose: Let predicates query the server without leaking transaction state.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A capability probe runs inside a [`RollbackScope`]. The scope rolls the
//! connection back when it finishes, and again on drop if it was never
//! finished (for example when the probe unwinds), so the gated body always
//! starts from a clean transaction.
//!
//! [`classify_probe`] turns a probe result into a skip decision: a
//! feature-absent backend error becomes a skip, any other error propagates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::GateError;
use crate::core::SkipDecision;
use crate::interfaces::BackendError;
use crate::interfaces::BackendHandle;

// ============================================================================
// SECTION: Rollback Scope
// ============================================================================

/// Borrow of a connection that is rolled back when the scope ends.
pub struct RollbackScope<'a, B: BackendHandle + ?Sized> {
    /// Connection under probe.
    handle: &'a mut B,
    /// Set once the explicit rollback ran.
    finished: bool,
}

impl<'a, B: BackendHandle + ?Sized> RollbackScope<'a, B> {
    /// Opens a scope over the connection.
    pub const fn new(handle: &'a mut B) -> Self {
        Self {
            handle,
            finished: false,
        }
    }

    /// Connection inside the scope.
    pub fn handle(&mut self) -> &mut B {
        &mut *self.handle
    }

    /// Rolls back and closes the scope.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the rollback fails.
    pub fn finish(mut self) -> Result<(), BackendError> {
        self.finished = true;
        self.handle.rollback()
    }
}

impl<B: BackendHandle + ?Sized> Drop for RollbackScope<'_, B> {
    fn drop(&mut self) {
        if !self.finished {
            // Unwinding or early-return path; `finish` reports rollback errors.
            let _ = self.handle.rollback();
        }
    }
}

/// Runs `probe` on the connection and rolls back on every exit path.
///
/// A probe error takes precedence over a rollback error.
///
/// # Errors
///
/// Returns the probe's [`BackendError`], or the rollback's when the probe
/// succeeded.
pub fn with_rollback<B, T, F>(handle: &mut B, probe: F) -> Result<T, BackendError>
where
    B: BackendHandle + ?Sized,
    F: FnOnce(&mut B) -> Result<T, BackendError>,
{
    let mut scope = RollbackScope::new(handle);
    let outcome = probe(scope.handle());
    let rollback = scope.finish();
    let value = outcome?;
    rollback?;
    Ok(value)
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Maps a capability probe result to a skip decision.
///
/// `Ok(true)` runs the test, `Ok(false)` and feature-absent errors skip with
/// `reason`, and every other error is returned unchanged.
///
/// # Errors
///
/// Returns [`GateError::Backend`] for errors other than feature absence.
pub fn classify_probe(
    result: Result<bool, BackendError>,
    reason: &str,
) -> Result<SkipDecision, GateError> {
    match result {
        Ok(available) => Ok(SkipDecision::skip_if(!available, reason)),
        Err(error) if error.is_feature_absent() => Ok(SkipDecision::skip(reason)),
        Err(error) => Err(GateError::Backend(error)),
    }
}
