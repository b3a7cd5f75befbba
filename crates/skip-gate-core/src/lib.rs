// crates/skip-gate-core/src/lib.rs
// ============================================================================
// Module: Skip Gate Core Library
// Description: Public API surface for conditional test gating.
// Purpose: Expose version matching, gates, suites, and the backend probe.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Skip Gate decides, per test, whether a database client test should run
//! against the backend in front of it. Gates check server and runtime
//! versions, probe server capabilities with guaranteed rollback, detect the
//! CockroachDB family through a cached status probe, and turn privilege
//! failures into skips. Gates compose as decorators over single test bodies
//! or whole suites.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use audit::FileGateAuditSink;
pub use audit::GateAuditEvent;
pub use audit::GateAuditOutcome;
pub use audit::GateAuditSink;
pub use audit::MemoryGateAuditSink;
pub use audit::NoopGateAuditSink;
pub use audit::StderrGateAuditSink;
pub use audit::VersionProbeAuditEvent;
pub use interfaces::BackendError;
pub use interfaces::BackendErrorClass;
pub use interfaces::BackendHandle;
pub use interfaces::GateContext;
pub use interfaces::Row;
pub use interfaces::sqlstate;
pub use runtime::*;
