// crates/skip-gate-core/src/core/mod.rs
// ============================================================================
// Module: Skip Gate Core Types
// Description: Versions, decisions, reasons, and errors.
// Purpose: Provide the data model shared by the gate runtime.
// Dependencies: regex, serde, thiserror
// ============================================================================

//! ## Overview
//! Core types are pure data and pure functions. Nothing here touches a backend
//! or holds process-wide mutable state.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod decision;
pub mod error;
pub mod reasons;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use decision::SkipDecision;
pub use decision::TestOutcome;
pub use error::GateError;
pub use error::validate_reason;
pub use reasons::COCKROACH_ISSUES_URL;
pub use reasons::ReasonRegistry;
pub use version::EncodedVersion;
pub use version::MAX_EXACT_COMPONENT;
pub use version::RuntimeVersion;
pub use version::VersionConstraint;
pub use version::VersionOp;
pub use version::VersionSpec;
pub use version::encode;
pub use version::encode_components;
pub use version::evaluate;
pub use version::parse_version_spec;
