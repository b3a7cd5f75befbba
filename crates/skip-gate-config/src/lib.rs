// crates/skip-gate-config/src/lib.rs
// ============================================================================
// Module: Skip Gate Config Library
// Description: Configuration model and context construction for gated suites.
// Purpose: Single source of truth for skip-gate.toml semantics.
// Dependencies: serde, skip-gate-core, skip-gate-sqlite, toml
// ============================================================================

//! ## Overview
//! `skip-gate-config` loads `skip-gate.toml`, validates it fail-closed, and
//! turns it into a ready [`skip_gate_core::ConnectingContext`] over the
//! `SQLite` backend.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
