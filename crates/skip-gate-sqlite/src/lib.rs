// crates/skip-gate-sqlite/src/lib.rs
// ============================================================================
// Module: Skip Gate SQLite Backend
// Description: Embedded SQLite implementation of the backend handle.
// Purpose: Let gated suites run against a real SQL engine in-process.
// Dependencies: rusqlite, skip-gate-core
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteBackend`], a [`skip_gate_core::BackendHandle`]
//! over an embedded `SQLite` database. Status parameters are seeded into a
//! table, so the same database can impersonate servers of different
//! versions and families.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::PARAMETER_STATUS_TABLE;
pub use backend::SERVER_VERSION_NUM_KEY;
pub use backend::SqliteBackend;
pub use backend::SqliteBackendConfig;
pub use backend::SqliteBackendError;
