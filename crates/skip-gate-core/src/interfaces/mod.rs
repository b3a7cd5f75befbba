// crates/skip-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Skip Gate Interfaces
// Description: Backend handle and test context contracts.
// Purpose: Define the capabilities the gate runtime consumes from its host.
// Dependencies: thiserror, crate::{audit, core, runtime}
// ============================================================================

//! ## Overview
//! The gate runtime never talks to a database client directly. It calls
//! through [`BackendHandle`] for status reporting, queries, and rollback, and
//! through [`GateContext`] for connections, the host runtime version, the
//! shared version cache, and the audit sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::audit::GateAuditSink;
use crate::audit::NoopGateAuditSink;
use crate::core::EncodedVersion;
use crate::core::GateError;
use crate::core::RuntimeVersion;
use crate::runtime::probe::BackendVersionCache;

// ============================================================================
// SECTION: SQLSTATE Codes
// ============================================================================

/// SQLSTATE codes the gate runtime recognizes.
pub mod sqlstate {
    /// `42501`: the current user lacks the required privilege.
    pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
    /// `42601`: statement could not be parsed.
    pub const SYNTAX_ERROR: &str = "42601";
    /// `42P01`: relation does not exist.
    pub const UNDEFINED_TABLE: &str = "42P01";
    /// `42703`: column does not exist.
    pub const UNDEFINED_COLUMN: &str = "42703";
    /// `42883`: function does not exist.
    pub const UNDEFINED_FUNCTION: &str = "42883";
    /// `42704`: named object (e.g. configuration parameter) does not exist.
    pub const UNDEFINED_OBJECT: &str = "42704";
}

// ============================================================================
// SECTION: Backend Errors
// ============================================================================

/// Error class reported by a backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorClass {
    /// The server rejected the statement: unknown object, syntax, privilege.
    Programming,
    /// Connection or server-side operational failure.
    Operational,
    /// Client-side failure or unexpected response shape.
    Internal,
}

impl BackendErrorClass {
    /// Returns a stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Programming => "programming",
            Self::Operational => "operational",
            Self::Internal => "internal",
        }
    }
}

/// Error returned by a backend handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend {} error: {message}", .class.as_str())]
pub struct BackendError {
    /// Error class.
    pub class: BackendErrorClass,
    /// SQLSTATE code when the server supplied one.
    pub sqlstate: Option<String>,
    /// Server or client message.
    pub message: String,
}

impl BackendError {
    /// Builds an error of the given class.
    pub fn new(
        class: BackendErrorClass,
        sqlstate: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            class,
            sqlstate: sqlstate.map(str::to_string),
            message: message.into(),
        }
    }

    /// Builds a programming error with a SQLSTATE code.
    pub fn programming(sqlstate: &str, message: impl Into<String>) -> Self {
        Self::new(BackendErrorClass::Programming, Some(sqlstate), message)
    }

    /// Builds an operational error.
    pub fn operational(message: impl Into<String>) -> Self {
        Self::new(BackendErrorClass::Operational, None, message)
    }

    /// Builds an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(BackendErrorClass::Internal, None, message)
    }

    /// Returns true when the server did not recognize the probed feature.
    #[must_use]
    pub fn is_feature_absent(&self) -> bool {
        self.class == BackendErrorClass::Programming && !self.is_insufficient_privilege()
    }

    /// Returns true for the insufficient-privilege SQLSTATE.
    #[must_use]
    pub fn is_insufficient_privilege(&self) -> bool {
        self.sqlstate.as_deref() == Some(sqlstate::INSUFFICIENT_PRIVILEGE)
    }
}

// ============================================================================
// SECTION: Backend Handle
// ============================================================================

/// A single result row with every column rendered as text.
pub type Row = Vec<Option<String>>;

/// Connection to the backend under test.
pub trait BackendHandle {
    /// Reports a server status parameter.
    ///
    /// Returns `Ok(None)` when the key is unknown or the handle cannot report
    /// status parameters at all.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the status lookup itself fails; such a
    /// failure says nothing about which parameters exist.
    fn report_status(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Runs a statement and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend rejects the statement.
    fn run_query(&mut self, sql: &str) -> Result<Vec<Row>, BackendError>;

    /// Rolls back any open transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the rollback fails.
    fn rollback(&mut self) -> Result<(), BackendError>;

    /// Returns the numeric server version.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the version cannot be determined.
    fn server_version(&self) -> Result<EncodedVersion, BackendError>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when closing fails.
    fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Returns true once the connection is closed.
    fn is_closed(&self) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Gate Context
// ============================================================================

/// Per-test environment gates evaluate against.
pub trait GateContext {
    /// Backend handle type.
    type Backend: BackendHandle;

    /// Returns the shared connection, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the connection cannot be opened.
    fn conn(&mut self) -> Result<&mut Self::Backend, GateError>;

    /// Opens a fresh connection that is closed on teardown.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the connection cannot be opened.
    fn connect(&mut self) -> Result<&mut Self::Backend, GateError>;

    /// Version of the host runtime.
    fn runtime_version(&self) -> &RuntimeVersion;

    /// Backend version cache shared by every gate in the process.
    fn version_cache(&self) -> Arc<BackendVersionCache>;

    /// Whether the client runs in asynchronous ("green") mode.
    fn green(&self) -> bool {
        false
    }

    /// Audit sink for gate events.
    fn audit_sink(&self) -> Arc<dyn GateAuditSink> {
        Arc::new(NoopGateAuditSink)
    }

    /// Marks the start of a named test.
    fn begin_test(&mut self, _name: &str) {}

    /// Marks the end of the running test and releases its connections.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when a connection fails to close.
    fn end_test(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    /// Name of the running test, when known.
    fn test_name(&self) -> Option<&str> {
        None
    }
}
