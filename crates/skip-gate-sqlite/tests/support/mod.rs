// crates/skip-gate-sqlite/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Result helpers and database fixtures for SQLite backend tests.
// ============================================================================
//! ## Overview
//! Shared helpers for Result-based assertions and seeded database files.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    dead_code,
    reason = "Test-only helpers; not every test binary uses every helper."
)]

use std::error::Error;
use std::fmt;

use skip_gate_sqlite::SqliteBackend;
use skip_gate_sqlite::SqliteBackendConfig;
use tempfile::TempDir;

/// Standard result type used across SQLite backend tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Lightweight error type for test assertions.
#[derive(Debug)]
struct TestError {
    /// Human-readable failure message.
    message: String,
}

impl fmt::Display for TestError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for TestError {}

/// Returns an error when a test condition fails.
///
/// # Errors
/// Returns a `TestError` when the condition is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(Box::new(TestError {
            message: message.into(),
        }))
    }
}

/// Database file inside a temporary directory.
pub struct TempDatabase {
    /// Owning directory; removed on drop.
    _dir: TempDir,
    /// Read-write config for the database file.
    pub config: SqliteBackendConfig,
}

impl TempDatabase {
    /// Creates an empty database location.
    pub fn new() -> TestResult<Self> {
        let dir = tempfile::tempdir()?;
        let config = SqliteBackendConfig::new(dir.path().join("gate.db"));
        Ok(Self {
            _dir: dir,
            config,
        })
    }

    /// Creates a database seeded with the given status parameters.
    pub fn with_status(status: &[(&str, &str)]) -> TestResult<Self> {
        let database = Self::new()?;
        let mut seeder = database.open()?;
        for (key, value) in status {
            seeder.set_parameter_status(key, value)?;
        }
        Ok(database)
    }

    /// Opens a read-write handle.
    pub fn open(&self) -> TestResult<SqliteBackend> {
        Ok(SqliteBackend::open(&self.config)?)
    }

    /// Opens a read-only handle.
    pub fn open_read_only(&self) -> TestResult<SqliteBackend> {
        let mut config = self.config.clone();
        config.read_only = true;
        Ok(SqliteBackend::open(&config)?)
    }
}
