// crates/skip-gate-sqlite/src/backend.rs
// ============================================================================
// Module: SQLite Backend Handle
// Description: BackendHandle over an embedded SQLite connection.
// Purpose: Run gated suites against a real SQL engine without a server.
// Dependencies: rusqlite, serde, skip-gate-core, thiserror
// ============================================================================

//! ## Overview
//! [`SqliteBackend`] behaves like a non-autocommit client connection: the
//! first statement opens a transaction that stays open until
//! [`BackendHandle::rollback`]. Server status parameters live in the
//! `skip_gate_parameter_status` table; when the table is missing the handle
//! reports no status at all. Any other lookup failure, such as a locked
//! database, is an error rather than an absent parameter. `SHOW <name>` statements are answered from the
//! same table.
//!
//! Engine errors are classified by SQLSTATE so capability gates can tell an
//! absent feature from a real failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use skip_gate_core::BackendError;
use skip_gate_core::BackendHandle;
use skip_gate_core::Connector;
use skip_gate_core::EncodedVersion;
use skip_gate_core::Row;
use skip_gate_core::encode_components;
use skip_gate_core::sqlstate;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Table holding reported status parameters.
pub const PARAMETER_STATUS_TABLE: &str = "skip_gate_parameter_status";
/// Status parameter carrying a numeric server version.
pub const SERVER_VERSION_NUM_KEY: &str = "server_version_num";
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Path that opens a private in-memory database.
const MEMORY_PATH: &str = ":memory:";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for opening SQLite backend handles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteBackendConfig {
    /// Path to the database file, or `:memory:`.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Opens the database read-only; writes fail with insufficient privilege.
    #[serde(default)]
    pub read_only: bool,
}

impl SqliteBackendConfig {
    /// Config for a read-write database file with default settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_only: false,
        }
    }

    /// Returns true when the config names a private in-memory database.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.path == Path::new(MEMORY_PATH)
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors opening a SQLite backend.
#[derive(Debug, Error)]
pub enum SqliteBackendError {
    /// `SQLite` engine error.
    #[error("sqlite backend db error: {0}")]
    Db(String),
    /// Invalid configuration.
    #[error("sqlite backend invalid config: {0}")]
    Invalid(String),
}

impl From<SqliteBackendError> for BackendError {
    fn from(error: SqliteBackendError) -> Self {
        Self::operational(error.to_string())
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Backend handle over one SQLite connection.
#[derive(Debug)]
pub struct SqliteBackend {
    /// Open connection; `None` once closed.
    connection: Option<Connection>,
}

impl SqliteBackend {
    /// Opens a connection using the given config.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteBackendError`] when the path is invalid or the
    /// database cannot be opened.
    pub fn open(config: &SqliteBackendConfig) -> Result<Self, SqliteBackendError> {
        if !config.is_memory() {
            validate_backend_path(&config.path)?;
        }
        let flags = if config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        };
        let connection =
            Connection::open_with_flags(&config.path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)
                .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
        connection
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteBackendError::Db(err.to_string()))?;
        Ok(Self {
            connection: Some(connection),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteBackendError::Db`] when `SQLite` cannot allocate it.
    pub fn open_in_memory() -> Result<Self, SqliteBackendError> {
        Self::open(&SqliteBackendConfig::new(MEMORY_PATH))
    }

    /// Returns a connector that opens a new handle per call.
    #[must_use]
    pub fn connector(config: SqliteBackendConfig) -> Connector<Self> {
        Arc::new(move || Self::open(&config).map_err(BackendError::from))
    }

    /// Seeds a status parameter, creating the status table if needed.
    ///
    /// Seeding runs in autocommit mode and is refused inside an open
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when a transaction is open or the write fails.
    pub fn set_parameter_status(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let connection = self.live()?;
        if !connection.is_autocommit() {
            return Err(BackendError::internal(
                "cannot seed parameter status inside an open transaction",
            ));
        }
        connection
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {PARAMETER_STATUS_TABLE} (name TEXT PRIMARY KEY, \
                 value TEXT NOT NULL);"
            ))
            .map_err(|err| classify_error(&err))?;
        connection
            .execute(
                &format!(
                    "INSERT OR REPLACE INTO {PARAMETER_STATUS_TABLE} (name, value) VALUES (?1, ?2)"
                ),
                params![key, value],
            )
            .map_err(|err| classify_error(&err))?;
        Ok(())
    }

    /// Returns true while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.connection.as_ref().is_some_and(|connection| !connection.is_autocommit())
    }

    /// Returns the open connection.
    fn live(&self) -> Result<&Connection, BackendError> {
        self.connection.as_ref().ok_or_else(|| BackendError::operational("connection already closed"))
    }

    /// Answers `SHOW <name>` from the status table.
    fn show(&self, name: &str) -> Result<Vec<Row>, BackendError> {
        match self.report_status(name)? {
            Some(value) => Ok(vec![vec![Some(value)]]),
            None => Err(BackendError::programming(
                sqlstate::UNDEFINED_OBJECT,
                format!("unrecognized configuration parameter \"{name}\""),
            )),
        }
    }

    /// Runs a statement inside the implicit transaction.
    fn query_rows(&self, sql: &str) -> Result<Vec<Row>, BackendError> {
        let connection = self.live()?;
        if connection.is_autocommit() {
            connection.execute_batch("BEGIN DEFERRED").map_err(|err| classify_error(&err))?;
        }
        let mut statement = connection.prepare(sql).map_err(|err| classify_error(&err))?;
        let columns = statement.column_count();
        let mut rows = statement.query([]).map_err(|err| classify_error(&err))?;
        let mut output = Vec::new();
        while let Some(row) = rows.next().map_err(|err| classify_error(&err))? {
            let mut values = Vec::with_capacity(columns);
            for index in 0 .. columns {
                values.push(render_value(row.get_ref(index).map_err(|err| classify_error(&err))?));
            }
            output.push(values);
        }
        Ok(output)
    }

    /// Encodes the engine's own `sqlite_version()`.
    fn engine_version(&self) -> Result<EncodedVersion, BackendError> {
        let text: String = self
            .live()?
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|err| classify_error(&err))?;
        let components = text
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BackendError::internal(format!("unexpected sqlite version '{text}'")))?;
        encode_components(&components).map_err(|err| BackendError::internal(err.to_string()))
    }
}

impl BackendHandle for SqliteBackend {
    fn report_status(&self, key: &str) -> Result<Option<String>, BackendError> {
        let lookup = self
            .live()?
            .query_row(
                &format!("SELECT value FROM {PARAMETER_STATUS_TABLE} WHERE name = ?1"),
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional();
        match lookup {
            Ok(value) => Ok(value),
            Err(err) => {
                let error = classify_error(&err);
                // Only a missing status table means "no status parameters".
                if error.sqlstate.as_deref() == Some(sqlstate::UNDEFINED_TABLE) {
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }

    fn run_query(&mut self, sql: &str) -> Result<Vec<Row>, BackendError> {
        match show_target(sql) {
            Some(name) => self.show(name),
            None => self.query_rows(sql),
        }
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        let Some(connection) = self.connection.as_ref() else {
            return Ok(());
        };
        if connection.is_autocommit() {
            return Ok(());
        }
        connection.execute_batch("ROLLBACK").map_err(|err| classify_error(&err))
    }

    fn server_version(&self) -> Result<EncodedVersion, BackendError> {
        match self.report_status(SERVER_VERSION_NUM_KEY)? {
            Some(value) => value.trim().parse::<u64>().map(EncodedVersion::from_raw).map_err(|_| {
                BackendError::internal(format!("invalid {SERVER_VERSION_NUM_KEY} '{value}'"))
            }),
            None => self.engine_version(),
        }
    }

    fn close(&mut self) -> Result<(), BackendError> {
        match self.connection.take() {
            None => Ok(()),
            Some(connection) => connection.close().map_err(|(_, err)| classify_error(&err)),
        }
    }

    fn is_closed(&self) -> bool {
        self.connection.is_none()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the parameter name of a `SHOW <name>` statement.
fn show_target(sql: &str) -> Option<&str> {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    let (keyword, rest) = trimmed.split_once(char::is_whitespace)?;
    if !keyword.eq_ignore_ascii_case("show") {
        return None;
    }
    let name = rest.trim();
    (!name.is_empty() && !name.contains(char::is_whitespace)).then_some(name)
}

/// Renders a column value as text.
fn render_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(number) => Some(number.to_string()),
        ValueRef::Real(number) => Some(number.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Maps an engine error to a backend error class and SQLSTATE.
fn classify_error(error: &rusqlite::Error) -> BackendError {
    let message = error.to_string();
    if let Some(code) = error.sqlite_error_code()
        && matches!(
            code,
            ErrorCode::ReadOnly | ErrorCode::PermissionDenied | ErrorCode::AuthorizationForStatementDenied
        )
    {
        return BackendError::programming(sqlstate::INSUFFICIENT_PRIVILEGE, message);
    }
    let lower = message.to_ascii_lowercase();
    let state = if lower.contains("no such table") {
        Some(sqlstate::UNDEFINED_TABLE)
    } else if lower.contains("no such column") {
        Some(sqlstate::UNDEFINED_COLUMN)
    } else if lower.contains("no such function") {
        Some(sqlstate::UNDEFINED_FUNCTION)
    } else if lower.contains("syntax error") || lower.contains("incomplete input") {
        Some(sqlstate::SYNTAX_ERROR)
    } else {
        None
    };
    match state {
        Some(state) => BackendError::programming(state, message),
        None => BackendError::operational(message),
    }
}

/// Validates backend paths for safety limits.
fn validate_backend_path(path: &Path) -> Result<(), SqliteBackendError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteBackendError::Invalid("backend path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteBackendError::Invalid("backend path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteBackendError::Invalid(
                "backend path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteBackendError::Invalid(
            "backend path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
