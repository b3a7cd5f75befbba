// crates/skip-gate-config/src/config.rs
// ============================================================================
// Module: Skip Gate Configuration
// Description: Configuration loading and validation for gated test suites.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, skip-gate-core, skip-gate-sqlite, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys are rejected. The backend DSN may be overridden from the
//! environment so one config file serves several databases.
//!
//! ```toml
//! [backend]
//! dsn = "target/gate.db"
//!
//! [runtime]
//! version = "3.11.4"
//! green = false
//!
//! [audit]
//! sink = "file"
//! path = "target/gate-audit.jsonl"
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use skip_gate_core::ConnectingContext;
use skip_gate_core::FileGateAuditSink;
use skip_gate_core::GateAuditSink;
use skip_gate_core::NoopGateAuditSink;
use skip_gate_core::RuntimeVersion;
use skip_gate_core::StderrGateAuditSink;
use skip_gate_sqlite::SqliteBackend;
use skip_gate_sqlite::SqliteBackendConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "skip-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SKIP_GATE_CONFIG";
/// Environment variable used to override the backend DSN.
pub const DSN_ENV_VAR: &str = "SKIP_GATE_DSN";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default busy timeout (ms) for backend connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Root configuration for gated suites.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkipGateConfig {
    /// Backend connection settings.
    pub backend: BackendConfig,
    /// Host runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Database location; a file path or `:memory:`.
    pub dsn: String,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Opens the database read-only.
    #[serde(default)]
    pub read_only: bool,
}

/// Host runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Dotted runtime version such as `"3.11.4"`; defaults to this crate's version.
    #[serde(default)]
    pub version: Option<String>,
    /// Asynchronous ("green") mode flag.
    #[serde(default)]
    pub green: bool,
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

/// Audit sink settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log path; required for the file sink only.
    #[serde(default)]
    pub path: Option<String>,
}

/// Returns the default busy timeout for backend connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl SkipGateConfig {
    /// Loads configuration using the process environment.
    ///
    /// The path is `path` when given, else `SKIP_GATE_CONFIG`, else
    /// `skip-gate.toml` in the working directory. `SKIP_GATE_DSN` overrides
    /// the backend DSN.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| env::var(key).ok())
    }

    /// Loads configuration, reading environment variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolved = resolve_path(path, &lookup)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml(content)?;
        config.apply_env_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration text without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dsn) = lookup(DSN_ENV_VAR) {
            self.backend.dsn = dsn;
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.runtime.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the configured runtime version, or this crate's own version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the version is not dotted integers.
    pub fn runtime_version(&self) -> Result<RuntimeVersion, ConfigError> {
        self.runtime.parse_version()
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn GateAuditSink>, ConfigError> {
        match self.audit.sink {
            AuditSinkKind::None => Ok(Arc::new(NoopGateAuditSink)),
            AuditSinkKind::Stderr => Ok(Arc::new(StderrGateAuditSink)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("audit.path is required for the file sink".to_string())
                })?;
                let sink = FileGateAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Builds a connecting context over the configured `SQLite` backend.
    ///
    /// The context shares the process-wide version cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the runtime version or audit sink is invalid.
    pub fn context(&self) -> Result<ConnectingContext<SqliteBackend>, ConfigError> {
        let runtime = self.runtime_version()?;
        let audit = self.build_audit_sink()?;
        Ok(ConnectingContext::from_connector(
            SqliteBackend::connector(self.backend.sqlite_config()),
            runtime,
        )
        .with_green(self.runtime.green)
        .with_audit_sink(audit))
    }
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

impl BackendConfig {
    /// Returns the `SQLite` backend config for this DSN.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteBackendConfig {
        SqliteBackendConfig {
            path: PathBuf::from(self.dsn.trim()),
            busy_timeout_ms: self.busy_timeout_ms,
            read_only: self.read_only,
        }
    }

    /// Validates backend settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("backend.dsn", &self.dsn)?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "backend.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl RuntimeConfig {
    /// Parses the configured version, defaulting to the package version.
    fn parse_version(&self) -> Result<RuntimeVersion, ConfigError> {
        let text = self.version.as_deref().unwrap_or(env!("CARGO_PKG_VERSION"));
        RuntimeVersion::parse(text)
            .map_err(|err| ConfigError::Invalid(format!("runtime.version: {err}")))
    }

    /// Validates runtime settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.parse_version().map(|_| ())
    }
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, self.path.as_deref()) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => Err(ConfigError::Invalid(
                "audit.path is required for the file sink".to_string(),
            )),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid for the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O errors while reading config or opening sinks.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parse errors.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation errors.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from input, environment, or default.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
