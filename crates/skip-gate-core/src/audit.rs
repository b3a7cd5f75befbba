// crates/skip-gate-core/src/audit.rs
// ============================================================================
// Module: Gate Audit Logging
// Description: Structured audit events for gate decisions and version probes.
// Purpose: Emit JSON-line logs of skips, errors, and probes without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Gates report every skip and every surfaced error as an audit event, and
//! the version cache reports the moment it resolves. Sinks decide where the
//! JSON lines go; the default sink drops them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::EncodedVersion;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Kind of gate audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAuditOutcome {
    /// The gate skipped the test.
    Skipped,
    /// The gate or the gated body surfaced an error.
    Error,
}

/// Gate decision audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Test name when known.
    pub test: Option<String>,
    /// Gate name.
    pub gate: String,
    /// Outcome classification.
    pub outcome: GateAuditOutcome,
    /// Skip reason or error message.
    pub detail: String,
}

impl GateAuditEvent {
    /// Creates a skip event.
    #[must_use]
    pub fn skipped(test: Option<&str>, gate: &str, reason: &str) -> Self {
        Self::build("gate_skip", test, gate, GateAuditOutcome::Skipped, reason)
    }

    /// Creates an error event.
    #[must_use]
    pub fn error(test: Option<&str>, gate: &str, message: &str) -> Self {
        Self::build("gate_error", test, gate, GateAuditOutcome::Error, message)
    }

    /// Assembles an event with a consistent timestamp.
    fn build(
        event: &'static str,
        test: Option<&str>,
        gate: &str,
        outcome: GateAuditOutcome,
        detail: &str,
    ) -> Self {
        Self {
            event,
            timestamp_ms: now_ms(),
            test: test.map(str::to_string),
            gate: gate.to_string(),
            outcome,
            detail: detail.to_string(),
        }
    }
}

/// Version probe audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct VersionProbeAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Status key that was queried.
    pub status_key: String,
    /// Whether the backend belongs to the probed family.
    pub family_present: bool,
    /// Encoded version when the family is present.
    pub version: Option<EncodedVersion>,
}

impl VersionProbeAuditEvent {
    /// Creates a probe event for a freshly resolved cache slot.
    #[must_use]
    pub fn resolved(status_key: &str, version: Option<EncodedVersion>) -> Self {
        Self {
            event: "version_probe",
            timestamp_ms: now_ms(),
            status_key: status_key.to_string(),
            family_present: version.is_some(),
            version,
        }
    }
}

/// Milliseconds since the Unix epoch, zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gate events.
pub trait GateAuditSink: Send + Sync {
    /// Record a gate decision event.
    fn record(&self, event: &GateAuditEvent);

    /// Record a version probe event.
    fn record_probe(&self, _event: &VersionProbeAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrGateAuditSink;

impl GateAuditSink for StderrGateAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_probe(&self, event: &VersionProbeAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileGateAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileGateAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized payload.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl GateAuditSink for FileGateAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        self.append(event);
    }

    fn record_probe(&self, event: &VersionProbeAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopGateAuditSink;

impl GateAuditSink for NoopGateAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

/// In-memory audit sink that keeps every event, for tests and reports.
#[derive(Default)]
pub struct MemoryGateAuditSink {
    /// Recorded gate events.
    events: Mutex<Vec<GateAuditEvent>>,
    /// Recorded probe events.
    probes: Mutex<Vec<VersionProbeAuditEvent>>,
}

impl MemoryGateAuditSink {
    /// Returns a snapshot of recorded gate events.
    #[must_use]
    pub fn events(&self) -> Vec<GateAuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns a snapshot of recorded probe events.
    #[must_use]
    pub fn probes(&self) -> Vec<VersionProbeAuditEvent> {
        self.probes.lock().map(|probes| probes.clone()).unwrap_or_default()
    }
}

impl GateAuditSink for MemoryGateAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn record_probe(&self, event: &VersionProbeAuditEvent) {
        if let Ok(mut probes) = self.probes.lock() {
            probes.push(event.clone());
        }
    }
}
