// crates/skip-gate-core/tests/support/mocks.rs
// ============================================================================
// Module: Mock Backend
// Description: Scriptable backend handle and context builders for gate tests.
// ============================================================================
//! ## Overview
//! [`MockBackend`] answers status keys and queries from fixed tables and
//! counts every call in a shared [`BackendStats`], so tests can observe
//! connections the context opened and closed.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    dead_code,
    reason = "Test-only helpers; not every test binary uses every helper."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use skip_gate_core::BackendError;
use skip_gate_core::BackendHandle;
use skip_gate_core::BackendVersionCache;
use skip_gate_core::ConnectingContext;
use skip_gate_core::EncodedVersion;
use skip_gate_core::MemoryGateAuditSink;
use skip_gate_core::Row;
use skip_gate_core::RuntimeVersion;

// ========================================================================
// Stats
// ========================================================================

/// Call counters shared by every clone of a mock backend.
#[derive(Debug, Default)]
pub struct BackendStats {
    /// Connections opened through the context connector.
    pub opened: AtomicUsize,
    /// `report_status` calls.
    pub status_queries: AtomicUsize,
    /// `run_query` calls.
    pub queries: AtomicUsize,
    /// `rollback` calls.
    pub rollbacks: AtomicUsize,
    /// `close` calls.
    pub closes: AtomicUsize,
}

impl BackendStats {
    /// Reads a counter.
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

// ========================================================================
// Mock Backend
// ========================================================================

/// Scriptable backend handle.
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Status parameters reported by the server.
    status: BTreeMap<String, String>,
    /// Canned query responses keyed by SQL text.
    responses: BTreeMap<String, Result<Vec<Row>, BackendError>>,
    /// Error returned by every status lookup, when set.
    status_error: Option<BackendError>,
    /// Numeric server version.
    version: EncodedVersion,
    /// Shared counters.
    stats: Arc<BackendStats>,
    /// Set once closed.
    closed: bool,
}

impl MockBackend {
    /// Creates a backend reporting the given server version.
    pub fn new(version: EncodedVersion) -> Self {
        Self {
            status: BTreeMap::new(),
            responses: BTreeMap::new(),
            status_error: None,
            version,
            stats: Arc::new(BackendStats::default()),
            closed: false,
        }
    }

    /// Adds a status parameter.
    pub fn with_status(mut self, key: &str, value: &str) -> Self {
        self.status.insert(key.to_string(), value.to_string());
        self
    }

    /// Makes every status lookup fail with `error`.
    pub fn with_status_error(mut self, error: BackendError) -> Self {
        self.status_error = Some(error);
        self
    }

    /// Adds a canned response for a query.
    pub fn with_response(mut self, sql: &str, response: Result<Vec<Row>, BackendError>) -> Self {
        self.responses.insert(sql.to_string(), response);
        self
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<BackendStats> {
        Arc::clone(&self.stats)
    }
}

impl BackendHandle for MockBackend {
    fn report_status(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.stats.status_queries.fetch_add(1, Ordering::SeqCst);
        match &self.status_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.status.get(key).cloned()),
        }
    }

    fn run_query(&mut self, sql: &str) -> Result<Vec<Row>, BackendError> {
        self.stats.queries.fetch_add(1, Ordering::SeqCst);
        self.responses.get(sql).cloned().unwrap_or_else(|| {
            Err(BackendError::programming("42601", format!("unexpected query: {sql}")))
        })
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn server_version(&self) -> Result<EncodedVersion, BackendError> {
        Ok(self.version)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ========================================================================
// Builders
// ========================================================================

/// Rows with a single text column.
pub fn text_rows(values: &[&str]) -> Vec<Row> {
    values.iter().map(|value| vec![Some((*value).to_string())]).collect()
}

/// Context over clones of `backend` with a private version cache.
pub fn context(backend: &MockBackend) -> ConnectingContext<MockBackend> {
    context_with_runtime(backend, RuntimeVersion::new(vec![3, 11, 4]))
}

/// Context over clones of `backend` with an explicit runtime version.
pub fn context_with_runtime(
    backend: &MockBackend,
    runtime: RuntimeVersion,
) -> ConnectingContext<MockBackend> {
    let template = backend.clone();
    ConnectingContext::new(
        move || {
            template.stats.opened.fetch_add(1, Ordering::SeqCst);
            Ok(template.clone())
        },
        runtime,
    )
    .with_version_cache(Arc::new(BackendVersionCache::new()))
}

/// Context that records audit events into the returned sink.
pub fn audited_context(
    backend: &MockBackend,
) -> (ConnectingContext<MockBackend>, Arc<MemoryGateAuditSink>) {
    let sink = Arc::new(MemoryGateAuditSink::default());
    let shared: Arc<MemoryGateAuditSink> = Arc::clone(&sink);
    (context(backend).with_audit_sink(shared), sink)
}
