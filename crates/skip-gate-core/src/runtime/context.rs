// crates/skip-gate-core/src/runtime/context.rs
// ============================================================================
// Module: Connecting Context
// Description: Concrete gate context that opens and tracks backend connections.
// Purpose: Give test suites a ready-made per-test environment with teardown.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`ConnectingContext`] opens connections through a connector closure. The
//! shared connection is opened lazily by [`GateContext::conn`]; every call to
//! [`GateContext::connect`] opens another one. All of them are closed by
//! [`ConnectingContext::teardown`], which suites run after every test
//! through [`GateContext::end_test`], and on drop when teardown was skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::audit::GateAuditSink;
use crate::audit::NoopGateAuditSink;
use crate::core::GateError;
use crate::core::RuntimeVersion;
use crate::interfaces::BackendError;
use crate::interfaces::BackendHandle;
use crate::interfaces::GateContext;
use crate::runtime::probe::BackendVersionCache;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Opens a new backend connection.
pub type Connector<B> = Arc<dyn Fn() -> Result<B, BackendError> + Send + Sync>;

/// Gate context backed by a connector closure.
pub struct ConnectingContext<B: BackendHandle> {
    /// Connection factory.
    connector: Connector<B>,
    /// Shared connection, opened on first use.
    conn: Option<B>,
    /// Extra connections opened by `connect`.
    conns: Vec<B>,
    /// Host runtime version.
    runtime: RuntimeVersion,
    /// Backend version cache.
    cache: Arc<BackendVersionCache>,
    /// Asynchronous ("green") mode flag.
    green: bool,
    /// Audit sink for gate events.
    audit: Arc<dyn GateAuditSink>,
    /// Running test name.
    test_name: Option<String>,
}

impl<B: BackendHandle> ConnectingContext<B> {
    /// Creates a context using the process-wide version cache.
    pub fn new<F>(connector: F, runtime: RuntimeVersion) -> Self
    where
        F: Fn() -> Result<B, BackendError> + Send + Sync + 'static,
    {
        Self::from_connector(Arc::new(connector), runtime)
    }

    /// Creates a context from a shared connector.
    #[must_use]
    pub fn from_connector(connector: Connector<B>, runtime: RuntimeVersion) -> Self {
        Self {
            connector,
            conn: None,
            conns: Vec::new(),
            runtime,
            cache: BackendVersionCache::shared(),
            green: false,
            audit: Arc::new(NoopGateAuditSink),
            test_name: None,
        }
    }

    /// Replaces the version cache.
    #[must_use]
    pub fn with_version_cache(mut self, cache: Arc<BackendVersionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the green mode flag.
    #[must_use]
    pub fn with_green(mut self, green: bool) -> Self {
        self.green = green;
        self
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn GateAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Number of connections still open, shared one included.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.conns.iter().chain(self.conn.as_ref()).filter(|conn| !conn.is_closed()).count()
    }

    /// Closes every tracked connection.
    ///
    /// All connections are closed even when one fails; the first failure
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Backend`] when a connection fails to close.
    pub fn teardown(&mut self) -> Result<(), GateError> {
        let mut first_error = None;
        for mut conn in self.conns.drain(..).chain(self.conn.take()) {
            if conn.is_closed() {
                continue;
            }
            if let Err(error) = conn.close()
                && first_error.is_none()
            {
                first_error = Some(error);
            }
        }
        first_error.map_or(Ok(()), |error| Err(GateError::Backend(error)))
    }

    /// Opens one connection through the connector.
    fn open(&self) -> Result<B, GateError> {
        (self.connector)().map_err(GateError::Backend)
    }
}

impl<B: BackendHandle> GateContext for ConnectingContext<B> {
    type Backend = B;

    fn conn(&mut self) -> Result<&mut B, GateError> {
        if self.conn.is_none() {
            self.conn = Some(self.open()?);
        }
        self.conn.as_mut().ok_or_else(|| GateError::failed("shared connection unavailable"))
    }

    fn connect(&mut self) -> Result<&mut B, GateError> {
        let conn = self.open()?;
        self.conns.retain(|tracked| !tracked.is_closed());
        self.conns.push(conn);
        self.conns.last_mut().ok_or_else(|| GateError::failed("connection unavailable"))
    }

    fn runtime_version(&self) -> &RuntimeVersion {
        &self.runtime
    }

    fn version_cache(&self) -> Arc<BackendVersionCache> {
        Arc::clone(&self.cache)
    }

    fn green(&self) -> bool {
        self.green
    }

    fn audit_sink(&self) -> Arc<dyn GateAuditSink> {
        Arc::clone(&self.audit)
    }

    fn begin_test(&mut self, name: &str) {
        self.test_name = Some(name.to_string());
    }

    fn end_test(&mut self) -> Result<(), GateError> {
        self.test_name = None;
        self.teardown()
    }

    fn test_name(&self) -> Option<&str> {
        self.test_name.as_deref()
    }
}

impl<B: BackendHandle> Drop for ConnectingContext<B> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}
