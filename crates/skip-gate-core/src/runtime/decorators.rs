// crates/skip-gate-core/src/runtime/decorators.rs
// ============================================================================
// Module: Gate Factories
// Description: Ready-made gates for backend, runtime, capability, and privilege checks.
// Purpose: Provide the skip conditions client test suites declare most often.
// Dependencies: crate::{audit, core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Every factory validates its arguments when called, so a malformed version
//! or blank reason fails the suite declaration rather than a test run.
//!
//! - Version gates compare literal triples with `<` / `>=`; no constraint
//!   text is parsed.
//! - Capability gates query the server inside a rollback scope.
//! - [`skip_unless_superuser`] runs the body first and converts only the
//!   insufficient-privilege SQLSTATE into a skip.
//! - [`skip_if_crdb`] consults the cached backend version probe.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::audit::GateAuditEvent;
use crate::core::EncodedVersion;
use crate::core::GateError;
use crate::core::ReasonRegistry;
use crate::core::SkipDecision;
use crate::core::TestOutcome;
use crate::core::VersionConstraint;
use crate::core::encode_components;
use crate::core::parse_version_spec;
use crate::core::validate_reason;
use crate::core::version::join_components;
use crate::interfaces::BackendError;
use crate::interfaces::BackendErrorClass;
use crate::interfaces::BackendHandle;
use crate::interfaces::GateContext;
use crate::interfaces::Row;
use crate::runtime::capability::classify_probe;
use crate::runtime::capability::with_rollback;
use crate::runtime::gate::Decorator;
use crate::runtime::gate::Gate;
use crate::runtime::gate::TestBody;
use crate::runtime::probe::BackendVersionCache;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query used to detect the `uuid` type.
const UUID_TYPE_QUERY: &str = "select typname from pg_type where typname = 'uuid'";
/// Query used to read the prepared transaction limit.
const MAX_PREPARED_TRANSACTIONS_QUERY: &str = "SHOW max_prepared_transactions;";
/// Skip reason when the `uuid` type is missing.
const NO_UUID_REASON: &str = "uuid type not available on the server";
/// Skip reason when the server predates two-phase commit.
const TPC_UNSUPPORTED_REASON: &str = "server too old: two phase transactions not supported.";
/// Skip reason when two-phase commit is disabled by configuration.
const TPC_DISABLED_REASON: &str = "server not configured for two phase transactions. set \
                                   max_prepared_transactions to > 0 to run the test";
/// Skip reason when the test needs superuser rights.
const NOT_SUPERUSER_REASON: &str = "skipped because not superuser";
/// Skip reason for copy tests in green mode.
const COPY_GREEN_REASON: &str = "copy in async mode currently not supported";

// ============================================================================
// SECTION: Backend Version Gates
// ============================================================================

/// Skips on servers older than the given version (one to three components).
///
/// # Errors
///
/// Returns [`GateError::MalformedVersionSpec`] for an empty or over-long version.
pub fn skip_before_backend<C>(version: &[u32]) -> Result<Gate<C>, GateError>
where
    C: GateContext + 'static,
{
    let threshold = encode_components(version)?;
    Ok(backend_version_gate("skip_before_backend", move |server| server < threshold))
}

/// Skips on servers at or after the given version (one to three components).
///
/// # Errors
///
/// Returns [`GateError::MalformedVersionSpec`] for an empty or over-long version.
pub fn skip_after_backend<C>(version: &[u32]) -> Result<Gate<C>, GateError>
where
    C: GateContext + 'static,
{
    let threshold = encode_components(version)?;
    Ok(backend_version_gate("skip_after_backend", move |server| server >= threshold))
}

/// Builds a gate over the shared connection's server version.
fn backend_version_gate<C, F>(name: &str, skip_when: F) -> Gate<C>
where
    C: GateContext + 'static,
    F: Fn(EncodedVersion) -> bool + Send + Sync + 'static,
{
    Gate::from_decision(name, move |ctx: &mut C| {
        let server = ctx.conn()?.server_version()?;
        Ok(SkipDecision::skip_if(skip_when(server), format!("skipped because PostgreSQL {server}")))
    })
}

// ============================================================================
// SECTION: Runtime Version Gates
// ============================================================================

/// Skips when the runtime version prefix is older than `version`.
pub fn skip_before_runtime<C>(version: &[u32]) -> Gate<C>
where
    C: GateContext + 'static,
{
    let threshold = version.to_vec();
    runtime_version_gate("skip_before_runtime", threshold, |current, threshold| current < threshold)
}

/// Skips when the runtime version prefix is at or after `version`.
pub fn skip_from_runtime<C>(version: &[u32]) -> Gate<C>
where
    C: GateContext + 'static,
{
    let threshold = version.to_vec();
    runtime_version_gate("skip_from_runtime", threshold, |current, threshold| current >= threshold)
}

/// Builds a gate comparing a same-length runtime version prefix.
fn runtime_version_gate<C, F>(name: &str, threshold: Vec<u32>, skip_when: F) -> Gate<C>
where
    C: GateContext + 'static,
    F: Fn(&[u32], &[u32]) -> bool + Send + Sync + 'static,
{
    Gate::from_decision(name, move |ctx: &mut C| {
        let current = ctx.runtime_version().prefix(threshold.len());
        Ok(SkipDecision::skip_if(
            skip_when(current, threshold.as_slice()),
            format!("skipped because runtime {}", join_components(current)),
        ))
    })
}

// ============================================================================
// SECTION: Capability Gates
// ============================================================================

/// Skips unless `probe` reports the capability on a fresh connection.
///
/// Feature-absent errors from the probe skip with `reason`; other backend
/// errors fail the test.
///
/// # Errors
///
/// Returns [`GateError::InvalidReason`] when the reason is blank.
pub fn skip_unless_capability<C, P>(probe: P, reason: impl Into<String>) -> Result<Gate<C>, GateError>
where
    C: GateContext + 'static,
    P: Fn(&mut C::Backend) -> Result<bool, BackendError> + Send + Sync + 'static,
{
    let reason = validate_reason(reason)?;
    Ok(Gate::from_decision("skip_unless_capability", move |ctx: &mut C| {
        let conn = ctx.connect()?;
        let probed = with_rollback(&mut *conn, |handle| probe(handle));
        let closed = conn.close();
        let decision = classify_probe(probed, &reason)?;
        closed?;
        Ok(decision)
    }))
}

/// Skips when the server has no `uuid` type.
pub fn skip_if_no_uuid<C>() -> Gate<C>
where
    C: GateContext + 'static,
{
    Gate::from_decision("skip_if_no_uuid", |ctx: &mut C| {
        let conn = ctx.conn()?;
        let rows = with_rollback(conn, |handle| handle.run_query(UUID_TYPE_QUERY))?;
        Ok(SkipDecision::skip_if(rows.is_empty(), NO_UUID_REASON))
    })
}

/// Skips when the server lacks or disables two-phase commit.
pub fn skip_if_tpc_disabled<C>() -> Gate<C>
where
    C: GateContext + 'static,
{
    Gate::from_decision("skip_if_tpc_disabled", |ctx: &mut C| {
        let conn = ctx.connect()?;
        let probed =
            with_rollback(&mut *conn, |handle| handle.run_query(MAX_PREPARED_TRANSACTIONS_QUERY));
        let closed = conn.close();
        let rows = match probed {
            Ok(rows) => rows,
            Err(error) if error.class == BackendErrorClass::Programming => {
                return Ok(SkipDecision::skip(TPC_UNSUPPORTED_REASON));
            }
            Err(error) => return Err(error.into()),
        };
        closed?;
        let limit = first_value(&rows)
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or_else(|| {
                BackendError::internal("max_prepared_transactions returned a non-integer value")
            })?;
        Ok(SkipDecision::skip_if(limit == 0, TPC_DISABLED_REASON))
    })
}

/// Returns the first column of the first row.
fn first_value(rows: &[Row]) -> Option<&str> {
    rows.first().and_then(|row| row.first()).and_then(|value| value.as_deref())
}

// ============================================================================
// SECTION: Green Mode Gates
// ============================================================================

/// Skips when the client runs in asynchronous ("green") mode.
///
/// # Errors
///
/// Returns [`GateError::InvalidReason`] when the reason is blank.
pub fn skip_if_green<C>(reason: impl Into<String>) -> Result<Gate<C>, GateError>
where
    C: GateContext + 'static,
{
    Ok(green_gate(validate_reason(reason)?))
}

/// Skips copy tests in green mode.
pub fn skip_copy_if_green<C>() -> Gate<C>
where
    C: GateContext + 'static,
{
    green_gate(COPY_GREEN_REASON.to_string())
}

/// Builds the green-mode gate for a validated reason.
fn green_gate<C>(reason: String) -> Gate<C>
where
    C: GateContext + 'static,
{
    Gate::from_decision("skip_if_green", move |ctx: &mut C| {
        Ok(SkipDecision::skip_if(ctx.green(), reason.as_str()))
    })
}

// ============================================================================
// SECTION: Superuser Gate
// ============================================================================

/// Decorator that converts insufficient-privilege failures into skips.
///
/// The body runs eagerly; any other error is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperuserGate;

impl<C: GateContext + 'static> Decorator<C> for SuperuserGate {
    fn name(&self) -> &'static str {
        "skip_unless_superuser"
    }

    fn decorate(&self, body: TestBody<C>) -> TestBody<C> {
        Arc::new(move |ctx: &mut C| match body(ctx) {
            Err(GateError::Backend(error)) if error.is_insufficient_privilege() => {
                ctx.audit_sink().record(&GateAuditEvent::skipped(
                    ctx.test_name(),
                    "skip_unless_superuser",
                    NOT_SUPERUSER_REASON,
                ));
                Ok(TestOutcome::skipped(NOT_SUPERUSER_REASON))
            }
            Err(error) => {
                ctx.audit_sink().record(&GateAuditEvent::error(
                    ctx.test_name(),
                    "skip_unless_superuser",
                    &error.to_string(),
                ));
                Err(error)
            }
            Ok(outcome) => Ok(outcome),
        })
    }
}

/// Skips tests that fail for lack of superuser rights.
#[must_use]
pub const fn skip_unless_superuser() -> SuperuserGate {
    SuperuserGate
}

// ============================================================================
// SECTION: Backend Family Gate
// ============================================================================

/// Decides whether to skip on CockroachDB for a given handle and cache.
///
/// Skips when the probe finds CockroachDB and its version matches
/// `constraint`; the reason is enriched through the CockroachDB registry.
///
/// # Errors
///
/// Returns [`GateError::VersionBannerUnparsable`] when the probe fails.
pub fn crdb_skip_decision<B>(
    reason: &str,
    handle: &B,
    cache: &BackendVersionCache,
    constraint: &VersionConstraint,
) -> Result<SkipDecision, GateError>
where
    B: BackendHandle + ?Sized,
{
    crdb_decision(reason, cache.probe(handle)?, constraint)
}

/// Builds the CockroachDB decision from a probed version.
fn crdb_decision(
    reason: &str,
    version: Option<EncodedVersion>,
    constraint: &VersionConstraint,
) -> Result<SkipDecision, GateError> {
    match version {
        Some(version) if constraint.matches(version) => Ok(SkipDecision::skip(format!(
            "not supported on CockroachDB {version}: {}",
            ReasonRegistry::cockroach().enrich(reason)
        ))),
        _ => Ok(SkipDecision::run()),
    }
}

/// Skips when testing against CockroachDB, optionally only for matching versions.
///
/// `version` is constraint text such as `">= 20.1"`, `"< 20"`, or `"== 20.1.3"`.
///
/// # Errors
///
/// Returns [`GateError::InvalidReason`] for a blank reason and
/// [`GateError::MalformedVersionSpec`] for malformed constraint text.
pub fn skip_if_crdb<C>(reason: impl Into<String>, version: Option<&str>) -> Result<Gate<C>, GateError>
where
    C: GateContext + 'static,
{
    let reason = validate_reason(reason)?;
    let constraint = parse_version_spec(version)?;
    Ok(Gate::from_decision("skip_if_crdb", move |ctx: &mut C| {
        let cache = ctx.version_cache();
        let audit = ctx.audit_sink();
        let conn = ctx.conn()?;
        let version = cache.probe_observed(&*conn, audit.as_ref())?;
        crdb_decision(&reason, version, &constraint)
    }))
}
