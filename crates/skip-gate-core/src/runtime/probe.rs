// crates/skip-gate-core/src/runtime/probe.rs
// ============================================================================
// Module: Backend Version Probe
// Description: One-shot, cached detection of the alternative backend family.
// Purpose: Resolve the CockroachDB version once per process and reuse it.
// Dependencies: regex, crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! The probe asks a backend handle for the `crdb_version` status parameter.
//! A missing parameter means the backend is not CockroachDB; a present one
//! must embed a `vMAJOR.MINOR.PATCH` banner component.
//!
//! The cache is a single slot keyed by nothing: once resolved, every later
//! probe returns the stored value whatever handle it is given. This holds
//! under the invariant "one backend per process under test". Running tests
//! against several backends from one process is not supported; call
//! [`BackendVersionCache::reset`] between isolated runs instead.
//!
//! An unparsable banner or a failed status lookup is reported and leaves the
//! slot unresolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;

use regex::Regex;

use crate::audit::GateAuditSink;
use crate::audit::NoopGateAuditSink;
use crate::audit::VersionProbeAuditEvent;
use crate::core::EncodedVersion;
use crate::core::GateError;
use crate::core::encode;
use crate::interfaces::BackendHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status parameter carrying the CockroachDB version banner.
pub const CRDB_VERSION_STATUS_KEY: &str = "crdb_version";
/// Banner component pattern, e.g. `v20.1.3` in `CockroachDB CCL v20.1.3 (...)`.
const BANNER_PATTERN: &str = r"\bv(\d+)\.(\d+)\.(\d+)";

// ============================================================================
// SECTION: Banner Parsing
// ============================================================================

/// Extracts and encodes the `vX.Y.Z` component of a version banner.
///
/// # Errors
///
/// Returns [`GateError::VersionBannerUnparsable`] when no such component exists
/// or a component overflows.
pub fn parse_version_banner(banner: &str) -> Result<EncodedVersion, GateError> {
    let unparsable = || GateError::VersionBannerUnparsable {
        banner: banner.to_string(),
    };
    let captures = banner_regex().and_then(|regex| regex.captures(banner)).ok_or_else(unparsable)?;
    let component = |index: usize| -> Result<u32, GateError> {
        captures
            .get(index)
            .and_then(|value| value.as_str().parse::<u32>().ok())
            .ok_or_else(unparsable)
    };
    Ok(encode(component(1)?, component(2)?, component(3)?))
}

/// Returns the compiled banner pattern, or `None` if it failed to compile.
fn banner_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(BANNER_PATTERN).ok()).as_ref()
}

// ============================================================================
// SECTION: Version Cache
// ============================================================================

/// Cache slot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheSlot {
    /// No probe has completed yet.
    Uninitialized,
    /// Probe completed; `None` means "not this backend family".
    Resolved(Option<EncodedVersion>),
}

/// Single-slot backend version cache.
///
/// # Invariants
/// - Written at most once between resets; readers never see a partial value.
/// - The slot is independent of which handle resolved it.
#[derive(Debug)]
pub struct BackendVersionCache {
    /// Slot guarded by a mutex held across the status query.
    slot: Mutex<CacheSlot>,
}

impl BackendVersionCache {
    /// Creates an unresolved cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(CacheSlot::Uninitialized),
        }
    }

    /// Returns the process-wide cache instance.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<BackendVersionCache>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Probes the handle on first call, then returns the cached value.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::VersionBannerUnparsable`] when the banner has no
    /// version component and [`GateError::Backend`] when the status lookup
    /// fails; either way the slot stays unresolved.
    pub fn probe<B>(&self, handle: &B) -> Result<Option<EncodedVersion>, GateError>
    where
        B: BackendHandle + ?Sized,
    {
        self.probe_observed(handle, &NoopGateAuditSink)
    }

    /// Like [`Self::probe`], recording an audit event when the slot resolves.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::VersionBannerUnparsable`] when the banner has no
    /// version component and [`GateError::Backend`] when the status lookup
    /// fails; either way the slot stays unresolved.
    pub fn probe_observed<B>(
        &self,
        handle: &B,
        audit: &dyn GateAuditSink,
    ) -> Result<Option<EncodedVersion>, GateError>
    where
        B: BackendHandle + ?Sized,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let CacheSlot::Resolved(version) = *slot {
            return Ok(version);
        }
        let version = match handle.report_status(CRDB_VERSION_STATUS_KEY)? {
            None => None,
            Some(banner) => Some(parse_version_banner(&banner)?),
        };
        *slot = CacheSlot::Resolved(version);
        audit.record_probe(&VersionProbeAuditEvent::resolved(CRDB_VERSION_STATUS_KEY, version));
        Ok(version)
    }

    /// Returns the cached value without probing; `None` when unresolved.
    #[must_use]
    pub fn cached(&self) -> Option<Option<EncodedVersion>> {
        match *self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            CacheSlot::Uninitialized => None,
            CacheSlot::Resolved(version) => Some(version),
        }
    }

    /// Returns true once a probe has resolved the slot.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cached().is_some()
    }

    /// Clears the slot so the next probe queries a handle again.
    pub fn reset(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = CacheSlot::Uninitialized;
    }
}

impl Default for BackendVersionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Probes through the process-wide cache.
///
/// # Errors
///
/// Returns [`GateError::VersionBannerUnparsable`] when the banner has no
/// version component and [`GateError::Backend`] when the status lookup fails.
pub fn probe_backend_version<B>(handle: &B) -> Result<Option<EncodedVersion>, GateError>
where
    B: BackendHandle + ?Sized,
{
    BackendVersionCache::shared().probe(handle)
}
