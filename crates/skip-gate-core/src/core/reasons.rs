// crates/skip-gate-core/src/core/reasons.rs
// ============================================================================
// Module: Skip Reason Registry
// Description: Static mapping from canonical skip reasons to tracking issues.
// Purpose: Enrich skip messages with a link to the upstream tracking issue.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The registry is built once and is read-only afterwards. A reason that
//! exactly matches a registered phrase gains a ` (<url><id>)` suffix; any
//! other reason is reported verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Base URL for CockroachDB tracking issues.
pub const COCKROACH_ISSUES_URL: &str = "https://github.com/cockroachdb/cockroach/issues/";

/// Known CockroachDB limitations and their tracking issue numbers.
const COCKROACH_REASONS: &[(&str, u32)] = &[
    ("2-phase commit", 22_329),
    ("backend pid", 35_897),
    ("cancel", 41_335),
    ("cast adds tz", 51_692),
    ("cidr", 18_846),
    ("composite", 27_792),
    ("copy", 41_608),
    ("deferrable", 48_307),
    ("encoding", 35_882),
    ("hstore", 41_284),
    ("infinity date", 41_564),
    ("interval style", 35_807),
    ("large objects", 243),
    ("named cursor", 41_412),
    ("nested array", 32_552),
    ("notify", 41_522),
    ("range", 41_282),
    ("stored procedure", 1_751),
];

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Read-only registry of skip reasons keyed by canonical phrase.
///
/// # Invariants
/// - Entries are fixed at construction; there is no mutation API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonRegistry {
    /// Base URL the tracking identifier is appended to.
    base_url: &'static str,
    /// Tracking identifiers keyed by reason phrase.
    entries: BTreeMap<&'static str, u32>,
}

impl ReasonRegistry {
    /// Builds a registry from a fixed table.
    #[must_use]
    pub fn from_entries(base_url: &'static str, entries: &[(&'static str, u32)]) -> Self {
        Self {
            base_url,
            entries: entries.iter().copied().collect(),
        }
    }

    /// Returns the process-wide CockroachDB registry.
    #[must_use]
    pub fn cockroach() -> &'static Self {
        static REGISTRY: OnceLock<ReasonRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| Self::from_entries(COCKROACH_ISSUES_URL, COCKROACH_REASONS))
    }

    /// Returns the tracking identifier for an exact reason match.
    #[must_use]
    pub fn tracking_id(&self, reason: &str) -> Option<u32> {
        self.entries.get(reason).copied()
    }

    /// Returns the tracking URL for an exact reason match.
    #[must_use]
    pub fn tracking_url(&self, reason: &str) -> Option<String> {
        self.tracking_id(reason).map(|id| format!("{}{id}", self.base_url))
    }

    /// Appends the tracking reference to a registered reason.
    #[must_use]
    pub fn enrich(&self, reason: &str) -> String {
        match self.tracking_url(reason) {
            Some(url) => format!("{reason} ({url})"),
            None => reason.to_string(),
        }
    }

    /// Iterates registered `(reason, id)` pairs in reason order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.entries.iter().map(|(reason, id)| (*reason, *id))
    }

    /// Number of registered reasons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no reasons are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
