// crates/skip-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Skip Gate Runtime
// Description: Gate evaluation, composition, and the backend version probe.
// Purpose: Run test bodies behind skip predicates.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime wraps test bodies with gates, evaluates them against a
//! [`crate::interfaces::GateContext`], and caches the backend family probe.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod capability;
pub mod context;
pub mod decorators;
pub mod gate;
pub mod probe;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capability::RollbackScope;
pub use capability::classify_probe;
pub use capability::with_rollback;
pub use context::ConnectingContext;
pub use context::Connector;
pub use decorators::SuperuserGate;
pub use decorators::crdb_skip_decision;
pub use decorators::skip_after_backend;
pub use decorators::skip_before_backend;
pub use decorators::skip_before_runtime;
pub use decorators::skip_copy_if_green;
pub use decorators::skip_from_runtime;
pub use decorators::skip_if_crdb;
pub use decorators::skip_if_green;
pub use decorators::skip_if_no_uuid;
pub use decorators::skip_if_tpc_disabled;
pub use decorators::skip_unless_capability;
pub use decorators::skip_unless_superuser;
pub use gate::Decoratable;
pub use gate::Decorator;
pub use gate::Gate;
pub use gate::SkipPredicate;
pub use gate::Suite;
pub use gate::SuiteEntry;
pub use gate::SuiteReport;
pub use gate::TEST_PREFIX;
pub use gate::TestBody;
pub use gate::TestRun;
pub use gate::apply_to_all;
pub use gate::compose;
pub use gate::gate;
pub use gate::test_body;
pub use probe::BackendVersionCache;
pub use probe::CRDB_VERSION_STATUS_KEY;
pub use probe::parse_version_banner;
pub use probe::probe_backend_version;
