// crates/skip-gate-core/tests/reasons.rs
// ============================================================================
// Module: Reason Registry Tests
// Description: Tracking issue lookup and reason enrichment.
// ============================================================================

//! ## Overview
//! Integration tests for the CockroachDB reason registry.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use skip_gate_core::COCKROACH_ISSUES_URL;
use skip_gate_core::ReasonRegistry;
use support::TestResult;
use support::ensure;

#[test]
fn registry_holds_every_known_limitation() -> TestResult {
    let registry = ReasonRegistry::cockroach();
    ensure(registry.len() == 18, "eighteen registered reasons")?;
    ensure(registry.tracking_id("2-phase commit") == Some(22_329), "2-phase commit")?;
    ensure(registry.tracking_id("large objects") == Some(243), "large objects")?;
    ensure(registry.tracking_id("stored procedure") == Some(1_751), "stored procedure")?;
    Ok(())
}

#[test]
fn known_reason_gets_issue_link() -> TestResult {
    let enriched = ReasonRegistry::cockroach().enrich("notify");
    ensure(
        enriched == "notify (https://github.com/cockroachdb/cockroach/issues/41522)",
        format!("unexpected enrichment: {enriched}"),
    )?;
    Ok(())
}

#[test]
fn unknown_reason_is_returned_verbatim() -> TestResult {
    let registry = ReasonRegistry::cockroach();
    ensure(registry.enrich("listen") == "listen", "unregistered reason unchanged")?;
    ensure(registry.enrich("Notify") == "Notify", "lookup is case sensitive")?;
    ensure(registry.tracking_url("notify ").is_none(), "lookup is exact")?;
    Ok(())
}

#[test]
fn custom_registry_uses_its_base_url() -> TestResult {
    let registry = ReasonRegistry::from_entries("https://tracker.example/", &[("slow", 7)]);
    ensure(registry.enrich("slow") == "slow (https://tracker.example/7)", "custom base url")?;
    ensure(
        ReasonRegistry::cockroach().tracking_url("cidr")
            == Some(format!("{COCKROACH_ISSUES_URL}18846")),
        "default base url",
    )?;
    Ok(())
}

#[test]
fn iteration_is_sorted_by_reason() -> TestResult {
    let reasons: Vec<&str> = ReasonRegistry::cockroach().iter().map(|(reason, _)| reason).collect();
    let mut sorted = reasons.clone();
    sorted.sort_unstable();
    ensure(reasons == sorted, "iteration follows reason order")?;
    Ok(())
}
