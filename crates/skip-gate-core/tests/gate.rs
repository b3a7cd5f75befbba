// crates/skip-gate-core/tests/gate.rs
// ============================================================================
// Module: Gate Composition Tests
// Description: Gate evaluation, decorator ordering, and suite-wide application.
// Purpose: Ensure skipped bodies never run and decorators compose predictably.
// ============================================================================

//! ## Overview
//! Integration tests for gates, decorators, and suites.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use skip_gate_core::ConnectingContext;
use skip_gate_core::Decoratable;
use skip_gate_core::Decorator;
use skip_gate_core::Gate;
use skip_gate_core::GateAuditOutcome;
use skip_gate_core::GateContext;
use skip_gate_core::GateError;
use skip_gate_core::ReasonRegistry;
use skip_gate_core::SkipDecision;
use skip_gate_core::Suite;
use skip_gate_core::TestBody;
use skip_gate_core::TestOutcome;
use skip_gate_core::apply_to_all;
use skip_gate_core::encode;
use skip_gate_core::gate;
use skip_gate_core::skip_unless_capability;
use skip_gate_core::test_body;
use support::TestResult;
use support::ensure;
use support::mocks::BackendStats;
use support::mocks::MockBackend;
use support::mocks::audited_context;
use support::mocks::context;

/// Context type used throughout these tests.
type Ctx = ConnectingContext<MockBackend>;

/// Mock backend at PostgreSQL 13.
fn backend() -> MockBackend {
    MockBackend::new(encode(13, 0, 0))
}

/// Body that counts its invocations and passes.
fn counting_body(counter: &Arc<AtomicUsize>) -> TestBody<Ctx> {
    let counter = Arc::clone(counter);
    test_body(move |_ctx: &mut Ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(TestOutcome::Passed)
    })
}

/// Gate that appends its label to a shared log and never skips.
fn logging_gate(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Gate<Ctx> {
    let log = Arc::clone(log);
    Gate::from_decision(label, move |_ctx: &mut Ctx| {
        log.lock().unwrap().push(label);
        Ok(SkipDecision::run())
    })
}

// ============================================================================
// SECTION: Single Bodies
// ============================================================================

#[test]
fn skipping_gate_never_runs_the_body() -> TestResult {
    let runs = Arc::new(AtomicUsize::new(0));
    let skip = gate(|_ctx: &mut Ctx| Ok(true), "not today")?;
    let body = skip.apply(counting_body(&runs));
    let outcome = body(&mut context(&backend()))?;
    ensure(outcome == TestOutcome::skipped("not today"), "skip outcome with reason")?;
    ensure(runs.load(Ordering::SeqCst) == 0, "body not invoked")?;
    Ok(())
}

#[test]
fn passing_gate_runs_the_body_once() -> TestResult {
    let runs = Arc::new(AtomicUsize::new(0));
    let allow = gate(|_ctx: &mut Ctx| Ok(false), "never")?;
    let body = allow.apply(counting_body(&runs));
    ensure(body(&mut context(&backend()))? == TestOutcome::Passed, "body outcome returned")?;
    ensure(runs.load(Ordering::SeqCst) == 1, "body invoked once")?;
    Ok(())
}

#[test]
fn blank_reason_is_rejected_at_declaration() -> TestResult {
    let result = gate(|_ctx: &mut Ctx| Ok(true), "   ");
    ensure(matches!(result, Err(GateError::InvalidReason(_))), "blank reason rejected")?;
    Ok(())
}

#[test]
fn predicate_error_propagates_and_is_audited() -> TestResult {
    let runs = Arc::new(AtomicUsize::new(0));
    let failing = gate(|_ctx: &mut Ctx| Err(GateError::failed("probe exploded")), "unused")?
        .named("exploding");
    let body = failing.apply(counting_body(&runs));
    let (mut ctx, sink) = audited_context(&backend());
    let result = body(&mut ctx);
    ensure(result == Err(GateError::failed("probe exploded")), "error surfaces unchanged")?;
    ensure(runs.load(Ordering::SeqCst) == 0, "body not invoked")?;
    let events = sink.events();
    ensure(events.len() == 1, "one audit event")?;
    ensure(events[0].outcome == GateAuditOutcome::Error, "error outcome")?;
    ensure(events[0].gate == "exploding", "gate name recorded")?;
    Ok(())
}

#[test]
fn body_error_is_audited_under_gate_name() -> TestResult {
    let allow = gate(|_ctx: &mut Ctx| Ok(false), "never")?.named("allowing");
    let body = allow.apply(test_body(|_ctx: &mut Ctx| Err(GateError::failed("boom"))));
    let (mut ctx, sink) = audited_context(&backend());
    ensure(body(&mut ctx) == Err(GateError::failed("boom")), "body error surfaces unchanged")?;
    let events = sink.events();
    ensure(events.len() == 1, "one audit event")?;
    ensure(events[0].outcome == GateAuditOutcome::Error, "error outcome")?;
    ensure(events[0].gate == "allowing", "gate name recorded")?;
    ensure(events[0].detail.contains("boom"), "error message recorded")?;
    Ok(())
}

#[test]
fn decorators_compose_first_listed_outermost() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let outer = logging_gate("outer", &log);
    let inner = logging_gate("inner", &log);
    let body = test_body(|_ctx: &mut Ctx| Ok(TestOutcome::Passed));
    let decorated = body.decorate_with(&[&outer, &inner]);
    decorated(&mut context(&backend()))?;
    ensure(*log.lock().unwrap() == vec!["outer", "inner"], "outer evaluated first")?;
    Ok(())
}

#[test]
fn outer_skip_short_circuits_inner_gates() -> TestResult {
    let log = Arc::new(Mutex::new(Vec::new()));
    let outer = gate(|_ctx: &mut Ctx| Ok(true), "outer says no")?;
    let inner = logging_gate("inner", &log);
    let body = apply_to_all::<Ctx, _>(test_body(|_ctx: &mut Ctx| Ok(TestOutcome::Passed)), &[
        &outer, &inner,
    ]);
    let outcome = body(&mut context(&backend()))?;
    ensure(outcome.skip_reason() == Some("outer says no"), "outer reason wins")?;
    ensure(log.lock().unwrap().is_empty(), "inner gate not evaluated")?;
    Ok(())
}

#[test]
fn registry_enriches_skip_reasons() -> TestResult {
    let skip = gate(|_ctx: &mut Ctx| Ok(true), "hstore")?
        .with_reason_registry(ReasonRegistry::cockroach());
    let decision = skip.evaluate(&mut context(&backend()))?;
    ensure(
        decision.reason == "hstore (https://github.com/cockroachdb/cockroach/issues/41284)",
        format!("unexpected reason: {}", decision.reason),
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Suites
// ============================================================================

/// Suite with two tests and one helper that count their runs.
fn sample_suite(runs: &Arc<Mutex<Vec<&'static str>>>) -> Suite<Ctx> {
    let (a, b, c) = (Arc::clone(runs), Arc::clone(runs), Arc::clone(runs));
    Suite::new("sample")
        .entry("test_a", move |_ctx: &mut Ctx| {
            a.lock().unwrap().push("test_a");
            Ok(TestOutcome::Passed)
        })
        .entry("test_b", move |_ctx: &mut Ctx| {
            b.lock().unwrap().push("test_b");
            Ok(TestOutcome::Passed)
        })
        .entry("helper_c", move |_ctx: &mut Ctx| {
            c.lock().unwrap().push("helper_c");
            Ok(TestOutcome::Passed)
        })
}

#[test]
fn suite_decoration_wraps_tests_only() -> TestResult {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let skip = gate(|_ctx: &mut Ctx| Ok(true), "whole suite off")?;
    let suite = skip.apply(sample_suite(&runs));
    let mut ctx = context(&backend());

    let report = suite.run(&mut ctx);
    ensure(report.skipped() == 2 && report.passed() == 0, "both tests skipped")?;
    ensure(suite.test_names() == vec!["test_a", "test_b"], "helpers are not tests")?;

    let helper = suite.call("helper_c", &mut ctx);
    ensure(matches!(helper, Some(Ok(TestOutcome::Passed))), "helper left undecorated")?;
    ensure(*runs.lock().unwrap() == vec!["helper_c"], "only the helper body ran")?;
    Ok(())
}

#[test]
fn suite_runs_tests_in_registration_order() -> TestResult {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let suite = sample_suite(&runs);
    let (mut ctx, _sink) = audited_context(&backend());
    let report = suite.run(&mut ctx);
    ensure(report.passed() == 2 && report.failed() == 0, "both tests pass")?;
    ensure(*runs.lock().unwrap() == vec!["test_a", "test_b"], "registration order")?;
    ensure(report.result("helper_c").is_none(), "helper not part of the report")?;
    Ok(())
}

#[test]
fn skipped_tests_are_audited_with_their_names() -> TestResult {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let skip = gate(|_ctx: &mut Ctx| Ok(true), "off")?.named("always");
    let suite = apply_to_all::<Ctx, _>(sample_suite(&runs), &[&skip]);
    let (mut ctx, sink) = audited_context(&backend());
    suite.run(&mut ctx);
    let tests: Vec<Option<String>> = sink.events().into_iter().map(|event| event.test).collect();
    ensure(
        tests == vec![Some("test_a".to_string()), Some("test_b".to_string())],
        "one skip event per test",
    )?;
    Ok(())
}

#[test]
fn later_entry_replaces_earlier_one() -> TestResult {
    let suite: Suite<Ctx> = Suite::new("dupes")
        .entry("test_x", |_ctx: &mut Ctx| Err(GateError::failed("old")))
        .entry("test_x", |_ctx: &mut Ctx| Ok(TestOutcome::Passed));
    ensure(suite.entries().len() == 1, "one entry kept")?;
    let report = suite.run(&mut context(&backend()));
    ensure(report.passed() == 1, "replacement body ran")?;
    Ok(())
}

#[test]
fn unknown_entry_is_none() -> TestResult {
    let suite: Suite<Ctx> = Suite::new("empty");
    ensure(suite.call("test_missing", &mut context(&backend())).is_none(), "not registered")?;
    Ok(())
}

#[test]
fn suite_tears_down_connections_after_each_test() -> TestResult {
    let backend = backend();
    let stats = backend.stats();
    let mut suite: Suite<Ctx> = Suite::new("gated");
    for index in 0 .. 50 {
        suite = suite.entry(format!("test_{index}"), |_ctx: &mut Ctx| Ok(TestOutcome::Passed));
    }
    let capability = skip_unless_capability::<Ctx, _>(|_conn: &mut MockBackend| Ok(true), "absent")?;
    let uses_shared = gate(
        |ctx: &mut Ctx| {
            ctx.conn()?;
            Ok(false)
        },
        "never",
    )?;
    let suite = apply_to_all::<Ctx, _>(suite, &[&capability, &uses_shared]);
    let mut ctx = context(&backend);
    let report = suite.run(&mut ctx);
    ensure(report.passed() == 50, "every test passed")?;
    ensure(ctx.open_connections() == 0, "no connections outlive their test")?;
    ensure(
        BackendStats::get(&stats.closes) == BackendStats::get(&stats.opened),
        "every opened connection was closed",
    )?;
    ensure(BackendStats::get(&stats.opened) == 100, "gate and shared connection per test")?;
    Ok(())
}

#[test]
fn called_entry_is_torn_down() -> TestResult {
    let suite: Suite<Ctx> = Suite::new("single").entry("test_conn", |ctx: &mut Ctx| {
        ctx.conn()?;
        Ok(TestOutcome::Passed)
    });
    let mut ctx = context(&backend());
    ensure(matches!(suite.call("test_conn", &mut ctx), Some(Ok(TestOutcome::Passed))), "ran")?;
    ensure(ctx.open_connections() == 0, "shared connection closed after the call")?;
    Ok(())
}
