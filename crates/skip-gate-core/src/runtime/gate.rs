// crates/skip-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Gate Composition
// Description: Gates, decorators, and explicit test suites.
// Purpose: Wrap test bodies with skip predicates and compose the wrappers.
// Dependencies: crate::{audit, core, interfaces}
// ============================================================================

//! ## Overview
//! A [`Gate`] evaluates its predicate before the wrapped body runs. On a skip
//! decision the body is not run and the outcome is
//! [`TestOutcome::Skipped`]; otherwise the body runs with the same context.
//! Skips, predicate errors and body errors are each recorded in the audit
//! sink under the gate's name.
//!
//! Decorators compose in declaration order: the first decorator listed is
//! the outermost wrapper and is evaluated first. The same decorator list can
//! be applied to a single [`TestBody`] or to every test entry of a [`Suite`]
//! through [`Decoratable`]. Suites list their entries explicitly; only
//! entries whose names start with [`TEST_PREFIX`] are tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::audit::GateAuditEvent;
use crate::core::GateError;
use crate::core::ReasonRegistry;
use crate::core::SkipDecision;
use crate::core::TestOutcome;
use crate::core::validate_reason;
use crate::interfaces::GateContext;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Name prefix that marks a suite entry as a test.
pub const TEST_PREFIX: &str = "test";

/// Result of running one test body.
pub type TestRun = Result<TestOutcome, GateError>;

/// A test body invoked with the per-test context.
pub type TestBody<C> = Arc<dyn Fn(&mut C) -> TestRun + Send + Sync>;

/// A predicate producing a skip decision for the current context.
pub type SkipPredicate<C> = Arc<dyn Fn(&mut C) -> Result<SkipDecision, GateError> + Send + Sync>;

/// Boxes a closure as a [`TestBody`].
pub fn test_body<C, F>(body: F) -> TestBody<C>
where
    F: Fn(&mut C) -> TestRun + Send + Sync + 'static,
{
    Arc::new(body)
}

// ============================================================================
// SECTION: Decorator Trait
// ============================================================================

/// A wrapper around test bodies.
pub trait Decorator<C>: Send + Sync {
    /// Name used in audit events.
    fn name(&self) -> &str;

    /// Wraps a body, returning the gated body.
    fn decorate(&self, body: TestBody<C>) -> TestBody<C>;

    /// Applies this decorator to a body or to every test of a suite.
    fn apply<T>(&self, target: T) -> T
    where
        Self: Sized,
        T: Decoratable<C>,
    {
        let decorator: &dyn Decorator<C> = self;
        target.decorate_with(&[decorator])
    }
}

/// Composes decorators around a body; the first decorator is outermost.
#[must_use]
pub fn compose<C>(body: TestBody<C>, decorators: &[&dyn Decorator<C>]) -> TestBody<C> {
    decorators.iter().rev().fold(body, |inner, decorator| decorator.decorate(inner))
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Decorator that skips the body when its predicate says so.
pub struct Gate<C> {
    /// Gate name for audit events.
    name: String,
    /// Skip predicate.
    predicate: SkipPredicate<C>,
    /// Registry used to enrich skip reasons, if any.
    registry: Option<&'static ReasonRegistry>,
}

impl<C> Clone for Gate<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
            registry: self.registry,
        }
    }
}

impl<C: GateContext + 'static> Gate<C> {
    /// Builds a gate from a predicate that computes its own decision.
    pub fn from_decision<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&mut C) -> Result<SkipDecision, GateError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            registry: None,
        }
    }

    /// Renames the gate.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enriches skip reasons through the registry.
    #[must_use]
    pub fn with_reason_registry(mut self, registry: &'static ReasonRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Evaluates the predicate without running any body.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when the predicate fails.
    pub fn evaluate(&self, ctx: &mut C) -> Result<SkipDecision, GateError> {
        let mut decision = (self.predicate)(ctx)?;
        if decision.skip
            && let Some(registry) = self.registry
        {
            decision.reason = registry.enrich(&decision.reason);
        }
        Ok(decision)
    }
}

impl<C: GateContext + 'static> Decorator<C> for Gate<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn decorate(&self, body: TestBody<C>) -> TestBody<C> {
        let gate = self.clone();
        Arc::new(move |ctx: &mut C| {
            let audit = ctx.audit_sink();
            match gate.evaluate(ctx) {
                Err(error) => {
                    audit.record(&GateAuditEvent::error(
                        ctx.test_name(),
                        &gate.name,
                        &error.to_string(),
                    ));
                    Err(error)
                }
                Ok(decision) if decision.skip => {
                    audit.record(&GateAuditEvent::skipped(
                        ctx.test_name(),
                        &gate.name,
                        &decision.reason,
                    ));
                    Ok(TestOutcome::from(decision))
                }
                Ok(_) => {
                    let result = body(ctx);
                    if let Err(error) = &result {
                        audit.record(&GateAuditEvent::error(
                            ctx.test_name(),
                            &gate.name,
                            &error.to_string(),
                        ));
                    }
                    result
                }
            }
        })
    }
}

/// Builds a gate that skips with `reason` whenever `predicate` returns true.
///
/// # Errors
///
/// Returns [`GateError::InvalidReason`] when the reason is blank.
pub fn gate<C, F>(predicate: F, reason: impl Into<String>) -> Result<Gate<C>, GateError>
where
    C: GateContext + 'static,
    F: Fn(&mut C) -> Result<bool, GateError> + Send + Sync + 'static,
{
    let reason = validate_reason(reason)?;
    Ok(Gate::from_decision("gate", move |ctx: &mut C| {
        Ok(SkipDecision::skip_if(predicate(ctx)?, reason.as_str()))
    }))
}

// ============================================================================
// SECTION: Decoratable Targets
// ============================================================================

/// Something decorators can be applied to: a single body or a whole suite.
pub trait Decoratable<C>: Sized {
    /// Applies the decorators, first listed outermost.
    #[must_use]
    fn decorate_with(self, decorators: &[&dyn Decorator<C>]) -> Self;
}

impl<C> Decoratable<C> for TestBody<C> {
    fn decorate_with(self, decorators: &[&dyn Decorator<C>]) -> Self {
        compose(self, decorators)
    }
}

impl<C> Decoratable<C> for Suite<C> {
    fn decorate_with(mut self, decorators: &[&dyn Decorator<C>]) -> Self {
        self.decorate_tests(decorators);
        self
    }
}

/// Applies decorators to a body or to every test of a suite.
#[must_use]
pub fn apply_to_all<C, T>(target: T, decorators: &[&dyn Decorator<C>]) -> T
where
    T: Decoratable<C>,
{
    target.decorate_with(decorators)
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Named entry of a suite.
pub struct SuiteEntry<C> {
    /// Entry name; tests start with [`TEST_PREFIX`].
    name: String,
    /// Entry body.
    body: TestBody<C>,
}

impl<C> SuiteEntry<C> {
    /// Entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when the entry is a test.
    #[must_use]
    pub fn is_test(&self) -> bool {
        self.name.starts_with(TEST_PREFIX)
    }
}

/// Ordered, explicitly registered collection of test entries and helpers.
pub struct Suite<C> {
    /// Suite name.
    name: String,
    /// Entries in registration order.
    entries: Vec<SuiteEntry<C>>,
}

impl<C> Suite<C> {
    /// Creates an empty suite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Registers an entry; a later entry with the same name replaces it.
    #[must_use]
    pub fn entry<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut C) -> TestRun + Send + Sync + 'static,
    {
        let name = name.into();
        let body: TestBody<C> = Arc::new(body);
        if let Some(existing) = self.entries.iter_mut().find(|entry| entry.name == name) {
            existing.body = body;
        } else {
            self.entries.push(SuiteEntry {
                name,
                body,
            });
        }
        self
    }

    /// Suite name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[SuiteEntry<C>] {
        &self.entries
    }

    /// Names of test entries in registration order.
    #[must_use]
    pub fn test_names(&self) -> Vec<&str> {
        self.entries.iter().filter(|entry| entry.is_test()).map(SuiteEntry::name).collect()
    }

    /// Returns the body registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TestBody<C>> {
        self.entries.iter().find(|entry| entry.name == name).map(|entry| &entry.body)
    }

    /// Wraps every test entry in place; helpers are left untouched.
    pub fn decorate_tests(&mut self, decorators: &[&dyn Decorator<C>]) {
        for entry in self.entries.iter_mut().filter(|entry| entry.is_test()) {
            entry.body = compose(Arc::clone(&entry.body), decorators);
        }
    }
}

impl<C: GateContext> Suite<C> {
    /// Runs one entry by name; `None` when it is not registered.
    ///
    /// The context's per-test teardown runs after the entry.
    pub fn call(&self, name: &str, ctx: &mut C) -> Option<TestRun> {
        let body = self.get(name)?;
        Some(run_entry(name, body, ctx))
    }

    /// Runs every test entry in order, tearing down after each one.
    pub fn run(&self, ctx: &mut C) -> SuiteReport {
        let results = self
            .entries
            .iter()
            .filter(|entry| entry.is_test())
            .map(|entry| (entry.name.clone(), run_entry(&entry.name, &entry.body, ctx)))
            .collect();
        SuiteReport {
            suite: self.name.clone(),
            results,
        }
    }
}

/// Runs one body between `begin_test` and `end_test`.
///
/// A teardown failure fails an otherwise successful test; a body error wins
/// over a teardown error.
fn run_entry<C: GateContext>(name: &str, body: &TestBody<C>, ctx: &mut C) -> TestRun {
    ctx.begin_test(name);
    let result = body(ctx);
    let teardown = ctx.end_test();
    let outcome = result?;
    teardown?;
    Ok(outcome)
}

// ============================================================================
// SECTION: Suite Report
// ============================================================================

/// Results of a suite run, in execution order.
#[derive(Debug)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: String,
    /// Per-test results.
    pub results: Vec<(String, TestRun)>,
}

impl SuiteReport {
    /// Returns the result for a test.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&TestRun> {
        self.results.iter().find(|(test, _)| test == name).map(|(_, result)| result)
    }

    /// Number of tests that passed.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(|result| matches!(result, Ok(TestOutcome::Passed)))
    }

    /// Number of tests that were skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|result| matches!(result, Ok(TestOutcome::Skipped { .. })))
    }

    /// Number of tests that failed or errored.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(Result::is_err)
    }

    /// Counts results matching a predicate.
    fn count(&self, predicate: impl Fn(&TestRun) -> bool) -> usize {
        self.results.iter().filter(|(_, result)| predicate(result)).count()
    }
}
