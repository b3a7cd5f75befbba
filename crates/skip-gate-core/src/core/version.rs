// crates/skip-gate-core/src/core/version.rs
// ============================================================================
// Module: Version Constraints
// Description: Version constraint parsing, integer encoding, and evaluation.
// Purpose: Decide whether a backend version satisfies a declared constraint.
// Dependencies: regex, serde, crate::core::error
// ============================================================================

//! ## Overview
//! Versions are compared as a single encoded integer,
//! `major * 10000 + minor * 100 + patch`, the same convention backends use for
//! numeric server versions (v20.1.3 encodes as 200103). Ordering of encoded
//! values matches semantic ordering only while minor and patch stay within
//! `0..=99`; larger components overflow into the next field.
//!
//! Constraints use the grammar `OP MAJOR[.MINOR[.PATCH]]` with
//! `OP` one of `>`, `>=`, `<`, `<=`, `==`, `!=`. An absent pattern is the
//! unconstrained [`VersionConstraint::Any`], which matches every version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::core::error::GateError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest minor/patch component that encodes without precision loss.
pub const MAX_EXACT_COMPONENT: u32 = 99;
/// Grammar for version constraint text.
const VERSION_SPEC_PATTERN: &str = r"^(>=|<=|==|!=|>|<)\s*(\d+)(?:\.(\d+))?(?:\.(\d+))?$";

// ============================================================================
// SECTION: Encoded Version
// ============================================================================

/// Monotonic integer encoding of a `(major, minor, patch)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedVersion(u64);

impl EncodedVersion {
    /// Wraps an already-encoded integer (e.g. a numeric server version).
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw encoded integer.
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Splits the encoding back into `(major, minor, patch)`.
    ///
    /// Only exact when minor and patch were within `0..=99`.
    #[must_use]
    pub const fn components(self) -> (u64, u64, u64) {
        (self.0 / 10_000, (self.0 / 100) % 100, self.0 % 100)
    }
}

impl fmt::Display for EncodedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encodes a version triple as `major * 10000 + minor * 100 + patch`.
#[must_use]
pub fn encode(major: u32, minor: u32, patch: u32) -> EncodedVersion {
    EncodedVersion(u64::from(major) * 10_000 + u64::from(minor) * 100 + u64::from(patch))
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Comparison operator of a version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionOp {
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `==`
    #[serde(rename = "==")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
}

impl VersionOp {
    /// Returns the textual operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Parses an operator symbol.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Applies the operator as `lhs OP rhs`.
    #[must_use]
    pub fn compare(self, lhs: EncodedVersion, rhs: EncodedVersion) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for VersionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// SECTION: Version Spec
// ============================================================================

/// Parsed version constraint such as `>= 20.1`.
///
/// # Invariants
/// - Immutable once parsed; missing minor/patch components are `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionSpec {
    /// Comparison operator.
    pub op: VersionOp,
    /// Major component.
    pub major: u32,
    /// Minor component (defaults to 0).
    pub minor: u32,
    /// Patch component (defaults to 0).
    pub patch: u32,
}

impl VersionSpec {
    /// Creates a spec from explicit components.
    #[must_use]
    pub const fn new(op: VersionOp, major: u32, minor: u32, patch: u32) -> Self {
        Self {
            op,
            major,
            minor,
            patch,
        }
    }

    /// Parses `OP MAJOR[.MINOR[.PATCH]]`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MalformedVersionSpec`] when the text does not match
    /// the grammar or a component overflows.
    pub fn parse(pattern: &str) -> Result<Self, GateError> {
        // Fails closed if the constant grammar could not be compiled.
        let captures = version_spec_regex()
            .and_then(|regex| regex.captures(pattern))
            .ok_or_else(|| GateError::malformed(pattern))?;
        let op = captures
            .get(1)
            .and_then(|symbol| VersionOp::from_symbol(symbol.as_str()))
            .ok_or_else(|| GateError::malformed(pattern))?;
        let component = |index: usize| -> Result<u32, GateError> {
            captures.get(index).map_or(Ok(0), |value| {
                value.as_str().parse::<u32>().map_err(|_| GateError::malformed(pattern))
            })
        };
        Ok(Self {
            op,
            major: component(2)?,
            minor: component(3)?,
            patch: component(4)?,
        })
    }

    /// Returns the encoded reference version of this spec.
    #[must_use]
    pub fn encoded(&self) -> EncodedVersion {
        encode(self.major, self.minor, self.patch)
    }

    /// Returns true when `version OP reference` holds.
    #[must_use]
    pub fn matches(&self, version: EncodedVersion) -> bool {
        self.op.compare(version, self.encoded())
    }
}

impl FromStr for VersionSpec {
    type Err = GateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}.{}", self.op, self.major, self.minor, self.patch)
    }
}

/// Returns the compiled constraint grammar, or `None` if it failed to compile.
fn version_spec_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(VERSION_SPEC_PATTERN).ok()).as_ref()
}

// ============================================================================
// SECTION: Constraint
// ============================================================================

/// A version constraint that may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionConstraint {
    /// No constraint; every version matches.
    #[default]
    Any,
    /// Explicit constraint.
    Spec(VersionSpec),
}

impl VersionConstraint {
    /// Returns true when the version satisfies the constraint.
    #[must_use]
    pub fn matches(&self, version: EncodedVersion) -> bool {
        match self {
            Self::Any => true,
            Self::Spec(spec) => spec.matches(version),
        }
    }

    /// Returns the explicit spec, if any.
    #[must_use]
    pub const fn spec(&self) -> Option<&VersionSpec> {
        match self {
            Self::Any => None,
            Self::Spec(spec) => Some(spec),
        }
    }
}

impl From<VersionSpec> for VersionConstraint {
    fn from(spec: VersionSpec) -> Self {
        Self::Spec(spec)
    }
}

/// Parses optional constraint text; `None` yields [`VersionConstraint::Any`].
///
/// # Errors
///
/// Returns [`GateError::MalformedVersionSpec`] when present text is malformed.
pub fn parse_version_spec(pattern: Option<&str>) -> Result<VersionConstraint, GateError> {
    match pattern {
        None => Ok(VersionConstraint::Any),
        Some(text) => VersionSpec::parse(text).map(VersionConstraint::Spec),
    }
}

/// Evaluates an encoded version against a constraint.
#[must_use]
pub fn evaluate(version: EncodedVersion, constraint: &VersionConstraint) -> bool {
    constraint.matches(version)
}

/// Pads a one to three component backend version with zeros and encodes it.
///
/// # Errors
///
/// Returns [`GateError::MalformedVersionSpec`] for zero or more than three
/// components.
pub fn encode_components(components: &[u32]) -> Result<EncodedVersion, GateError> {
    match components {
        [major] => Ok(encode(*major, 0, 0)),
        [major, minor] => Ok(encode(*major, *minor, 0)),
        [major, minor, patch] => Ok(encode(*major, *minor, *patch)),
        _ => Err(GateError::malformed(join_components(components))),
    }
}

// ============================================================================
// SECTION: Runtime Version
// ============================================================================

/// Version tuple of the host runtime the client under test is bound to.
///
/// Compared component-wise like a tuple: a shorter prefix orders first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeVersion(Vec<u32>);

impl RuntimeVersion {
    /// Creates a runtime version from explicit components.
    #[must_use]
    pub const fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// Parses dotted integer text such as `3.11.4`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MalformedVersionSpec`] on empty or non-numeric
    /// components.
    pub fn parse(text: &str) -> Result<Self, GateError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GateError::malformed(text));
        }
        trimmed
            .split('.')
            .map(|part| part.parse::<u32>().map_err(|_| GateError::malformed(text)))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Returns all components.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Returns the first `len` components (fewer if the version is shorter).
    #[must_use]
    pub fn prefix(&self, len: usize) -> &[u32] {
        &self.0[.. len.min(self.0.len())]
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_components(&self.0))
    }
}

/// Joins version components with dots.
pub(crate) fn join_components(components: &[u32]) -> String {
    components.iter().map(u32::to_string).collect::<Vec<_>>().join(".")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
