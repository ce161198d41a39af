// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime validation of PIF instances.
//!
//! [`check`] runs every applicable rule and collects all violations; [`validate`]
//! turns a non-empty report into [`PifError::Invalid`]. Rules are independent
//! and never modify the instance.
//!
//! Payload exclusivity cannot be violated in memory (see [`Payload`]); wire
//! readers call [`check_payload_selector`] on the raw document fields instead.

use std::fmt;

use crate::error::{ErrorKind, PifError};
use crate::model::{Amplitude, Note, Payload, Pif, MAX_ALPHABET, MIN_ALPHABET};
use crate::phase::TWO_PI;
use crate::policy::{is_narrow_safe, PhaseDtype};

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Error category.
    pub kind: ErrorKind,
    /// Dotted wire path of the offending field (`schema.alphabet.M`, `theta`, …).
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Build a violation.
    pub fn new(kind: ErrorKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in one pass, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// Record a violation.
    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Returns `true` when nothing was violated.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in the order they were found.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Category of the first violation.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.violations.first().map(|v| v.kind)
    }

    /// Returns `true` if any violation is of `kind`.
    pub fn has(&self, kind: ErrorKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// `Ok(())` when empty, otherwise [`PifError::Invalid`].
    pub fn into_result(self) -> Result<(), PifError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(PifError::Invalid(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Run every rule against `p` and collect the violations.
pub fn check(p: &Pif) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_version(p.format_version(), &mut report);
    check_schema(p, &mut report);
    check_payload(p, &mut report);
    check_numeric(p, &mut report);
    check_amplitude(p, &mut report);
    check_meta(p, &mut report);
    report
}

/// Run [`check`] and fail with [`PifError::Invalid`] on any violation.
pub fn validate(p: &Pif) -> Result<(), PifError> {
    check(p).into_result()
}

/// Decide the payload mode from raw document fields.
///
/// `theta` excludes both `theta_lazy: true` and `encoded_uint`; `theta_lazy: true`
/// requires `encoded_uint`; `encoded_uint` requires `theta_lazy: true`; one of
/// the two arrays must be present. Returns `true` for a lazy payload.
pub fn check_payload_selector(
    has_theta: bool,
    theta_lazy: Option<bool>,
    has_encoded: bool,
) -> Result<bool, Violation> {
    let lazy_flag = theta_lazy == Some(true);
    let fail = |msg: &str| Err(Violation::new(ErrorKind::Schema, "payload", msg));
    match (has_theta, lazy_flag, has_encoded) {
        (true, _, true) => fail("theta and encoded_uint are mutually exclusive"),
        (true, true, false) => fail("theta present but theta_lazy is true"),
        (true, false, false) => Ok(false),
        (false, true, true) => Ok(true),
        (false, true, false) => fail("theta_lazy is true but encoded_uint is missing"),
        (false, false, true) => fail("encoded_uint present without theta_lazy: true"),
        (false, false, false) => fail("neither theta nor encoded_uint present"),
    }
}

/// Returns `true` if `version` is a `1.x.y` string this crate reads.
pub fn is_supported_version(version: &str) -> bool {
    let mut parts = version.split('.');
    let major = parts.next().and_then(|s| s.parse::<u64>().ok());
    major == Some(1) && parts.all(|s| s.parse::<u64>().is_ok())
}

fn check_version(version: &str, report: &mut ValidationReport) {
    if !is_supported_version(version) {
        report.push(Violation::new(
            ErrorKind::Schema,
            "format_version",
            format!("unsupported version {version:?} (expected 1.x.y)"),
        ));
    }
}

fn check_schema(p: &Pif, report: &mut ValidationReport) {
    let m = p.m();
    if !(MIN_ALPHABET..=MAX_ALPHABET).contains(&m) {
        report.push(Violation::new(
            ErrorKind::Schema,
            "schema.alphabet.M",
            format!("M = {m} outside [{MIN_ALPHABET}, {MAX_ALPHABET}]"),
        ));
    }
    if let Some(fs) = p.schema().sampling_rate() {
        if !(fs.is_finite() && fs > 0.0) {
            report.push(Violation::new(
                ErrorKind::Schema,
                "schema.sampling.fs",
                format!("sampling rate {fs} must be positive and finite"),
            ));
        }
    }
}

fn check_payload(p: &Pif, report: &mut ValidationReport) {
    match p.payload() {
        Payload::Eager(angles) => {
            let bad = angles
                .iter()
                .enumerate()
                .filter(|(_, t)| !(t.is_finite() && (0.0..TWO_PI).contains(t)));
            if let Some((first, count)) = first_and_count(bad) {
                report.push(Violation::new(
                    ErrorKind::Range,
                    "theta",
                    format!(
                        "{count} angle(s) not finite or outside [0, 2π); first at index {} = {}",
                        first.0, first.1
                    ),
                ));
            }
        }
        Payload::Lazy(symbols) => {
            let m = p.m();
            let bad = symbols.iter().enumerate().filter(|(_, n)| *n >= m);
            if let Some((first, count)) = first_and_count(bad) {
                report.push(Violation::new(
                    ErrorKind::Range,
                    "encoded_uint",
                    format!(
                        "{count} symbol(s) outside [0, {}]; first at index {} = {}",
                        m.saturating_sub(1),
                        first.0,
                        first.1
                    ),
                ));
            }
        }
    }
}

fn check_numeric(p: &Pif, report: &mut ValidationReport) {
    let Some(numeric) = p.numeric() else {
        return;
    };
    if let Payload::Eager(angles) = p.payload() {
        if angles.dtype() != numeric.dtype {
            report.push(Violation::new(
                ErrorKind::NumericPolicy,
                "numeric.dtype",
                format!(
                    "declared {} but theta is stored as {}",
                    numeric.dtype,
                    angles.dtype()
                ),
            ));
        }
    }
    if numeric.precision_safe == Some(true)
        && numeric.dtype == PhaseDtype::Narrow
        && !is_narrow_safe(p.m())
    {
        report.push(Violation::new(
            ErrorKind::NumericPolicy,
            "numeric.precision_safe",
            format!("float32 storage is not precision-safe for M = {}", p.m()),
        ));
    }
    if let Some([lo, hi]) = numeric.phase_wrap {
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            report.push(Violation::new(
                ErrorKind::Schema,
                "numeric.phase_wrap",
                format!("[{lo}, {hi}] is not a finite increasing interval"),
            ));
        }
    }
}

fn check_amplitude(p: &Pif, report: &mut ValidationReport) {
    let admissible = |a: f64| a.is_finite() && a >= 0.0;
    match p.amplitude() {
        Amplitude::Scalar(a) => {
            if !admissible(*a) {
                report.push(Violation::new(
                    ErrorKind::Range,
                    "amp",
                    format!("amplitude {a} must be finite and non-negative"),
                ));
            }
        }
        Amplitude::PerSample(values) => {
            if values.len() != p.len() {
                report.push(Violation::new(
                    ErrorKind::Schema,
                    "amp",
                    format!(
                        "amplitude length {} does not match payload length {}",
                        values.len(),
                        p.len()
                    ),
                ));
            }
            let bad = values.iter().copied().enumerate().filter(|(_, a)| !admissible(*a));
            if let Some((first, count)) = first_and_count(bad) {
                report.push(Violation::new(
                    ErrorKind::Range,
                    "amp",
                    format!(
                        "{count} amplitude(s) negative or not finite; first at index {} = {}",
                        first.0, first.1
                    ),
                ));
            }
        }
    }
}

fn check_meta(p: &Pif, report: &mut ValidationReport) {
    if let Note::Processed(tag) = &p.meta().note {
        if tag.is_empty() {
            report.push(Violation::new(
                ErrorKind::Schema,
                "meta.note",
                "processed note needs a non-empty tag",
            ));
        }
    }
}

fn first_and_count<T>(mut items: impl Iterator<Item = T>) -> Option<(T, usize)> {
    let first = items.next()?;
    Some((first, 1 + items.count()))
}
