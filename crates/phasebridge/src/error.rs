// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types shared by every PIF layer.

use thiserror::Error;

use crate::integrity::ContentHash;
use crate::validate::ValidationReport;

/// Flat error category, one per failure class of the interchange format.
///
/// Use [`PifError::kind`] to branch on the category without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Discrete input (or stored value) outside its allowed range.
    Range,
    /// Missing required field, malformed payload-mode union, bad enum member.
    Schema,
    /// Declared numeric policy inconsistent with dtype / alphabet size.
    NumericPolicy,
    /// Malformed or truncated container, unknown array-packing tag.
    Serialization,
    /// Requested container format not known or not compiled in.
    UnsupportedFormat,
    /// Content hash mismatch.
    Integrity,
    /// Coherence diagnostic could not be computed.
    Diagnostic,
}

/// Errors returned by encode, decode, validation and serialization entry points.
#[derive(Debug, Error)]
pub enum PifError {
    /// A discrete symbol lies outside `[0, M-1]`; no partial output is produced.
    #[error("[PIF_RANGE] symbol {value} at index {index} is outside [0, {max}]")]
    Range {
        /// Position of the first offending element.
        index: usize,
        /// The offending value.
        value: u64,
        /// Largest admissible symbol (`M - 1`).
        max: u64,
    },
    /// Structural problem with a schema or document.
    #[error("[PIF_SCHEMA] {0}")]
    Schema(String),
    /// Numeric policy violation.
    #[error("[PIF_NUMERIC_POLICY] {0}")]
    NumericPolicy(String),
    /// Container bytes could not be produced or parsed.
    #[error("[PIF_SERIALIZATION] {0}")]
    Serialization(String),
    /// Container format unknown or unavailable in this build.
    #[error("[PIF_UNSUPPORTED_FORMAT] {0}")]
    UnsupportedFormat(String),
    /// Stored content hash does not match the reconstructed bytes.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    /// One or more validator violations (every violation found is listed).
    #[error("[PIF_INVALID] {0}")]
    Invalid(ValidationReport),
    /// Diagnostic computation failed (empty input, degenerate weights).
    #[error("[PIF_DIAGNOSTIC] {0}")]
    Diagnostic(String),
}

impl PifError {
    /// The category of this error.
    ///
    /// For [`PifError::Invalid`] this is the category of the first violation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Range { .. } => ErrorKind::Range,
            Self::Schema(_) => ErrorKind::Schema,
            Self::NumericPolicy(_) => ErrorKind::NumericPolicy,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Invalid(report) => report.kind().unwrap_or(ErrorKind::Schema),
            Self::Diagnostic(_) => ErrorKind::Diagnostic,
        }
    }

    /// Returns the validation report when this error carries one.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Invalid(report) => Some(report),
            _ => None,
        }
    }

    /// Returns `true` if the report (or the error itself) contains `kind`.
    pub fn involves(&self, kind: ErrorKind) -> bool {
        match self {
            Self::Invalid(report) => report.has(kind),
            other => other.kind() == kind,
        }
    }
}

/// A stored content hash disagrees with the hash of the reconstructed bytes.
///
/// Non-fatal to decoding: the decoded symbols are still returned alongside this
/// value, and the caller decides whether to escalate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[PIF_HASH_MISMATCH] expected {expected}, computed {computed}")]
pub struct IntegrityError {
    /// The hash recorded in `meta.hash_raw` (or supplied by the caller).
    pub expected: ContentHash,
    /// The hash computed from the canonical bytes.
    pub computed: ContentHash,
}

/// Map a `serde_json` failure onto the PIF categories.
///
/// Shape errors (missing field, wrong type, unknown enum member) are schema
/// problems; everything else means the bytes themselves are malformed.
pub(crate) fn from_json_error(context: &str, err: &serde_json::Error) -> PifError {
    match err.classify() {
        serde_json::error::Category::Data => PifError::Schema(format!("{context}: {err}")),
        _ => PifError::Serialization(format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::validate::Violation;

    #[test]
    fn kind_of_invalid_follows_first_violation() {
        let mut report = ValidationReport::default();
        report.push(Violation::new(ErrorKind::NumericPolicy, "numeric", "bad"));
        report.push(Violation::new(ErrorKind::Range, "theta", "bad"));
        let err = PifError::Invalid(report);
        assert_eq!(err.kind(), ErrorKind::NumericPolicy);
        assert!(err.involves(ErrorKind::Range));
        assert!(!err.involves(ErrorKind::Schema));
    }

    #[test]
    fn messages_carry_codes() {
        let err = PifError::Range {
            index: 1,
            value: 16,
            max: 15,
        };
        assert!(err.to_string().starts_with("[PIF_RANGE]"));
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn json_shape_errors_are_schema_errors() {
        let Err(err) = serde_json::from_str::<crate::model::Schema>("{}") else {
            unreachable!("empty object has no alphabet");
        };
        assert_eq!(from_json_error("schema", &err).kind(), ErrorKind::Schema);

        let Err(err) = serde_json::from_str::<crate::model::Schema>("{\"alph") else {
            unreachable!("truncated json");
        };
        assert_eq!(
            from_json_error("schema", &err).kind(),
            ErrorKind::Serialization
        );
    }
}
