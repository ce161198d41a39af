// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Range rejection, payload exclusivity and numeric-policy checks.
#![allow(clippy::unwrap_used)]

use phasebridge::validate::{check, check_payload_selector};
use phasebridge::{
    encode, validate, EncodeOptions, ErrorKind, Meta, NumericPolicy, Payload, PhaseArray,
    PhaseDtype, Pif, PifError, Schema, SymbolArray, TWO_PI,
};

#[test]
fn out_of_range_input_produces_no_instance() {
    for m in [2u64, 256, 70_000] {
        let err = encode(&[0, m], &Schema::uint(m), &EncodeOptions::default()).unwrap_err();
        match err {
            PifError::Range { index, value, max } => {
                assert_eq!((index, value, max), (1, m, m - 1));
            }
            other => unreachable!("expected a range error, got {other}"),
        }
    }
}

#[test]
fn alphabet_bounds() {
    assert_eq!(
        encode(&[0u8], &Schema::uint(1), &EncodeOptions::default()).unwrap_err().kind(),
        ErrorKind::Schema
    );
    assert_eq!(
        encode(&[0u8], &Schema::uint((1 << 32) + 1), &EncodeOptions::default())
            .unwrap_err()
            .kind(),
        ErrorKind::Schema
    );
}

#[test]
fn payload_selector_accepts_exactly_one_payload() {
    assert_eq!(check_payload_selector(true, None, false), Ok(false));
    assert_eq!(check_payload_selector(false, Some(true), true), Ok(true));
    for (theta, lazy, encoded) in [
        (true, Some(true), true),
        (true, None, true),
        (false, None, false),
        (false, Some(true), false),
        (false, Some(false), true),
    ] {
        let violation = check_payload_selector(theta, lazy, encoded).unwrap_err();
        assert_eq!(violation.kind, ErrorKind::Schema);
    }
}

#[test]
fn every_violation_is_reported_at_once() {
    let pif = Pif::new(
        Schema::uint(8),
        Payload::Eager(PhaseArray::Wide(vec![0.5, -0.1, TWO_PI, f64::NAN])),
        Meta::untouched(),
    )
    .with_numeric(NumericPolicy {
        dtype: PhaseDtype::Narrow,
        ..NumericPolicy::default()
    })
    .with_format_version("0.9.0");

    let report = check(&pif);
    assert!(!report.is_ok());
    assert!(report.has(ErrorKind::Schema));
    assert!(report.has(ErrorKind::Range));
    assert!(report.has(ErrorKind::NumericPolicy));
    let theta = report
        .violations()
        .iter()
        .filter(|v| v.field == "theta")
        .count();
    assert_eq!(theta, 1, "one aggregated violation per field: {report}");
}

#[test]
fn precision_safe_claim_outside_safe_zone_is_a_policy_error() {
    let pif = Pif::new(
        Schema::uint(70_000),
        Payload::Lazy(SymbolArray::U32(vec![1, 69_999])),
        Meta::untouched(),
    )
    .with_numeric(NumericPolicy {
        dtype: PhaseDtype::Narrow,
        precision_safe: Some(true),
        phase_wrap: None,
    });
    let err = validate(&pif).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NumericPolicy);
    assert!(err.report().is_some());
}

#[test]
fn lazy_symbols_at_or_above_m_are_range_violations() {
    let pif = Pif::new(
        Schema::uint(10),
        Payload::Lazy(SymbolArray::U8(vec![9, 10, 200])),
        Meta::untouched(),
    );
    let err = validate(&pif).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(err.to_string().contains("2 symbol(s)"), "{err}");
}

#[test]
fn processed_payloads_still_validate_and_decode() {
    let encoded = encode(&[1u8, 2, 3], &Schema::uint(4), &EncodeOptions::default()).unwrap();
    let text = encoded
        .to_text()
        .unwrap()
        .replace("no_processing", "processed:lowpass");
    let pif = Pif::from_text(&text, true).unwrap();
    assert!(!pif.meta().note.is_untouched());
    assert_eq!(
        phasebridge::decode(&pif).unwrap().symbols.to_u64_vec(),
        vec![1, 2, 3]
    );
}
