// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exact round trip across alphabet sizes, payload modes and storage widths.
#![allow(clippy::unwrap_used)]

mod common;

use phasebridge::{
    decode, encode, verify_roundtrip, EncodeOptions, IntegrityStatus, Note, Payload, PhaseArray,
    PhaseDtype, PolicyConfig, S1PhaseCodec, Schema, SymbolWidth, TWO_PI,
};

#[test]
fn decode_inverts_encode_for_every_alphabet_mode_and_dtype() {
    for m in common::ALPHABETS {
        let x = common::symbols_for(m, 64);
        let schema = Schema::uint(m);
        for (opts, dtype) in common::option_grid(m) {
            let pif = encode(&x, &schema, &opts).unwrap();
            assert_eq!(pif.dtype(), dtype, "M={m} {:?}", opts.mode);
            assert_eq!(pif.len(), x.len());

            let decoded = decode(&pif).unwrap();
            assert_eq!(decoded.integrity, IntegrityStatus::Verified);
            assert_eq!(decoded.symbols.to_u64_vec(), x, "M={m} {:?} {dtype}", opts.mode);
            assert_eq!(decoded.symbols.width(), SymbolWidth::for_alphabet(m));
        }
    }
}

#[test]
fn stored_angles_lie_in_the_half_open_circle() {
    for m in common::ALPHABETS {
        let x = common::symbols_for(m, 16);
        let pif = encode(&x, &Schema::uint(m), &EncodeOptions::default()).unwrap();
        for theta in pif.phases() {
            assert!((0.0..TWO_PI).contains(&theta), "M={m} theta={theta}");
        }
    }
}

#[test]
fn narrow_zone_boundary() {
    let x = [0u64, 1, 65_535];
    let at_edge = encode(
        &x,
        &Schema::uint(65_536),
        &EncodeOptions::default().with_policy(PolicyConfig::narrow()),
    )
    .unwrap();
    let numeric = at_edge.numeric().unwrap();
    assert_eq!(numeric.dtype, PhaseDtype::Narrow);
    assert_eq!(numeric.precision_safe, Some(true));

    let beyond = [0u64, 1, 65_536];
    let downgraded = encode(
        &beyond,
        &Schema::uint(65_537),
        &EncodeOptions::default().with_policy(PolicyConfig::narrow()),
    )
    .unwrap();
    assert_eq!(downgraded.dtype(), PhaseDtype::Wide);
    assert_eq!(downgraded.numeric().unwrap().precision_safe, Some(true));

    let forced = encode(
        &beyond,
        &Schema::uint(65_537),
        &EncodeOptions::default().with_policy(PolicyConfig::narrow_unchecked()),
    )
    .unwrap();
    assert_eq!(forced.dtype(), PhaseDtype::Narrow);
    assert_eq!(forced.numeric().unwrap().precision_safe, Some(false));
    // The final rounding step runs in f64, so the round trip still holds.
    assert_eq!(decode(&forced).unwrap().symbols.to_u64_vec(), beyond);
}

#[test]
fn m256_scenario() {
    let codec = S1PhaseCodec::new(256).unwrap();
    let pif = codec.encode(&[0u8, 1, 255], &Schema::uint(256)).unwrap();
    let Payload::Eager(PhaseArray::Wide(theta)) = pif.payload() else {
        unreachable!("default encode is eager float64");
    };
    let expected = [0.0, 0.024_543_7, 6.258_642];
    for (got, want) in theta.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "{got} vs {want}");
    }
    assert_eq!(codec.decode(&pif).unwrap().to_u64_vec(), vec![0, 1, 255]);
    assert_eq!(pif.meta().codec.as_deref(), Some("S1_phase_code_M256"));
    assert_eq!(pif.meta().note, Note::NoProcessing);
}

#[test]
fn lazy_payload_materializes_the_same_angles() {
    let x = common::symbols_for(1000, 32);
    let schema = Schema::uint(1000);
    let eager = encode(&x, &schema, &EncodeOptions::default()).unwrap();
    let lazy = encode(&x, &schema, &EncodeOptions::lazy()).unwrap();
    assert!(lazy.is_lazy());
    assert_eq!(lazy.materialize(), eager.materialize());
    assert_eq!(lazy.phase_at(5), eager.phase_at(5));
    assert_eq!(lazy.meta().hash_raw, eager.meta().hash_raw);
}

#[test]
fn non_strict_codec_reduces_modulo_m() {
    let codec = S1PhaseCodec::new(10).unwrap().with_strict_range(false);
    let pif = codec
        .encode_with(&[3u32, 13, 29], &Schema::uint(10), &EncodeOptions::lazy())
        .unwrap();
    assert_eq!(codec.decode(&pif).unwrap().to_u64_vec(), vec![3, 3, 9]);
}

#[test]
fn verify_roundtrip_reports_codec() {
    let report =
        verify_roundtrip(&[0u16, 4095], &Schema::uint(4096), &EncodeOptions::lazy()).unwrap();
    assert!(report.ok);
    assert_eq!(report.n, 2);
    assert_eq!(report.m, 4096);
    assert_eq!(report.codec, "S1_phase_code_M4096");
}

