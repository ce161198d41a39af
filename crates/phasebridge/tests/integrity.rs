// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content hashes: stability, known vectors and corruption detection.
#![allow(clippy::unwrap_used)]

mod common;

use phasebridge::integrity::{check_reference, hash_symbols, hash_values};
use phasebridge::{
    decode, encode, ContentHash, EncodeOptions, ErrorKind, HashAlgorithm, IntegrityStatus, Payload,
    Pif, Schema, SymbolArray,
};

#[test]
fn encoding_twice_yields_the_same_hash() {
    for m in common::ALPHABETS {
        let x = common::symbols_for(m, 32);
        let schema = Schema::uint(m);
        let a = encode(&x, &schema, &EncodeOptions::default()).unwrap();
        let b = encode(&x, &schema, &EncodeOptions::lazy()).unwrap();
        assert!(a.meta().hash_raw.is_some());
        assert_eq!(a.meta().hash_raw, b.meta().hash_raw, "M={m}");
        assert_eq!(a.meta().codec_hash, b.meta().codec_hash);
    }
}

#[test]
fn known_vectors() {
    let pif = encode(&[0u8, 1, 255], &Schema::uint(256), &EncodeOptions::default()).unwrap();
    assert_eq!(
        pif.meta().hash_raw.unwrap().to_string(),
        "sha256:26a66b061e8f48f39927c312f25293959729eee95978e2892d49d3512a5cc092"
    );
    assert_eq!(
        pif.meta().codec_hash.unwrap().to_string(),
        "sha256:3bc822cccea51a567c459da2c46eab277eee3e9bffd26451ba42e6c82bc203ae"
    );
}

#[test]
fn hash_ignores_storage_width() {
    let narrow = SymbolArray::U8(vec![3, 200]);
    let wide = SymbolArray::U64(vec![3, 200]);
    assert_eq!(
        hash_symbols(&narrow, 256, HashAlgorithm::Sha256),
        hash_symbols(&wide, 256, HashAlgorithm::Sha256)
    );
    // The canonical width follows M, so the same values hash differently under a wider alphabet.
    assert_ne!(
        hash_values([3, 200], 256, HashAlgorithm::Sha256),
        hash_values([3, 200], 257, HashAlgorithm::Sha256)
    );
}

#[test]
fn corrupting_one_element_is_reported_not_hidden() {
    let x = common::symbols_for(4096, 16);
    let pif = encode(&x, &Schema::uint(4096), &EncodeOptions::lazy()).unwrap();
    let Payload::Lazy(symbols) = pif.payload() else {
        unreachable!("lazy encode stores symbols");
    };
    let mut values = symbols.to_u64_vec();
    values[3] = (values[3] + 1) % 4096;
    let tampered = Pif::new(
        *pif.schema(),
        Payload::Lazy(SymbolArray::for_alphabet(values.clone(), 4096)),
        pif.meta().clone(),
    );

    let decoded = decode(&tampered).unwrap();
    assert_eq!(decoded.symbols.to_u64_vec(), values);
    let IntegrityStatus::Mismatch(err) = &decoded.integrity else {
        unreachable!("tampered payload must not verify");
    };
    assert_eq!(Some(err.expected), pif.meta().hash_raw);
    assert_ne!(err.computed, err.expected);
    assert_eq!(decoded.into_verified().unwrap_err().kind(), ErrorKind::Integrity);

    let expected = pif.meta().hash_raw.unwrap();
    assert!(check_reference(&expected, &x, 4096).is_ok());
    assert!(check_reference(&expected, &values, 4096).is_err());
}

#[test]
fn out_of_alphabet_reference_never_matches() {
    let pif = encode(&[0u8, 7], &Schema::uint(256), &EncodeOptions::default()).unwrap();
    let expected = pif.meta().hash_raw.unwrap();
    assert!(check_reference(&expected, &[0u16, 7], 256).is_ok());
    // 263 shares its low byte with 7.
    let err = check_reference(&expected, &[0u16, 263], 256).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
}

#[test]
fn missing_hash_is_not_a_mismatch() {
    let pif = encode(&[1u8, 2], &Schema::uint(4), &EncodeOptions::default()).unwrap();
    let mut meta = pif.meta().clone();
    meta.hash_raw = None;
    let bare = Pif::new(*pif.schema(), pif.payload().clone(), meta);
    assert_eq!(decode(&bare).unwrap().integrity, IntegrityStatus::NotRecorded);
}

#[test]
fn blake3_hashes_verify() {
    let opts = EncodeOptions {
        hash_algorithm: HashAlgorithm::Blake3,
        ..EncodeOptions::lazy()
    };
    let pif = encode(&[9u16, 999], &Schema::uint(1000), &opts).unwrap();
    let hash = pif.meta().hash_raw.unwrap();
    assert_eq!(hash.algorithm(), HashAlgorithm::Blake3);
    assert!(hash.to_string().starts_with("blake3:"));
    assert_eq!(decode(&pif).unwrap().integrity, IntegrityStatus::Verified);
}

#[test]
fn hash_strings_parse_strictly() {
    let good = "sha256:26A66B061E8F48F39927C312F25293959729EEE95978E2892D49D3512A5CC092";
    let parsed: ContentHash = good.parse().unwrap();
    assert_eq!(parsed.to_string(), good.to_lowercase());
    for bad in ["26a66b06", "md5:00", "sha256:zz", "sha256:"] {
        assert!(bad.parse::<ContentHash>().is_err(), "{bad}");
    }
}
