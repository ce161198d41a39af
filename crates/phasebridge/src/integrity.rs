// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content hashes over the canonical byte image of a discrete array.
//!
//! # Canonical bytes
//!
//! A discrete array of alphabet `M` hashes as its values written at the minimal
//! unsigned width for `M` (see [`SymbolWidth::for_alphabet`]), little-endian,
//! concatenated with no header. Producer and consumer use the same rule, so
//! hashes agree no matter what width the caller held the array at.
//!
//! # Wire form
//!
//! `"<alg>:<64 hex digits>"`, e.g. `sha256:9f86…`. Readers accept either hex
//! case; writers emit lowercase.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{IntegrityError, PifError};
use crate::symbols::{canonical_bytes, SymbolArray, SymbolWidth, UnsignedSymbol};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 (written by default).
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
}

impl HashAlgorithm {
    /// Wire prefix before the colon.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sha256" => Some(Self::Sha256),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }

    /// Digest `bytes` with this algorithm.
    pub fn digest(self, bytes: &[u8]) -> ContentHash {
        let digest = match self {
            Self::Sha256 => Sha256::digest(bytes).into(),
            Self::Blake3 => *blake3::hash(bytes).as_bytes(),
        };
        ContentHash {
            algorithm: self,
            digest,
        }
    }
}

/// A 32-byte digest tagged with the algorithm that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    digest: [u8; 32],
}

impl ContentHash {
    /// The producing algorithm.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.digest
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.prefix(), hex::encode(self.digest))
    }
}

impl FromStr for ContentHash {
    type Err = PifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, digits) = s
            .split_once(':')
            .ok_or_else(|| PifError::Schema(format!("content hash {s:?} has no algorithm prefix")))?;
        let algorithm = HashAlgorithm::from_prefix(prefix)
            .ok_or_else(|| PifError::Schema(format!("unknown hash algorithm {prefix:?}")))?;
        if digits.len() != 64 {
            return Err(PifError::Schema(format!(
                "content hash digest must be 64 hex digits, got {}",
                digits.len()
            )));
        }
        let mut digest = [0u8; 32];
        hex::decode_to_slice(digits, &mut digest)
            .map_err(|e| PifError::Schema(format!("content hash digest: {e}")))?;
        Ok(Self { algorithm, digest })
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash of the UTF-8 codec identifier string.
pub fn identity_hash(id: &str, algorithm: HashAlgorithm) -> ContentHash {
    algorithm.digest(id.as_bytes())
}

/// Hash the canonical byte image of `values` for alphabet `m`.
pub fn hash_values<I>(values: I, m: u64, algorithm: HashAlgorithm) -> ContentHash
where
    I: IntoIterator<Item = u64>,
{
    algorithm.digest(&canonical_bytes(values, SymbolWidth::for_alphabet(m)))
}

/// Hash a [`SymbolArray`] for alphabet `m`, independent of its storage width.
pub fn hash_symbols(symbols: &SymbolArray, m: u64, algorithm: HashAlgorithm) -> ContentHash {
    hash_values(symbols.iter(), m, algorithm)
}

/// Compare `symbols` against `expected`, hashing with `expected`'s algorithm.
pub fn verify(expected: &ContentHash, symbols: &SymbolArray, m: u64) -> Result<(), IntegrityError> {
    let computed = hash_symbols(symbols, m, expected.algorithm);
    if computed == *expected {
        Ok(())
    } else {
        Err(IntegrityError {
            expected: *expected,
            computed,
        })
    }
}

/// Check a caller-held reference array against a stored hash.
///
/// A reference value `≥ M` has no canonical bytes and fails with
/// [`PifError::Range`] before anything is hashed.
pub fn check_reference<T: UnsignedSymbol>(
    expected: &ContentHash,
    reference: &[T],
    m: u64,
) -> Result<(), PifError> {
    let values = reference.iter().map(|&v| Into::<u64>::into(v));
    if let Some((index, value)) = values.clone().enumerate().find(|&(_, v)| v >= m) {
        return Err(PifError::Range {
            index,
            value,
            max: m.saturating_sub(1),
        });
    }
    let computed = hash_values(values, m, expected.algorithm);
    if computed == *expected {
        Ok(())
    } else {
        Err(IntegrityError {
            expected: *expected,
            computed,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn sha256_of_m256_bytes_matches_known_vector() {
        // sha256 of the three bytes 00 01 ff
        let h = hash_values([0u64, 1, 255], 256, HashAlgorithm::Sha256);
        let expected = Sha256::digest([0u8, 1, 255]);
        assert_eq!(h.as_bytes().as_slice(), expected.as_slice());
        assert!(h.to_string().starts_with("sha256:"));
    }

    #[test]
    fn width_of_holder_does_not_change_hash() {
        let narrow = SymbolArray::U8(vec![3, 4, 5]);
        let wide = SymbolArray::U64(vec![3, 4, 5]);
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            assert_eq!(hash_symbols(&narrow, 256, alg), hash_symbols(&wide, 256, alg));
        }
        // Different M means a different canonical width.
        assert_ne!(
            hash_symbols(&narrow, 256, HashAlgorithm::Sha256),
            hash_symbols(&narrow, 257, HashAlgorithm::Sha256)
        );
    }

    #[test]
    fn parse_and_display() {
        let h = identity_hash("S1_phase_code_M256", HashAlgorithm::Blake3);
        let text = h.to_string();
        let back: ContentHash = text.parse().unwrap();
        assert_eq!(back, h);
        let upper: ContentHash = text.to_uppercase().replacen("BLAKE3", "blake3", 1).parse().unwrap();
        assert_eq!(upper, h);

        assert!("md5:00".parse::<ContentHash>().is_err());
        assert!("sha256:abcd".parse::<ContentHash>().is_err());
        assert!("nohash".parse::<ContentHash>().is_err());
        assert!(format!("sha256:{}", "zz".repeat(32)).parse::<ContentHash>().is_err());
    }

    #[test]
    fn verify_reports_both_sides() {
        let expected = hash_values([1u64, 2, 3], 16, HashAlgorithm::Sha256);
        assert!(verify(&expected, &SymbolArray::U8(vec![1, 2, 3]), 16).is_ok());
        let err = verify(&expected, &SymbolArray::U8(vec![1, 2, 4]), 16).unwrap_err();
        assert_eq!(err.expected, expected);
        assert_ne!(err.computed, expected);
        assert!(check_reference(&expected, &[1u16, 2, 3], 16).is_ok());
        assert!(check_reference(&expected, &[1u16, 2], 16).is_err());
    }

    #[test]
    fn reference_values_outside_the_alphabet_are_rejected() {
        // 256 truncated to one byte would hash like 0.
        let expected = hash_values([0u64], 256, HashAlgorithm::Sha256);
        let err = check_reference(&expected, &[256u16], 256).unwrap_err();
        assert!(matches!(
            err,
            PifError::Range {
                index: 0,
                value: 256,
                max: 255
            }
        ));
        assert!(check_reference(&expected, &[0u16], 256).is_ok());
    }

    #[test]
    fn serde_as_string() {
        let h = identity_hash("x", HashAlgorithm::Sha256);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{h}\""));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
