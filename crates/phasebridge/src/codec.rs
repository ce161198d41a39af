// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The S¹ phase codec: `n ↦ θ = (2π/M)·n` and back.
//!
//! Encoding runs in `f64` and narrows afterwards; decoding widens to `f64`
//! before rounding to the nearest lattice point, so `float32` storage inside
//! the safe zone cannot break the round trip.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IntegrityError, PifError};
use crate::integrity::{self, ContentHash, HashAlgorithm};
use crate::model::{
    Meta, Note, NumericPolicy, Payload, PhaseArray, Pif, Schema, MAX_ALPHABET, MIN_ALPHABET,
};
use crate::phase::{lattice_index, lattice_phase, TWO_PI};
use crate::policy::PolicyConfig;
use crate::symbols::{SymbolArray, SymbolWidth, UnsignedSymbol};
use crate::validate::validate;

/// Which payload variant the encoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadMode {
    /// Store the angles.
    #[default]
    Eager,
    /// Store the symbols; compute angles on demand.
    Lazy,
}

impl fmt::Display for PayloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
        })
    }
}

/// Per-call encoder settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Payload variant.
    pub mode: PayloadMode,
    /// Numeric storage preference.
    pub policy: PolicyConfig,
    /// Optional domain tag copied into the instance.
    pub domain: Option<String>,
    /// Digest used for `hash_raw` and `codec_hash`.
    pub hash_algorithm: HashAlgorithm,
}

impl EncodeOptions {
    /// Lazy payload, default policy.
    pub fn lazy() -> Self {
        Self {
            mode: PayloadMode::Lazy,
            ..Self::default()
        }
    }

    /// Replace the numeric policy.
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Set the domain tag.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Codec for one alphabet size.
///
/// In strict mode (the default) symbols `≥ M` are rejected with
/// [`PifError::Range`]. Non-strict mode reduces them modulo `M` first, and the
/// round trip then holds for `x mod M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S1PhaseCodec {
    m: u64,
    strict_range: bool,
}

impl S1PhaseCodec {
    /// Strict codec for alphabet `m` (`2 ≤ m ≤ 2^32`).
    pub fn new(m: u64) -> Result<Self, PifError> {
        if !(MIN_ALPHABET..=MAX_ALPHABET).contains(&m) {
            return Err(PifError::Schema(format!(
                "alphabet size {m} outside [{MIN_ALPHABET}, {MAX_ALPHABET}]"
            )));
        }
        Ok(Self {
            m,
            strict_range: true,
        })
    }

    /// Toggle strict range checking.
    pub fn with_strict_range(mut self, strict: bool) -> Self {
        self.strict_range = strict;
        self
    }

    /// Alphabet size.
    pub fn m(&self) -> u64 {
        self.m
    }

    /// Whether out-of-range input is rejected.
    pub fn is_strict(&self) -> bool {
        self.strict_range
    }

    /// `S1_phase_code_M<M>`.
    pub fn codec_id(&self) -> String {
        format!("S1_phase_code_M{}", self.m)
    }

    /// Hash of [`codec_id`](Self::codec_id).
    pub fn codec_hash(&self, algorithm: HashAlgorithm) -> ContentHash {
        integrity::identity_hash(&self.codec_id(), algorithm)
    }

    /// Eager encode with the default policy.
    pub fn encode<T: UnsignedSymbol>(&self, x: &[T], schema: &Schema) -> Result<Pif, PifError> {
        self.encode_with(x, schema, &EncodeOptions::default())
    }

    /// Encode `x` under `opts`.
    pub fn encode_with<T: UnsignedSymbol>(
        &self,
        x: &[T],
        schema: &Schema,
        opts: &EncodeOptions,
    ) -> Result<Pif, PifError> {
        self.encode_values(x.iter().map(|&v| v.into()), x.len(), schema, opts)
    }

    /// Encode a [`SymbolArray`] under `opts`.
    pub fn encode_array(
        &self,
        x: &SymbolArray,
        schema: &Schema,
        opts: &EncodeOptions,
    ) -> Result<Pif, PifError> {
        self.encode_values(x.iter(), x.len(), schema, opts)
    }

    fn encode_values(
        &self,
        values: impl Iterator<Item = u64>,
        len: usize,
        schema: &Schema,
        opts: &EncodeOptions,
    ) -> Result<Pif, PifError> {
        self.check_schema(schema)?;
        let m = self.m;

        let mut symbols = Vec::with_capacity(len);
        for (index, value) in values.enumerate() {
            if value < m {
                symbols.push(value);
            } else if self.strict_range {
                return Err(PifError::Range {
                    index,
                    value,
                    max: m - 1,
                });
            } else {
                symbols.push(value % m);
            }
        }

        let resolved = opts.policy.resolve(m);
        if opts.policy.downgrades(m) {
            warn!(m, "float32 requested outside the safe zone; storing float64");
        }

        let hash_raw = integrity::hash_values(symbols.iter().copied(), m, opts.hash_algorithm);
        let payload = match opts.mode {
            PayloadMode::Eager => {
                let theta = symbols.iter().map(|&n| lattice_phase(n, m)).collect();
                Payload::Eager(PhaseArray::from_wide(theta, resolved.dtype))
            }
            PayloadMode::Lazy => Payload::Lazy(SymbolArray::collect_with_width(
                SymbolWidth::for_alphabet(m),
                symbols,
            )?),
        };
        let meta = Meta {
            note: Note::NoProcessing,
            hash_raw: Some(hash_raw),
            codec: Some(self.codec_id()),
            codec_hash: Some(self.codec_hash(opts.hash_algorithm)),
        };
        let pif = Pif::new(*schema, payload, meta)
            .with_numeric(NumericPolicy {
                dtype: resolved.dtype,
                precision_safe: Some(resolved.precision_safe),
                phase_wrap: Some([0.0, TWO_PI]),
            })
            .set_domain(opts.domain.clone());

        validate(&pif)?;
        debug!(
            m,
            n = pif.len(),
            mode = %opts.mode,
            dtype = %resolved.dtype,
            "encoded"
        );
        Ok(pif)
    }

    /// Reconstruct the discrete array from `p` without looking at `hash_raw`.
    pub fn decode(&self, p: &Pif) -> Result<SymbolArray, PifError> {
        validate(p)?;
        self.check_alphabet(p.m())?;
        self.reconstruct(p)
    }

    /// Reconstruct and compare against `hash_raw` when one is recorded.
    ///
    /// A mismatch does not fail the call; it is reported in [`Decoded::integrity`].
    pub fn decode_checked(&self, p: &Pif) -> Result<Decoded, PifError> {
        let symbols = self.decode(p)?;
        let integrity = integrity_status(p, &symbols);
        Ok(Decoded { symbols, integrity })
    }

    fn reconstruct(&self, p: &Pif) -> Result<SymbolArray, PifError> {
        let m = self.m;
        if let Note::Processed(tag) = &p.meta().note {
            warn!(tag = %tag, "decoding a processed payload; exact reconstruction is not guaranteed");
        }
        let symbols = SymbolArray::collect_with_width(
            SymbolWidth::for_alphabet(m),
            p.phases().map(|theta| lattice_index(theta, m)),
        )?;
        debug!(m, n = symbols.len(), lazy = p.is_lazy(), "decoded");
        Ok(symbols)
    }

    fn check_schema(&self, schema: &Schema) -> Result<(), PifError> {
        self.check_alphabet(schema.m())
    }

    fn check_alphabet(&self, m: u64) -> Result<(), PifError> {
        if m == self.m {
            Ok(())
        } else {
            Err(PifError::Schema(format!(
                "schema.alphabet.M ({m}) != codec M ({})",
                self.m
            )))
        }
    }
}

fn integrity_status(p: &Pif, symbols: &SymbolArray) -> IntegrityStatus {
    let Some(expected) = &p.meta().hash_raw else {
        return IntegrityStatus::NotRecorded;
    };
    match integrity::verify(expected, symbols, p.m()) {
        Ok(()) => IntegrityStatus::Verified,
        Err(err) => {
            warn!(%err, "hash_raw does not match the decoded symbols");
            IntegrityStatus::Mismatch(err)
        }
    }
}

/// Outcome of comparing decoded symbols against `hash_raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// Hash recorded and matched.
    Verified,
    /// No hash recorded.
    NotRecorded,
    /// Hash recorded and did not match.
    Mismatch(IntegrityError),
}

/// Decoded symbols plus their integrity verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Reconstructed array at the minimal width for `M`.
    pub symbols: SymbolArray,
    /// Result of the `hash_raw` comparison.
    pub integrity: IntegrityStatus,
}

impl Decoded {
    /// Symbols, or [`PifError::Integrity`] on a hash mismatch.
    pub fn into_verified(self) -> Result<SymbolArray, PifError> {
        match self.integrity {
            IntegrityStatus::Mismatch(err) => Err(err.into()),
            IntegrityStatus::Verified | IntegrityStatus::NotRecorded => Ok(self.symbols),
        }
    }
}

/// Encode `x` with a codec sized from `schema`.
pub fn encode<T: UnsignedSymbol>(
    x: &[T],
    schema: &Schema,
    opts: &EncodeOptions,
) -> Result<Pif, PifError> {
    S1PhaseCodec::new(schema.m())?.encode_with(x, schema, opts)
}

/// Decode `p` with a codec sized from its schema, checking `hash_raw`.
pub fn decode(p: &Pif) -> Result<Decoded, PifError> {
    validate(p)?;
    let codec = S1PhaseCodec::new(p.m())?;
    let symbols = codec.reconstruct(p)?;
    let integrity = integrity_status(p, &symbols);
    Ok(Decoded { symbols, integrity })
}

/// Summary from [`verify_roundtrip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundTripReport {
    /// Decoded output equals the input and the stored hash verified.
    pub ok: bool,
    /// Number of symbols.
    pub n: usize,
    /// Alphabet size.
    pub m: u64,
    /// Codec identifier.
    pub codec: String,
}

/// Encode then decode `x` and report whether the result is identical.
pub fn verify_roundtrip<T: UnsignedSymbol>(
    x: &[T],
    schema: &Schema,
    opts: &EncodeOptions,
) -> Result<RoundTripReport, PifError> {
    let codec = S1PhaseCodec::new(schema.m())?;
    let pif = codec.encode_with(x, schema, opts)?;
    let decoded = codec.decode_checked(&pif)?;
    let same = decoded.symbols.len() == x.len()
        && decoded.symbols.iter().zip(x).all(|(a, &b)| a == Into::<u64>::into(b));
    Ok(RoundTripReport {
        ok: same && decoded.integrity == IntegrityStatus::Verified,
        n: x.len(),
        m: codec.m(),
        codec: codec.codec_id(),
    })
}
