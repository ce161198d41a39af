// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory PIF instance.
//!
//! A [`Pif`] is built once (by the codec or by a reader) and never mutated
//! afterwards. The payload is a closed [`Payload`] enum, so an instance always
//! carries exactly one of a phase array or a symbol array.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PifError;
use crate::integrity::ContentHash;
use crate::phase::{self, Phases};
use crate::policy::PhaseDtype;
use crate::symbols::SymbolArray;
use crate::wire::{self, Format};

/// Format version written by this crate.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Version assumed for a document that carries no version key.
pub(crate) fn default_format_version() -> String {
    FORMAT_VERSION.to_owned()
}
/// Smallest admissible alphabet.
pub const MIN_ALPHABET: u64 = 2;
/// Largest admissible alphabet (`2^32`).
pub const MAX_ALPHABET: u64 = 1 << 32;

/// Alphabet family. Only unsigned integers exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlphabetKind {
    /// `{0, …, M-1}`.
    #[default]
    #[serde(rename = "uint")]
    Uint,
}

/// `schema.alphabet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphabet {
    /// Alphabet family (`"uint"`).
    #[serde(rename = "type")]
    pub kind: AlphabetKind,
    /// Alphabet size.
    #[serde(rename = "M")]
    pub m: u64,
}

/// `schema.sampling`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sampling {
    /// Sampling rate for time-ordered domains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<f64>,
}

/// `schema`: alphabet plus optional sampling description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The discrete alphabet.
    pub alphabet: Alphabet,
    /// Sampling description, time-ordered domains only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Sampling>,
}

impl Schema {
    /// Unsigned alphabet of size `m`, no sampling.
    pub fn uint(m: u64) -> Self {
        Self {
            alphabet: Alphabet {
                kind: AlphabetKind::Uint,
                m,
            },
            sampling: None,
        }
    }

    /// Attach a sampling rate.
    pub fn with_sampling_rate(mut self, fs: f64) -> Self {
        self.sampling = Some(Sampling { fs: Some(fs) });
        self
    }

    /// Alphabet size `M`.
    pub fn m(&self) -> u64 {
        self.alphabet.m
    }

    /// Sampling rate, if any.
    pub fn sampling_rate(&self) -> Option<f64> {
        self.sampling.and_then(|s| s.fs)
    }
}

/// `numeric`: declared storage policy for phase values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericPolicy {
    /// Storage width (default `float64`).
    #[serde(default)]
    pub dtype: PhaseDtype,
    /// Whether the declared width guarantees exact round trips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision_safe: Option<bool>,
    /// Half-open interval the angles live in, `[lo, hi)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_wrap: Option<[f64; 2]>,
}

/// `meta.note`: whether the stored values are an untouched encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Note {
    /// Produced by the codec; the round-trip contract holds.
    NoProcessing,
    /// Transformed after encoding; the tag names the transformation.
    Processed(String),
}

impl Note {
    /// Returns `true` for [`Note::NoProcessing`].
    pub fn is_untouched(&self) -> bool {
        matches!(self, Self::NoProcessing)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProcessing => f.write_str("no_processing"),
            Self::Processed(tag) => write!(f, "processed:{tag}"),
        }
    }
}

impl FromStr for Note {
    type Err = PifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "no_processing" {
            return Ok(Self::NoProcessing);
        }
        match s.strip_prefix("processed:") {
            Some(tag) if !tag.is_empty() => Ok(Self::Processed(tag.to_owned())),
            _ => Err(PifError::Schema(format!(
                "note {s:?} is neither \"no_processing\" nor \"processed:<tag>\""
            ))),
        }
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// `meta`: provenance and integrity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Processing marker.
    pub note: Note,
    /// Hash of the canonical bytes of the source array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_raw: Option<ContentHash>,
    /// Codec identifier, e.g. `S1_phase_code_M256`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// Hash of the codec identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_hash: Option<ContentHash>,
}

impl Meta {
    /// Bare `no_processing` meta with no hashes.
    pub fn untouched() -> Self {
        Self {
            note: Note::NoProcessing,
            hash_raw: None,
            codec: None,
            codec_hash: None,
        }
    }
}

/// Stored phase values at their declared width.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseArray {
    /// `float32` storage.
    Narrow(Vec<f32>),
    /// `float64` storage.
    Wide(Vec<f64>),
}

impl PhaseArray {
    /// Number of angles.
    pub fn len(&self) -> usize {
        match self {
            Self::Narrow(v) => v.len(),
            Self::Wide(v) => v.len(),
        }
    }

    /// Returns `true` if there are no angles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage width.
    pub fn dtype(&self) -> PhaseDtype {
        match self {
            Self::Narrow(_) => PhaseDtype::Narrow,
            Self::Wide(_) => PhaseDtype::Wide,
        }
    }

    /// Angle at `index`, widened to `f64`.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Self::Narrow(v) => v.get(index).copied().map(f64::from),
            Self::Wide(v) => v.get(index).copied(),
        }
    }

    /// Iterate angles as `f64`.
    pub fn iter(&self) -> Phases<'_> {
        Phases::stored(self)
    }

    /// Narrow `f64` angles into `dtype` storage.
    pub(crate) fn from_wide(values: Vec<f64>, dtype: PhaseDtype) -> Self {
        match dtype {
            PhaseDtype::Wide => Self::Wide(values),
            PhaseDtype::Narrow => Self::Narrow(values.into_iter().map(phase::narrow).collect()),
        }
    }
}

/// Payload of an instance: exactly one of eager angles or lazy symbols.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Angles present.
    Eager(PhaseArray),
    /// Only symbol indices present; angles are computed on demand.
    Lazy(SymbolArray),
}

impl Payload {
    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Eager(a) => a.len(),
            Self::Lazy(s) => s.len(),
        }
    }

    /// Returns `true` if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `amp`: scalar or per-sample non-negative weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amplitude {
    /// One weight for every sample.
    Scalar(f64),
    /// One weight per sample.
    PerSample(Vec<f64>),
}

impl Default for Amplitude {
    fn default() -> Self {
        Self::Scalar(1.0)
    }
}

impl Amplitude {
    /// Weight for sample `index`.
    pub fn weight(&self, index: usize) -> Option<f64> {
        match self {
            Self::Scalar(a) => Some(*a),
            Self::PerSample(v) => v.get(index).copied(),
        }
    }
}

/// An immutable PIF instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Pif {
    format_version: String,
    domain: Option<String>,
    schema: Schema,
    numeric: Option<NumericPolicy>,
    payload: Payload,
    amplitude: Amplitude,
    meta: Meta,
}

impl Pif {
    /// Assemble an instance. Nothing is checked here; see [`crate::validate`].
    pub fn new(schema: Schema, payload: Payload, meta: Meta) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_owned(),
            domain: None,
            schema,
            numeric: None,
            payload,
            amplitude: Amplitude::default(),
            meta,
        }
    }

    /// Set the domain tag.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the declared numeric policy.
    pub fn with_numeric(mut self, numeric: NumericPolicy) -> Self {
        self.numeric = Some(numeric);
        self
    }

    /// Set the amplitude.
    pub fn with_amplitude(mut self, amplitude: Amplitude) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Override the recorded format version (readers keep what they read).
    pub fn with_format_version(mut self, version: impl Into<String>) -> Self {
        self.format_version = version.into();
        self
    }

    pub(crate) fn set_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    pub(crate) fn set_numeric(mut self, numeric: Option<NumericPolicy>) -> Self {
        self.numeric = numeric;
        self
    }

    /// Recorded format version.
    pub fn format_version(&self) -> &str {
        &self.format_version
    }

    /// Free-form domain tag.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Declared numeric policy, if any.
    pub fn numeric(&self) -> Option<&NumericPolicy> {
        self.numeric.as_ref()
    }

    /// Payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Amplitude.
    pub fn amplitude(&self) -> &Amplitude {
        &self.amplitude
    }

    /// Meta block.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Alphabet size `M`.
    pub fn m(&self) -> u64 {
        self.schema.m()
    }

    /// Number of samples `N`.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if `N == 0`.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns `true` for a lazy payload.
    pub fn is_lazy(&self) -> bool {
        matches!(self.payload, Payload::Lazy(_))
    }

    /// Effective storage width: the eager array's own width, else the declared one.
    pub fn dtype(&self) -> PhaseDtype {
        match &self.payload {
            Payload::Eager(a) => a.dtype(),
            Payload::Lazy(_) => self.numeric.map(|n| n.dtype).unwrap_or_default(),
        }
    }

    /// Iterate phase values in `f64`; lazy payloads compute each angle on demand.
    pub fn phases(&self) -> Phases<'_> {
        match &self.payload {
            Payload::Eager(a) => Phases::stored(a),
            Payload::Lazy(s) => Phases::lattice(s, self.m()),
        }
    }

    /// Phase value at `index`.
    pub fn phase_at(&self, index: usize) -> Option<f64> {
        match &self.payload {
            Payload::Eager(a) => a.get(index),
            Payload::Lazy(s) => s.get(index).map(|n| phase::lattice_phase(n, self.m())),
        }
    }

    /// Allocate the phase values in the effective dtype.
    pub fn materialize(&self) -> PhaseArray {
        match &self.payload {
            Payload::Eager(a) => a.clone(),
            Payload::Lazy(_) => PhaseArray::from_wide(self.phases().collect(), self.dtype()),
        }
    }

    /// Serialize to JSON text.
    pub fn to_text(&self) -> Result<String, PifError> {
        wire::to_text(self)
    }

    /// Serialize to indented JSON text.
    pub fn to_text_pretty(&self) -> Result<String, PifError> {
        wire::to_text_pretty(self)
    }

    /// Parse JSON text; `validate` runs the full validator on the result.
    pub fn from_text(text: &str, validate: bool) -> Result<Self, PifError> {
        wire::from_text(text, validate)
    }

    /// Serialize into container `format`.
    pub fn to_bytes(&self, format: Format) -> Result<Vec<u8>, PifError> {
        wire::to_container(self, format)
    }

    /// Parse container `format`.
    pub fn from_bytes(bytes: &[u8], format: Format, validate: bool) -> Result<Self, PifError> {
        wire::from_container(bytes, format, validate)
    }
}
