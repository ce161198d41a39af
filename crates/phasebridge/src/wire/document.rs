// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON text document.
//!
//! Arrays are plain JSON number lists. `float32` angles are written with the
//! shortest digits that round-trip at single precision, `float64` at double.
//! Unknown fields are ignored on read.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::PifError;
use crate::model::{
    default_format_version, Amplitude, Meta, NumericPolicy, PhaseArray, Payload, Pif, Schema,
};
use crate::policy::PhaseDtype;
use crate::symbols::SymbolArray;
use crate::validate::check_payload_selector;

/// Borrowed view of a [`Pif`] in wire field order.
#[derive(Serialize)]
pub(crate) struct DocumentOut<'a> {
    format_version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    schema: &'a Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    numeric: Option<&'a NumericPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    theta: Option<ThetaOut<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    theta_lazy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoded_uint: Option<SymbolsOut<'a>>,
    amp: &'a Amplitude,
    meta: &'a Meta,
}

impl<'a> DocumentOut<'a> {
    pub(crate) fn new(p: &'a Pif) -> Self {
        let (theta, theta_lazy, encoded_uint) = match p.payload() {
            Payload::Eager(a) => (Some(ThetaOut(a)), None, None),
            Payload::Lazy(s) => (None, Some(true), Some(SymbolsOut(s))),
        };
        Self {
            format_version: p.format_version(),
            domain: p.domain(),
            schema: p.schema(),
            numeric: p.numeric(),
            theta,
            theta_lazy,
            encoded_uint,
            amp: p.amplitude(),
            meta: p.meta(),
        }
    }
}

struct ThetaOut<'a>(&'a PhaseArray);

impl Serialize for ThetaOut<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            PhaseArray::Narrow(v) => v.serialize(serializer),
            PhaseArray::Wide(v) => v.serialize(serializer),
        }
    }
}

struct SymbolsOut<'a>(&'a SymbolArray);

impl Serialize for SymbolsOut<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for n in self.0 {
            seq.serialize_element(&n)?;
        }
        seq.end()
    }
}

/// Owned JSON document as read from text.
#[derive(Debug, Deserialize)]
pub(crate) struct DocumentIn {
    #[serde(alias = "pif_version", default = "default_format_version")]
    format_version: String,
    #[serde(default)]
    domain: Option<String>,
    schema: Schema,
    #[serde(default)]
    numeric: Option<NumericPolicy>,
    #[serde(default)]
    theta: Option<Vec<f64>>,
    #[serde(default)]
    theta_lazy: Option<bool>,
    #[serde(default)]
    encoded_uint: Option<Vec<u64>>,
    #[serde(default)]
    amp: Option<Amplitude>,
    meta: Meta,
}

impl DocumentIn {
    /// Resolve the payload union and build the instance.
    ///
    /// Angles are narrowed to `f32` when the declared dtype is `float32`; no
    /// value is rewrapped or clamped.
    pub(crate) fn into_pif(self) -> Result<Pif, PifError> {
        let lazy = check_payload_selector(
            self.theta.is_some(),
            self.theta_lazy,
            self.encoded_uint.is_some(),
        )
        .map_err(|v| PifError::Schema(v.to_string()))?;

        let m = self.schema.m();
        let dtype = self.numeric.map(|n| n.dtype).unwrap_or_default();
        let payload = match (lazy, self.theta, self.encoded_uint) {
            (true, _, Some(encoded)) => Payload::Lazy(SymbolArray::for_alphabet(encoded, m)),
            (false, Some(theta), _) => Payload::Eager(match dtype {
                PhaseDtype::Wide => PhaseArray::Wide(theta),
                PhaseDtype::Narrow => PhaseArray::Narrow(theta.into_iter().map(|t| t as f32).collect()),
            }),
            _ => return Err(PifError::Schema("payload arrays missing".into())),
        };

        Ok(Pif::new(self.schema, payload, self.meta)
            .with_format_version(self.format_version)
            .set_domain(self.domain)
            .set_numeric(self.numeric)
            .with_amplitude(self.amp.unwrap_or_default()))
    }
}
