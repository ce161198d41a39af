// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Binary containers (CBOR, MessagePack) sharing one tagged-array document.
//!
//! Numeric arrays travel as `{"__nd__": true, "dtype", "shape", "data"}` with
//! `data` holding the raw little-endian bytes. [`pack`] and [`unpack`] are the
//! only place that convention is implemented; the two formats differ solely in
//! how the resulting document is written to bytes.

use std::io::Cursor;

use serde::{Deserialize, Serialize};

use crate::error::PifError;
use crate::model::{
    default_format_version, Amplitude, Meta, NumericPolicy, Payload, Pif, Schema,
};
use crate::validate::check_payload_selector;

use super::array::{ArrayDtype, RawArray};

/// The binary encodings that use the tagged-array document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryFormat {
    #[cfg(feature = "cbor")]
    Cbor,
    #[cfg(feature = "msgpack")]
    MsgPack,
}

#[derive(Debug, Serialize, Deserialize)]
struct PackedArray {
    #[serde(rename = "__nd__")]
    nd: bool,
    dtype: String,
    shape: Vec<u64>,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
}

impl PackedArray {
    fn from_raw(raw: RawArray) -> Self {
        Self {
            nd: true,
            dtype: raw.dtype.name().to_owned(),
            shape: raw.shape(),
            data: raw.bytes,
        }
    }

    fn into_raw(self, field: &str) -> Result<RawArray, PifError> {
        if !self.nd {
            return Err(PifError::Serialization(format!(
                "{field}: array marker __nd__ is not true"
            )));
        }
        RawArray::new(ArrayDtype::from_name(&self.dtype)?, &self.shape, self.data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PackedAmplitude {
    Scalar(f64),
    Array(PackedArray),
}

#[derive(Debug, Serialize, Deserialize)]
struct PackedDocument {
    #[serde(alias = "pif_version", default = "default_format_version")]
    format_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    numeric: Option<NumericPolicy>,
    #[serde(default)]
    theta_lazy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    theta: Option<PackedArray>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoded_uint: Option<PackedArray>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amp: Option<PackedAmplitude>,
    meta: Meta,
}

fn pack(p: &Pif) -> PackedDocument {
    let (theta, encoded_uint) = match p.payload() {
        Payload::Eager(angles) => (Some(PackedArray::from_raw(RawArray::from_phases(angles))), None),
        Payload::Lazy(symbols) => (
            None,
            Some(PackedArray::from_raw(RawArray::from_symbols(symbols))),
        ),
    };
    let amp = match p.amplitude() {
        Amplitude::Scalar(a) => PackedAmplitude::Scalar(*a),
        Amplitude::PerSample(v) => PackedAmplitude::Array(PackedArray::from_raw(RawArray::from_f64s(v))),
    };
    PackedDocument {
        format_version: p.format_version().to_owned(),
        domain: p.domain().map(str::to_owned),
        schema: *p.schema(),
        numeric: p.numeric().copied(),
        theta_lazy: Some(p.is_lazy()),
        theta,
        encoded_uint,
        amp: Some(amp),
        meta: p.meta().clone(),
    }
}

fn unpack(doc: PackedDocument) -> Result<Pif, PifError> {
    let lazy = check_payload_selector(
        doc.theta.is_some(),
        doc.theta_lazy,
        doc.encoded_uint.is_some(),
    )
    .map_err(|v| PifError::Schema(v.to_string()))?;

    let m = doc.schema.m();
    let payload = match (lazy, doc.theta, doc.encoded_uint) {
        (true, _, Some(encoded)) => Payload::Lazy(encoded.into_raw("encoded_uint")?.into_symbols(m)?),
        (false, Some(theta), _) => Payload::Eager(theta.into_raw("theta")?.into_phases()?),
        _ => return Err(PifError::Schema("payload arrays missing".into())),
    };
    let amplitude = match doc.amp {
        None => Amplitude::default(),
        Some(PackedAmplitude::Scalar(a)) => Amplitude::Scalar(a),
        Some(PackedAmplitude::Array(a)) => Amplitude::PerSample(a.into_raw("amp")?.into_f64s()?),
    };
    Ok(Pif::new(doc.schema, payload, doc.meta)
        .with_format_version(doc.format_version)
        .set_domain(doc.domain)
        .set_numeric(doc.numeric)
        .with_amplitude(amplitude))
}

/// Serialize `p` (already validated) into `format`.
pub(crate) fn encode(p: &Pif, format: BinaryFormat) -> Result<Vec<u8>, PifError> {
    let doc = pack(p);
    match format {
        #[cfg(feature = "cbor")]
        BinaryFormat::Cbor => {
            let value = ciborium::value::Value::serialized(&doc)
                .map_err(|e| PifError::Serialization(format!("cbor: {e}")))?;
            super::canonical::encode_value(&value)
        }
        #[cfg(feature = "msgpack")]
        BinaryFormat::MsgPack => rmp_serde::to_vec_named(&doc)
            .map_err(|e| PifError::Serialization(format!("msgpack: {e}"))),
    }
}

/// Parse `bytes` written in `format`. Trailing bytes are an error.
pub(crate) fn decode(bytes: &[u8], format: BinaryFormat) -> Result<Pif, PifError> {
    let mut cursor = Cursor::new(bytes);
    let doc: PackedDocument = match format {
        #[cfg(feature = "cbor")]
        BinaryFormat::Cbor => ciborium::de::from_reader(&mut cursor).map_err(cbor_error)?,
        #[cfg(feature = "msgpack")]
        BinaryFormat::MsgPack => {
            let mut de = rmp_serde::Deserializer::new(&mut cursor);
            PackedDocument::deserialize(&mut de).map_err(msgpack_error)?
        }
    };
    if cursor.position() != bytes.len() as u64 {
        return Err(PifError::Serialization(format!(
            "{} trailing bytes after document",
            bytes.len() as u64 - cursor.position()
        )));
    }
    unpack(doc)
}

#[cfg(feature = "cbor")]
fn cbor_error(err: ciborium::de::Error<std::io::Error>) -> PifError {
    match err {
        ciborium::de::Error::Semantic(_, msg) => PifError::Schema(format!("cbor: {msg}")),
        other => PifError::Serialization(format!("cbor: {other:?}")),
    }
}

#[cfg(feature = "msgpack")]
fn msgpack_error(err: rmp_serde::decode::Error) -> PifError {
    use rmp_serde::decode::Error;
    match err {
        Error::Syntax(_) | Error::Uncategorized(_) | Error::TypeMismatch(_) => {
            PifError::Schema(format!("msgpack: {err}"))
        }
        other => PifError::Serialization(format!("msgpack: {other}")),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Note, PhaseArray};
    use crate::symbols::SymbolArray;

    fn sample() -> Pif {
        Pif::new(
            Schema::uint(300),
            Payload::Lazy(SymbolArray::U16(vec![0, 299, 7])),
            Meta::untouched(),
        )
        .with_amplitude(Amplitude::PerSample(vec![1.0, 0.5, 0.0]))
        .with_domain("audio")
    }

    fn formats() -> Vec<BinaryFormat> {
        vec![
            #[cfg(feature = "cbor")]
            BinaryFormat::Cbor,
            #[cfg(feature = "msgpack")]
            BinaryFormat::MsgPack,
        ]
    }

    #[test]
    fn documents_survive_both_formats() {
        let p = sample();
        for format in formats() {
            let bytes = encode(&p, format).unwrap();
            let back = decode(&bytes, format).unwrap();
            assert_eq!(back, p, "{format:?}");
        }
    }

    #[test]
    fn eager_narrow_keeps_bits() {
        let p = Pif::new(
            Schema::uint(8),
            Payload::Eager(PhaseArray::Narrow(vec![0.0, 0.785_398_2, 5.497_787])),
            Meta {
                note: Note::Processed("demo".into()),
                ..Meta::untouched()
            },
        );
        for format in formats() {
            let back = decode(&encode(&p, format).unwrap(), format).unwrap();
            assert_eq!(back.payload(), p.payload());
            assert_eq!(back.meta().note, Note::Processed("demo".into()));
        }
    }

    #[test]
    fn marker_and_shape_are_enforced() {
        let mut doc = pack(&sample());
        if let Some(enc) = doc.encoded_uint.as_mut() {
            enc.nd = false;
        }
        assert_eq!(unpack(doc).unwrap_err().kind(), ErrorKind::Serialization);

        let mut doc = pack(&sample());
        if let Some(enc) = doc.encoded_uint.as_mut() {
            enc.data.pop();
        }
        assert_eq!(unpack(doc).unwrap_err().kind(), ErrorKind::Serialization);

        let mut doc = pack(&sample());
        if let Some(enc) = doc.encoded_uint.as_mut() {
            enc.dtype = "int16".into();
        }
        assert_eq!(unpack(doc).unwrap_err().kind(), ErrorKind::Serialization);
    }

    #[test]
    fn both_payloads_is_a_schema_error() {
        let mut doc = pack(&sample());
        doc.theta = Some(PackedArray::from_raw(RawArray::from_f64s(&[0.0, 0.0, 0.0])));
        assert_eq!(unpack(doc).unwrap_err().kind(), ErrorKind::Schema);
    }

    #[test]
    fn truncated_and_trailing_bytes_fail() {
        for format in formats() {
            let bytes = encode(&sample(), format).unwrap();
            assert!(decode(&bytes[..bytes.len() / 2], format).is_err());
            let mut padded = bytes.clone();
            padded.push(0);
            let err = decode(&padded, format).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Serialization, "{format:?}");
        }
    }
}
