// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ZIP bundle (`.npz`-compatible) container.
//!
//! | entry | contents |
//! |---|---|
//! | `schema.json` | [`Schema`] |
//! | `meta.json` | [`Meta`] |
//! | `numeric.json` | [`NumericPolicy`], optional |
//! | `flags.json` | `{"theta_lazy", "format_version", "domain"}`, optional on read |
//! | `theta.npy` / `encoded_uint.npy` | exactly one payload array |
//! | `amp.npy` / `amp.json` | per-sample array or `{"scalar": a}` |
//!
//! JSON entries are UTF-8 without a byte-order mark. The archive lives in memory
//! for the whole call, so a failed read or write leaves nothing half-done.

use std::io::{Cursor, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{from_json_error, PifError};
use crate::model::{
    default_format_version, Amplitude, Meta, NumericPolicy, Payload, Pif, Schema,
};
use crate::validate::check_payload_selector;

use super::array::RawArray;
use super::npy;

const SCHEMA: &str = "schema.json";
const META: &str = "meta.json";
const NUMERIC: &str = "numeric.json";
const FLAGS: &str = "flags.json";
const THETA: &str = "theta.npy";
const ENCODED: &str = "encoded_uint.npy";
const AMP_ARRAY: &str = "amp.npy";
const AMP_SCALAR: &str = "amp.json";

#[derive(Debug, Serialize, Deserialize)]
struct Flags {
    #[serde(default)]
    theta_lazy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScalarAmp {
    scalar: f64,
}

fn zip_error(err: ZipError) -> PifError {
    PifError::Serialization(format!("bundle: {err}"))
}

fn io_error(err: std::io::Error) -> PifError {
    PifError::Serialization(format!("bundle: {err}"))
}

/// Write `p` (already validated) as a bundle.
pub(crate) fn write(p: &Pif) -> Result<Vec<u8>, PifError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entry = |name: &str, bytes: &[u8]| -> Result<(), PifError> {
        zip.start_file(name, options).map_err(zip_error)?;
        zip.write_all(bytes).map_err(io_error)
    };

    entry(SCHEMA, &to_json(p.schema())?)?;
    entry(META, &to_json(p.meta())?)?;
    if let Some(numeric) = p.numeric() {
        entry(NUMERIC, &to_json(numeric)?)?;
    }
    let flags = Flags {
        theta_lazy: Some(p.is_lazy()),
        format_version: Some(p.format_version().to_owned()),
        domain: p.domain().map(str::to_owned),
    };
    entry(FLAGS, &to_json(&flags)?)?;
    match p.payload() {
        Payload::Eager(theta) => entry(THETA, &npy::write(&RawArray::from_phases(theta)))?,
        Payload::Lazy(symbols) => entry(ENCODED, &npy::write(&RawArray::from_symbols(symbols)))?,
    }
    match p.amplitude() {
        Amplitude::Scalar(a) => entry(AMP_SCALAR, &to_json(&ScalarAmp { scalar: *a })?)?,
        Amplitude::PerSample(v) => entry(AMP_ARRAY, &npy::write(&RawArray::from_f64s(v)))?,
    }

    let cursor = zip.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

/// Read a bundle.
pub(crate) fn read(bytes: &[u8]) -> Result<Pif, PifError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;

    let schema: Schema = read_json(&mut archive, SCHEMA)?
        .ok_or_else(|| PifError::Schema(format!("bundle has no {SCHEMA}")))?;
    let meta: Meta = read_json(&mut archive, META)?
        .ok_or_else(|| PifError::Schema(format!("bundle has no {META}")))?;
    let numeric: Option<NumericPolicy> = read_json(&mut archive, NUMERIC)?;
    let theta = read_entry(&mut archive, THETA)?;
    let encoded = read_entry(&mut archive, ENCODED)?;
    let flags: Flags = read_json(&mut archive, FLAGS)?.unwrap_or(Flags {
        theta_lazy: encoded.as_ref().map(|_| true),
        format_version: None,
        domain: None,
    });

    let lazy = check_payload_selector(theta.is_some(), flags.theta_lazy, encoded.is_some())
        .map_err(|v| PifError::Schema(v.to_string()))?;
    let payload = match (lazy, theta, encoded) {
        (true, _, Some(bytes)) => Payload::Lazy(npy::read(&bytes)?.into_symbols(schema.m())?),
        (false, Some(bytes), _) => Payload::Eager(npy::read(&bytes)?.into_phases()?),
        _ => return Err(PifError::Schema("payload arrays missing".into())),
    };

    let amp_array = read_entry(&mut archive, AMP_ARRAY)?;
    let amp_scalar: Option<ScalarAmp> = read_json(&mut archive, AMP_SCALAR)?;
    let amplitude = match (amp_array, amp_scalar) {
        (Some(_), Some(_)) => {
            return Err(PifError::Schema(format!(
                "bundle has both {AMP_ARRAY} and {AMP_SCALAR}"
            )))
        }
        (Some(bytes), None) => Amplitude::PerSample(npy::read(&bytes)?.into_f64s()?),
        (None, Some(s)) => Amplitude::Scalar(s.scalar),
        (None, None) => Amplitude::default(),
    };

    Ok(Pif::new(schema, payload, meta)
        .with_format_version(flags.format_version.unwrap_or_else(default_format_version))
        .set_domain(flags.domain)
        .set_numeric(numeric)
        .with_amplitude(amplitude))
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, PifError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(zip_error(err)),
    };
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(io_error)?;
    Ok(Some(buf))
}

fn read_json<T: DeserializeOwned, R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<T>, PifError> {
    let Some(bytes) = read_entry(archive, name)? else {
        return Ok(None);
    };
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Err(PifError::Serialization(format!(
            "{name} starts with a byte-order mark"
        )));
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| from_json_error(name, &e))
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, PifError> {
    serde_json::to_vec(value).map_err(|e| PifError::Serialization(format!("bundle: {e}")))
}
