// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Container formats for [`Pif`] instances.
//!
//! Every writer validates first and refuses to emit an invalid instance. Every
//! reader resolves the payload union structurally (both or neither payload is a
//! schema error) and then runs the validator when asked to.
//!
//! | format | feature | extension(s) |
//! |---|---|---|
//! | [`Format::Json`] | always | `.json` |
//! | [`Format::MsgPack`] | `msgpack` | `.mp`, `.msgpack`, `.mpk` |
//! | [`Format::Cbor`] | `cbor` | `.cbor` |
//! | [`Format::Npz`] | `bundle` | `.npz` |

#[cfg(any(feature = "cbor", feature = "msgpack", feature = "bundle"))]
pub(crate) mod array;
#[cfg(feature = "bundle")]
mod bundle;
#[cfg(feature = "cbor")]
mod canonical;
mod document;
#[cfg(feature = "bundle")]
mod npy;
#[cfg(any(feature = "cbor", feature = "msgpack"))]
mod packed;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{from_json_error, PifError};
use crate::model::Pif;
use crate::validate::validate;

use document::{DocumentIn, DocumentOut};

/// A serialized container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// UTF-8 JSON text.
    Json,
    /// MessagePack with tagged numeric arrays.
    MsgPack,
    /// Deterministic CBOR with tagged numeric arrays.
    Cbor,
    /// ZIP bundle of JSON entries and `.npy` arrays.
    Npz,
}

impl Format {
    /// Every format, compiled in or not.
    pub const ALL: [Self; 4] = [Self::Json, Self::MsgPack, Self::Cbor, Self::Npz];

    /// Canonical lowercase name (`json`, `msgpack`, `cbor`, `npz`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MsgPack => "msgpack",
            Self::Cbor => "cbor",
            Self::Npz => "npz",
        }
    }

    /// Format for a file extension (without the dot, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "mp" | "msgpack" | "mpk" => Some(Self::MsgPack),
            "cbor" => Some(Self::Cbor),
            "npz" => Some(Self::Npz),
            _ => None,
        }
    }

    /// Infer the format from `path`'s extension.
    pub fn for_path(path: &Path) -> Result<Self, PifError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                PifError::UnsupportedFormat(format!(
                    "cannot infer a container format from {}",
                    path.display()
                ))
            })
    }

    /// Whether this build can read and write the format.
    pub fn is_available(self) -> bool {
        match self {
            Self::Json => true,
            Self::MsgPack => cfg!(feature = "msgpack"),
            Self::Cbor => cfg!(feature = "cbor"),
            Self::Npz => cfg!(feature = "bundle"),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = PifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "msgpack" | "mp" | "mpk" => Ok(Self::MsgPack),
            "cbor" => Ok(Self::Cbor),
            "npz" | "bundle" => Ok(Self::Npz),
            other => Err(PifError::UnsupportedFormat(format!(
                "unknown container format {other:?}"
            ))),
        }
    }
}

fn unavailable(format: Format) -> PifError {
    PifError::UnsupportedFormat(format!(
        "{format} support is not compiled into this build"
    ))
}

/// Serialize `p` to compact JSON text.
pub fn to_text(p: &Pif) -> Result<String, PifError> {
    validate(p)?;
    serde_json::to_string(&DocumentOut::new(p))
        .map_err(|e| PifError::Serialization(format!("json: {e}")))
}

/// Serialize `p` to indented JSON text.
pub fn to_text_pretty(p: &Pif) -> Result<String, PifError> {
    validate(p)?;
    serde_json::to_string_pretty(&DocumentOut::new(p))
        .map_err(|e| PifError::Serialization(format!("json: {e}")))
}

/// Parse JSON text.
pub fn from_text(text: &str, validate_result: bool) -> Result<Pif, PifError> {
    let doc: DocumentIn = serde_json::from_str(text).map_err(|e| from_json_error("json", &e))?;
    finish(doc.into_pif()?, Format::Json, validate_result)
}

fn finish(p: Pif, format: Format, validate_result: bool) -> Result<Pif, PifError> {
    if validate_result {
        validate(&p)?;
    }
    debug!(%format, m = p.m(), n = p.len(), lazy = p.is_lazy(), "read pif");
    Ok(p)
}

/// Serialize `p` into `format`.
pub fn to_container(p: &Pif, format: Format) -> Result<Vec<u8>, PifError> {
    if !format.is_available() {
        return Err(unavailable(format));
    }
    validate(p)?;
    #[allow(unreachable_patterns)]
    let bytes = match format {
        Format::Json => serde_json::to_vec(&DocumentOut::new(p))
            .map_err(|e| PifError::Serialization(format!("json: {e}")))?,
        #[cfg(feature = "msgpack")]
        Format::MsgPack => packed::encode(p, packed::BinaryFormat::MsgPack)?,
        #[cfg(feature = "cbor")]
        Format::Cbor => packed::encode(p, packed::BinaryFormat::Cbor)?,
        #[cfg(feature = "bundle")]
        Format::Npz => bundle::write(p)?,
        other => return Err(unavailable(other)),
    };
    debug!(%format, bytes = bytes.len(), "wrote pif");
    Ok(bytes)
}

/// Parse `bytes` written in `format`.
pub fn from_container(
    bytes: &[u8],
    format: Format,
    validate_result: bool,
) -> Result<Pif, PifError> {
    if !format.is_available() {
        return Err(unavailable(format));
    }
    #[allow(unreachable_patterns)]
    let p = match format {
        Format::Json => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| PifError::Serialization(format!("json: not UTF-8: {e}")))?;
            return from_text(text, validate_result);
        }
        #[cfg(feature = "msgpack")]
        Format::MsgPack => packed::decode(bytes, packed::BinaryFormat::MsgPack)?,
        #[cfg(feature = "cbor")]
        Format::Cbor => packed::decode(bytes, packed::BinaryFormat::Cbor)?,
        #[cfg(feature = "bundle")]
        Format::Npz => bundle::read(bytes)?,
        other => return Err(unavailable(other)),
    };
    finish(p, format, validate_result)
}

/// Serialize `p` and write it to `path`.
///
/// The container is built in memory, written to a hidden sibling file and
/// renamed over `path`, so `path` is either untouched or complete.
pub fn write_file(p: &Pif, path: &Path, format: Format) -> Result<(), PifError> {
    write_atomic(path, &to_container(p, format)?)
}

/// Write already-serialized container `bytes` to `path` the way
/// [`write_file`] does.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PifError> {
    let tmp = temp_sibling(path);
    let io = |what: &str, e: std::io::Error| {
        PifError::Serialization(format!("{what} {}: {e}", path.display()))
    };
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(io("cannot write", e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io("cannot replace", e));
    }
    Ok(())
}

/// Read and parse the container at `path`.
pub fn read_file(path: &Path, format: Format, validate_result: bool) -> Result<Pif, PifError> {
    let bytes = fs::read(path)
        .map_err(|e| PifError::Serialization(format!("cannot read {}: {e}", path.display())))?;
    from_container(&bytes, format, validate_result)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "pif".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}
