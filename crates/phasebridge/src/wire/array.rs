// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Raw little-endian 1-D arrays shared by the tagged-array marker and `.npy` entries.

use crate::error::PifError;
use crate::model::PhaseArray;
use crate::symbols::{le_chunks, SymbolArray, SymbolWidth};

/// Element types that may appear in a packed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArrayDtype {
    F32,
    F64,
    Uint(SymbolWidth),
}

impl ArrayDtype {
    /// NumPy dtype name used inside the tagged-array marker.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::Uint(w) => w.dtype_name(),
        }
    }

    pub(crate) fn from_name(name: &str) -> Result<Self, PifError> {
        match name {
            "float32" => Ok(Self::F32),
            "float64" => Ok(Self::F64),
            other => SymbolWidth::from_dtype_name(other)
                .map(Self::Uint)
                .ok_or_else(|| PifError::Serialization(format!("unknown array dtype {other:?}"))),
        }
    }

    /// `.npy` type descriptor (`<f8`, `|u1`, …).
    pub(crate) fn descr(self) -> &'static str {
        match self {
            Self::F32 => "<f4",
            Self::F64 => "<f8",
            Self::Uint(SymbolWidth::U8) => "|u1",
            Self::Uint(SymbolWidth::U16) => "<u2",
            Self::Uint(SymbolWidth::U32) => "<u4",
            Self::Uint(SymbolWidth::U64) => "<u8",
        }
    }

    /// Parse a `.npy` descriptor. Big-endian multi-byte types are rejected.
    pub(crate) fn from_descr(descr: &str) -> Result<Self, PifError> {
        let (order, code) = match descr.chars().next() {
            Some(c @ ('<' | '>' | '|' | '=')) => (c, &descr[1..]),
            _ => ('=', descr),
        };
        let dtype = match code {
            "f4" => Self::F32,
            "f8" => Self::F64,
            "u1" => Self::Uint(SymbolWidth::U8),
            "u2" => Self::Uint(SymbolWidth::U16),
            "u4" => Self::Uint(SymbolWidth::U32),
            "u8" => Self::Uint(SymbolWidth::U64),
            _ => {
                return Err(PifError::Serialization(format!(
                    "unsupported npy descr {descr:?}"
                )))
            }
        };
        if order == '>' && dtype.item_size() > 1 {
            return Err(PifError::Serialization(format!(
                "big-endian npy descr {descr:?} is not supported"
            )));
        }
        Ok(dtype)
    }

    pub(crate) fn item_size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
            Self::Uint(w) => w.bytes(),
        }
    }
}

/// A flat array: dtype, element count and raw little-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawArray {
    pub(crate) dtype: ArrayDtype,
    pub(crate) len: usize,
    pub(crate) bytes: Vec<u8>,
}

impl RawArray {
    /// Check `shape` and byte length before accepting foreign bytes.
    pub(crate) fn new(dtype: ArrayDtype, shape: &[u64], bytes: Vec<u8>) -> Result<Self, PifError> {
        let [n] = shape else {
            return Err(PifError::Serialization(format!(
                "only 1-D arrays are supported, got shape {shape:?}"
            )));
        };
        let len = usize::try_from(*n)
            .map_err(|_| PifError::Serialization(format!("array length {n} too large")))?;
        let expected = len.checked_mul(dtype.item_size()).ok_or_else(|| {
            PifError::Serialization(format!("array length {n} too large"))
        })?;
        if bytes.len() != expected {
            return Err(PifError::Serialization(format!(
                "{} array of shape [{n}] needs {expected} bytes, got {}",
                dtype.name(),
                bytes.len()
            )));
        }
        Ok(Self { dtype, len, bytes })
    }

    pub(crate) fn from_phases(theta: &PhaseArray) -> Self {
        match theta {
            PhaseArray::Narrow(v) => Self {
                dtype: ArrayDtype::F32,
                len: v.len(),
                bytes: v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            },
            PhaseArray::Wide(v) => Self::from_f64s(v),
        }
    }

    pub(crate) fn from_symbols(symbols: &SymbolArray) -> Self {
        Self {
            dtype: ArrayDtype::Uint(symbols.width()),
            len: symbols.len(),
            bytes: symbols.to_le_bytes(),
        }
    }

    pub(crate) fn from_f64s(values: &[f64]) -> Self {
        Self {
            dtype: ArrayDtype::F64,
            len: values.len(),
            bytes: values.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    pub(crate) fn shape(&self) -> Vec<u64> {
        vec![self.len as u64]
    }

    pub(crate) fn into_phases(self) -> Result<PhaseArray, PifError> {
        match self.dtype {
            ArrayDtype::F32 => Ok(PhaseArray::Narrow(le_chunks(&self.bytes, f32::from_le_bytes))),
            ArrayDtype::F64 => Ok(PhaseArray::Wide(le_chunks(&self.bytes, f64::from_le_bytes))),
            ArrayDtype::Uint(_) => Err(self.wrong_kind("theta", "float32 or float64")),
        }
    }

    /// Symbols re-packed at the canonical width for `m` when they fit.
    pub(crate) fn into_symbols(self, m: u64) -> Result<SymbolArray, PifError> {
        match self.dtype {
            ArrayDtype::Uint(width) => {
                Ok(SymbolArray::from_le_bytes(&self.bytes, width)?.into_canonical(m))
            }
            ArrayDtype::F32 | ArrayDtype::F64 => {
                Err(self.wrong_kind("encoded_uint", "an unsigned integer dtype"))
            }
        }
    }

    pub(crate) fn into_f64s(self) -> Result<Vec<f64>, PifError> {
        match self.dtype {
            ArrayDtype::F64 => Ok(le_chunks(&self.bytes, f64::from_le_bytes)),
            ArrayDtype::F32 => Ok(le_chunks(&self.bytes, f32::from_le_bytes)
                .into_iter()
                .map(f64::from)
                .collect()),
            ArrayDtype::Uint(_) => Err(self.wrong_kind("amp", "float32 or float64")),
        }
    }

    fn wrong_kind(&self, field: &str, wanted: &str) -> PifError {
        PifError::Serialization(format!(
            "{field} must be {wanted}, got {}",
            self.dtype.name()
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn descr_parsing() {
        assert_eq!(ArrayDtype::from_descr("<f8").unwrap(), ArrayDtype::F64);
        assert_eq!(
            ArrayDtype::from_descr("|u1").unwrap(),
            ArrayDtype::Uint(SymbolWidth::U8)
        );
        assert_eq!(
            ArrayDtype::from_descr(">u1").unwrap(),
            ArrayDtype::Uint(SymbolWidth::U8)
        );
        assert!(ArrayDtype::from_descr(">f8").is_err());
        assert!(ArrayDtype::from_descr("<i4").is_err());
        assert!(ArrayDtype::from_name("complex64").is_err());
    }

    #[test]
    fn shape_and_length_are_checked() {
        assert!(RawArray::new(ArrayDtype::F32, &[2], vec![0; 8]).is_ok());
        assert!(RawArray::new(ArrayDtype::F32, &[2], vec![0; 7]).is_err());
        assert!(RawArray::new(ArrayDtype::F32, &[1, 2], vec![0; 8]).is_err());
        assert!(RawArray::new(ArrayDtype::F32, &[], vec![0; 4]).is_err());
    }

    #[test]
    fn wide_symbols_narrow_on_read() {
        let raw = RawArray::from_symbols(&SymbolArray::U64(vec![1, 2, 255]));
        let symbols = raw.into_symbols(256).unwrap();
        assert_eq!(symbols, SymbolArray::U8(vec![1, 2, 255]));
    }

    #[test]
    fn phases_keep_their_width() {
        let raw = RawArray::from_phases(&PhaseArray::Narrow(vec![0.5, 1.5]));
        assert_eq!(raw.dtype, ArrayDtype::F32);
        assert_eq!(
            raw.into_phases().unwrap(),
            PhaseArray::Narrow(vec![0.5, 1.5])
        );
        let raw = RawArray::from_f64s(&[1.0]);
        assert!(raw.clone().into_symbols(4).is_err());
        assert_eq!(raw.into_f64s().unwrap(), vec![1.0]);
    }
}
