// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! NumPy `.npy` flat array entries.
//!
//! Writes format v1.0; reads v1.0, v2.0 and v3.0. Only 1-D little-endian
//! arrays of the dtypes in [`ArrayDtype`] are accepted.

use crate::error::PifError;

use super::array::{ArrayDtype, RawArray};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGN: usize = 64;

/// Serialize `array` as a v1.0 `.npy` file.
pub(crate) fn write(array: &RawArray) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({},), }}",
        array.dtype.descr(),
        array.len
    );
    // magic + version + u16 length, then the dict padded so data starts aligned.
    let preamble = MAGIC.len() + 2 + 2;
    let unpadded = preamble + dict.len() + 1;
    let padding = (ALIGN - unpadded % ALIGN) % ALIGN;
    let header_len = dict.len() + padding + 1;

    let mut writer = Writer::with_capacity(preamble + header_len + array.bytes.len());
    writer.write_bytes(MAGIC);
    writer.write_bytes(&[1, 0]);
    writer.write_u16_le(header_len as u16);
    writer.write_bytes(dict.as_bytes());
    writer.write_bytes(&vec![b' '; padding]);
    writer.write_bytes(b"\n");
    writer.write_bytes(&array.bytes);
    writer.into_vec()
}

/// Parse a `.npy` file into a [`RawArray`].
pub(crate) fn read(bytes: &[u8]) -> Result<RawArray, PifError> {
    let mut reader = Reader::new(bytes);
    if reader.take(MAGIC.len())? != MAGIC {
        return Err(PifError::Serialization("not an npy file (bad magic)".into()));
    }
    let major = reader.read_u8()?;
    let _minor = reader.read_u8()?;
    let header_len = match major {
        1 => usize::from(reader.read_u16_le()?),
        2 | 3 => reader.read_u32_le()? as usize,
        other => {
            return Err(PifError::Serialization(format!(
                "unsupported npy version {other}"
            )))
        }
    };
    let header = std::str::from_utf8(reader.take(header_len)?)
        .map_err(|_| PifError::Serialization("npy header is not UTF-8".into()))?;
    let header = Header::parse(header)?;
    if header.fortran_order && header.shape.len() > 1 {
        return Err(PifError::Serialization(
            "fortran-ordered npy arrays are not supported".into(),
        ));
    }
    RawArray::new(header.dtype, &header.shape, reader.rest().to_vec())
}

#[derive(Debug)]
struct Header {
    dtype: ArrayDtype,
    fortran_order: bool,
    shape: Vec<u64>,
}

impl Header {
    /// Parse the Python dict literal numpy writes (`{'descr': …, 'shape': (…), }`).
    fn parse(text: &str) -> Result<Self, PifError> {
        let bad = |what: &str| PifError::Serialization(format!("npy header: {what}"));

        let descr = value_after(text, "descr").ok_or_else(|| bad("missing descr"))?;
        let descr = descr
            .strip_prefix(['\'', '"'])
            .and_then(|s| s.split(['\'', '"']).next())
            .ok_or_else(|| bad("descr is not a string"))?;

        let order = value_after(text, "fortran_order").ok_or_else(|| bad("missing fortran_order"))?;
        let fortran_order = if order.starts_with("True") {
            true
        } else if order.starts_with("False") {
            false
        } else {
            return Err(bad("fortran_order is not a bool"));
        };

        let shape = value_after(text, "shape").ok_or_else(|| bad("missing shape"))?;
        let inner = shape
            .strip_prefix('(')
            .and_then(|s| s.split(')').next())
            .ok_or_else(|| bad("shape is not a tuple"))?;
        let shape = inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('L').parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| bad("shape has a non-integer dimension"))?;

        Ok(Self {
            dtype: ArrayDtype::from_descr(descr)?,
            fortran_order,
            shape,
        })
    }
}

/// Text following `'key':` with leading whitespace removed.
fn value_after<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let start = quoted
        .iter()
        .find_map(|q| text.find(q.as_str()).map(|i| i + q.len()))?;
    let rest = text[start..].trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

#[derive(Debug, Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn write_u16_le(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], PifError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| PifError::Serialization("npy file truncated".into()))?;
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, PifError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16_le(&mut self) -> Result<u16, PifError> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(raw))
    }

    fn read_u32_le(&mut self) -> Result<u32, PifError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::symbols::SymbolWidth;

    #[test]
    fn header_is_aligned_and_numpy_shaped() {
        let array = RawArray::from_f64s(&[0.0, 1.5, 3.0]);
        let bytes = write(&array);
        assert_eq!(&bytes[..8], b"\x93NUMPY\x01\x00");
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (3,), }"));
        assert!(header.ends_with('\n'));
        assert_eq!(read(&bytes).unwrap(), array);
    }

    #[test]
    fn reads_version_two_headers() {
        let dict = "{'descr': '<u2', 'fortran_order': False, 'shape': (2,), }\n";
        let mut bytes = b"\x93NUMPY\x02\x00".to_vec();
        bytes.extend_from_slice(&(dict.len() as u32).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        bytes.extend_from_slice(&[1, 0, 2, 0]);
        let array = read(&bytes).unwrap();
        assert_eq!(array.dtype, ArrayDtype::Uint(SymbolWidth::U16));
        assert_eq!(array.len, 2);
    }

    #[test]
    fn rejects_malformed_files() {
        assert!(read(b"NUMPY").is_err());
        let good = write(&RawArray::from_f64s(&[1.0, 2.0]));
        assert!(read(&good[..good.len() - 1]).is_err());
        assert!(read(&good[..20]).is_err());

        let dict = "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 1), }\n";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        bytes.extend_from_slice(&[0; 8]);
        assert!(read(&bytes).is_err());
    }

    #[test]
    fn parses_header_variants() {
        let h = Header::parse("{\"descr\": \"|u1\", \"fortran_order\": True, \"shape\": (4,)}")
            .unwrap();
        assert_eq!(h.dtype, ArrayDtype::Uint(SymbolWidth::U8));
        assert!(h.fortran_order);
        assert_eq!(h.shape, vec![4]);
        assert!(Header::parse("{'descr': '<f8', 'shape': (4,)}").is_err());
    }
}
