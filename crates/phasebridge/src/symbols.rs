// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Discrete symbol arrays stored at a fixed unsigned width.
//!
//! The canonical width for an alphabet of size `M` is the smallest of
//! 8/16/32/64 bits covering `[0, M-1]`: `M ≤ 256 → u8`, `M ≤ 65536 → u16`,
//! `M ≤ 2^32 → u32`, otherwise `u64`.

use crate::error::PifError;

/// Unsigned integer types accepted as discrete input.
pub trait UnsignedSymbol: Copy + Into<u64> {}

impl UnsignedSymbol for u8 {}
impl UnsignedSymbol for u16 {}
impl UnsignedSymbol for u32 {}
impl UnsignedSymbol for u64 {}

/// Element width of a [`SymbolArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolWidth {
    /// 8-bit.
    U8,
    /// 16-bit.
    U16,
    /// 32-bit.
    U32,
    /// 64-bit.
    U64,
}

impl SymbolWidth {
    /// Minimal width covering `[0, m-1]`.
    pub fn for_alphabet(m: u64) -> Self {
        if m <= 1 << 8 {
            Self::U8
        } else if m <= 1 << 16 {
            Self::U16
        } else if m <= 1 << 32 {
            Self::U32
        } else {
            Self::U64
        }
    }

    /// Bytes per element.
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Largest representable value.
    pub fn max_value(self) -> u64 {
        match self {
            Self::U8 => u64::from(u8::MAX),
            Self::U16 => u64::from(u16::MAX),
            Self::U32 => u64::from(u32::MAX),
            Self::U64 => u64::MAX,
        }
    }

    /// NumPy dtype name (`"uint8"` …).
    pub fn dtype_name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
        }
    }

    /// Parse a NumPy dtype name.
    pub fn from_dtype_name(name: &str) -> Option<Self> {
        match name {
            "uint8" => Some(Self::U8),
            "uint16" => Some(Self::U16),
            "uint32" => Some(Self::U32),
            "uint64" => Some(Self::U64),
            _ => None,
        }
    }
}

/// An ordered sequence of discrete symbols at a fixed width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolArray {
    /// 8-bit symbols.
    U8(Vec<u8>),
    /// 16-bit symbols.
    U16(Vec<u16>),
    /// 32-bit symbols.
    U32(Vec<u32>),
    /// 64-bit symbols.
    U64(Vec<u64>),
}

impl SymbolArray {
    /// Number of symbols.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
        }
    }

    /// Returns `true` if there are no symbols.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage width.
    pub fn width(&self) -> SymbolWidth {
        match self {
            Self::U8(_) => SymbolWidth::U8,
            Self::U16(_) => SymbolWidth::U16,
            Self::U32(_) => SymbolWidth::U32,
            Self::U64(_) => SymbolWidth::U64,
        }
    }

    /// Symbol at `index`, widened to `u64`.
    pub fn get(&self, index: usize) -> Option<u64> {
        match self {
            Self::U8(v) => v.get(index).copied().map(u64::from),
            Self::U16(v) => v.get(index).copied().map(u64::from),
            Self::U32(v) => v.get(index).copied().map(u64::from),
            Self::U64(v) => v.get(index).copied(),
        }
    }

    /// Iterate symbols widened to `u64`.
    pub fn iter(&self) -> SymbolIter<'_> {
        SymbolIter {
            array: self,
            index: 0,
        }
    }

    /// Copy out as `u64` values.
    pub fn to_u64_vec(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// Collect `values` at `width`, failing with [`PifError::Range`] on overflow.
    pub fn collect_with_width<I>(width: SymbolWidth, values: I) -> Result<Self, PifError>
    where
        I: IntoIterator<Item = u64>,
    {
        fn narrow<T: TryFrom<u64>>(
            values: impl IntoIterator<Item = u64>,
            max: u64,
        ) -> Result<Vec<T>, PifError> {
            values
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    T::try_from(value).map_err(|_| PifError::Range { index, value, max })
                })
                .collect()
        }

        let max = width.max_value();
        Ok(match width {
            SymbolWidth::U8 => Self::U8(narrow(values, max)?),
            SymbolWidth::U16 => Self::U16(narrow(values, max)?),
            SymbolWidth::U32 => Self::U32(narrow(values, max)?),
            SymbolWidth::U64 => Self::U64(values.into_iter().collect()),
        })
    }

    /// Pack `values` at the canonical width for alphabet `m`.
    ///
    /// Values that do not fit the canonical width are kept at `u64` unchanged so
    /// the validator can report them; nothing is truncated.
    pub fn for_alphabet(values: Vec<u64>, m: u64) -> Self {
        let width = SymbolWidth::for_alphabet(m);
        if values.iter().all(|&v| v <= width.max_value()) {
            Self::collect_with_width(width, values.iter().copied()).unwrap_or(Self::U64(values))
        } else {
            Self::U64(values)
        }
    }

    /// Re-pack at the canonical width for alphabet `m` when every value fits.
    pub fn into_canonical(self, m: u64) -> Self {
        if self.width() == SymbolWidth::for_alphabet(m) {
            self
        } else {
            Self::for_alphabet(self.to_u64_vec(), m)
        }
    }

    /// Decode little-endian bytes at `width`.
    pub fn from_le_bytes(bytes: &[u8], width: SymbolWidth) -> Result<Self, PifError> {
        if bytes.len() % width.bytes() != 0 {
            return Err(PifError::Serialization(format!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                width.dtype_name()
            )));
        }
        Ok(match width {
            SymbolWidth::U8 => Self::U8(bytes.to_vec()),
            SymbolWidth::U16 => Self::U16(le_chunks(bytes, u16::from_le_bytes)),
            SymbolWidth::U32 => Self::U32(le_chunks(bytes, u32::from_le_bytes)),
            SymbolWidth::U64 => Self::U64(le_chunks(bytes, u64::from_le_bytes)),
        })
    }

    /// Raw little-endian bytes at the current width.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::U8(v) => v.clone(),
            Self::U16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::U64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

impl<T: UnsignedSymbol> From<&[T]> for SymbolArray {
    fn from(values: &[T]) -> Self {
        Self::U64(values.iter().map(|&v| v.into()).collect())
    }
}

impl<'a> IntoIterator for &'a SymbolArray {
    type Item = u64;
    type IntoIter = SymbolIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`SymbolArray`], yielding `u64`.
#[derive(Debug, Clone)]
pub struct SymbolIter<'a> {
    array: &'a SymbolArray,
    index: usize,
}

impl Iterator for SymbolIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let value = self.array.get(self.index)?;
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.array.len().saturating_sub(self.index);
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for SymbolIter<'_> {}

/// Split `bytes` into `W`-byte chunks and convert each one.
///
/// Trailing bytes that do not fill a chunk are ignored; callers check lengths.
pub(crate) fn le_chunks<const W: usize, T>(bytes: &[u8], convert: impl Fn([u8; W]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(W)
        .map(|chunk| {
            let mut raw = [0u8; W];
            raw.copy_from_slice(chunk);
            convert(raw)
        })
        .collect()
}

/// Canonical byte image of `values` at `width`: each value's low `width`
/// bytes, little-endian, concatenated.
pub(crate) fn canonical_bytes<I>(values: I, width: SymbolWidth) -> Vec<u8>
where
    I: IntoIterator<Item = u64>,
{
    let take = width.bytes();
    let values = values.into_iter();
    let mut out = Vec::with_capacity(values.size_hint().0 * take);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes()[..take]);
    }
    out
}
