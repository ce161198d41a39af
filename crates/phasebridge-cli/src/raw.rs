// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Raw integer arrays on disk: packed little-endian binary or CSV text.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use phasebridge::{SymbolArray, SymbolWidth};

/// Element type of a raw array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RawDtype {
    /// Unsigned 8-bit.
    #[default]
    #[value(alias = "uint8")]
    U8,
    /// Unsigned 16-bit.
    #[value(alias = "uint16")]
    U16,
    /// Unsigned 32-bit.
    #[value(alias = "uint32")]
    U32,
    /// Unsigned 64-bit.
    #[value(alias = "uint64")]
    U64,
}

impl RawDtype {
    /// Matching symbol width.
    pub fn width(self) -> SymbolWidth {
        match self {
            Self::U8 => SymbolWidth::U8,
            Self::U16 => SymbolWidth::U16,
            Self::U32 => SymbolWidth::U32,
            Self::U64 => SymbolWidth::U64,
        }
    }
}

/// On-disk layout of a raw array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RawFormat {
    /// Packed little-endian elements, no header.
    #[default]
    Bin,
    /// Decimal integers separated by commas or whitespace.
    Csv,
}

/// Parse raw `bytes` as `dtype` elements.
pub fn parse(bytes: &[u8], format: RawFormat, dtype: RawDtype) -> Result<SymbolArray> {
    match format {
        RawFormat::Bin => Ok(SymbolArray::from_le_bytes(bytes, dtype.width())?),
        RawFormat::Csv => {
            let text = std::str::from_utf8(bytes).context("CSV input is not UTF-8")?;
            let max = dtype.width().max_value();
            let mut values = Vec::new();
            for (index, field) in text
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .enumerate()
            {
                let value: u64 = field
                    .parse()
                    .with_context(|| format!("CSV field {index} ({field:?}) is not an unsigned integer"))?;
                if value > max {
                    bail!("CSV field {index} = {value} does not fit {dtype:?}");
                }
                values.push(value);
            }
            Ok(SymbolArray::collect_with_width(dtype.width(), values)?)
        }
    }
}

/// Render `symbols` in `format`, at `dtype` or their own width.
pub fn render(symbols: &SymbolArray, format: RawFormat, dtype: Option<RawDtype>) -> Result<Vec<u8>> {
    match format {
        RawFormat::Bin => match dtype {
            None => Ok(symbols.to_le_bytes()),
            Some(dtype) => {
                let resized = SymbolArray::collect_with_width(dtype.width(), symbols.iter())
                    .with_context(|| format!("decoded symbols do not fit {dtype:?}"))?;
                Ok(resized.to_le_bytes())
            }
        },
        RawFormat::Csv => {
            let mut text = symbols
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            text.push('\n');
            Ok(text.into_bytes())
        }
    }
}

/// Read a whole file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    if is_stdio(path) {
        let mut buf = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Write `bytes` to a file, or to `out` for `-`.
pub fn write_output(path: &Path, bytes: &[u8], out: &mut dyn Write) -> Result<()> {
    if is_stdio(path) {
        out.write_all(bytes).context("writing stdout")?;
        out.flush().context("writing stdout")
    } else {
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }
}

/// `-` (or an empty path) names stdin/stdout.
pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str().is_empty() || path.as_os_str() == "-"
}
