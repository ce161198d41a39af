// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `pb validate` report.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use phasebridge::Meta;
use serde::Serialize;

/// Outcome of every check `pb validate` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checks {
    /// Container parsed and passed the full validator.
    pub schema_runtime_ok: bool,
    /// Symbols were reconstructed.
    pub decode_ok: bool,
    /// `hash_raw` matched the decoded symbols (true when none is recorded).
    pub hash_match: bool,
    /// Decoded symbols equal `--raw`; `None` without `--raw`.
    pub raw_match: Option<bool>,
    /// `hash_raw` matched `--raw`; `None` without `--raw` or without a hash.
    pub raw_hash_match: Option<bool>,
    /// `meta.note`.
    pub note: String,
    /// Every validator violation, empty when `schema_runtime_ok`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

/// Summary of the instance's `meta` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaSummary {
    /// `meta.hash_raw`.
    pub hash_raw: Option<String>,
    /// `meta.codec`.
    pub codec: Option<String>,
    /// `meta.codec_hash`.
    pub codec_hash: Option<String>,
    /// `meta.note`.
    pub note: String,
}

impl From<&Meta> for MetaSummary {
    fn from(meta: &Meta) -> Self {
        Self {
            hash_raw: meta.hash_raw.map(|h| h.to_string()),
            codec: meta.codec.clone(),
            codec_hash: meta.codec_hash.map(|h| h.to_string()),
            note: meta.note.to_string(),
        }
    }
}

/// The full report, serialized as-is for `--report json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidateReport {
    /// Every check passed.
    pub ok: bool,
    /// Alphabet size.
    #[serde(rename = "M", skip_serializing_if = "Option::is_none")]
    pub m: Option<u64>,
    /// Sample count.
    #[serde(rename = "N", skip_serializing_if = "Option::is_none")]
    pub n: Option<usize>,
    /// Why the container could not be checked at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Individual checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Checks>,
    /// Instance metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaSummary>,
}

impl ValidateReport {
    /// A report for an instance that passed validation and decoded.
    pub fn new(m: u64, n: usize, checks: Checks, meta: MetaSummary) -> Self {
        let ok = checks.schema_runtime_ok
            && checks.decode_ok
            && checks.hash_match
            && checks.raw_match != Some(false)
            && checks.raw_hash_match != Some(false);
        Self {
            ok,
            m: Some(m),
            n: Some(n),
            error: None,
            checks: Some(checks),
            meta: Some(meta),
        }
    }

    /// A report for a container that could not be loaded or decoded.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            m: None,
            n: None,
            error: Some(error.into()),
            checks: None,
            meta: None,
        }
    }

    /// Render as a two-column table.
    pub fn to_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL).set_header(vec!["check", "result"]);
        table.add_row(vec![Cell::new("ok"), Cell::new(self.ok)]);
        if let Some(error) = &self.error {
            table.add_row(vec![Cell::new("error"), Cell::new(error)]);
        }
        if let (Some(m), Some(n)) = (self.m, self.n) {
            table.add_row(vec![Cell::new("M"), Cell::new(m)]);
            table.add_row(vec![Cell::new("N"), Cell::new(n)]);
        }
        if let Some(checks) = &self.checks {
            let rows = [
                ("schema_runtime_ok", Some(checks.schema_runtime_ok)),
                ("decode_ok", Some(checks.decode_ok)),
                ("hash_match", Some(checks.hash_match)),
                ("raw_match", checks.raw_match),
                ("raw_hash_match", checks.raw_hash_match),
            ];
            for (name, value) in rows {
                let shown = value.map_or_else(|| "-".to_owned(), |v| v.to_string());
                table.add_row(vec![Cell::new(name), Cell::new(shown)]);
            }
            table.add_row(vec![Cell::new("note"), Cell::new(&checks.note)]);
            for violation in &checks.violations {
                table.add_row(vec![Cell::new("violation"), Cell::new(violation)]);
            }
        }
        if let Some(meta) = &self.meta {
            for (name, value) in [
                ("hash_raw", &meta.hash_raw),
                ("codec", &meta.codec),
                ("codec_hash", &meta.codec_hash),
            ] {
                if let Some(value) = value {
                    table.add_row(vec![Cell::new(name), Cell::new(value)]);
                }
            }
        }
        table.to_string()
    }
}
