// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Subcommand implementations.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use phasebridge::integrity::check_reference;
use phasebridge::validate::check;
use phasebridge::wire::{self, Format};
use phasebridge::{
    decode as decode_pif, kappa as kappa_of, kappa_windowed, EncodeOptions, IntegrityStatus,
    PayloadMode, Pif, PolicyConfig, S1PhaseCodec, Schema,
};
use serde_json::json;
use tracing::info;

use crate::config::CliConfig;
use crate::raw::{self, is_stdio};
use crate::report::{Checks, MetaSummary, ValidateReport};
use crate::{
    ConvertArgs, DecodeArgs, EncodeArgs, KappaArgs, KappaFormat, ReportFormat, Status,
    ValidateArgs,
};

/// Explicit name, then the path's extension, then `fallback`.
fn pick_format(explicit: Option<&str>, path: &Path, fallback: Option<Format>) -> Result<Format> {
    if let Some(name) = explicit {
        return Ok(name.parse()?);
    }
    if !is_stdio(path) {
        if let Ok(format) = Format::for_path(path) {
            return Ok(format);
        }
    }
    Ok(fallback.unwrap_or(Format::Json))
}

fn load_pif(path: &Path, explicit: Option<&str>) -> Result<Pif> {
    load_pif_with(path, explicit, true)
}

fn load_pif_with(path: &Path, explicit: Option<&str>, validate: bool) -> Result<Pif> {
    let format = pick_format(explicit, path, None)?;
    let bytes = raw::read_input(path)?;
    Pif::from_bytes(&bytes, format, validate)
        .with_context(|| format!("loading {} as {format}", path.display()))
}

fn store_pif(
    p: &Pif,
    path: &Path,
    format: Format,
    pretty: bool,
    out: &mut dyn Write,
) -> Result<()> {
    if is_stdio(path) {
        let bytes = match (format, pretty) {
            (Format::Json, true) => p.to_text_pretty()?.into_bytes(),
            _ => p.to_bytes(format)?,
        };
        return raw::write_output(path, &bytes, out);
    }
    if format == Format::Json && pretty {
        return wire::write_atomic(path, p.to_text_pretty()?.as_bytes())
            .with_context(|| format!("writing {}", path.display()));
    }
    wire::write_file(p, path, format).with_context(|| format!("writing {}", path.display()))
}

/// `pb encode`.
pub fn encode(args: &EncodeArgs, config: &CliConfig, out: &mut dyn Write) -> Result<Status> {
    let bytes = raw::read_input(&args.input)?;
    let symbols = raw::parse(&bytes, args.in_fmt, args.dtype)?;

    let mut schema = Schema::uint(args.m);
    if let Some(fs) = args.fs {
        schema = schema.with_sampling_rate(fs);
    }
    let policy = if args.narrow || args.no_downgrade {
        PolicyConfig {
            prefer_narrow: true,
            allow_downgrade: !args.no_downgrade,
        }
    } else {
        config.policy
    };
    let opts = EncodeOptions {
        mode: if args.lazy { PayloadMode::Lazy } else { config.mode },
        policy,
        domain: args.domain.clone(),
        hash_algorithm: config.hash_algorithm,
    };

    let codec = S1PhaseCodec::new(args.m)?.with_strict_range(!args.wrap);
    let pif = codec.encode_array(&symbols, &schema, &opts)?;
    let format = pick_format(args.format.as_deref(), &args.out, config.default_format())?;
    store_pif(&pif, &args.out, format, args.pretty, out)?;
    info!(
        n = pif.len(),
        m = args.m,
        %format,
        mode = %opts.mode,
        dtype = %pif.dtype(),
        "encoded {} -> {}",
        args.input.display(),
        args.out.display()
    );
    Ok(Status::Ok)
}

/// `pb decode`.
pub fn decode(args: &DecodeArgs, _config: &CliConfig, out: &mut dyn Write) -> Result<Status> {
    let pif = load_pif(&args.input, args.format.as_deref())?;
    let decoded = decode_pif(&pif)?;
    let symbols = if args.no_verify {
        decoded.symbols
    } else {
        decoded
            .into_verified()
            .context("hash_raw does not match; rerun with --no-verify to keep the output")?
    };
    let bytes = raw::render(&symbols, args.out_fmt, args.dtype)?;
    raw::write_output(&args.out, &bytes, out)?;
    info!(n = symbols.len(), m = pif.m(), "decoded {}", args.input.display());
    Ok(Status::Ok)
}

/// `pb validate`.
pub fn validate(args: &ValidateArgs, _config: &CliConfig, out: &mut dyn Write) -> Result<Status> {
    let report = match build_report(args) {
        Ok(report) => report,
        Err(err) => ValidateReport::failed(format!("{err:#}")),
    };
    match args.report {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        ReportFormat::Text => writeln!(out, "{}", report.to_table())?,
    }
    Ok(if report.ok { Status::Ok } else { Status::Invalid })
}

fn build_report(args: &ValidateArgs) -> Result<ValidateReport> {
    let pif = load_pif_with(&args.input, args.format.as_deref(), false)?;
    let violations = check(&pif);
    let decoded = if violations.is_ok() {
        Some(decode_pif(&pif)?)
    } else {
        None
    };
    let hash_match = decoded
        .as_ref()
        .is_some_and(|d| !matches!(d.integrity, IntegrityStatus::Mismatch(_)));

    let (raw_match, raw_hash_match) = match &args.raw {
        None => (None, None),
        Some(path) => {
            let bytes = raw::read_input(path)?;
            let reference = raw::parse(&bytes, args.in_fmt, args.dtype)?.to_u64_vec();
            let same = decoded
                .as_ref()
                .is_some_and(|d| d.symbols.to_u64_vec() == reference);
            let hashed = pif
                .meta()
                .hash_raw
                .map(|expected| check_reference(&expected, &reference, pif.m()).is_ok());
            (Some(same), hashed)
        }
    };

    let checks = Checks {
        schema_runtime_ok: violations.is_ok(),
        decode_ok: decoded.is_some(),
        hash_match,
        raw_match,
        raw_hash_match,
        note: pif.meta().note.to_string(),
        violations: violations.violations().iter().map(ToString::to_string).collect(),
    };
    Ok(ValidateReport::new(
        pif.m(),
        pif.len(),
        checks,
        MetaSummary::from(pif.meta()),
    ))
}

/// `pb convert`.
pub fn convert(args: &ConvertArgs, _config: &CliConfig) -> Result<Status> {
    let pif = load_pif(&args.input, args.from.as_deref())?;
    let to = match args.to.as_deref() {
        Some(name) => name.parse()?,
        None => Format::for_path(&args.out)?,
    };
    let mut sink = std::io::sink();
    store_pif(&pif, &args.out, to, args.pretty, &mut sink)?;
    info!(%to, "converted {} -> {}", args.input.display(), args.out.display());
    Ok(Status::Ok)
}

/// `pb kappa`.
pub fn kappa(args: &KappaArgs, _config: &CliConfig, out: &mut dyn Write) -> Result<Status> {
    let pif = load_pif(&args.input, args.format.as_deref())?;
    match (args.win, args.hop) {
        (Some(win), Some(hop)) => {
            let windows = kappa_windowed(&pif, win, hop, args.weighted)?;
            if args.fmt == KappaFormat::Json {
                let doc = json!({"centers": windows.centers, "kappa": windows.kappas});
                writeln!(out, "{doc}")?;
            } else {
                writeln!(out, "center,kappa")?;
                for (center, k) in windows.centers.iter().zip(&windows.kappas) {
                    writeln!(out, "{center},{k:.12}")?;
                }
            }
        }
        _ => {
            let k = kappa_of(&pif, args.weighted)?;
            match args.fmt {
                KappaFormat::Plain => writeln!(out, "{k:.12}")?,
                KappaFormat::Json => writeln!(out, "{}", json!({"kappa": k}))?,
                KappaFormat::Csv => writeln!(out, "kappa\n{k:.12}")?,
            }
        }
    }
    Ok(Status::Ok)
}
