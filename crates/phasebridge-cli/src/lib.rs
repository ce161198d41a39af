// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `pb`: command-line front end for the Phase Interchange Format.
//!
//! ```text
//! pb encode   --in data.bin --dtype u8 --M 256 --out data.pif.json
//! pb decode   --in data.pif.json --out back.bin
//! pb validate --in data.pif.json --raw data.bin --dtype u8
//! pb convert  --in data.pif.json --out data.cbor
//! pb kappa    --in data.pif.json --win 64 --hop 32
//! ```
//!
//! Paths may be `-` for stdin/stdout. The container format follows the file
//! extension unless `--format` (or `--from`/`--to`) names it. Log output goes
//! to stderr and honours `RUST_LOG`.

pub mod commands;
pub mod config;
pub mod raw;
pub mod report;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use raw::{RawDtype, RawFormat};

/// Top-level arguments.
#[derive(Parser, Debug)]
#[command(name = "pb", version, about = "Phase Interchange Format tools")]
pub struct Cli {
    /// Settings file (JSON). Defaults to the platform config dir.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Subcommand.
    #[command(subcommand)]
    pub command: Command,
}

/// `pb` subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a raw integer array into a PIF container.
    Encode(EncodeArgs),
    /// Decode a PIF container back into a raw integer array.
    Decode(DecodeArgs),
    /// Validate a PIF container, optionally against the raw source.
    Validate(ValidateArgs),
    /// Re-encode a PIF container in another format.
    Convert(ConvertArgs),
    /// Phase coherence of a PIF container, global or windowed.
    Kappa(KappaArgs),
}

/// Arguments for `pb encode`.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw input file, or `-` for stdin.
    #[arg(long = "in", default_value = "-")]
    pub input: PathBuf,
    /// Raw input layout.
    #[arg(long, value_enum, default_value_t = RawFormat::Bin)]
    pub in_fmt: RawFormat,
    /// Element type of the raw input.
    #[arg(long, value_enum, default_value_t = RawDtype::U8)]
    pub dtype: RawDtype,
    /// Alphabet size.
    #[arg(long = "M", default_value_t = 256)]
    pub m: u64,
    /// Sampling rate recorded in the schema.
    #[arg(long)]
    pub fs: Option<f64>,
    /// Store symbols instead of angles.
    #[arg(long)]
    pub lazy: bool,
    /// Prefer float32 angle storage.
    #[arg(long)]
    pub narrow: bool,
    /// Keep float32 even outside the safe zone (marks the result precision-unsafe).
    #[arg(long)]
    pub no_downgrade: bool,
    /// Reduce out-of-range symbols modulo M instead of failing.
    #[arg(long)]
    pub wrap: bool,
    /// Free-form domain tag.
    #[arg(long)]
    pub domain: Option<String>,
    /// Output container, or `-` for stdout.
    #[arg(long, default_value = "-")]
    pub out: PathBuf,
    /// Container format (default: from the extension, else config, else json).
    #[arg(long)]
    pub format: Option<String>,
    /// Indent JSON output.
    #[arg(long)]
    pub pretty: bool,
}

/// Arguments for `pb decode`.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// PIF container, or `-` for stdin.
    #[arg(long = "in", default_value = "-")]
    pub input: PathBuf,
    /// Container format of the input.
    #[arg(long)]
    pub format: Option<String>,
    /// Raw output file, or `-` for stdout.
    #[arg(long, default_value = "-")]
    pub out: PathBuf,
    /// Raw output layout.
    #[arg(long, value_enum, default_value_t = RawFormat::Bin)]
    pub out_fmt: RawFormat,
    /// Element type of the raw output (default: smallest that holds M-1).
    #[arg(long, value_enum)]
    pub dtype: Option<RawDtype>,
    /// Do not fail when `hash_raw` disagrees with the decoded symbols.
    #[arg(long)]
    pub no_verify: bool,
}

/// Report rendering for `pb validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Human-readable table.
    Text,
}

/// Arguments for `pb validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// PIF container, or `-` for stdin.
    #[arg(long = "in", default_value = "-")]
    pub input: PathBuf,
    /// Container format of the input.
    #[arg(long)]
    pub format: Option<String>,
    /// Raw source to compare the decoded symbols with.
    #[arg(long)]
    pub raw: Option<PathBuf>,
    /// Layout of `--raw`.
    #[arg(long, value_enum, default_value_t = RawFormat::Bin)]
    pub in_fmt: RawFormat,
    /// Element type of `--raw`.
    #[arg(long, value_enum, default_value_t = RawDtype::U8)]
    pub dtype: RawDtype,
    /// Report rendering.
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    pub report: ReportFormat,
}

/// Arguments for `pb convert`.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Source container.
    #[arg(long = "in")]
    pub input: PathBuf,
    /// Destination container.
    #[arg(long)]
    pub out: PathBuf,
    /// Source format (default: from the extension).
    #[arg(long)]
    pub from: Option<String>,
    /// Destination format (default: from the extension).
    #[arg(long)]
    pub to: Option<String>,
    /// Indent JSON output.
    #[arg(long)]
    pub pretty: bool,
}

/// Output layout for `pb kappa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KappaFormat {
    /// A bare number (global) or CSV (windowed).
    #[default]
    Plain,
    /// JSON object.
    Json,
    /// CSV with a header row.
    Csv,
}

/// Arguments for `pb kappa`.
#[derive(Args, Debug)]
pub struct KappaArgs {
    /// PIF container, or `-` for stdin.
    #[arg(long = "in", default_value = "-")]
    pub input: PathBuf,
    /// Container format of the input.
    #[arg(long)]
    pub format: Option<String>,
    /// Weight by the per-sample amplitude when present.
    #[arg(long)]
    pub weighted: bool,
    /// Window length in samples.
    #[arg(long, requires = "hop")]
    pub win: Option<usize>,
    /// Window advance in samples.
    #[arg(long, requires = "win")]
    pub hop: Option<usize>,
    /// Output layout.
    #[arg(long, value_enum, default_value_t = KappaFormat::Plain)]
    pub fmt: KappaFormat,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Everything checked out.
    Ok,
    /// `pb validate` produced a report that is not ok.
    Invalid,
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` picks the level (default `warn`).
pub fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}

/// Run one parsed command, writing results to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<Status> {
    let config = config::CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Encode(args) => commands::encode(&args, &config, out),
        Command::Decode(args) => commands::decode(&args, &config, out),
        Command::Validate(args) => commands::validate(&args, &config, out),
        Command::Convert(args) => commands::convert(&args, &config),
        Command::Kappa(args) => commands::kappa(&args, &config, out),
    }
}
