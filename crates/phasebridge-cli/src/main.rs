// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `pb` entry point.
//!
//! Exit codes: `0` success, `1` a validation report that is not ok, `2` any
//! other error.
// The CLI is expected to print to stderr.
#![allow(clippy::print_stderr)]

use std::process::ExitCode;

use clap::Parser;
use phasebridge_cli::{init_tracing, run, Cli, Status};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("pb: {err:#}");
        return ExitCode::from(2);
    }
    let mut stdout = std::io::stdout().lock();
    match run(cli, &mut stdout) {
        Ok(Status::Ok) => ExitCode::SUCCESS,
        Ok(Status::Invalid) => ExitCode::from(1),
        Err(err) => {
            eprintln!("pb: {err:#}");
            ExitCode::from(2)
        }
    }
}
