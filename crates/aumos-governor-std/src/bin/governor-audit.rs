// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Audit chain verification CLI.
//!
//! ```bash
//! governor-audit verify /var/lib/aumos/governor-audit.jsonl
//! ```
//!
//! Exit codes: `0` valid chain, `1` invalid chain, `2` I/O error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use aumos_governor_std::JsonlAuditLog;

/// Tamper-evidence tooling for AumOS governor audit logs.
#[derive(Parser, Debug)]
#[command(name = "governor-audit", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute every entry hash and chain link in an audit file.
    Verify {
        /// Path to the JSONL audit chain.
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Command::Verify { path } => match JsonlAuditLog::verify_file(&path) {
            Ok(check) if check.valid => {
                println!("chain verified: OK ({})", path.display());
                ExitCode::SUCCESS
            }
            Ok(check) => {
                eprintln!(
                    "chain verification FAILED at seq {}: {}",
                    check.error_seq.unwrap_or(0),
                    check.error.as_deref().unwrap_or("unknown mismatch")
                );
                ExitCode::from(1)
            }
            Err(error) => {
                eprintln!("I/O error reading {}: {error}", path.display());
                ExitCode::from(2)
            }
        },
    }
}
