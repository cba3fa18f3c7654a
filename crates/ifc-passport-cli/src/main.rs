// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Passport patcher CLI
//!
//! Usage:
//!   ifc-passport-patch --ifc model.ifc --mapping mapping.csv \
//!       [--passport-dir dpps/] [--out patched.ifc] [--mode values_and_refs]

use clap::{Parser, ValueEnum};
use ifc_passport_patch::{run, PatchMode, PatchOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ifc-passport-patch",
    version,
    about = "Idempotently patch an IFC model with product-passport metadata"
)]
struct Cli {
    /// Path to the IFC file to patch
    #[arg(long)]
    ifc: PathBuf,

    /// CSV with component-scoped property values
    #[arg(long)]
    mapping: PathBuf,

    /// Folder with DPP JSON-LD files for class URIs and document links
    #[arg(long)]
    passport_dir: Option<PathBuf>,

    /// Output IFC file. Default: adds _patched before the extension
    #[arg(long)]
    out: Option<PathBuf>,

    /// What to write into the model
    #[arg(long, value_enum, default_value_t = Mode::ValuesAndRefs)]
    mode: Mode,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Property values plus document and classification references
    #[value(name = "values_and_refs")]
    ValuesAndRefs,
    /// References only; property sets are created without values
    #[value(name = "refs_only")]
    RefsOnly,
}

impl From<Mode> for PatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::ValuesAndRefs => PatchMode::ValuesAndRefs,
            Mode::RefsOnly => PatchMode::RefsOnly,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let max_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .init();

    let options = PatchOptions {
        mode: cli.mode.into(),
        output: cli.out,
    };
    match run(&cli.ifc, &cli.mapping, cli.passport_dir.as_deref(), &options) {
        Ok(outcome) => {
            println!(
                "Wrote {} ({} entities, {} new; {} rows applied, {} skipped)",
                outcome.output.display(),
                outcome.entities_after,
                outcome.entities_after - outcome.entities_before,
                outcome.stats.rows_applied,
                outcome.stats.rows_skipped,
            );
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
