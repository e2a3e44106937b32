use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use molecule_hygiene::*;

/// Generate conformers for every molecule listed in a spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "conf-gen", version)]
struct Args {
    /// Path to the source XLS/XLSX (or CSV) file.
    #[arg(long)]
    excel: PathBuf,

    /// Worksheet to read; the first sheet by default.
    #[arg(long)]
    sheet: Option<String>,

    /// How many conformers to generate per molecule.
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u32).range(1..))]
    num_confs: u32,

    /// "auto" tries MMFF94, then UFF, then MMFF94s. Use "none" to skip minimization.
    #[arg(long, value_enum, ignore_case = true, default_value = "auto")]
    min_method: MinMethod,

    /// Write all unique conformers to a single SDF instead of separate ones.
    #[arg(long)]
    write_multi: bool,

    /// Directory the per-molecule directories are created in.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Python interpreter with RDKit installed.
    #[arg(long, env = "MOLECULE_HYGIENE_PYTHON", default_value = "python3")]
    python: PathBuf,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let records = read_molecules(&args.excel, &SheetOptions { sheet: args.sheet.clone() })
        .with_context(|| format!("Failed to load molecules from {}", args.excel.display()))?;

    let mut toolkit = PythonToolkit::spawn(&PythonConfig {
        program: args.python.clone(),
        forward_stderr: matches!(args.log_level.as_str(), "debug" | "trace"),
    })
    .context("Failed to start the chemistry toolkit")?;

    let options = ConformerOptions {
        num_confs: args.num_confs,
        min_method: args.min_method,
        write_multi: args.write_multi,
        output_root: args.output_dir.clone(),
    };

    let progress = ProgressBar::new(records.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{msg}: {percent:>3}%|{wide_bar}| {pos}/{len} [{elapsed_precise}<{eta_precise}]")
            .context("Invalid progress bar template")?,
    );
    progress.set_message("Generating conformers");

    let summary = run_batch(&records, &mut toolkit, &options, &progress);
    print!("{summary}");
    Ok(())
}
