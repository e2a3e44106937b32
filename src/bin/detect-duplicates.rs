use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use molecule_hygiene::*;

/// Detect duplicate canonical SMILES in a spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "detect-duplicates", version)]
struct Args {
    /// Path to the source XLS/XLSX (or CSV) file.
    #[arg(long)]
    excel: PathBuf,

    /// Worksheet to read; the first sheet by default.
    #[arg(long)]
    sheet: Option<String>,

    /// Where to save the duplicate groups.
    #[arg(long, default_value = "duplicates.csv")]
    output: PathBuf,

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

    let scan = find_duplicates(&records, &mut toolkit).context("Chemistry toolkit stopped responding")?;
    report_duplicates(&scan.groups, &args.output, &mut io::stdout().lock())?;
    Ok(())
}
