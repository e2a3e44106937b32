//! Batch conformer generation.
//!
//! Every molecule gets its own output directory under the output root. A
//! molecule that fails, for whatever reason, is recorded with its error text
//! and the batch moves on to the next one.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use indicatif::ProgressBar;
use thiserror::Error;
use tracing::*;

use crate::{BatchSummary, ConformerGenerator, ConformerRequest, ConformerTable, MinMethod, MoleculeRecord, ToolkitError};

#[derive(Error, Debug)]
pub enum ConformerError {
    #[error("Molecule identifier {0:?} cannot be used as a directory name")]
    UnsafeId(String),
    #[error("Failed to create output directory {}: {}", .path.display(), .source)]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Toolkit(#[from] ToolkitError),
    #[error("Failed to write conformer statistics to {}: {}", .path.display(), .source)]
    WriteStats {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Settings shared by every molecule in a batch.
#[derive(Debug, Clone)]
pub struct ConformerOptions {
    pub num_confs: u32,
    pub min_method: MinMethod,
    /// Combine all unique conformers into one structure file per molecule.
    pub write_multi: bool,
    /// Directory the per-molecule directories are created in.
    pub output_root: PathBuf,
}

impl Default for ConformerOptions {
    fn default() -> Self {
        Self {
            num_confs: 250,
            min_method: MinMethod::Auto,
            write_multi: false,
            output_root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConformerOutcome {
    Generated {
        stats: ConformerTable,
        stats_path: PathBuf,
    },
    Failed {
        error: String,
    },
}

/// What happened to one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformerResult {
    pub id: String,
    pub outcome: ConformerOutcome,
}

impl ConformerResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, ConformerOutcome::Generated { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ConformerOutcome::Failed { error } => Some(error),
            ConformerOutcome::Generated { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<&ConformerTable> {
        match &self.outcome {
            ConformerOutcome::Generated { stats, .. } => Some(stats),
            ConformerOutcome::Failed { .. } => None,
        }
    }
}

/// The directory a molecule's files go into, if its id is usable as one.
///
/// Ids that are empty, are `.` or `..`, or contain a path separator would
/// land outside the output root and are refused.
pub fn molecule_dir(output_root: &Path, id: &str) -> Result<PathBuf, ConformerError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(ConformerError::UnsafeId(id.to_string()));
    }
    Ok(output_root.join(id))
}

/// Path of the statistics CSV written next to a molecule's structure files.
pub fn stats_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}_conformers.csv"))
}

/// Generates conformers for one molecule and saves its statistics.
///
/// Never fails: any error is turned into a `ConformerOutcome::Failed`.
pub fn process_molecule<G>(generator: &mut G, record: &MoleculeRecord, options: &ConformerOptions) -> ConformerResult
where
    G: ConformerGenerator + ?Sized,
{
    let outcome = match try_process_molecule(generator, record, options) {
        Ok((stats, stats_path)) => {
            debug!("Generated {} conformers for {}", stats.len(), record.id);
            ConformerOutcome::Generated { stats, stats_path }
        }
        Err(err) => {
            debug!("Conformer generation failed for {}: {}", record, err);
            ConformerOutcome::Failed {
                error: err.to_string(),
            }
        }
    };
    ConformerResult {
        id: record.id.clone(),
        outcome,
    }
}

fn try_process_molecule<G>(
    generator: &mut G,
    record: &MoleculeRecord,
    options: &ConformerOptions,
) -> Result<(ConformerTable, PathBuf), ConformerError>
where
    G: ConformerGenerator + ?Sized,
{
    let dir = molecule_dir(&options.output_root, &record.id)?;
    // Existing directories from an earlier run are reused.
    fs::create_dir_all(&dir).map_err(|source| ConformerError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    let stats = generator.generate(&ConformerRequest {
        smiles: record.smiles.clone(),
        output_dir: dir.clone(),
        num_confs: options.num_confs,
        min_method: options.min_method,
        write_multi: options.write_multi,
    })?;

    let path = stats_path(&dir, &record.id);
    write_stats(&path, &stats).map_err(|source| ConformerError::WriteStats {
        path: path.clone(),
        source,
    })?;
    Ok((stats, path))
}

/// Writes a statistics table as CSV, header row first.
pub fn write_stats(path: &Path, stats: &ConformerTable) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    let mut wtr = Writer::from_writer(file);
    if !stats.columns.is_empty() {
        wtr.write_record(&stats.columns)?;
    }
    for row in &stats.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Runs every record through the generator, in order, one at a time.
///
/// The progress bar advances once per molecule whatever the outcome.
pub fn run_batch<G>(
    records: &[MoleculeRecord],
    generator: &mut G,
    options: &ConformerOptions,
    progress: &ProgressBar,
) -> BatchSummary
where
    G: ConformerGenerator + ?Sized,
{
    info!(
        "Generating up to {} conformers for {} molecules (minimization: {}, combined output: {})",
        options.num_confs,
        records.len(),
        options.min_method,
        options.write_multi
    );
    progress.set_length(records.len() as u64);

    let mut summary = BatchSummary::new(records.len());
    for record in records {
        let result = process_molecule(generator, record, options);
        summary.record(&result);
        progress.inc(1);
    }
    progress.finish();

    info!("{} of {} molecules succeeded", summary.successes.len(), summary.total);
    summary
}
