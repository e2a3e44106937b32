//! Console summaries and the duplicates CSV.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::Writer;
use thiserror::Error;
use tracing::*;

use crate::{ConformerResult, DuplicateGroup};

pub const DUPLICATES_HEADER: [&str; 2] = ["Canonical SMILES", "Molecule IDs"];

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write {}: {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to write report: {0}")]
    Console(#[from] io::Error),
}

/// Successes and failures of a conformer batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub successes: Vec<String>,
    /// Failing molecule ids with the error text captured for each.
    pub failures: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: &ConformerResult) {
        match result.error_message() {
            None => self.successes.push(result.id.clone()),
            Some(error) => self.failures.push((result.id.clone(), error.to_string())),
        }
    }
}

impl Display for BatchSummary {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        writeln!(f, "\n✅ Finished!")?;
        writeln!(f, "   Successful molecules: {} / {}", self.successes.len(), self.total)?;
        if !self.failures.is_empty() {
            writeln!(f, "   ❌ Failures:")?;
            for (id, error) in &self.failures {
                writeln!(f, "     - {}: {}", id, error)?;
            }
        }
        Ok(())
    }
}

/// Writes one row per group: the canonical SMILES and its member ids joined
/// with ", ".
pub fn write_duplicates_csv<W: Write>(writer: W, groups: &[DuplicateGroup]) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(DUPLICATES_HEADER)?;
    for group in groups {
        wtr.write_record([group.canonical_smiles.as_str(), group.member_ids.join(", ").as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Prints the duplicate summary and, when there is at least one group, saves
/// the groups to `csv_path`.
///
/// # Returns
///
/// * `Result<Option<PathBuf>, ReportError>` - The CSV written, or `None` when
///   nothing was duplicated and no file was created.
pub fn report_duplicates<W: Write>(
    groups: &[DuplicateGroup],
    csv_path: &Path,
    console: &mut W,
) -> Result<Option<PathBuf>, ReportError> {
    if groups.is_empty() {
        writeln!(console, "\n✅ No duplicate SMILES found.")?;
        return Ok(None);
    }

    writeln!(console, "\n🔍 Found {} duplicate canonical SMILES entries.", groups.len())?;
    let csv_error = |source| ReportError::Csv {
        path: csv_path.to_path_buf(),
        source,
    };
    let file = File::create(csv_path).map_err(|err| csv_error(csv::Error::from(err)))?;
    write_duplicates_csv(file, groups).map_err(csv_error)?;
    info!("Wrote {} duplicate groups to {}", groups.len(), csv_path.display());
    writeln!(console, "🧬 Duplicate entries saved to {}", csv_path.display())?;
    Ok(Some(csv_path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConformerOutcome;
    use std::fs;

    fn group(canonical: &str, ids: &[&str]) -> DuplicateGroup {
        DuplicateGroup {
            canonical_smiles: canonical.to_string(),
            member_ids: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn test_summary_without_failures() {
        let mut summary = BatchSummary::new(1);
        summary.record(&ConformerResult {
            id: "M1".into(),
            outcome: ConformerOutcome::Generated {
                stats: Default::default(),
                stats_path: PathBuf::from("M1/M1_conformers.csv"),
            },
        });
        assert_eq!(summary.to_string(), "\n✅ Finished!\n   Successful molecules: 1 / 1\n");
    }

    #[test]
    fn test_summary_lists_failures_in_order() {
        let mut summary = BatchSummary::new(3);
        for (id, error) in [("M1", None), ("M2", Some("embedding failed")), ("M3", Some("bad SMILES"))] {
            let outcome = match error {
                None => ConformerOutcome::Generated {
                    stats: Default::default(),
                    stats_path: PathBuf::new(),
                },
                Some(error) => ConformerOutcome::Failed {
                    error: error.to_string(),
                },
            };
            summary.record(&ConformerResult { id: id.into(), outcome });
        }

        assert_eq!(
            summary.to_string(),
            concat!(
                "\n✅ Finished!\n",
                "   Successful molecules: 1 / 3\n",
                "   ❌ Failures:\n",
                "     - M2: embedding failed\n",
                "     - M3: bad SMILES\n",
            )
        );
    }

    #[test]
    fn test_duplicates_csv_layout() {
        let mut out = Vec::new();
        write_duplicates_csv(&mut out, &[group("CCO", &["A", "B"]), group("C1CC1", &["C", "D", "E"])]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Canonical SMILES,Molecule IDs\nCCO,\"A, B\"\nC1CC1,\"C, D, E\"\n"
        );
    }

    #[test]
    fn test_report_writes_csv_when_duplicates_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duplicates.csv");
        let mut console = Vec::new();

        let written = report_duplicates(&[group("CCO", &["A", "B"])], &path, &mut console).unwrap();

        assert_eq!(written, Some(path.clone()));
        assert!(fs::read_to_string(&path).unwrap().contains("CCO,\"A, B\""));
        let text = String::from_utf8(console).unwrap();
        assert!(text.contains("Found 1 duplicate canonical SMILES entries."), "{text}");
        assert!(text.contains("Duplicate entries saved to"), "{text}");
    }

    #[test]
    fn test_no_duplicates_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duplicates.csv");
        let mut console = Vec::new();

        let written = report_duplicates(&[], &path, &mut console).unwrap();

        assert_eq!(written, None);
        assert!(!path.exists());
        assert_eq!(String::from_utf8(console).unwrap(), "\n✅ No duplicate SMILES found.\n");
    }

    #[test]
    fn test_unwritable_csv_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("duplicates.csv");
        let result = report_duplicates(&[group("CCO", &["A", "B"])], &path, &mut Vec::new());
        assert!(matches!(result, Err(ReportError::Csv { .. })));
    }
}
