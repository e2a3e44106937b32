//! Loading molecule records from spreadsheets.
//!
//! Workbooks (`.xlsx`, `.xls`, `.ods`, ...) are read with calamine and plain
//! `.csv` files with the csv crate. In both cases the first row is the header
//! row and only the identifier and SMILES columns are kept.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::*;

use crate::MoleculeRecord;

mod columns;
pub use columns::*;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read CSV file {}: {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to read workbook {}: {}", .path.display(), .source)]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("Unsupported spreadsheet format for {} (expected .csv, .xlsx, .xlsm, .xlsb, .xls or .ods)", .path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Workbook {} has no worksheets", .path.display())]
    NoWorksheet { path: PathBuf },
    #[error("Worksheet '{}' not found; available sheets: {:?}", .name, .available)]
    SheetNotFound { name: String, available: Vec<String> },
    #[error("Spreadsheet {} has no header row", .path.display())]
    MissingHeader { path: PathBuf },
    #[error("No {} column found: expected a header starting with \"{}\", found {:?}", .role, .role.prefix(), .headers)]
    ColumnNotFound {
        role: ColumnRole,
        headers: Vec<String>,
    },
}

/// Options that control how a spreadsheet is read.
#[derive(Debug, Clone, Default)]
pub struct SheetOptions {
    /// Worksheet to read from a workbook. The first sheet when unset.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(SheetFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Some(SheetFormat::Workbook),
            _ => None,
        }
    }
}

/// Reads every molecule record from a spreadsheet, in row order.
///
/// Fails before returning any record if the file cannot be read or if either
/// required column is missing.
pub fn read_molecules(path: &Path, options: &SheetOptions) -> Result<Vec<MoleculeRecord>, LoadError> {
    let format = SheetFormat::detect(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let rows = match format {
        SheetFormat::Csv => {
            if let Some(sheet) = &options.sheet {
                warn!("Ignoring sheet '{}' for CSV input {}", sheet, path.display());
            }
            read_csv_rows(path)?
        }
        SheetFormat::Workbook => read_workbook_rows(path, options.sheet.as_deref())?,
    };

    let records = records_from_rows(rows).map_err(|err| match err {
        LoadError::MissingHeader { .. } => LoadError::MissingHeader {
            path: path.to_path_buf(),
        },
        other => other,
    })?;
    info!("Loaded {} molecules from {}", records.len(), path.display());
    Ok(records)
}

/// Turns a header row followed by data rows into molecule records.
///
/// Cells are trimmed; short rows read as empty cells. Rows whose cells are all
/// blank are dropped.
pub fn records_from_rows(rows: Vec<Vec<String>>) -> Result<Vec<MoleculeRecord>, LoadError> {
    let mut rows = rows.into_iter();
    let header = rows.next().ok_or_else(|| LoadError::MissingHeader {
        path: PathBuf::new(),
    })?;
    let columns = resolve_columns(&header)?;
    debug!(
        "Using '{}' as {} and '{}' as {}",
        columns.id_header,
        ColumnRole::Identifier.canonical_name(),
        columns.smiles_header,
        ColumnRole::Smiles.canonical_name()
    );

    let records = rows
        .filter(|row| row.iter().any(|value| !value.trim().is_empty()))
        .map(|row| MoleculeRecord::new(cell(&row, columns.id), cell(&row, columns.smiles)))
        .collect();
    Ok(records)
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>, LoadError> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_error)?;
        rows.push(record.iter().map(|value| value.to_string()).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<String>>, LoadError> {
    let workbook_error = |source| LoadError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let range = match sheet {
        Some(name) => {
            let available = workbook.sheet_names();
            if !available.iter().any(|sheet_name| sheet_name == name) {
                return Err(LoadError::SheetNotFound {
                    name: name.to_string(),
                    available,
                });
            }
            workbook.worksheet_range(name).map_err(workbook_error)?
        }
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::NoWorksheet {
                path: path.to_path_buf(),
            })?
            .map_err(workbook_error)?,
    };

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

/// Renders a workbook cell as text. Integral floats lose their fractional
/// part so numeric identifiers read the same as they display in the sheet.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", *value as i64)
        }
        other => other.to_string(),
    }
}
