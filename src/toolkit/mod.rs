//! The chemistry capabilities the pipelines delegate to.
//!
//! Nothing in this crate parses SMILES or embeds conformers itself. The
//! pipelines talk to a [`Canonicalizer`] and a [`ConformerGenerator`], and
//! [`PythonToolkit`] implements both by driving RDKit in a child process.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod python;
pub use python::*;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Failed to start chemistry bridge '{}': {}", .program.display(), .source)]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Chemistry bridge is unavailable: {0}")]
    Unavailable(String),
    #[error("Chemistry bridge I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed chemistry bridge message: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("Chemistry bridge closed unexpectedly")]
    Closed,
    /// The toolkit ran but refused the molecule (bad SMILES, embedding failure, ...).
    #[error("{0}")]
    Rejected(String),
}

impl ToolkitError {
    /// True when the bridge itself is broken, as opposed to a single molecule
    /// being rejected. Every later call will fail the same way.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ToolkitError::Rejected(_))
    }
}

/// Computes canonical SMILES.
pub trait Canonicalizer {
    fn canonicalize(&mut self, smiles: &str) -> Result<String, ToolkitError>;
}

/// Generates conformers for one molecule and writes structure files into
/// `request.output_dir`.
pub trait ConformerGenerator {
    fn generate(&mut self, request: &ConformerRequest) -> Result<ConformerTable, ToolkitError>;
}

/// Force-field strategy used to pre-minimize generated conformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum MinMethod {
    /// Try MMFF94, then UFF, then MMFF94s.
    #[default]
    #[value(name = "auto")]
    Auto,
    #[value(name = "UFF")]
    Uff,
    #[value(name = "MMFF94")]
    Mmff94,
    #[value(name = "MMFF94s")]
    Mmff94s,
    /// Skip minimization.
    #[value(name = "none")]
    Off,
}

impl MinMethod {
    const AUTO_ORDER: [ForceField; 3] = [ForceField::Mmff94, ForceField::Uff, ForceField::Mmff94s];

    /// Force fields to try, in order, stopping at the first that succeeds.
    pub fn force_fields(self) -> Vec<ForceField> {
        match self {
            MinMethod::Auto => Self::AUTO_ORDER.to_vec(),
            MinMethod::Uff => vec![ForceField::Uff],
            MinMethod::Mmff94 => vec![ForceField::Mmff94],
            MinMethod::Mmff94s => vec![ForceField::Mmff94s],
            MinMethod::Off => Vec::new(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MinMethod::Auto => "auto",
            MinMethod::Uff => "UFF",
            MinMethod::Mmff94 => "MMFF94",
            MinMethod::Mmff94s => "MMFF94s",
            MinMethod::Off => "none",
        }
    }
}

impl Display for MinMethod {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForceField {
    #[serde(rename = "UFF")]
    Uff,
    #[serde(rename = "MMFF94")]
    Mmff94,
    #[serde(rename = "MMFF94s")]
    Mmff94s,
}

/// Everything a generator needs to produce conformers for one molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformerRequest {
    pub smiles: String,
    pub output_dir: PathBuf,
    pub num_confs: u32,
    pub min_method: MinMethod,
    pub write_multi: bool,
}

/// Per-conformer statistics returned by a generator, one row per conformer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformerTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ConformerTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
