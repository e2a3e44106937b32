use std::fmt::{Display, Formatter, Result as FmtResult};

/// One spreadsheet row: a molecule identifier and its SMILES string.
///
/// Identifiers are not guaranteed to be unique across a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoleculeRecord {
    pub id: String,
    pub smiles: String,
}

impl MoleculeRecord {
    pub fn new(id: impl Into<String>, smiles: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            smiles: smiles.into(),
        }
    }
}

impl Display for MoleculeRecord {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{} ({})", self.id, self.smiles)
    }
}
