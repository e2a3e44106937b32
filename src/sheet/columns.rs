use std::fmt::{Display, Formatter, Result as FmtResult};

use super::LoadError;

/// The two columns every input sheet must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Identifier,
    Smiles,
}

impl ColumnRole {
    /// Lowercase prefix a trimmed header must start with to fill this role.
    pub fn prefix(self) -> &'static str {
        match self {
            ColumnRole::Identifier => "molecule",
            ColumnRole::Smiles => "smile",
        }
    }

    /// The name the column is known by once resolved.
    pub fn canonical_name(self) -> &'static str {
        match self {
            ColumnRole::Identifier => "Molecule ChEMBL ID",
            ColumnRole::Smiles => "Smiles",
        }
    }

    fn matches(self, header: &str) -> bool {
        header.to_lowercase().starts_with(self.prefix())
    }
}

impl Display for ColumnRole {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            ColumnRole::Identifier => write!(f, "molecule identifier"),
            ColumnRole::Smiles => write!(f, "SMILES"),
        }
    }
}

/// Positions of the resolved columns within a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub id: usize,
    pub smiles: usize,
    /// The trimmed headers that were matched, kept for log output.
    pub id_header: String,
    pub smiles_header: String,
}

pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_string()
}

/// Resolves the identifier and SMILES columns from a header row.
///
/// Headers are trimmed before matching, and the first header whose lowercase
/// form starts with the role's prefix wins. Any other columns are ignored.
///
/// # Arguments
///
/// * `headers` - The raw header cells, in sheet order.
///
/// # Returns
///
/// * `Result<ColumnMap, LoadError>` - The resolved positions, or
///   `LoadError::ColumnNotFound` naming the first role with no match.
pub fn resolve_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnMap, LoadError> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|header| normalize_header(header.as_ref()))
        .collect();

    let find = |role: ColumnRole| {
        normalized
            .iter()
            .position(|header| role.matches(header))
            .ok_or_else(|| LoadError::ColumnNotFound {
                role,
                headers: normalized.clone(),
            })
    };

    let id = find(ColumnRole::Identifier)?;
    let smiles = find(ColumnRole::Smiles)?;

    Ok(ColumnMap {
        id,
        smiles,
        id_header: normalized[id].clone(),
        smiles_header: normalized[smiles].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_padded_and_mixed_case_headers() {
        let headers = ["Name", " Molecule ChEMBL ID ", "Weight", "SMILES"];
        let map = resolve_columns(&headers).unwrap();
        assert_eq!(map.id, 1);
        assert_eq!(map.smiles, 3);
        assert_eq!(map.id_header, "Molecule ChEMBL ID");
        assert_eq!(map.smiles_header, "SMILES");
    }

    #[test]
    fn test_first_matching_column_wins() {
        let headers = ["smiles_raw", "molecule_id", "Smiles", "Molecule Name"];
        let map = resolve_columns(&headers).unwrap();
        assert_eq!(map.id, 1);
        assert_eq!(map.smiles, 0);
    }

    #[test]
    fn test_prefix_must_start_the_header() {
        // "Canonical Smiles" contains the prefix but does not start with it.
        let headers = ["Molecule", "Canonical Smiles"];
        match resolve_columns(&headers) {
            Err(LoadError::ColumnNotFound { role, headers }) => {
                assert_eq!(role, ColumnRole::Smiles);
                assert_eq!(headers, vec!["Molecule", "Canonical Smiles"]);
            }
            other => panic!("expected a missing SMILES column, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_identifier_is_reported_first() {
        let headers = ["ID", "Smile"];
        match resolve_columns(&headers) {
            Err(LoadError::ColumnNotFound { role, .. }) => {
                assert_eq!(role, ColumnRole::Identifier)
            }
            other => panic!("expected a missing identifier column, got {:?}", other),
        }
    }

    #[test]
    fn test_column_not_found_message_lists_headers() {
        let err = resolve_columns(&["a", " b "]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("molecule identifier"), "{message}");
        assert!(message.contains("\"b\""), "{message}");
    }
}
