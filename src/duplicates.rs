//! Duplicate detection by canonical SMILES.

use indexmap::IndexMap;
use tracing::*;

use crate::{Canonicalizer, MoleculeRecord, ToolkitError};

/// The first record seen with a given canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub canonical_smiles: String,
    pub first_seen_id: String,
    pub first_seen_smiles: String,
}

/// All records sharing one canonical form, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub canonical_smiles: String,
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateScan {
    /// Groups ordered by when their first repeat was found.
    pub groups: Vec<DuplicateGroup>,
    /// Distinct canonical forms seen.
    pub unique: usize,
    /// Rows left out because their SMILES could not be canonicalized.
    pub skipped: usize,
}

/// Insert-once map from canonical SMILES to the first record seen with it,
/// plus the ids of every later record that repeats it.
#[derive(Debug, Default)]
pub struct CanonicalIndex {
    first_seen: IndexMap<String, CanonicalEntry>,
    repeats: IndexMap<String, Vec<String>>,
}

impl CanonicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one canonicalized row. Returns the entry it duplicates, if any.
    pub fn insert(&mut self, canonical: String, record: &MoleculeRecord) -> Option<&CanonicalEntry> {
        if self.first_seen.contains_key(&canonical) {
            self.repeats
                .entry(canonical.clone())
                .or_default()
                .push(record.id.clone());
            return self.first_seen.get(&canonical);
        }
        self.first_seen.insert(
            canonical.clone(),
            CanonicalEntry {
                canonical_smiles: canonical,
                first_seen_id: record.id.clone(),
                first_seen_smiles: record.smiles.clone(),
            },
        );
        None
    }

    pub fn get(&self, canonical: &str) -> Option<&CanonicalEntry> {
        self.first_seen.get(canonical)
    }

    pub fn unique(&self) -> usize {
        self.first_seen.len()
    }

    /// One group per repeated canonical form: the first-seen id followed by
    /// each repeat in the order it was encountered.
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        self.repeats
            .iter()
            .filter_map(|(canonical, ids)| {
                let first = self.first_seen.get(canonical)?;
                let mut member_ids = Vec::with_capacity(ids.len() + 1);
                member_ids.push(first.first_seen_id.clone());
                member_ids.extend(ids.iter().cloned());
                Some(DuplicateGroup {
                    canonical_smiles: canonical.clone(),
                    member_ids,
                })
            })
            .collect()
    }
}

/// Canonicalizes every record in order and groups the repeats.
///
/// A row whose SMILES is blank or that the toolkit rejects is skipped without
/// any user-visible message. Only a broken toolkit (the bridge process died or
/// stopped speaking the protocol) aborts the scan, since every remaining row
/// would otherwise be skipped silently as well.
pub fn find_duplicates<C>(records: &[MoleculeRecord], canonicalizer: &mut C) -> Result<DuplicateScan, ToolkitError>
where
    C: Canonicalizer + ?Sized,
{
    let mut index = CanonicalIndex::new();
    let mut skipped = 0;

    for record in records {
        if record.smiles.is_empty() {
            debug!("Skipping {}: empty SMILES", record.id);
            skipped += 1;
            continue;
        }
        let canonical = match canonicalizer.canonicalize(&record.smiles) {
            Ok(canonical) => canonical,
            Err(err) if err.is_transport() => return Err(err),
            Err(err) => {
                debug!("Skipping {}: {}", record, err);
                skipped += 1;
                continue;
            }
        };
        if let Some(first) = index.insert(canonical, record) {
            debug!("{} duplicates {}", record.id, first.first_seen_id);
        }
    }

    let scan = DuplicateScan {
        groups: index.groups(),
        unique: index.unique(),
        skipped,
    };
    info!(
        "Canonicalized {} of {} molecules: {} unique, {} duplicate groups",
        records.len() - skipped,
        records.len(),
        scan.unique,
        scan.groups.len()
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canonical form = the SMILES characters sorted, so "CCO" and "OCC"
    /// collide. Anything containing '!' is rejected.
    #[derive(Default)]
    struct SortingCanonicalizer {
        calls: usize,
        fail_transport_after: Option<usize>,
    }

    impl Canonicalizer for SortingCanonicalizer {
        fn canonicalize(&mut self, smiles: &str) -> Result<String, ToolkitError> {
            self.calls += 1;
            if self.fail_transport_after.is_some_and(|limit| self.calls > limit) {
                return Err(ToolkitError::Closed);
            }
            if smiles.contains('!') {
                return Err(ToolkitError::Rejected(format!("could not parse SMILES {smiles:?}")));
            }
            let mut chars: Vec<char> = smiles.chars().collect();
            chars.sort_unstable();
            Ok(chars.into_iter().collect())
        }
    }

    fn records(rows: &[(&str, &str)]) -> Vec<MoleculeRecord> {
        rows.iter().map(|(id, smiles)| MoleculeRecord::new(*id, *smiles)).collect()
    }

    #[test]
    fn test_group_lists_first_seen_id_first() {
        let scan = find_duplicates(
            &records(&[("A", "CCO"), ("B", "OCC"), ("C", "CCN")]),
            &mut SortingCanonicalizer::default(),
        )
        .unwrap();

        assert_eq!(
            scan.groups,
            vec![DuplicateGroup {
                canonical_smiles: "CCO".into(),
                member_ids: vec!["A".into(), "B".into()],
            }]
        );
        assert_eq!(scan.unique, 2);
        assert_eq!(scan.skipped, 0);
    }

    #[test]
    fn test_groups_follow_discovery_order() {
        // "CN" repeats (at row 3) before "CCO" does (at row 4).
        let scan = find_duplicates(
            &records(&[("A", "CCO"), ("B", "CN"), ("C", "NC"), ("D", "OCC"), ("E", "COC"), ("F", "CN")]),
            &mut SortingCanonicalizer::default(),
        )
        .unwrap();

        let summary: Vec<(&str, Vec<&str>)> = scan
            .groups
            .iter()
            .map(|group| {
                (
                    group.canonical_smiles.as_str(),
                    group.member_ids.iter().map(String::as_str).collect(),
                )
            })
            .collect();
        assert_eq!(summary, vec![("CN", vec!["B", "C", "F"]), ("CCO", vec!["A", "D", "E"])]);
    }

    #[test]
    fn test_all_distinct_yields_no_groups() {
        let scan = find_duplicates(
            &records(&[("A", "C"), ("B", "CC"), ("C", "CCC")]),
            &mut SortingCanonicalizer::default(),
        )
        .unwrap();
        assert!(scan.groups.is_empty());
        assert_eq!(scan.unique, 3);
    }

    #[test]
    fn test_rejected_and_blank_smiles_are_skipped() {
        let mut canonicalizer = SortingCanonicalizer::default();
        let scan = find_duplicates(
            &records(&[("A", "C!C"), ("B", "CCO"), ("C", ""), ("D", "C!C"), ("E", "OCC")]),
            &mut canonicalizer,
        )
        .unwrap();

        // The two rejected rows do not form a group of their own.
        assert_eq!(scan.groups.len(), 1);
        assert_eq!(scan.groups[0].member_ids, vec!["B", "E"]);
        assert_eq!(scan.skipped, 3);
        // Blank SMILES never reach the toolkit.
        assert_eq!(canonicalizer.calls, 4);
    }

    #[test]
    fn test_duplicate_ids_are_tolerated() {
        let scan = find_duplicates(
            &records(&[("A", "CCO"), ("A", "OCC")]),
            &mut SortingCanonicalizer::default(),
        )
        .unwrap();
        assert_eq!(scan.groups[0].member_ids, vec!["A", "A"]);
    }

    #[test]
    fn test_broken_toolkit_aborts_the_scan() {
        let mut canonicalizer = SortingCanonicalizer {
            fail_transport_after: Some(1),
            ..SortingCanonicalizer::default()
        };
        let result = find_duplicates(&records(&[("A", "CCO"), ("B", "OCC")]), &mut canonicalizer);
        assert!(matches!(result, Err(ToolkitError::Closed)));
    }

    #[test]
    fn test_index_keeps_the_first_entry() {
        let mut index = CanonicalIndex::new();
        assert!(index.insert("CCO".into(), &MoleculeRecord::new("A", "CCO")).is_none());
        let first = index.insert("CCO".into(), &MoleculeRecord::new("B", "OCC")).cloned();

        let expected = CanonicalEntry {
            canonical_smiles: "CCO".into(),
            first_seen_id: "A".into(),
            first_seen_smiles: "CCO".into(),
        };
        assert_eq!(first, Some(expected.clone()));
        assert_eq!(index.get("CCO"), Some(&expected));
        assert_eq!(index.unique(), 1);
    }
}
