use std::collections::HashSet;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::config::ImportMetadata;
use crate::db::RecordStore;
use crate::error::StoreError;
use crate::model::{CanonicalRecord, Provenance};

/// Records keyed by `id`, in admission order. Ids are unique by construction.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSet {
    records: Vec<CanonicalRecord>,
    ids: HashSet<String>,
}

impl CanonicalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a record unless its id is already present (first-seen-wins).
    /// Records without an id are never admitted.
    pub fn admit(&mut self, record: CanonicalRecord) -> bool {
        if record.id.is_empty() || self.ids.contains(&record.id) {
            return false;
        }
        self.ids.insert(record.id.clone());
        self.records.push(record);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }
}

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub set: CanonicalSet,
    /// Ids dropped because an earlier batch already supplied them.
    pub duplicates: Vec<String>,
    /// Records dropped because they carried no id.
    pub missing_id: usize,
}

/// Merge batches in the caller's priority order. The earliest batch wins every id collision;
/// there is no implicit ordering, so callers decide whether curated or fresh data comes first.
pub fn merge<I>(batches_in_priority_order: I) -> MergeOutcome
where
    I: IntoIterator<Item = Vec<CanonicalRecord>>,
{
    let mut outcome = MergeOutcome::default();
    for (batch_idx, batch) in batches_in_priority_order.into_iter().enumerate() {
        for record in batch {
            if record.id.is_empty() {
                outcome.missing_id += 1;
                continue;
            }
            let id = record.id.clone();
            if !outcome.set.admit(record) {
                debug!(%id, batch = batch_idx, "duplicate id dropped");
                outcome.duplicates.push(id);
            }
        }
    }
    if outcome.missing_id > 0 {
        warn!(count = outcome.missing_id, "records without id dropped during merge");
    }
    info!(
        records = outcome.set.len(),
        duplicates = outcome.duplicates.len(),
        "merged batches"
    );
    outcome
}

// ── Import-time duplicate policy ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Ask a resolver once per duplicate id.
    Prompt,
    Skip,
    Overwrite,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prompt" => Ok(DuplicatePolicy::Prompt),
            "skip" => Ok(DuplicatePolicy::Skip),
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            other => Err(format!(
                "unknown duplicate policy '{}' (expected prompt, skip or overwrite)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepExisting,
    UseCandidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Inserted,
    Overwritten,
    Skipped,
}

/// Upsert one record through the persistence collaborator, applying `policy` when a record
/// with the same id is already stored. `resolve` is only called under `Prompt`, with
/// `(existing, candidate)`.
pub fn import_record<S, F>(
    store: &mut S,
    record: &CanonicalRecord,
    provenance: &Provenance,
    metadata: &ImportMetadata,
    policy: DuplicatePolicy,
    resolve: &mut F,
) -> Result<ImportOutcome, StoreError>
where
    S: RecordStore + ?Sized,
    F: FnMut(&CanonicalRecord, &CanonicalRecord) -> Resolution,
{
    let existing = store.check_existing(&record.id)?;
    let effective = match (&existing, policy) {
        (None, _) => DuplicatePolicy::Overwrite,
        (Some(existing), DuplicatePolicy::Prompt) => match resolve(existing, record) {
            Resolution::KeepExisting => DuplicatePolicy::Skip,
            Resolution::UseCandidate => DuplicatePolicy::Overwrite,
        },
        (Some(_), p) => p,
    };

    if existing.is_some() && effective == DuplicatePolicy::Skip {
        debug!(id = %record.id, "duplicate skipped");
        return Ok(ImportOutcome::Skipped);
    }

    let owner_id = store.find_or_create_owner(&record.company_name)?;
    let result = store.upsert(record, owner_id, provenance, metadata, effective)?;
    let written = result.success && !result.skipped;
    Ok(match (written, existing.is_some()) {
        (false, _) => ImportOutcome::Skipped,
        (true, true) => ImportOutcome::Overwritten,
        (true, false) => ImportOutcome::Inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;

    fn rec(id: &str, name: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.to_string(),
            technology_name_en: name.to_string(),
            company_name: "Econowind".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn first_seen_wins() {
        let out = merge(vec![
            vec![rec("171616", "EnergySail")],
            vec![rec("171616", "Energy Sail v2"), rec("200001", "Other")],
        ]);
        assert_eq!(out.set.len(), 2);
        assert_eq!(out.set.get("171616").unwrap().technology_name_en, "EnergySail");
        assert_eq!(out.duplicates, vec!["171616".to_string()]);
    }

    #[test]
    fn caller_order_decides() {
        let out = merge(vec![
            vec![rec("171616", "Energy Sail v2")],
            vec![rec("171616", "EnergySail")],
        ]);
        assert_eq!(out.set.get("171616").unwrap().technology_name_en, "Energy Sail v2");
    }

    #[test]
    fn merged_ids_unique() {
        let batches: Vec<Vec<CanonicalRecord>> = (0..5)
            .map(|b| (0..20).map(|i| rec(&((i * (b + 1)) % 13).to_string(), "x")).collect())
            .collect();
        let out = merge(batches);
        let mut ids: Vec<&str> = out.set.records().iter().map(|r| r.id.as_str()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(before, ids.len());
        assert_eq!(out.set.len(), 13);
    }

    #[test]
    fn records_without_id_dropped() {
        let out = merge(vec![vec![rec("", "nameless"), rec("1", "a")]]);
        assert_eq!(out.set.len(), 1);
        assert_eq!(out.missing_id, 1);

        let out = merge(vec![vec![rec("", "nameless")], vec![]]);
        assert!(out.set.is_empty());
        assert_eq!(out.missing_id, 1);
    }

    #[test]
    fn policy_parse() {
        assert_eq!("Skip".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::Skip));
        assert!("merge".parse::<DuplicatePolicy>().is_err());
    }

    fn no_prompt(_: &CanonicalRecord, _: &CanonicalRecord) -> Resolution {
        panic!("resolver must not be called");
    }

    #[test]
    fn import_skip_and_overwrite() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let meta = ImportMetadata::default();
        let prov = Provenance::default();
        let first = rec("171616", "EnergySail");
        let second = rec("171616", "Energy Sail v2");

        assert_eq!(
            import_record(&mut store, &first, &prov, &meta, DuplicatePolicy::Skip, &mut no_prompt).unwrap(),
            ImportOutcome::Inserted
        );
        assert_eq!(
            import_record(&mut store, &second, &prov, &meta, DuplicatePolicy::Skip, &mut no_prompt).unwrap(),
            ImportOutcome::Skipped
        );
        assert_eq!(
            store.check_existing("171616").unwrap().unwrap().technology_name_en,
            "EnergySail"
        );
        assert_eq!(
            import_record(&mut store, &second, &prov, &meta, DuplicatePolicy::Overwrite, &mut no_prompt).unwrap(),
            ImportOutcome::Overwritten
        );
        assert_eq!(
            store.check_existing("171616").unwrap().unwrap().technology_name_en,
            "Energy Sail v2"
        );
    }

    #[test]
    fn import_prompt_called_once_per_duplicate() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let meta = ImportMetadata::default();
        let prov = Provenance::default();
        let mut calls = Vec::new();
        let mut resolver = |existing: &CanonicalRecord, candidate: &CanonicalRecord| {
            calls.push((existing.technology_name_en.clone(), candidate.technology_name_en.clone()));
            Resolution::UseCandidate
        };

        let out = import_record(&mut store, &rec("1", "old"), &prov, &meta, DuplicatePolicy::Prompt, &mut resolver).unwrap();
        assert_eq!(out, ImportOutcome::Inserted);
        let out = import_record(&mut store, &rec("1", "new"), &prov, &meta, DuplicatePolicy::Prompt, &mut resolver).unwrap();
        assert_eq!(out, ImportOutcome::Overwritten);
        assert_eq!(calls, vec![("old".to_string(), "new".to_string())]);
    }

    #[test]
    fn import_prompt_keep_existing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let meta = ImportMetadata::default();
        let prov = Provenance::default();
        let mut keep = |_: &CanonicalRecord, _: &CanonicalRecord| Resolution::KeepExisting;
        import_record(&mut store, &rec("1", "old"), &prov, &meta, DuplicatePolicy::Prompt, &mut keep).unwrap();
        let out = import_record(&mut store, &rec("1", "new"), &prov, &meta, DuplicatePolicy::Prompt, &mut keep).unwrap();
        assert_eq!(out, ImportOutcome::Skipped);
        assert_eq!(store.check_existing("1").unwrap().unwrap().technology_name_en, "old");
    }
}
