use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::config::ImportMetadata;
use crate::error::StoreError;
use crate::merge::DuplicatePolicy;
use crate::model::{CanonicalRecord, Provenance};

/// Result of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertResult {
    pub success: bool,
    pub skipped: bool,
}

/// Persistence collaborator consumed by the import step.
pub trait RecordStore {
    fn find_or_create_owner(&mut self, name: &str) -> Result<i64, StoreError>;

    fn check_existing(&self, id: &str) -> Result<Option<CanonicalRecord>, StoreError>;

    /// Insert, or resolve a conflict on `id` with `on_conflict`. `Prompt` has to be resolved
    /// by the caller beforehand; a store receiving it treats the conflict as `Skip`.
    /// The stored source tag is the provenance attribution when present, else `metadata`'s.
    fn upsert(
        &mut self,
        record: &CanonicalRecord,
        owner_id: i64,
        provenance: &Provenance,
        metadata: &ImportMetadata,
        on_conflict: DuplicatePolicy,
    ) -> Result<UpsertResult, StoreError>;

    fn log_failure(&mut self, external_id: &str, reason: &str) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

pub struct StoreStats {
    pub technologies: i64,
    pub owners: i64,
    pub failures: i64,
    /// Technology count per source tag, largest first.
    pub by_source: Vec<(String, i64)>,
}

const SELECT_RECORD: &str = "SELECT technology_name_en, id, company_name, published_time, updated_time,
        company_website_url, technology_image_url, description, benefits, benefits_description,
        developed_in_country, deployed_in_country, technology_readiness_level,
        intellectual_property, custom_labels, technology_name_cn, technology_category, sub_category
 FROM technologies";

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            // Missing directory surfaces as an open error below
            let _ = std::fs::create_dir_all(dir);
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS owners (
                id          INTEGER PRIMARY KEY,
                name        TEXT UNIQUE NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS technologies (
                id                          TEXT PRIMARY KEY,
                technology_name_en          TEXT NOT NULL,
                company_name                TEXT NOT NULL,
                published_time              TEXT NOT NULL,
                updated_time                TEXT NOT NULL,
                company_website_url         TEXT NOT NULL,
                technology_image_url        TEXT NOT NULL,
                description                 TEXT NOT NULL,
                benefits                    TEXT NOT NULL,
                benefits_description        TEXT NOT NULL,
                developed_in_country        TEXT NOT NULL,
                deployed_in_country         TEXT NOT NULL,
                technology_readiness_level  TEXT NOT NULL,
                intellectual_property       TEXT NOT NULL,
                custom_labels               TEXT NOT NULL,   -- JSON array
                technology_name_cn          TEXT NOT NULL,
                technology_category         TEXT NOT NULL,
                sub_category                TEXT NOT NULL,
                owner_id                    INTEGER REFERENCES owners(id),
                source_tag                  TEXT NOT NULL,
                provenance_category         TEXT NOT NULL,
                uploader                    TEXT,
                source_label                TEXT,
                institution                 TEXT,
                patent_status               INTEGER,
                imported_at                 TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_tech_owner ON technologies(owner_id);
            CREATE INDEX IF NOT EXISTS idx_tech_source ON technologies(source_tag);

            CREATE TABLE IF NOT EXISTS import_failures (
                id           INTEGER PRIMARY KEY,
                external_id  TEXT NOT NULL,
                reason       TEXT NOT NULL,
                failed_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_failures_external ON import_failures(external_id);
            ",
        )?;
        Ok(())
    }

    pub fn all_records(&self) -> Result<Vec<CanonicalRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{} ORDER BY rowid", SELECT_RECORD))?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let count = |table: &str| -> Result<i64, StoreError> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
        };
        let mut stmt = self.conn.prepare(
            "SELECT source_tag, COUNT(*) FROM technologies GROUP BY source_tag ORDER BY COUNT(*) DESC, source_tag",
        )?;
        let by_source = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StoreStats {
            technologies: count("technologies")?,
            owners: count("owners")?,
            failures: count("import_failures")?,
            by_source,
        })
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<CanonicalRecord> {
    Ok(CanonicalRecord {
        technology_name_en: row.get(0)?,
        id: row.get(1)?,
        company_name: row.get(2)?,
        published_time: row.get(3)?,
        updated_time: row.get(4)?,
        company_website_url: row.get(5)?,
        technology_image_url: row.get(6)?,
        description: row.get(7)?,
        benefits: row.get(8)?,
        benefits_description: row.get(9)?,
        developed_in_country: row.get(10)?,
        deployed_in_country: row.get(11)?,
        technology_readiness_level: row.get(12)?,
        intellectual_property: row.get(13)?,
        custom_labels: decode_labels(&row.get::<_, String>(14)?)?,
        technology_name_cn: row.get(15)?,
        technology_category: row.get(16)?,
        sub_category: row.get(17)?,
    })
}

fn decode_labels(raw: &str) -> rusqlite::Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))
}

impl RecordStore for SqliteStore {
    fn find_or_create_owner(&mut self, name: &str) -> Result<i64, StoreError> {
        let name = name.trim();
        self.conn
            .execute("INSERT OR IGNORE INTO owners (name) VALUES (?1)", params![name])?;
        let id = self
            .conn
            .query_row("SELECT id FROM owners WHERE name = ?1", params![name], |r| r.get(0))?;
        Ok(id)
    }

    fn check_existing(&self, id: &str) -> Result<Option<CanonicalRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_RECORD),
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn upsert(
        &mut self,
        record: &CanonicalRecord,
        owner_id: i64,
        provenance: &Provenance,
        metadata: &ImportMetadata,
        on_conflict: DuplicatePolicy,
    ) -> Result<UpsertResult, StoreError> {
        let verb = match on_conflict {
            DuplicatePolicy::Overwrite => "INSERT OR REPLACE",
            DuplicatePolicy::Skip | DuplicatePolicy::Prompt => "INSERT OR IGNORE",
        };
        let labels = serde_json::to_string(&record.custom_labels)?;
        // Import metadata fills category columns the record leaves empty
        let category = non_empty_or(&record.technology_category, &metadata.category_id);
        let sub_category = non_empty_or(&record.sub_category, &metadata.subcategory_id);
        let source_tag = provenance.source_tag(&metadata.source_tag);

        let changed = self.conn.execute(
            &format!(
                "{} INTO technologies
                 (technology_name_en, id, company_name, published_time, updated_time,
                  company_website_url, technology_image_url, description, benefits,
                  benefits_description, developed_in_country, deployed_in_country,
                  technology_readiness_level, intellectual_property, custom_labels,
                  technology_name_cn, technology_category, sub_category, owner_id, source_tag,
                  provenance_category, uploader, source_label, institution, patent_status)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,
                         ?21,?22,?23,?24,?25)",
                verb
            ),
            params![
                record.technology_name_en,
                record.id,
                record.company_name,
                record.published_time,
                record.updated_time,
                record.company_website_url,
                record.technology_image_url,
                record.description,
                record.benefits,
                record.benefits_description,
                record.developed_in_country,
                record.deployed_in_country,
                record.technology_readiness_level,
                record.intellectual_property,
                labels,
                record.technology_name_cn,
                category,
                sub_category,
                owner_id,
                source_tag,
                provenance.category.as_str(),
                provenance.uploader,
                provenance.source_label,
                provenance.institution,
                provenance.patent_status,
            ],
        )?;
        debug!(id = %record.id, changed, %source_tag, "upsert");
        Ok(UpsertResult {
            success: true,
            skipped: changed == 0,
        })
    }

    fn log_failure(&mut self, external_id: &str, reason: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO import_failures (external_id, reason) VALUES (?1, ?2)",
            params![external_id, reason],
        )?;
        Ok(())
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProvenanceCategory;

    fn sample() -> CanonicalRecord {
        CanonicalRecord {
            id: "148955".into(),
            technology_name_en: "Construction and maintenance of wind turbine".into(),
            company_name: "Mitsubishi Heavy Industries, Ltd.".into(),
            custom_labels: vec!["Wind energy".into(), "Monitoring".into()],
            ..Default::default()
        }
    }

    #[test]
    fn owner_reused() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = store.find_or_create_owner("Vestas").unwrap();
        let b = store.find_or_create_owner(" Vestas ").unwrap();
        let c = store.find_or_create_owner("Siemens").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn upsert_round_trip_with_metadata() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let meta = ImportMetadata::default();
        let owner = store.find_or_create_owner("Mitsubishi Heavy Industries, Ltd.").unwrap();
        let res = store
            .upsert(&sample(), owner, &Provenance::default(), &meta, DuplicatePolicy::Skip)
            .unwrap();
        assert_eq!(res, UpsertResult { success: true, skipped: false });

        let back = store.check_existing("148955").unwrap().unwrap();
        assert_eq!(back.custom_labels, sample().custom_labels);
        assert_eq!(back.technology_category, meta.category_id);
        assert_eq!(back.sub_category, meta.subcategory_id);
        assert!(store.check_existing("1").unwrap().is_none());
    }

    #[test]
    fn conflict_handling() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let meta = ImportMetadata::default();
        let owner = store.find_or_create_owner("x").unwrap();
        store.upsert(&sample(), owner, &Provenance::default(), &meta, DuplicatePolicy::Skip).unwrap();

        let mut changed = sample();
        changed.technology_name_en = "Changed".into();
        let res = store.upsert(&changed, owner, &Provenance::default(), &meta, DuplicatePolicy::Prompt).unwrap();
        assert!(res.skipped);
        let res = store.upsert(&changed, owner, &Provenance::default(), &meta, DuplicatePolicy::Overwrite).unwrap();
        assert!(!res.skipped);
        assert_eq!(store.all_records().unwrap().len(), 1);
        assert_eq!(store.all_records().unwrap()[0].technology_name_en, "Changed");
    }

    #[test]
    fn failures_counted() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.log_failure("42", "timeout").unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.technologies, 0);
        assert!(stats.by_source.is_empty());
    }

    #[test]
    fn provenance_columns_written() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let meta = ImportMetadata::default();
        let owner = store.find_or_create_owner("x").unwrap();
        let prov = Provenance {
            category: ProvenanceCategory::UserUpload,
            uploader: Some("WIPO GREEN Admin".into()),
            source_label: Some("Company brochure".into()),
            ..Default::default()
        };
        store.upsert(&sample(), owner, &prov, &meta, DuplicatePolicy::Skip).unwrap();

        let (tag, category, uploader, label, patent): (String, String, Option<String>, Option<String>, Option<bool>) = store
            .conn
            .query_row(
                "SELECT source_tag, provenance_category, uploader, source_label, patent_status
                 FROM technologies WHERE id = '148955'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .unwrap();
        assert_eq!(tag, meta.source_tag);
        assert_eq!(category, "user-upload");
        assert_eq!(uploader.as_deref(), Some("WIPO GREEN Admin"));
        assert_eq!(label.as_deref(), Some("Company brochure"));
        assert_eq!(patent, None);
    }

    #[test]
    fn malformed_labels_column_is_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let owner = store.find_or_create_owner("x").unwrap();
        store
            .upsert(&sample(), owner, &Provenance::default(), &ImportMetadata::default(), DuplicatePolicy::Skip)
            .unwrap();
        store
            .conn
            .execute("UPDATE technologies SET custom_labels = 'not json' WHERE id = '148955'", [])
            .unwrap();
        assert!(matches!(store.check_existing("148955"), Err(StoreError::Sqlite(_))));

        store
            .conn
            .execute("UPDATE technologies SET custom_labels = '' WHERE id = '148955'", [])
            .unwrap();
        assert!(store.check_existing("148955").unwrap().unwrap().custom_labels.is_empty());
    }
}
