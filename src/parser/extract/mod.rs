pub mod base;
pub mod legacy;
pub mod patent;
pub mod upload;

use super::{parse, ParsedDocument};
use crate::model::{PartialRecord, ProvenanceCategory, SourceDocument};

/// Category-independent fields.
pub fn extract_base(doc: &SourceDocument) -> PartialRecord {
    base::extract(&parse(doc))
}

/// Category overlay alone, without the base fields.
pub fn extract_for(category: ProvenanceCategory, doc: &SourceDocument) -> PartialRecord {
    overlay(category, &parse(doc))
}

/// Base fields first, then the category overlay fills the gaps.
/// The one override: a PatentImport applicant replaces the captured owner.
pub fn extract(category: ProvenanceCategory, doc: &SourceDocument) -> PartialRecord {
    let parsed = parse(doc);
    let mut record = base::extract(&parsed);
    let overlay = overlay(category, &parsed);

    if category == ProvenanceCategory::PatentImport {
        if let Some(applicant) = &overlay.applicant {
            record.owner = Some(applicant.clone());
        }
    }
    record.fill_from(overlay);
    record
}

fn overlay(category: ProvenanceCategory, parsed: &ParsedDocument) -> PartialRecord {
    match category {
        ProvenanceCategory::PatentImport => patent::extract(parsed),
        ProvenanceCategory::UserUpload => upload::extract(parsed),
        ProvenanceCategory::LegacyTransfer => legacy::extract(parsed),
    }
}

// ── Tests ──
