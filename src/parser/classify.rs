use tracing::debug;

use crate::config::ClassifierSettings;
use crate::model::{ProvenanceCategory, SourceDocument};

/// Content signatures checked when the identifier is out of range or malformed.
/// Order matters: the first set with a hit decides.
const SIGNATURES: &[(ProvenanceCategory, &[&str])] = &[
    (
        ProvenanceCategory::PatentImport,
        &[
            "patentscope",
            "espacenet",
            "patents.google",
            "uspto",
            "j-platpat",
            "patent status",
            "publication number",
            "applicant",
            "priority date",
        ],
    ),
    (
        ProvenanceCategory::UserUpload,
        &["uploaded by", "visit website"],
    ),
    (
        ProvenanceCategory::LegacyTransfer,
        &[
            "technology transfer",
            "tech transfer",
            "licensing office",
            "university",
            "institute of",
            "research council",
            "ctc-n.org",
        ],
    ),
];

/// Assign a provenance category. Total: always returns one of the three variants.
pub fn classify(doc: &SourceDocument, settings: &ClassifierSettings) -> ProvenanceCategory {
    if let Some(id) = doc.numeric_id() {
        if id >= settings.patent_min_id {
            return ProvenanceCategory::PatentImport;
        }
        if id >= settings.upload_min_id {
            return ProvenanceCategory::UserUpload;
        }
        if id < settings.legacy_max_id {
            return ProvenanceCategory::LegacyTransfer;
        }
    }

    let lower = doc.text.to_lowercase();
    for (category, terms) in SIGNATURES {
        if let Some(term) = terms.iter().find(|t| lower.contains(*t)) {
            debug!(id = %doc.external_id, %category, term, "classified by content signature");
            return *category;
        }
    }

    ProvenanceCategory::UserUpload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_default(id: &str, text: &str) -> ProvenanceCategory {
        classify(&SourceDocument::new(id, text), &ClassifierSettings::default())
    }

    #[test]
    fn id_ranges_win_over_content() {
        assert_eq!(
            classify_default("250000", "Uploaded by someone at a university"),
            ProvenanceCategory::PatentImport
        );
        assert_eq!(
            classify_default("148955", "Applicant [X] patentscope"),
            ProvenanceCategory::UserUpload
        );
        assert_eq!(
            classify_default("4501", "Visit website"),
            ProvenanceCategory::LegacyTransfer
        );
    }

    #[test]
    fn watermarks_are_inclusive() {
        assert_eq!(classify_default("200000", ""), ProvenanceCategory::PatentImport);
        assert_eq!(classify_default("140000", ""), ProvenanceCategory::UserUpload);
        assert_eq!(classify_default("99999", ""), ProvenanceCategory::LegacyTransfer);
        assert_eq!(classify_default("100000", ""), ProvenanceCategory::UserUpload);
    }

    #[test]
    fn gap_falls_back_to_signatures_in_order() {
        assert_eq!(
            classify_default("120000", "See PATENTSCOPE. Uploaded by Jane"),
            ProvenanceCategory::PatentImport
        );
        assert_eq!(
            classify_default("120000", "Uploaded by Jane from a University"),
            ProvenanceCategory::UserUpload
        );
        assert_eq!(
            classify_default("abc", "Office of Technology Transfer"),
            ProvenanceCategory::LegacyTransfer
        );
    }

    #[test]
    fn default_is_user_upload() {
        assert_eq!(classify_default("120000", "nothing here"), ProvenanceCategory::UserUpload);
        assert_eq!(classify_default("", ""), ProvenanceCategory::UserUpload);
    }

    #[test]
    fn totality_over_mixed_inputs() {
        let ids = ["", "0", "1", "99999", "100000", "139999", "140000", "199999", "200000", "18446744073709551615", "-5", "12a", "１２"];
        let texts = ["", "applicant", "uploaded by", "university", "\u{0}\n\n###", "ÄÖÜ patent status"];
        for id in ids {
            for text in texts {
                let c = classify_default(id, text);
                assert!(matches!(
                    c,
                    ProvenanceCategory::PatentImport
                        | ProvenanceCategory::UserUpload
                        | ProvenanceCategory::LegacyTransfer
                ));
            }
        }
    }
}
