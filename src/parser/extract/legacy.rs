use std::sync::LazyLock;

use regex::Regex;

use crate::model::PartialRecord;
use crate::parser::ParsedDocument;

pub const LEGACY_SOURCE_TAG: &str = "legacy-technology-transfer";

/// Institutional repositories whose presence marks a transferred legacy record.
const REPOSITORY_DOMAINS: &[&str] = &[
    "ctc-n.org",
    "flintbox.com",
    "inpart.io",
    "techfinder",
    "autm.net",
    "ott.nih.gov",
    "technologypublisher.com",
];

static ORG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:[A-Z][\w&'.-]*\s+){0,5}(?:University|Institute|Laboratory|Laboratories|Centre|Center|Agency|Foundation|Council|Academy)\b(?:\s+(?:of|for|and|the|[A-Z][\w&'.-]*)\b)*)",
    )
    .unwrap()
});

const TRAILING_CONNECTORS: &[&str] = &["of", "for", "and", "the"];

pub fn extract(doc: &ParsedDocument) -> PartialRecord {
    let institution = institution_name(doc.text);
    let lower = doc.text.to_lowercase();
    let source_attribution = REPOSITORY_DOMAINS
        .iter()
        .any(|d| lower.contains(d))
        .then(|| LEGACY_SOURCE_TAG.to_string());

    PartialRecord {
        // Fills the owner only when the base pass found none
        owner: institution.clone(),
        institution,
        source_attribution,
        ..Default::default()
    }
}

pub fn institution_name(text: &str) -> Option<String> {
    let caps = ORG_RE.captures(text)?;
    let mut words: Vec<&str> = caps[1].split_whitespace().collect();
    while words
        .last()
        .is_some_and(|w| TRAILING_CONNECTORS.contains(&w.to_lowercase().as_str()))
    {
        words.pop();
    }
    if words.first().is_some_and(|w| *w == "The") {
        words.remove(0);
    }
    let name = words.join(" ").trim_end_matches(['.', ',']).to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
