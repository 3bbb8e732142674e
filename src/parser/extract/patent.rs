use std::sync::LazyLock;

use regex::Regex;

use super::base::bracketed_or_plain;
use crate::model::PartialRecord;
use crate::parser::ParsedDocument;

static REGISTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:https?://)?((?:patentscope\.wipo\.int|worldwide\.espacenet\.com|patents\.google\.com|ppubs\.uspto\.gov|www\.j-platpat\.inpit\.go\.jp)[^\s)\]"'<>]*)"#,
    )
    .unwrap()
});

pub fn extract(doc: &ParsedDocument) -> PartialRecord {
    let applicant = doc.label("applicant").and_then(bracketed_or_plain);
    let patent_link = registry_link(doc.text);
    let patent_status = doc.label("patent status").is_some() || patent_link.is_some();

    PartialRecord {
        applicant,
        patent_status: Some(patent_status),
        patent_link,
        ..Default::default()
    }
}

/// First registry URL in the text, normalized to `https://` without trailing punctuation.
pub fn registry_link(text: &str) -> Option<String> {
    let caps = REGISTRY_RE.captures(text)?;
    let path = caps[1].trim_end_matches(['.', ',', ';', ':']);
    Some(format!("https://{}", path))
}
