use std::sync::LazyLock;

use regex::Regex;

use crate::model::PartialRecord;
use crate::parser::blocks::{strip_link_syntax, Block};
use crate::parser::sections::SectionKind;
use crate::parser::ParsedDocument;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4}[/-]\d{1,2}[/-]\d{1,2})\b").unwrap());
static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());
static LINK_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\]\(([^)\s]+)\)").unwrap());

pub fn extract(doc: &ParsedDocument) -> PartialRecord {
    PartialRecord {
        id: doc
            .label("id")
            .and_then(|v| NUMBER_RE.find(v))
            .map(|m| m.as_str().to_string()),
        name: doc.blocks.iter().find_map(|b| match b {
            Block::Heading { level: 1, text } => Some(strip_link_syntax(text).trim().to_string()),
            _ => None,
        }),
        owner: doc
            .label("owner")
            .and_then(bracketed_or_plain)
            .or_else(|| doc.label("applicant").and_then(bracketed_or_plain)),
        published: doc.label("published").and_then(date_token),
        updated: doc.label("updated").and_then(date_token),
        description: doc
            .section(SectionKind::Description)
            .and_then(|s| s.captured_text()),
        benefits: doc
            .section(SectionKind::Benefits)
            .and_then(|s| s.captured_text()),
        website: website(doc),
        readiness_level: doc.label("readiness level").map(strip_link_syntax),
        intellectual_property: doc
            .label("intellectual property")
            .map(strip_link_syntax),
        name_localized: doc.label("localized name").map(strip_link_syntax),
        ..Default::default()
    }
}

/// Bracketed value of a label (`Owner [Acme Corp]`), or the plain value (`Owner: Acme Corp`).
pub fn bracketed_or_plain(value: &str) -> Option<String> {
    let captured = match BRACKET_RE.captures(value) {
        Some(caps) => caps[1].trim().to_string(),
        None => value.trim().to_string(),
    };
    if captured.is_empty() {
        None
    } else {
        Some(captured)
    }
}

fn date_token(value: &str) -> Option<String> {
    DATE_RE.captures(value).map(|c| c[1].to_string())
}

/// URL of a "Visit Website" link, else the value of a `Website` label.
fn website(doc: &ParsedDocument) -> Option<String> {
    let visit = doc
        .links()
        .find(|(text, url)| text.to_lowercase().contains("visit website") && !url.is_empty())
        .map(|(_, url)| url.to_string());
    if visit.is_some() {
        return visit;
    }

    let value = doc.label("website").or_else(|| doc.label("visit website"))?;
    if let Some(caps) = LINK_URL_RE.captures(value) {
        return Some(caps[1].to_string());
    }
    value
        .split_whitespace()
        .next()
        .map(|v| v.trim_matches(['[', ']', '<', '>']).to_string())
        .filter(|v| !v.is_empty())
}
