use std::collections::HashSet;
use std::fmt;

use crate::lookup::{is_text_placeholder, BENEFIT_CLAUSES, BENEFIT_CLOSING, KEYWORD_LABELS};

pub const MAX_LABELS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    ImageUrl(String),
    DateDelimiter { field: &'static str, value: String },
    WebsiteScheme(String),
    DuplicateLabels(usize),
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::ImageUrl(url) => write!(f, "image url set to {}", url),
            Repair::DateDelimiter { field, value } => write!(f, "{} normalized to {}", field, value),
            Repair::WebsiteScheme(url) => write!(f, "website normalized to {}", url),
            Repair::DuplicateLabels(n) => write!(f, "removed {} duplicate labels", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enhancement {
    Labels(Vec<String>),
    BenefitsDescription(String),
}

impl fmt::Display for Enhancement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Enhancement::Labels(labels) => write!(f, "labels derived: {}", labels.join(", ")),
            Enhancement::BenefitsDescription(_) => f.write_str("benefits description synthesized"),
        }
    }
}

/// Fixes structural problems in place. Running it twice changes nothing the second time.
pub fn repair(record: &mut crate::model::CanonicalRecord, image_url_base: &str) -> Vec<Repair> {
    let mut applied = Vec::new();

    if record.technology_image_url.trim().is_empty() && !record.id.trim().is_empty() {
        let url = format!("{}/{}.jpg", image_url_base.trim_end_matches('/'), record.id.trim());
        record.technology_image_url = url.clone();
        applied.push(Repair::ImageUrl(url));
    }

    for (field, value) in [
        ("publishedTime", &mut record.published_time),
        ("updatedTime", &mut record.updated_time),
    ] {
        if value.contains('-') {
            *value = value.trim().replace('-', "/");
            applied.push(Repair::DateDelimiter {
                field,
                value: value.clone(),
            });
        }
    }

    let site = record.company_website_url.trim();
    let fixed = match site.split_once("://") {
        _ if site.is_empty() => None,
        None => Some(format!("https://{}", site)),
        Some((scheme, rest)) if scheme.chars().any(|c| c.is_ascii_uppercase()) => {
            Some(format!("{}://{}", scheme.to_ascii_lowercase(), rest))
        }
        Some(_) => None,
    };
    if let Some(fixed) = fixed {
        record.company_website_url = fixed.clone();
        applied.push(Repair::WebsiteScheme(fixed));
    }

    let before = record.custom_labels.len();
    dedup_preserving_order(&mut record.custom_labels);
    if record.custom_labels.len() < before {
        applied.push(Repair::DuplicateLabels(before - record.custom_labels.len()));
    }

    applied
}

/// Best-effort synthesis of labels and benefits narrative. Existing values are never replaced.
pub fn enhance(record: &mut crate::model::CanonicalRecord) -> Vec<Enhancement> {
    let mut applied = Vec::new();

    if record.custom_labels.is_empty() {
        let labels = derive_labels(&record.technology_name_en, &record.description);
        if !labels.is_empty() {
            record.custom_labels = labels.clone();
            applied.push(Enhancement::Labels(labels));
        }
    }

    if is_text_placeholder(&record.benefits_description) {
        if let Some(text) = synthesize_benefits(&record.benefits) {
            record.benefits_description = text.clone();
            applied.push(Enhancement::BenefitsDescription(text));
        }
    }

    applied
}

/// Labels whose keyword appears in name or description, highest priority first
/// (table order on ties), de-duplicated and capped at [`MAX_LABELS`].
pub fn derive_labels(name: &str, description: &str) -> Vec<String> {
    let haystack = format!("{} {}", name, description).to_lowercase();
    let mut hits: Vec<(usize, &str, u8)> = KEYWORD_LABELS
        .iter()
        .enumerate()
        .filter(|(_, (kw, _, _))| haystack.contains(kw))
        .map(|(idx, (_, label, prio))| (idx, *label, *prio))
        .collect();
    hits.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut labels: Vec<String> = hits.into_iter().map(|(_, l, _)| l.to_string()).collect();
    dedup_preserving_order(&mut labels);
    labels.truncate(MAX_LABELS);
    labels
}

/// Join the clauses triggered by the benefits tag and close with the fixed clause.
pub fn synthesize_benefits(benefits: &str) -> Option<String> {
    let lower = benefits.to_lowercase();
    let clauses: Vec<&str> = BENEFIT_CLAUSES
        .iter()
        .filter(|(key, _)| lower.contains(key))
        .map(|(_, clause)| *clause)
        .collect();
    if clauses.is_empty() {
        return None;
    }
    let mut text = clauses.join(", ");
    if let Some(first) = text.get(..1) {
        text = first.to_uppercase() + &text[1..];
    }
    Some(format!("{}, {}", text, BENEFIT_CLOSING))
}

fn dedup_preserving_order(labels: &mut Vec<String>) {
    let mut seen = HashSet::new();
    labels.retain(|l| seen.insert(l.trim().to_lowercase()));
}
