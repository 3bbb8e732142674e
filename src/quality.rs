//! Weighted completeness/consistency scoring.
//!
//! | part | weight |
//! |---|---|
//! | required fields filled | 40 |
//! | important fields filled | 30 |
//! | enhancement criteria met (3) | 20 |
//! | consistency (10 − 2 per warning), scaled by important fill | 10 |

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::infer::country_from_website;
use crate::lookup::{is_owner_placeholder, is_text_placeholder};
use crate::model::{CanonicalRecord, QualityLevel, QualityReport};

static DATE_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}$").unwrap());
static LEGAL_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[,\s]+(co\.?,?\s*ltd\.?|ltd\.?|limited|inc\.?|corp\.?|corporation|gmbh|ag|s\.?a\.?|plc|llc|b\.?v\.?|a/s|oy)\s*$").unwrap()
});

const REQUIRED_WEIGHT: f64 = 40.0;
const IMPORTANT_WEIGHT: f64 = 30.0;
const ENHANCEMENT_WEIGHT: f64 = 20.0;
const ENHANCEMENT_CRITERIA: f64 = 3.0;
const CONSISTENCY_WEIGHT: f64 = 10.0;
const WARNING_PENALTY: f64 = 2.0;

fn required_fields(r: &CanonicalRecord) -> [(&'static str, &str); 5] {
    [
        ("id", &r.id),
        ("technologyNameEN", &r.technology_name_en),
        ("companyName", &r.company_name),
        ("publishedTime", &r.published_time),
        ("description", &r.description),
    ]
}

fn important_fields(r: &CanonicalRecord) -> [(&'static str, &str); 5] {
    [
        ("companyWebsiteUrl", &r.company_website_url),
        ("benefits", &r.benefits),
        ("developedInCountry", &r.developed_in_country),
        ("deployedInCountry", &r.deployed_in_country),
        ("technologyReadinessLevel", &r.technology_readiness_level),
    ]
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn score(record: &CanonicalRecord) -> QualityReport {
    let required = required_fields(record);
    let important = important_fields(record);

    let required_ratio = ratio(&required);
    let important_ratio = ratio(&important);

    let enhancements = [
        filled(&record.benefits_description) && !is_text_placeholder(&record.benefits_description),
        !record.custom_labels.is_empty(),
        filled(&record.technology_name_cn) || filled(&record.intellectual_property),
    ];
    let enhancement_met = enhancements.iter().filter(|e| **e).count() as f64;

    let warnings = consistency_warnings(record);
    let consistency = (CONSISTENCY_WEIGHT - WARNING_PENALTY * warnings.len() as f64).max(0.0)
        * important_ratio;

    let raw = required_ratio * REQUIRED_WEIGHT
        + important_ratio * IMPORTANT_WEIGHT
        + enhancement_met * (ENHANCEMENT_WEIGHT / ENHANCEMENT_CRITERIA)
        + consistency;
    let score = (raw * 100.0).round() / 100.0;
    let percentage = score.round().clamp(0.0, 100.0) as u8;

    let missing_fields: Vec<&'static str> = required
        .iter()
        .chain(important.iter())
        .filter(|(_, v)| !filled(v))
        .map(|(name, _)| *name)
        .collect();

    QualityReport {
        id: record.id.clone(),
        score,
        percentage,
        level: QualityLevel::from_percentage(percentage),
        errors: validation_errors(record),
        warnings,
        suggestions: suggestions(record, &missing_fields, &enhancements),
        missing_fields,
    }
}

fn ratio(fields: &[(&'static str, &str)]) -> f64 {
    let n = fields.iter().filter(|(_, v)| filled(v)).count();
    n as f64 / fields.len() as f64
}

fn consistency_warnings(record: &CanonicalRecord) -> Vec<String> {
    let mut warnings = Vec::new();

    if filled(&record.developed_in_country) {
        if let Some(site_country) = country_from_website(&record.company_website_url) {
            if !site_country.eq_ignore_ascii_case(record.developed_in_country.trim()) {
                warnings.push(format!(
                    "website domain suggests {} but developedInCountry is {}",
                    site_country, record.developed_in_country
                ));
            }
        }
    }

    let owner = record.company_name.trim();
    if filled(owner) && filled(&record.description) && !is_owner_placeholder(owner) {
        let core = core_owner_name(owner).to_lowercase();
        if !record.description.to_lowercase().contains(&core) {
            warnings.push(format!("owner '{}' is not mentioned in the description", owner));
        }
    }

    warnings
}

/// Owner name without a trailing legal-form suffix ("Acme Co., Ltd." → "Acme").
fn core_owner_name(owner: &str) -> &str {
    match LEGAL_SUFFIX_RE.find(owner) {
        Some(m) if m.start() > 0 => owner[..m.start()].trim(),
        _ => owner.trim(),
    }
}

fn validation_errors(record: &CanonicalRecord) -> Vec<String> {
    let mut errors: Vec<String> = required_fields(record)
        .iter()
        .filter(|(_, v)| !filled(v))
        .map(|(name, _)| format!("required field '{}' is empty", name))
        .collect();

    if filled(&record.id) && !record.id.chars().all(|c| c.is_ascii_digit()) {
        errors.push(format!("id '{}' is not numeric", record.id));
    }

    for (name, value) in [
        ("publishedTime", &record.published_time),
        ("updatedTime", &record.updated_time),
    ] {
        if filled(value) && !is_normalized_date(value) {
            errors.push(format!("{} '{}' is not a YYYY/M/D date", name, value));
        }
    }

    let site = record.company_website_url.trim();
    if filled(site) && !has_web_scheme(site) {
        errors.push(format!("website '{}' has no scheme", site));
    }

    errors
}

/// `http://` or `https://` prefix, any case.
fn has_web_scheme(url: &str) -> bool {
    let head = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

pub fn is_normalized_date(value: &str) -> bool {
    DATE_SHAPE_RE.is_match(value) && NaiveDate::parse_from_str(value, "%Y/%m/%d").is_ok()
}

fn suggestions(record: &CanonicalRecord, missing: &[&'static str], enhancements: &[bool; 3]) -> Vec<String> {
    let mut out: Vec<String> = missing
        .iter()
        .map(|field| format!("fill in {}", field))
        .collect();
    if !enhancements[0] {
        out.push("add a benefits description".to_string());
    }
    if !enhancements[1] {
        out.push("add keyword labels".to_string());
    }
    if !enhancements[2] {
        out.push("add a localized name or intellectual property details".to_string());
    }
    if filled(&record.company_name)
        && filled(&record.description)
        && consistency_warnings(record).iter().any(|w| w.starts_with("owner"))
    {
        out.push("mention the owner in the description".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_only() -> CanonicalRecord {
        CanonicalRecord {
            id: "148955".into(),
            technology_name_en: "Construction and maintenance of wind turbine".into(),
            company_name: "Mitsubishi Heavy Industries, Ltd.".into(),
            published_time: "2023/11/12".into(),
            description: "Mitsubishi Heavy Industries builds wind turbines.".into(),
            ..Default::default()
        }
    }

    fn complete() -> CanonicalRecord {
        CanonicalRecord {
            company_website_url: "https://www.mhi.com".into(),
            benefits: "Greenhouse gases".into(),
            developed_in_country: "Japan".into(),
            deployed_in_country: "Chile".into(),
            technology_readiness_level: "9".into(),
            benefits_description: "It reduces greenhouse gas emissions.".into(),
            custom_labels: vec!["Wind energy".into()],
            technology_name_cn: "风力涡轮机的建造和维护".into(),
            ..required_only()
        }
    }

    #[test]
    fn required_only_scores_forty() {
        let report = score(&required_only());
        assert_eq!(report.score, 40.0);
        assert_eq!(report.percentage, 40);
        assert_eq!(report.level, QualityLevel::NeedsImprovement);
        assert!(report.warnings.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(report.missing_fields.len(), 5);
    }

    #[test]
    fn complete_record_is_excellent() {
        let report = score(&complete());
        assert_eq!(report.score, 100.0);
        assert_eq!(report.level, QualityLevel::Excellent);
        assert!(report.missing_fields.is_empty());
    }

    #[test]
    fn website_country_mismatch_warns() {
        let mut r = complete();
        r.developed_in_country = "Germany".into();
        let report = score(&r);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.score, 98.0);
    }

    #[test]
    fn owner_missing_from_description_warns_unless_placeholder() {
        let mut r = complete();
        r.description = "A turbine service.".into();
        assert_eq!(score(&r).warnings.len(), 1);
        r.company_name = "Unknown".into();
        assert!(score(&r).warnings.is_empty());
    }

    #[test]
    fn legal_suffix_ignored_for_owner_match() {
        assert_eq!(core_owner_name("Eco Marine Power Co. Ltd."), "Eco Marine Power");
        assert_eq!(core_owner_name("Sealtec GmbH"), "Sealtec");
        assert_eq!(core_owner_name("Vestas"), "Vestas");
    }

    #[test]
    fn validation_errors_listed() {
        let r = CanonicalRecord {
            id: "14a".into(),
            published_time: "2023-11-12".into(),
            updated_time: "2023/13/40".into(),
            company_website_url: "www.mhi.com".into(),
            ..Default::default()
        };
        let errors = score(&r).errors;
        assert!(errors.iter().any(|e| e.contains("technologyNameEN")));
        assert!(errors.iter().any(|e| e.contains("not numeric")));
        assert!(errors.iter().any(|e| e.contains("publishedTime")));
        assert!(errors.iter().any(|e| e.contains("updatedTime")));
        assert!(errors.iter().any(|e| e.contains("no scheme")));
    }

    #[test]
    fn uppercase_scheme_accepted() {
        let mut r = complete();
        r.company_website_url = "HTTPS://WWW.MHI.COM".into();
        assert!(score(&r).errors.is_empty(), "{:?}", score(&r).errors);
        assert!(has_web_scheme("Http://a.org"));
        assert!(!has_web_scheme("ftp://a.org"));
        assert!(!has_web_scheme("htt"));
    }

    #[test]
    fn placeholder_benefits_description_does_not_count() {
        let mut r = complete();
        r.benefits_description = "N/A".into();
        assert!(score(&r).score < 100.0);
    }

    fn set_field(r: &mut CanonicalRecord, name: &str, value: &str) {
        let slot = match name {
            "id" => &mut r.id,
            "technologyNameEN" => &mut r.technology_name_en,
            "companyName" => &mut r.company_name,
            "publishedTime" => &mut r.published_time,
            "description" => &mut r.description,
            "companyWebsiteUrl" => &mut r.company_website_url,
            "benefits" => &mut r.benefits,
            "developedInCountry" => &mut r.developed_in_country,
            "deployedInCountry" => &mut r.deployed_in_country,
            "technologyReadinessLevel" => &mut r.technology_readiness_level,
            _ => unreachable!(),
        };
        *slot = value.to_string();
    }

    #[test]
    fn filling_fields_never_lowers_score() {
        // Values picked to provoke consistency warnings when they land
        let values = [
            ("id", "123"),
            ("technologyNameEN", "Tidal kite"),
            ("companyName", "Minesto AB"),
            ("publishedTime", "2020/1/1"),
            ("description", "A tidal kite deployed in Wales."),
            ("companyWebsiteUrl", "https://minesto.de"),
            ("benefits", "Energy"),
            ("developedInCountry", "Sweden"),
            ("deployedInCountry", "United Kingdom"),
            ("technologyReadinessLevel", "7"),
        ];
        // Walk every fill order prefix from several starting points
        for start in 0..values.len() {
            let mut r = CanonicalRecord::default();
            let mut last = score(&r).score;
            for k in 0..values.len() {
                let (name, value) = values[(start + k) % values.len()];
                set_field(&mut r, name, value);
                let now = score(&r).score;
                assert!(now >= last, "filling {} lowered score {} -> {}", name, last, now);
                last = now;
            }
        }
    }
}
