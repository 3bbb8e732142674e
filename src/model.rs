use serde::{Deserialize, Serialize};

/// Raw document as handed over by a fetcher.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub external_id: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(external_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            text: text.into(),
        }
    }

    /// `None` when the identifier is not a plain unsigned integer.
    pub fn numeric_id(&self) -> Option<u64> {
        self.external_id.trim().parse::<u64>().ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvenanceCategory {
    PatentImport,
    #[default]
    UserUpload,
    LegacyTransfer,
}

impl ProvenanceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceCategory::PatentImport => "patent-import",
            ProvenanceCategory::UserUpload => "user-upload",
            ProvenanceCategory::LegacyTransfer => "legacy-transfer",
        }
    }
}

impl std::fmt::Display for ProvenanceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record came from. Carried next to the canonical record into the store;
/// none of it is part of the 18-column schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub category: ProvenanceCategory,
    pub uploader: Option<String>,
    pub source_label: Option<String>,
    pub institution: Option<String>,
    pub source_attribution: Option<String>,
    pub patent_status: Option<bool>,
}

impl Provenance {
    pub fn from_partial(category: ProvenanceCategory, partial: &PartialRecord) -> Self {
        Self {
            category,
            uploader: partial.uploader.clone(),
            source_label: partial.source_label.clone(),
            institution: partial.institution.clone(),
            source_attribution: partial.source_attribution.clone(),
            patent_status: partial.patent_status,
        }
    }

    /// Source-acquisition tag to store: the document's own attribution, else `default`.
    pub fn source_tag<'a>(&'a self, default: &'a str) -> &'a str {
        self.source_attribution
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(default)
    }
}

/// Fields captured by the extractors. Every field is optional; a miss leaves it `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub applicant: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub description: Option<String>,
    pub benefits: Option<String>,
    pub website: Option<String>,
    pub readiness_level: Option<String>,
    pub intellectual_property: Option<String>,
    pub name_localized: Option<String>,
    pub patent_status: Option<bool>,
    pub patent_link: Option<String>,
    pub uploader: Option<String>,
    pub source_label: Option<String>,
    pub institution: Option<String>,
    pub source_attribution: Option<String>,
}

macro_rules! fill_missing {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if $dst.$field.is_none() {
                $dst.$field = $src.$field;
            }
        )+
    };
}

impl PartialRecord {
    /// Additive merge: fields already captured in `self` are kept, `overlay` only fills gaps.
    pub fn fill_from(&mut self, overlay: PartialRecord) {
        fill_missing!(
            self,
            overlay,
            id,
            name,
            owner,
            applicant,
            published,
            updated,
            description,
            benefits,
            website,
            readiness_level,
            intellectual_property,
            name_localized,
            patent_status,
            patent_link,
            uploader,
            source_label,
            institution,
            source_attribution,
        );
    }
}

/// The 18-column canonical schema. Empty strings mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanonicalRecord {
    #[serde(rename = "technologyNameEN")]
    pub technology_name_en: String,
    pub id: String,
    pub company_name: String,
    pub published_time: String,
    pub updated_time: String,
    pub company_website_url: String,
    pub technology_image_url: String,
    pub description: String,
    pub benefits: String,
    pub benefits_description: String,
    pub developed_in_country: String,
    pub deployed_in_country: String,
    pub technology_readiness_level: String,
    pub intellectual_property: String,
    pub custom_labels: Vec<String>,
    #[serde(rename = "technologyNameCN")]
    pub technology_name_cn: String,
    pub technology_category: String,
    pub sub_category: String,
}

/// Column order used for CSV serialization.
pub const CSV_COLUMNS: [&str; 18] = [
    "technologyNameEN",
    "id",
    "companyName",
    "publishedTime",
    "updatedTime",
    "companyWebsiteUrl",
    "technologyImageUrl",
    "description",
    "benefits",
    "benefitsDescription",
    "developedInCountry",
    "deployedInCountry",
    "technologyReadinessLevel",
    "intellectualProperty",
    "customLabels",
    "technologyNameCN",
    "technologyCategory",
    "subCategory",
];

impl CanonicalRecord {
    /// Build a record from extracted fields and inferred countries.
    pub fn from_partial(partial: PartialRecord, developed: Option<String>, deployed: Option<String>) -> Self {
        let intellectual_property = partial
            .intellectual_property
            .or(partial.patent_link)
            .unwrap_or_default();
        Self {
            technology_name_en: partial.name.unwrap_or_default(),
            id: partial.id.unwrap_or_default(),
            company_name: partial.owner.unwrap_or_default(),
            published_time: partial.published.unwrap_or_default(),
            updated_time: partial.updated.unwrap_or_default(),
            company_website_url: partial.website.unwrap_or_default(),
            description: partial.description.unwrap_or_default(),
            benefits: partial.benefits.unwrap_or_default(),
            developed_in_country: developed.unwrap_or_default(),
            deployed_in_country: deployed.unwrap_or_default(),
            technology_readiness_level: partial.readiness_level.unwrap_or_default(),
            intellectual_property,
            technology_name_cn: partial.name_localized.unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Values in `CSV_COLUMNS` order, labels joined with `;`.
    pub fn to_row(&self) -> [String; 18] {
        [
            self.technology_name_en.clone(),
            self.id.clone(),
            self.company_name.clone(),
            self.published_time.clone(),
            self.updated_time.clone(),
            self.company_website_url.clone(),
            self.technology_image_url.clone(),
            self.description.clone(),
            self.benefits.clone(),
            self.benefits_description.clone(),
            self.developed_in_country.clone(),
            self.deployed_in_country.clone(),
            self.technology_readiness_level.clone(),
            self.intellectual_property.clone(),
            self.custom_labels.join(";"),
            self.technology_name_cn.clone(),
            self.technology_category.clone(),
            self.sub_category.clone(),
        ]
    }

    /// Inverse of [`to_row`](Self::to_row).
    pub fn from_row(row: &[&str; 18]) -> Self {
        let labels = row[14]
            .split(';')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            technology_name_en: row[0].to_string(),
            id: row[1].to_string(),
            company_name: row[2].to_string(),
            published_time: row[3].to_string(),
            updated_time: row[4].to_string(),
            company_website_url: row[5].to_string(),
            technology_image_url: row[6].to_string(),
            description: row[7].to_string(),
            benefits: row[8].to_string(),
            benefits_description: row[9].to_string(),
            developed_in_country: row[10].to_string(),
            deployed_in_country: row[11].to_string(),
            technology_readiness_level: row[12].to_string(),
            intellectual_property: row[13].to_string(),
            custom_labels: labels,
            technology_name_cn: row[15].to_string(),
            technology_category: row[16].to_string(),
            sub_category: row[17].to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityLevel {
    #[serde(rename = "excellent")]
    Excellent,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "acceptable")]
    Acceptable,
    #[serde(rename = "fair")]
    Fair,
    #[serde(rename = "needs improvement")]
    NeedsImprovement,
}

impl QualityLevel {
    pub fn from_percentage(pct: u8) -> Self {
        match pct {
            90.. => QualityLevel::Excellent,
            80..=89 => QualityLevel::Good,
            70..=79 => QualityLevel::Acceptable,
            60..=69 => QualityLevel::Fair,
            _ => QualityLevel::NeedsImprovement,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Excellent => "excellent",
            QualityLevel::Good => "good",
            QualityLevel::Acceptable => "acceptable",
            QualityLevel::Fair => "fair",
            QualityLevel::NeedsImprovement => "needs improvement",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub id: String,
    pub score: f64,
    pub percentage: u8,
    pub level: QualityLevel,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub missing_fields: Vec<&'static str>,
    pub suggestions: Vec<String>,
}

impl QualityReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_id_rejects_garbage() {
        assert_eq!(SourceDocument::new(" 148955 ", "").numeric_id(), Some(148955));
        assert_eq!(SourceDocument::new("14a", "").numeric_id(), None);
        assert_eq!(SourceDocument::new("", "").numeric_id(), None);
    }

    #[test]
    fn fill_from_keeps_existing() {
        let mut base = PartialRecord {
            owner: Some("Acme".into()),
            ..Default::default()
        };
        base.fill_from(PartialRecord {
            owner: Some("Other".into()),
            uploader: Some("jane".into()),
            ..Default::default()
        });
        assert_eq!(base.owner.as_deref(), Some("Acme"));
        assert_eq!(base.uploader.as_deref(), Some("jane"));
    }

    #[test]
    fn provenance_source_tag_prefers_attribution() {
        let partial = PartialRecord {
            source_attribution: Some("legacy-technology-transfer".into()),
            institution: Some("University of Nairobi".into()),
            ..Default::default()
        };
        let prov = Provenance::from_partial(ProvenanceCategory::LegacyTransfer, &partial);
        assert_eq!(prov.source_tag("wipo-green"), "legacy-technology-transfer");
        assert_eq!(prov.institution.as_deref(), Some("University of Nairobi"));

        let blank = Provenance {
            source_attribution: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(blank.source_tag("wipo-green"), "wipo-green");
        assert_eq!(blank.category, ProvenanceCategory::UserUpload);
    }

    #[test]
    fn level_thresholds_are_inclusive() {
        assert_eq!(QualityLevel::from_percentage(90), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_percentage(89), QualityLevel::Good);
        assert_eq!(QualityLevel::from_percentage(80), QualityLevel::Good);
        assert_eq!(QualityLevel::from_percentage(70), QualityLevel::Acceptable);
        assert_eq!(QualityLevel::from_percentage(60), QualityLevel::Fair);
        assert_eq!(QualityLevel::from_percentage(59), QualityLevel::NeedsImprovement);
    }

    #[test]
    fn json_uses_schema_names() {
        let rec = CanonicalRecord {
            technology_name_en: "EnergySail".into(),
            id: "171616".into(),
            custom_labels: vec!["Wind energy".into()],
            ..Default::default()
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["technologyNameEN"], "EnergySail");
        assert_eq!(v["technologyNameCN"], "");
        assert_eq!(v["customLabels"][0], "Wind energy");
        assert!(v.get("companyWebsiteUrl").is_some());
    }
}
