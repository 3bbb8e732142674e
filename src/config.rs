use std::path::PathBuf;

use serde::Deserialize;

const CONFIG_FILE: &str = "tech_ingest";
const ENV_PREFIX: &str = "TECH_INGEST";

/// Runtime settings. Loaded from an optional `tech_ingest.toml` and
/// `TECH_INGEST_*` environment variables (nested keys use `__`).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub classifier: ClassifierSettings,
    pub fetch: FetchSettings,
    pub import: ImportMetadata,
    pub image_url_base: ImageUrlBase,
    pub db_path: DbPath,
}

/// Identifier watermarks used by the page classifier.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierSettings {
    pub patent_min_id: u64,
    pub upload_min_id: u64,
    pub legacy_max_id: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            patent_min_id: 200_000,
            upload_min_id: 140_000,
            legacy_max_id: 100_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Page URL template; `{id}` is replaced by the external identifier.
    pub url_template: String,
    pub timeout_secs: u64,
    pub interval_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            url_template: "https://wipogreen.wipo.int/wipogreen-database/articles/{id}".to_string(),
            timeout_secs: 30,
            interval_ms: 1500,
        }
    }
}

/// Fixed metadata stamped on every imported record.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImportMetadata {
    pub source_tag: String,
    pub category_id: String,
    pub subcategory_id: String,
}

impl Default for ImportMetadata {
    fn default() -> Self {
        Self {
            source_tag: "wipo-green-import".to_string(),
            category_id: "clean-energy".to_string(),
            subcategory_id: "renewables".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ImageUrlBase(pub String);

impl Default for ImageUrlBase {
    fn default() -> Self {
        Self("https://wipogreen.wipo.int/wipogreen-database/images".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct DbPath(pub PathBuf);

impl Default for DbPath {
    fn default() -> Self {
        Self(PathBuf::from("data/technologies.sqlite"))
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
