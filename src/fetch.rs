use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::FetchError;
use crate::model::SourceDocument;

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Per-item document source. Timeouts are the fetcher's responsibility.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, external_id: &str) -> Result<SourceDocument, FetchError>;
}

/// Fetches `url_template` with `{id}` substituted.
pub struct HttpFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl HttpFetcher {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Http {
                id: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    fn url_for(&self, id: &str) -> String {
        self.url_template.replace("{id}", id)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, external_id: &str) -> Result<SourceDocument, FetchError> {
        let url = self.url_for(external_id);
        let start = Instant::now();
        let map_err = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    id: external_id.to_string(),
                }
            } else {
                FetchError::Http {
                    id: external_id.to_string(),
                    source,
                }
            }
        };

        let response = self.client.get(&url).send().await.map_err(map_err)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(external_id.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                id: external_id.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(map_err)?;
        debug!(%url, latency_ms = start.elapsed().as_millis() as u64, "fetched");
        document(external_id, &body)
    }
}

/// Reads `<dir>/<id>.md` (or `.txt`) from disk.
pub struct DirFetcher {
    dir: PathBuf,
}

impl DirFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Fetcher for DirFetcher {
    async fn fetch(&self, external_id: &str) -> Result<SourceDocument, FetchError> {
        for ext in ["md", "txt"] {
            let path = self.dir.join(format!("{}.{}", external_id, ext));
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => return document(external_id, &text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(FetchError::NotFound(external_id.to_string()))
    }
}

fn document(external_id: &str, body: &str) -> Result<SourceDocument, FetchError> {
    let text = strip_images(body);
    if text.trim().is_empty() {
        return Err(FetchError::Empty(external_id.to_string()));
    }
    Ok(SourceDocument::new(external_id, text))
}

/// Remove markdown image syntax and collapse the blank runs it leaves behind.
pub fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

/// Split a user-supplied identifier list on commas, whitespace and newlines, keeping order
/// and dropping repeats.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}
