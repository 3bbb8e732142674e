use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("fetch of {id} timed out")]
    Timeout { id: String },

    #[error("HTTP {status} for {id}")]
    Status { id: String, status: u16 },

    #[error("request for {id} failed: {source}")]
    Http {
        id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no document for {0}")]
    NotFound(String),

    #[error("empty document for {0}")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("label serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected CSV header: expected {expected} columns, found {found}")]
    Schema { expected: usize, found: usize },

    #[error("unexpected CSV header: column {column} should be '{expected}', found '{found}'")]
    Header {
        column: usize,
        expected: &'static str,
        found: String,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no identifiers supplied")]
    NoIdentifiers,
}
