// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Fetch failed or returned nothing usable (non-2xx, empty body, transport error).
    #[error("source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    /// No row of the sheet carried any of the expected header markers.
    #[error("header row not found in {source_id}")]
    HeaderNotFound { source_id: String },

    /// A recording (or other linked file) could not be resolved.
    /// `fallback` is the link to open the original location instead.
    #[error("resource missing: {url}")]
    ResourceMissing {
        url: String,
        fallback: Option<String>,
    },

    #[error("no usable data for {dashboard}")]
    NoUsableData { dashboard: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn unavailable(source_id: impl ToString, reason: impl ToString) -> Self {
        Error::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors that are answered by substituting sample data.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable { .. } | Error::HeaderNotFound { .. }
        )
    }
}
