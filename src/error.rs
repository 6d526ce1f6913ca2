//! Error types shared by the reference data, the lookups and the renderers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtymapError>;

#[derive(Debug, Error)]
pub enum EtymapError {
    /// The isocode has no entry in the coordinate table.
    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    #[error("unknown word {word:?} in language {lang}")]
    UnknownWord { word: String, lang: String },

    #[error("no relation recorded from {src} to {dst}")]
    NoRelation { src: String, dst: String },

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtymapError {
    /// True for lookups that failed because the data has no such entry, as
    /// opposed to transport or decoding failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EtymapError::UnknownLanguage(_) | EtymapError::UnknownWord { .. } | EtymapError::NoRelation { .. }
        ) || matches!(self, EtymapError::Status { status: 404, .. })
    }
}
