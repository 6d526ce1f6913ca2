use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lang_data::word::WordInfo;

pub mod client;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LangInfo {
    pub lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub samples: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairInfo {
    pub lang_src: String,
    pub lang_to: String,
    #[serde(default)]
    pub samples: Vec<String>,
}

/// A search suggestion: a word in a language, or a language alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    pub lang: String,
}

/// The four read-only lookups behind the explorer. Implemented over HTTP by
/// [`client::HttpLookup`] and in-process by
/// [`crate::lang_data::index::DataIndex`].
pub trait LookupSource: Send + Sync {
    fn word(&self, word: &str, lang: &str) -> Result<WordInfo>;
    fn language(&self, iso: &str) -> Result<LangInfo>;
    fn pair(&self, src: &str, dst: &str) -> Result<PairInfo>;
    fn search(&self, query: &str) -> Result<Vec<SearchEntry>>;
}

// Server lifecycle API (feature-gated). Non-server builds get no-op stubs.
#[cfg(feature = "server")]
pub mod server;

#[cfg(not(feature = "server"))]
pub mod server {
    use std::sync::Arc;

    use crate::lang_data::index::DataIndex;
    use crate::persistence::settings::AppSettings;

    pub fn start_server(_cfg: &AppSettings, _index: Arc<DataIndex>) -> anyhow::Result<()> {
        anyhow::bail!("built without the `server` feature")
    }
    pub fn stop_server() {}
    pub fn is_running() -> bool { false }
}
