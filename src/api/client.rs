//! Blocking HTTP client for the Etymap API. Calls run on worker threads, so
//! the blocking reqwest client is enough; there is no retry and no cache.

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, CACHE_CONTROL};
use serde::de::DeserializeOwned;

use super::{LangInfo, LookupSource, PairInfo, SearchEntry};
use crate::error::{EtymapError, Result};
use crate::lang_data::word::WordInfo;

pub struct HttpLookup {
    client: Client,
    base: Url,
}

impl HttpLookup {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            anyhow::bail!("API URL {} cannot be used as a base", base_url);
        }
        // path_segments_mut appends after the last segment, drop a trailing '/'
        if base.path().ends_with('/') {
            let trimmed = base.path().trim_end_matches('/').to_string();
            base.set_path(&trimmed);
        }
        Ok(Self { client: Client::builder().build()?, base })
    }

    /// Builds `base/seg1/seg2/...` with every segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments);
        log::debug!("GET {}", url);
        let resp = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .header(ACCEPT_CHARSET, "utf-8")
            .header(CACHE_CONTROL, "no-cache")
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EtymapError::Status { status: status.as_u16(), url: url.to_string() });
        }
        let body = resp.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl LookupSource for HttpLookup {
    fn word(&self, word: &str, lang: &str) -> Result<WordInfo> {
        self.get_json(&["word", word, lang])
    }

    fn language(&self, iso: &str) -> Result<LangInfo> {
        self.get_json(&["lang", iso])
    }

    fn pair(&self, src: &str, dst: &str) -> Result<PairInfo> {
        self.get_json(&["relation", src, dst])
    }

    fn search(&self, query: &str) -> Result<Vec<SearchEntry>> {
        self.get_json(&["search", query])
    }
}
