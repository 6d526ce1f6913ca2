//! Server-side lookup tables, read from the JSON index files in the data
//! directory. Keys follow the export format: `"lang:word"` for words and
//! `"{src}{dst}"` for language pairs.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::api::{LangInfo, LookupSource, PairInfo, SearchEntry};
use crate::error::{EtymapError, Result};
use crate::lang_data::word::{EtymologyNode, WordInfo};

pub const SEARCH_LIMIT: usize = 20;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LangEntry {
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct DataIndex {
    pub langs: BTreeMap<String, LangEntry>,
    pub word_langs: HashMap<String, Vec<String>>,
    pub meanings: HashMap<String, Vec<String>>,
    pub parents: HashMap<String, Vec<String>>,
    pub children: HashMap<String, Vec<String>>,
    pub lang_samples: HashMap<String, Vec<String>>,
    pub relation_samples: HashMap<String, Vec<String>>,
}

fn read_json<T: DeserializeOwned + Default>(dir: &Path, name: &str, required: bool) -> Result<T> {
    let path = dir.join(name);
    if !path.exists() && !required {
        log::warn!("index file {} missing, using an empty table", path.display());
        return Ok(T::default());
    }
    let s = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&s)?)
}

fn word_key(lang: &str, word: &str) -> String {
    format!("{}:{}", lang, word)
}

fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(':')
}

impl DataIndex {
    pub fn load(dir: &Path) -> Result<Self> {
        let idx = DataIndex {
            langs: read_json(dir, "langs.json", true)?,
            word_langs: read_json(dir, "word_langs.json", false)?,
            meanings: read_json(dir, "meanings.json", false)?,
            parents: read_json(dir, "parents.json", false)?,
            children: read_json(dir, "children.json", false)?,
            lang_samples: read_json(dir, "lang_samples.json", false)?,
            relation_samples: read_json(dir, "relation_samples.json", false)?,
        };
        log::info!(
            "data index loaded from {}: {} languages, {} words",
            dir.display(),
            idx.langs.len(),
            idx.word_langs.len()
        );
        Ok(idx)
    }

    pub fn lang_name(&self, iso: &str) -> Option<&str> {
        self.langs.get(iso).map(|l| l.name.as_str())
    }

    fn require_lang(&self, iso: &str) -> Result<&LangEntry> {
        self.langs.get(iso).ok_or_else(|| EtymapError::UnknownLanguage(iso.to_string()))
    }

    /// Expands `key` through `mapping` into a tree. A key already on the
    /// current ancestry path is not expanded again, so cycles in the index
    /// terminate.
    pub fn tree(&self, key: &str, mapping: &HashMap<String, Vec<String>>) -> Vec<EtymologyNode> {
        let mut path = vec![key.to_string()];
        self.expand(key, mapping, &mut path)
    }

    fn expand(&self, key: &str, mapping: &HashMap<String, Vec<String>>, path: &mut Vec<String>) -> Vec<EtymologyNode> {
        let Some(next) = mapping.get(key) else { return Vec::new() };
        let mut out = Vec::with_capacity(next.len());
        for k in next {
            let Some((lang, word)) = split_key(k) else {
                log::debug!("skipping malformed index key {:?}", k);
                continue;
            };
            if path.iter().any(|p| p == k) {
                out.push(EtymologyNode::leaf(word, lang));
                continue;
            }
            path.push(k.clone());
            let children = self.expand(k, mapping, path);
            path.pop();
            out.push(EtymologyNode::leaf(word, lang).with_children(children));
        }
        out
    }

    fn knows_word(&self, word: &str, lang: &str) -> bool {
        let key = word_key(lang, word);
        self.word_langs.get(word).is_some_and(|ls| ls.iter().any(|l| l == lang))
            || self.meanings.contains_key(&key)
            || self.parents.contains_key(&key)
            || self.children.contains_key(&key)
    }
}

impl LookupSource for DataIndex {
    fn word(&self, word: &str, lang: &str) -> Result<WordInfo> {
        if !self.knows_word(word, lang) {
            return Err(EtymapError::UnknownWord { word: word.to_string(), lang: lang.to_string() });
        }
        let key = word_key(lang, word);
        let synonyms = self
            .meanings
            .get(&key)
            .map(|ms| {
                ms.iter()
                    .filter_map(|m| split_key(m))
                    .map(|(l, w)| (l.to_string(), w.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let homographs = self
            .word_langs
            .get(word)
            .map(|ls| ls.iter().filter(|l| *l != lang).cloned().collect())
            .unwrap_or_default();
        Ok(WordInfo {
            word: word.to_string(),
            lang: lang.to_string(),
            synonyms,
            homographs,
            parents: self.tree(&key, &self.parents),
            children: self.tree(&key, &self.children),
        })
    }

    fn language(&self, iso: &str) -> Result<LangInfo> {
        let entry = self.require_lang(iso)?;
        Ok(LangInfo {
            lang: iso.to_string(),
            name: Some(entry.name.clone()),
            samples: self.lang_samples.get(iso).cloned().unwrap_or_default(),
        })
    }

    fn pair(&self, src: &str, dst: &str) -> Result<PairInfo> {
        self.require_lang(src)?;
        self.require_lang(dst)?;
        Ok(PairInfo {
            lang_src: src.to_string(),
            lang_to: dst.to_string(),
            samples: self.relation_samples.get(&format!("{}{}", src, dst)).cloned().unwrap_or_default(),
        })
    }

    fn search(&self, query: &str) -> Result<Vec<SearchEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        if let Some(langs) = self.word_langs.get(query) {
            for l in langs {
                out.push(SearchEntry { word: Some(query.to_string()), lang: l.clone() });
            }
        }
        let needle = query.to_lowercase();
        let mut by_name: Vec<(&String, &LangEntry)> = self
            .langs
            .iter()
            .filter(|(iso, l)| l.name.to_lowercase().starts_with(&needle) || iso.as_str() == needle)
            .collect();
        by_name.sort_by(|a, b| a.1.name.cmp(&b.1.name).then_with(|| a.0.cmp(b.0)));
        out.extend(by_name.into_iter().map(|(iso, _)| SearchEntry { word: None, lang: iso.clone() }));
        out.truncate(SEARCH_LIMIT);
        Ok(out)
    }
}
