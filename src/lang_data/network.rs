use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EtymapError, Result};

pub type Isocode = String;

// (other isocode, word count) as stored in lang_network.json
pub type RelationList = Vec<(Isocode, u64)>;
pub type ProportionList = Vec<(Isocode, f64)>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Language {
    #[serde(default)]
    pub isocode: Isocode,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    // Number of documented words, drives marker visibility; None when the
    // source has no count column
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub mean_length: Option<f64>,
    #[serde(default)]
    pub median_length: Option<f64>,
    // letter -> relative frequency
    #[serde(default)]
    pub letters: BTreeMap<String, f64>,
}

impl Language {
    /// Letters sorted by frequency, most frequent first.
    pub fn top_letters(&self, n: usize) -> Vec<(&str, f64)> {
        let mut v: Vec<(&str, f64)> = self.letters.iter().map(|(l, f)| (l.as_str(), *f)).collect();
        v.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        v.truncate(n);
        v
    }
}

/// The JSON bundle as shipped: coordinates plus raw, unsorted relation lists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawNetwork {
    pub locations: HashMap<Isocode, Language>,
    #[serde(default)]
    pub from: HashMap<Isocode, RelationList>,
    #[serde(default)]
    pub to: HashMap<Isocode, RelationList>,
}

/// Reference tables derived once from a [`RawNetwork`].
///
/// `from[iso]` holds the pairs `(other, count)` for words flowing from `iso`
/// to `other`, `to[iso]` the pairs for words flowing from `other` to `iso`.
/// Every key and every `other` is present in the coordinate table.
#[derive(Clone, Debug, Default)]
pub struct LanguageNetwork {
    languages: BTreeMap<Isocode, Language>,
    from: HashMap<Isocode, RelationList>,
    to: HashMap<Isocode, RelationList>,
    from_proportion: HashMap<Isocode, ProportionList>,
    to_proportion: HashMap<Isocode, ProportionList>,
    relation: HashMap<Isocode, HashMap<Isocode, u64>>,
}

impl LanguageNetwork {
    pub fn build(raw: RawNetwork) -> Self {
        let mut languages = BTreeMap::new();
        for (iso, mut lang) in raw.locations {
            if !lang.longitude.is_finite() || !lang.latitude.is_finite() {
                log::warn!("dropping language {} without a usable coordinate", iso);
                continue;
            }
            lang.isocode = iso.clone();
            languages.insert(iso, lang);
        }

        let from = Self::clean_relations(raw.from, &languages);
        let to = Self::clean_relations(raw.to, &languages);
        let from_proportion = Self::proportions(&from);
        let to_proportion = Self::proportions(&to);

        let mut relation: HashMap<Isocode, HashMap<Isocode, u64>> = HashMap::new();
        for table in [&from, &to] {
            for (iso, list) in table {
                let entry = relation.entry(iso.clone()).or_default();
                for (other, count) in list {
                    *entry.entry(other.clone()).or_insert(0) += count;
                }
            }
        }

        log::info!(
            "language network ready: {} languages, {} sources, {} targets",
            languages.len(),
            from.len(),
            to.len()
        );

        LanguageNetwork { languages, from, to, from_proportion, to_proportion, relation }
    }

    // Removes self relations and isocodes missing from the coordinate table,
    // merges duplicates and sorts by count descending.
    fn clean_relations(
        raw: HashMap<Isocode, RelationList>,
        languages: &BTreeMap<Isocode, Language>,
    ) -> HashMap<Isocode, RelationList> {
        let mut out = HashMap::new();
        let mut dropped = 0usize;
        for (iso, list) in raw {
            if !languages.contains_key(&iso) {
                dropped += list.len();
                continue;
            }
            let mut merged: HashMap<Isocode, u64> = HashMap::new();
            for (other, count) in list {
                if other == iso {
                    continue;
                }
                if !languages.contains_key(&other) {
                    dropped += 1;
                    continue;
                }
                *merged.entry(other).or_insert(0) += count;
            }
            let mut sorted: RelationList = merged.into_iter().filter(|(_, c)| *c > 0).collect();
            sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            out.insert(iso, sorted);
        }
        if dropped > 0 {
            log::debug!("dropped {} relation entries referencing unknown languages", dropped);
        }
        out
    }

    fn proportions(table: &HashMap<Isocode, RelationList>) -> HashMap<Isocode, ProportionList> {
        table
            .iter()
            .map(|(iso, list)| {
                let total: u64 = list.iter().map(|(_, c)| *c).sum();
                let props = if total == 0 {
                    Vec::new()
                } else {
                    list.iter().map(|(o, c)| (o.clone(), *c as f64 / total as f64)).collect()
                };
                (iso.clone(), props)
            })
            .collect()
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawNetwork = serde_json::from_str(s)?;
        Ok(Self::build(raw))
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    /// Builds the network from the coordinate and relation CSV exports
    /// (`isocode,name,longitude,latitude[,count]` and `src_lang,to_lang,count`).
    pub fn load_csv(coordinates: &Path, relations: &Path) -> Result<Self> {
        let coords = csv::Reader::from_path(coordinates)?;
        let rels = csv::Reader::from_path(relations)?;
        Self::from_csv_readers(coords, rels)
    }

    pub fn from_csv_readers<R1: std::io::Read, R2: std::io::Read>(
        mut coordinates: csv::Reader<R1>,
        mut relations: csv::Reader<R2>,
    ) -> Result<Self> {
        #[derive(Deserialize)]
        struct CoordRow {
            isocode: Option<String>,
            #[serde(default)]
            name: Option<String>,
            longitude: Option<String>,
            latitude: Option<String>,
            #[serde(default)]
            count: Option<String>,
        }
        #[derive(Deserialize)]
        struct RelationRow {
            src_lang: String,
            to_lang: String,
            count: String,
        }

        let mut raw = RawNetwork::default();
        for row in coordinates.deserialize::<CoordRow>() {
            let row = row?;
            let iso = match row.isocode.filter(|s| !s.is_empty()) {
                Some(iso) => iso,
                None => continue,
            };
            let parse = |s: Option<String>| s.and_then(|v| v.trim().parse::<f64>().ok()).filter(|v| v.is_finite());
            let (Some(longitude), Some(latitude)) = (parse(row.longitude), parse(row.latitude)) else {
                continue;
            };
            let count = row.count.and_then(|c| c.trim().parse::<u64>().ok());
            raw.locations.insert(
                iso.clone(),
                Language {
                    isocode: iso.clone(),
                    name: row.name.unwrap_or_else(|| iso.clone()),
                    longitude,
                    latitude,
                    count,
                    mean_length: None,
                    median_length: None,
                    letters: BTreeMap::new(),
                },
            );
        }
        for row in relations.deserialize::<RelationRow>() {
            let row = row?;
            let Ok(count) = row.count.trim().parse::<f64>() else { continue };
            if count <= 0.0 {
                continue;
            }
            let count = count.round() as u64;
            raw.from.entry(row.src_lang.clone()).or_default().push((row.to_lang.clone(), count));
            raw.to.entry(row.to_lang).or_default().push((row.src_lang, count));
        }
        Ok(Self::build(raw))
    }

    pub fn language(&self, iso: &str) -> Result<&Language> {
        self.languages.get(iso).ok_or_else(|| EtymapError::UnknownLanguage(iso.to_string()))
    }

    pub fn contains(&self, iso: &str) -> bool {
        self.languages.contains_key(iso)
    }

    /// Display name, falling back to the raw isocode for unknown languages.
    pub fn name_or_code<'a>(&'a self, iso: &'a str) -> &'a str {
        self.languages.get(iso).map(|l| l.name.as_str()).unwrap_or(iso)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.languages.values()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    pub fn from(&self, iso: &str) -> &[(Isocode, u64)] {
        self.from.get(iso).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn to(&self, iso: &str) -> &[(Isocode, u64)] {
        self.to.get(iso).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn from_proportion(&self, iso: &str) -> &[(Isocode, f64)] {
        self.from_proportion.get(iso).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn to_proportion(&self, iso: &str) -> &[(Isocode, f64)] {
        self.to_proportion.get(iso).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn relation(&self, iso: &str) -> Option<&HashMap<Isocode, u64>> {
        self.relation.get(iso)
    }

    pub fn relation_between(&self, a: &str, b: &str) -> u64 {
        self.relation.get(a).and_then(|m| m.get(b)).copied().unwrap_or(0)
    }

    /// Words counted from `src` to `dst`, if the relation exists.
    pub fn count_from(&self, src: &str, dst: &str) -> Option<u64> {
        self.from(src).iter().find(|(o, _)| o == dst).map(|(_, c)| *c)
    }

    pub fn count_to(&self, iso: &str, other: &str) -> Option<u64> {
        self.to(iso).iter().find(|(o, _)| o == other).map(|(_, c)| *c)
    }

    pub fn proportion_from(&self, src: &str, dst: &str) -> Option<f64> {
        self.from_proportion(src).iter().find(|(o, _)| o == dst).map(|(_, p)| *p)
    }

    /// Strongest partners by the symmetric relation index, descending.
    pub fn strongest_partners(&self, iso: &str, n: usize) -> Vec<Isocode> {
        let Some(rel) = self.relation.get(iso) else { return Vec::new() };
        let mut v: Vec<(&Isocode, u64)> = rel.iter().map(|(o, c)| (o, *c)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        v.into_iter().take(n).map(|(o, _)| o.clone()).collect()
    }
}
