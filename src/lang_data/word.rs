use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One word of an etymology tree; `children` points away from the focal
/// word (towards older ancestors in `parents`, younger descendants in
/// `children`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtymologyNode {
    pub word: String,
    pub lang: String,
    #[serde(default)]
    pub children: Vec<EtymologyNode>,
}

impl EtymologyNode {
    pub fn leaf(word: impl Into<String>, lang: impl Into<String>) -> Self {
        Self { word: word.into(), lang: lang.into(), children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<EtymologyNode>) -> Self {
        self.children = children;
        self
    }

    /// Number of levels below and including this node.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    fn collect_langs(&self, out: &mut BTreeSet<String>) {
        out.insert(self.lang.clone());
        for c in &self.children {
            c.collect_langs(out);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    pub word: String,
    pub lang: String,
    // (isocode, word); same-language entries are synonyms, the rest translations
    #[serde(default)]
    pub synonyms: Vec<(String, String)>,
    // other languages spelling the same word
    #[serde(default)]
    pub homographs: Vec<String>,
    #[serde(default)]
    pub parents: Vec<EtymologyNode>,
    #[serde(default)]
    pub children: Vec<EtymologyNode>,
}

impl WordInfo {
    pub fn new(word: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            lang: lang.into(),
            synonyms: Vec::new(),
            homographs: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn same_language_synonyms(&self) -> impl Iterator<Item = &(String, String)> {
        self.synonyms.iter().filter(move |(l, _)| *l == self.lang)
    }

    pub fn translations(&self) -> impl Iterator<Item = &(String, String)> {
        self.synonyms.iter().filter(move |(l, _)| *l != self.lang)
    }

    /// Language chains from this word to every oldest known ancestor, one
    /// chain per ancestry leaf. A word without parents has no chain.
    pub fn ancestry_paths(&self) -> Vec<Vec<String>> {
        fn walk(node: &EtymologyNode, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
            prefix.push(node.lang.clone());
            if node.children.is_empty() {
                out.push(prefix.clone());
            }
            for c in &node.children {
                walk(c, prefix, out);
            }
            prefix.pop();
        }

        let mut out = Vec::new();
        let mut prefix = vec![self.lang.clone()];
        for p in &self.parents {
            walk(p, &mut prefix, &mut out);
        }
        out
    }

    /// Every language mentioned by the word, its trees and its synonyms.
    pub fn languages(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        out.insert(self.lang.clone());
        for n in self.parents.iter().chain(self.children.iter()) {
            n.collect_langs(&mut out);
        }
        out
    }
}
