//! Fuzzy search over public components.

use crate::address::ComponentAddress;
use crate::metadata::ComponentMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The searchable view of one public component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub address: ComponentAddress,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub author: String,
}

impl IndexEntry {
    fn texts(&self) -> impl Iterator<Item = &str> {
        [self.name.as_str(), self.description.as_str(), self.author.as_str()]
            .into_iter()
            .chain(self.tags.iter().map(String::as_str))
    }
}

impl From<&ComponentMetadata> for IndexEntry {
    fn from(metadata: &ComponentMetadata) -> Self {
        Self {
            address: metadata.address(),
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            author: metadata.author.clone(),
        }
    }
}

/// A search hit. Lower distance is a better match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub entry: IndexEntry,
    pub distance: f64,
}

/// Public components keyed by component id; the last indexed version of an
/// id replaces earlier ones.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: BTreeMap<String, IndexEntry>,
}

impl SearchIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for the entry's component id.
    pub fn upsert(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.address.id.clone(), entry);
    }

    /// Removes the entry for `address.id` if it is for exactly `address`.
    pub fn remove(&mut self, address: &ComponentAddress) -> bool {
        if self
            .entries
            .get(&address.id)
            .is_some_and(|entry| entry.address == *address)
        {
            self.entries.remove(&address.id);
            return true;
        }
        false
    }

    /// The entry for a component id.
    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// Number of indexed components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries within `threshold` of `query`, best first, at most `limit`.
    pub fn search(&self, query: &str, limit: usize, threshold: f64) -> Vec<SearchResult> {
        let query = query.trim().to_lowercase();
        let mut hits: Vec<SearchResult> = self
            .entries
            .values()
            .filter_map(|entry| {
                let distance = entry_distance(&query, entry);
                (distance <= threshold).then(|| SearchResult {
                    entry: entry.clone(),
                    distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.entry.name.cmp(&b.entry.name))
                .then_with(|| a.entry.address.cmp(&b.entry.address))
        });
        hits.truncate(limit);
        hits
    }
}

/// Best distance between `query` (already lowercased) and any searchable
/// text of `entry`.
fn entry_distance(query: &str, entry: &IndexEntry) -> f64 {
    let texts: Vec<String> = entry.texts().map(str::to_lowercase).collect();

    // Substring match
    if texts.iter().any(|text| text.contains(query)) {
        return 0.0;
    }

    let words: Vec<&str> = texts.iter().flat_map(|text| tokenize(text)).collect();
    if words.is_empty() {
        return 1.0;
    }

    let query_tokens: Vec<&str> = tokenize(query).collect();
    if query_tokens.is_empty() {
        return 1.0;
    }

    let total: f64 = query_tokens
        .iter()
        .map(|token| {
            words
                .iter()
                .map(|word| token_distance(token, word))
                .fold(1.0, f64::min)
        })
        .sum();
    total / query_tokens.len() as f64
}

fn token_distance(token: &str, word: &str) -> f64 {
    if word.contains(token) {
        0.0
    } else {
        normalized_levenshtein(token, word)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Edit distance between `a` and `b` in characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Edit distance divided by the longer length: 0.0 is identical, 1.0
/// shares nothing.
pub fn normalized_levenshtein(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(a, b) as f64 / longest as f64
}
