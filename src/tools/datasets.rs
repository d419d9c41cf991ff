// src/tools/datasets.rs — Dataset catalog search (TF-IDF, cosine ranking)
//
// Weights follow the usual smoothed scheme: idf = ln((1 + n) / (1 + df)) + 1,
// raw term counts, L2-normalised rows. Tokens are lowercase runs of two or
// more word characters.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::infra::config::SearchConfig;

static TOKEN_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn token_pattern() -> Option<&'static Regex> {
    TOKEN_PATTERN
        .get_or_init(|| Regex::new(r"\b\w\w+\b").ok())
        .as_ref()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub downloads: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetHit<'a> {
    pub entry: &'a DatasetEntry,
    pub score: f64,
}

type SparseVec = HashMap<usize, f64>;

pub struct DatasetSearcher {
    entries: Vec<DatasetEntry>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVec>,
}

impl DatasetSearcher {
    /// Keep entries with `likes >= min_likes` and `downloads >= min_downloads`
    /// (missing counts fail the filter) and index their descriptions.
    pub fn new(entries: Vec<DatasetEntry>, min_likes: u64, min_downloads: u64) -> Self {
        let entries: Vec<DatasetEntry> = entries
            .into_iter()
            .filter(|d| {
                d.likes.is_some_and(|l| l >= min_likes)
                    && d.downloads.is_some_and(|n| n >= min_downloads)
            })
            .collect();

        let docs: Vec<Vec<String>> = entries.iter().map(|d| tokenize(&d.description)).collect();

        let mut vocabulary = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        for tokens in &docs {
            let mut seen = std::collections::HashSet::new();
            for t in tokens {
                let next = vocabulary.len();
                let idx = *vocabulary.entry(t.clone()).or_insert(next);
                if idx == doc_freq.len() {
                    doc_freq.push(0);
                }
                if seen.insert(idx) {
                    doc_freq[idx] += 1;
                }
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let vectors = docs
            .iter()
            .map(|tokens| weigh(tokens, &vocabulary, &idf))
            .collect();

        Self {
            entries,
            vocabulary,
            idf,
            vectors,
        }
    }

    pub fn from_config(entries: Vec<DatasetEntry>, config: &SearchConfig) -> Self {
        Self::new(entries, config.min_likes, config.min_downloads)
    }

    /// Load a catalog from a JSON array or JSON Lines file.
    pub fn load_catalog(path: &Path) -> anyhow::Result<Vec<DatasetEntry>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset catalog {}", path.display()))?;
        parse_catalog(&content)
            .with_context(|| format!("Invalid dataset catalog {}", path.display()))
    }

    /// Entries that survived the popularity filter.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best `top_n` entries by cosine similarity to `query`, highest first.
    pub fn search(&self, query: &str, top_n: usize) -> Vec<DatasetHit<'_>> {
        let q = weigh(&tokenize(query), &self.vocabulary, &self.idf);

        let mut hits: Vec<DatasetHit<'_>> = self
            .entries
            .iter()
            .zip(&self.vectors)
            .map(|(entry, doc)| DatasetHit {
                entry,
                score: q
                    .iter()
                    .map(|(idx, w)| w * doc.get(idx).copied().unwrap_or(0.0))
                    .sum(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_n);
        hits
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let Some(re) = token_pattern() else {
        return Vec::new();
    };
    let lower = text.to_lowercase();
    re.find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Term counts × idf, L2-normalised. Unknown terms are dropped.
fn weigh(tokens: &[String], vocabulary: &HashMap<String, usize>, idf: &[f64]) -> SparseVec {
    let mut v: SparseVec = HashMap::new();
    for t in tokens {
        if let Some(&idx) = vocabulary.get(t) {
            *v.entry(idx).or_default() += 1.0;
        }
    }
    for (idx, w) in v.iter_mut() {
        *w *= idf[*idx];
    }
    let norm = v.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for w in v.values_mut() {
            *w /= norm;
        }
    }
    v
}

fn parse_catalog(content: &str) -> anyhow::Result<Vec<DatasetEntry>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<DatasetEntry>(line).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, description: &str, likes: u64, downloads: u64) -> DatasetEntry {
        DatasetEntry {
            id: id.into(),
            description: description.into(),
            likes: Some(likes),
            downloads: Some(downloads),
        }
    }

    fn catalog() -> Vec<DatasetEntry> {
        vec![
            entry("imdb", "Movie reviews labelled for sentiment classification", 50, 10_000),
            entry("squad", "Question answering over Wikipedia articles", 40, 9_000),
            entry("mnist", "Handwritten digit images for classification", 30, 20_000),
            entry("tiny", "Sentiment of tweets", 1, 10),
        ]
    }

    #[test]
    fn test_popularity_filter() {
        let s = DatasetSearcher::new(catalog(), 3, 50);
        assert_eq!(s.len(), 3);
        let mut missing = entry("x", "anything", 10, 100);
        missing.downloads = None;
        assert!(DatasetSearcher::new(vec![missing], 3, 50).is_empty());
    }

    #[test]
    fn test_ranking() {
        let s = DatasetSearcher::new(catalog(), 3, 50);
        let hits = s.search("sentiment of movie reviews", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.id, "imdb");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_shared_term_ranks_both() {
        let s = DatasetSearcher::new(catalog(), 3, 50);
        let hits = s.search("classification", 3);
        let top: Vec<&str> = hits.iter().take(2).map(|h| h.entry.id.as_str()).collect();
        assert!(top.contains(&"imdb"));
        assert!(top.contains(&"mnist"));
        assert_eq!(hits[2].score, 0.0);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let s = DatasetSearcher::new(catalog(), 3, 50);
        let hits = s.search("Question answering over Wikipedia articles", 1);
        assert_eq!(hits[0].entry.id, "squad");
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_query_scores_zero() {
        let s = DatasetSearcher::new(catalog(), 3, 50);
        assert!(s.search("zebra", 10).iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("A big, BIG test-case!"), vec!["big", "big", "test", "case"]);
    }

    #[test]
    fn test_parse_catalog_formats() {
        let json = r#"[{"id": "a", "description": "x", "likes": 5, "downloads": 60}]"#;
        assert_eq!(parse_catalog(json).unwrap().len(), 1);

        let jsonl = "{\"id\": \"a\", \"likes\": 5}\n\n{\"id\": \"b\", \"downloads\": null}\n";
        let entries = parse_catalog(jsonl).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "");
        assert!(entries[1].downloads.is_none());

        assert!(parse_catalog("{\"id\": 1}").is_err());
    }

    #[test]
    fn test_load_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.jsonl");
        std::fs::write(&path, "{\"id\": \"a\", \"description\": \"d\", \"likes\": 9, \"downloads\": 99}\n").unwrap();
        let entries = DatasetSearcher::load_catalog(&path).unwrap();
        assert_eq!(entries[0].id, "a");
        assert!(DatasetSearcher::load_catalog(&dir.path().join("missing.json")).is_err());
    }
}
