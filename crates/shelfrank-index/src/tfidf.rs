//! Sparse lexical vectorization: TF-IDF with english stop-word removal and
//! a bounded vocabulary. Rows are L2-normalized so the dot product of two
//! vectors is their cosine similarity.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use shelfrank_core::text;

/// Terms too common to carry signal, dropped before counting.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "all", "an", "and", "any", "are", "as", "at",
        "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
        "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
        "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his",
        "how", "if", "in", "into", "is", "it", "its", "just", "more", "most", "my", "no", "nor",
        "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "out", "over",
        "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
        "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
        "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
        "while", "who", "whom", "why", "will", "with", "you", "your",
    ]
    .into_iter()
    .collect()
});

/// Tokens are runs of word characters, two characters or longer, minus stop
/// words. Input must already be in canonical normalized form.
fn tokenize(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split_whitespace()
        .filter(|t| t.len() >= 2 && !STOP_WORDS.contains(t))
}

/// One sparse row: parallel `indices`/`values` with strictly increasing
/// indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseVec {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVec {
    pub fn dot(&self, other: &SparseVec) -> f32 {
        let (mut i, mut j) = (0usize, 0usize);
        let mut acc = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    pub fn l2_normalize(&mut self) {
        let norm = self.values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Item-by-term matrix, one sparse row per item in feature-table order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub dim: usize,
    pub rows: Vec<SparseVec>,
}

impl SparseMatrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A fitted TF-IDF vectorizer: term → column index plus the smoothed idf
/// weights. Queries must be transformed through the same fitted instance
/// that produced a matrix, never a refit one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfModel {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f32>,
}

impl TfidfModel {
    /// Fit over a corpus and vectorize it in one pass. The vocabulary keeps
    /// the `max_features` most frequent terms; ties resolve alphabetically
    /// and column order is alphabetical, so fitting is deterministic.
    pub fn fit(docs: &[String], max_features: usize) -> (TfidfModel, SparseMatrix) {
        let tokenized: Vec<Vec<String>> = docs
            .iter()
            .map(|d| {
                let normalized = text::normalize(d);
                tokenize(&normalized).map(str::to_string).collect()
            })
            .collect();

        let mut corpus_counts: HashMap<&str, u64> = HashMap::new();
        let mut doc_freq: HashMap<&str, u32> = HashMap::new();
        for doc in &tokenized {
            let mut seen = HashSet::new();
            for tok in doc {
                *corpus_counts.entry(tok.as_str()).or_insert(0) += 1;
                if seen.insert(tok.as_str()) {
                    *doc_freq.entry(tok.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut terms: Vec<(&str, u64)> = corpus_counts.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        terms.truncate(max_features);
        let mut selected: Vec<&str> = terms.into_iter().map(|(t, _)| t).collect();
        selected.sort_unstable();

        let vocabulary: HashMap<String, u32> = selected
            .iter()
            .enumerate()
            .map(|(i, t)| ((*t).to_string(), i as u32))
            .collect();
        let n_docs = docs.len() as f32;
        let mut idf = vec![0.0f32; selected.len()];
        for (term, &idx) in &vocabulary {
            let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f32;
            // smoothed idf, never zero, so every vocabulary term contributes
            idf[idx as usize] = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;
        }

        let model = TfidfModel { vocabulary, idf };
        let rows = tokenized.iter().map(|toks| model.vectorize_tokens(toks)).collect();
        let matrix = SparseMatrix {
            dim: model.idf.len(),
            rows,
        };
        (model, matrix)
    }

    /// Vectorize a query. Unknown terms are dropped; a query with no
    /// vocabulary overlap yields the zero vector, which scores 0 against
    /// every row.
    pub fn transform(&self, query: &str) -> SparseVec {
        let normalized = text::normalize(query);
        let tokens: Vec<String> = tokenize(&normalized).map(str::to_string).collect();
        self.vectorize_tokens(&tokens)
    }

    fn vectorize_tokens(&self, tokens: &[String]) -> SparseVec {
        let mut counts: HashMap<u32, f32> = HashMap::new();
        for tok in tokens {
            if let Some(&idx) = self.vocabulary.get(tok.as_str()) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut pairs: Vec<(u32, f32)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx as usize]))
            .collect();
        pairs.sort_unstable_by_key(|p| p.0);
        let mut vec = SparseVec {
            indices: pairs.iter().map(|p| p.0).collect(),
            values: pairs.iter().map(|p| p.1).collect(),
        };
        vec.l2_normalize();
        vec
    }

    pub fn vocab_size(&self) -> usize {
        self.idf.len()
    }
}
