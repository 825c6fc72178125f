use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;

/// BM25 k1 parameter (term-frequency saturation).
const K1: f32 = 1.5;
/// BM25 b parameter (document-length normalization).
const B: f32 = 0.75;

/// In-memory BM25 index over a whitespace-tokenized corpus.
///
/// Extending the index rebuilds the term statistics over the full
/// accumulated corpus rather than updating incrementally: O(n) per
/// extension, acceptable for corpora in the tens to hundreds of texts.
/// Positions returned by [`search`](Self::search) are stable offsets into
/// the accumulated corpus.
pub struct LexicalIndex {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    corpus: Vec<String>,
    tokenized: Vec<Vec<String>>,
    /// Number of documents each term appears in.
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f32,
}

/// A single keyword-relevance match.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    /// Position into the accumulated corpus.
    pub position: usize,
    /// BM25 relevance score (higher = more relevant).
    pub score: f32,
}

#[derive(Debug, Error)]
pub enum LexicalError {
    /// Searching before any corpus has been indexed. Distinct from the
    /// vector index's graceful-empty behavior; callers in the pipeline
    /// convert this to an empty contribution.
    #[error("lexical index is empty; index data before searching")]
    IndexNotReady,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Append texts to the corpus and rebuild the BM25 statistics over the
    /// whole accumulated corpus.
    pub fn build_or_extend(&self, new_texts: &[String]) {
        if new_texts.is_empty() {
            return;
        }

        let mut inner = self.inner.write();
        for text in new_texts {
            inner.tokenized.push(tokenize(text));
            inner.corpus.push(text.clone());
        }

        // Rebuild document frequencies and average length from scratch.
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;
        for tokens in &inner.tokenized {
            total_len += tokens.len();
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                *doc_freq.entry(token.clone()).or_insert(0) += 1;
            }
        }
        inner.doc_freq = doc_freq;
        inner.avg_doc_len = if inner.tokenized.is_empty() {
            0.0
        } else {
            total_len as f32 / inner.tokenized.len() as f32
        };
    }

    /// Return up to `k` corpus positions by descending BM25 score.
    /// Fails with [`LexicalError::IndexNotReady`] if nothing has been
    /// indexed yet.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<LexicalHit>, LexicalError> {
        let inner = self.inner.read();
        if inner.corpus.is_empty() {
            return Err(LexicalError::IndexNotReady);
        }

        let query_tokens = tokenize(query);
        let n_docs = inner.tokenized.len();

        let mut hits: Vec<LexicalHit> = inner
            .tokenized
            .iter()
            .enumerate()
            .map(|(position, tokens)| LexicalHit {
                position,
                score: bm25_score(&query_tokens, tokens, &inner.doc_freq, n_docs, inner.avg_doc_len),
            })
            .filter(|h| h.score > 0.0)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Text stored at a corpus position, if it exists.
    pub fn get_text(&self, position: usize) -> Option<String> {
        self.inner.read().corpus.get(position).cloned()
    }

    /// Resolve a hit list to `(text, score)` pairs.
    pub fn resolve(&self, hits: &[LexicalHit]) -> Vec<(String, f32)> {
        let inner = self.inner.read();
        hits.iter()
            .filter_map(|h| inner.corpus.get(h.position).map(|t| (t.clone(), h.score)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LexicalIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Language-naive whitespace tokenization, lowercased so that queries match
/// regardless of casing.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Okapi BM25 score of one document against the query tokens.
fn bm25_score(
    query_tokens: &[String],
    doc_tokens: &[String],
    doc_freq: &HashMap<String, usize>,
    n_docs: usize,
    avg_doc_len: f32,
) -> f32 {
    if doc_tokens.is_empty() || avg_doc_len == 0.0 {
        return 0.0;
    }

    let doc_len = doc_tokens.len() as f32;
    let mut score = 0.0f32;

    for term in query_tokens {
        let df = match doc_freq.get(term) {
            Some(df) => *df,
            None => continue,
        };
        let tf = doc_tokens.iter().filter(|t| *t == term).count() as f32;
        if tf == 0.0 {
            continue;
        }

        let idf = (1.0 + (n_docs as f32 - df as f32 + 0.5) / (df as f32 + 0.5)).ln();
        let norm = tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * doc_len / avg_doc_len));
        score += idf * norm;
    }

    score
}
