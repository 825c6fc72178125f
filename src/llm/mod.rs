//! Injected model capabilities and their HTTP-backed implementations.
//!
//! The pipeline consumes four capabilities as trait objects so that tests
//! can substitute deterministic stubs and so that model handles are
//! constructed once and passed in, never loaded as hidden globals:
//!
//! - [`Embedder`]: text → fixed-dimension dense vectors
//! - [`Condenser`]: bounded text condensation
//! - [`PairScorer`]: cross-encoder relevance of (query, candidate) pairs
//! - [`InsightGenerator`]: free-form and JSON-shaped generation
//!
//! [`client::LlmClient`] implements all four over Ollama or
//! OpenAI-compatible HTTP APIs plus an OpenAI-compatible rerank sidecar.

use anyhow::Result;
use async_trait::async_trait;

pub mod client;
pub mod condense;
pub mod embeddings;
pub mod insight;
pub mod rerank;

/// Maps texts to fixed-dimension dense vectors, one per input, in order.
///
/// Deterministic for a given model version. An empty input yields an empty
/// output. Failure is fail-fast for the whole batch: there is no partial
/// per-item failure, and no retries at this layer.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Condenses a text to roughly `max_words`, aiming for at least
/// `min_words`. Best-effort: callers must treat failure as "keep the
/// original text".
#[async_trait]
pub trait Condenser: Send + Sync {
    async fn condense(&self, text: &str, max_words: usize, min_words: usize) -> Result<String>;
}

/// Scores the relevance of each candidate to the query, cross-encoder
/// style: one real-valued score per candidate, in input order, higher =
/// more relevant.
#[async_trait]
pub trait PairScorer: Send + Sync {
    async fn score_pairs(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;
}

/// Free-form and JSON-shaped generation for the insight stage.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// One natural-language insight paragraph about the dish.
    async fn generate_insight(
        &self,
        dish_name: &str,
        summaries: &[String],
        user_query: Option<&str>,
    ) -> Result<String>;

    /// A JSON-shaped completion for structured suggestions. Callers
    /// validate the shape; this only guarantees *some* JSON value parsed
    /// out of the model output.
    async fn generate_structured(&self, prompt: &str) -> Result<serde_json::Value>;
}
