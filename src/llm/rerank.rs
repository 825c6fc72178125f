//! Cross-encoder pair scoring via an OpenAI-compatible `/v1/rerank` endpoint.
//!
//! One batched request scores every (query, candidate) pair instead of N
//! individual chat calls. Raw logits are sigmoid-normalized to 0-1 and
//! returned in candidate input order; the pipeline owns the sort.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::RerankerConfig;

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<ScoredDocument>,
}

#[derive(Deserialize)]
struct ScoredDocument {
    index: usize,
    relevance_score: f32,
}

/// Score each candidate's relevance to the query. Returns one score per
/// candidate, in input order. Errors if the reranker endpoint is not
/// configured or unreachable; callers fall back to the pre-rerank order.
pub async fn score_pairs(
    client: &reqwest::Client,
    config: &RerankerConfig,
    query: &str,
    candidates: &[String],
) -> Result<Vec<f32>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let base_url = config
        .base_url
        .as_deref()
        .context("Reranker base_url not configured")?;

    let resp = client
        .post(format!("{}/v1/rerank", base_url.trim_end_matches('/')))
        .timeout(std::time::Duration::from_secs(config.timeout_secs.min(30)))
        .json(&RerankRequest {
            model: config.model.as_deref().unwrap_or("default"),
            query,
            documents: candidates,
            top_n: candidates.len(),
        })
        .send()
        .await
        .context("Failed to reach reranker endpoint")?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        anyhow::bail!("Reranker returned {status}: {detail}");
    }

    let parsed: RerankResponse = resp
        .json()
        .await
        .context("Failed to parse reranker response")?;

    // The endpoint reports (index, score) pairs in its own order; scatter
    // them back into candidate input order. Unscored candidates get 0.0.
    let mut scores = vec![0.0f32; candidates.len()];
    for doc in parsed.results {
        if let Some(slot) = scores.get_mut(doc.index) {
            *slot = sigmoid(doc.relevance_score);
        }
    }

    Ok(scores)
}

/// Sigmoid normalization: maps raw logits to 0-1 range.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
