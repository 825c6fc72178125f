//! HTTP-backed implementation of the model capabilities.

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{LlmConfig, RerankerConfig};

use super::{condense, embeddings, insight, rerank};
use super::{Condenser, Embedder, InsightGenerator, PairScorer};

const CRITIC_PERSONA: &str = "You are a helpful food critic assistant.";
const CULINARY_PERSONA: &str = "You are a creative culinary assistant.";

/// One explicitly constructed handle over the configured model services:
/// the embedding and chat provider plus the optional rerank sidecar.
/// Built once at startup and injected wherever a capability is consumed.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    llm: LlmConfig,
    reranker: RerankerConfig,
}

impl LlmClient {
    pub fn new(http: reqwest::Client, llm: LlmConfig, reranker: RerankerConfig) -> Self {
        Self {
            http,
            llm,
            reranker,
        }
    }
}

#[async_trait]
impl Embedder for LlmClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        embeddings::embed_batch(&self.http, &self.llm, texts).await
    }
}

#[async_trait]
impl Condenser for LlmClient {
    async fn condense(&self, text: &str, max_words: usize, min_words: usize) -> Result<String> {
        condense::condense(&self.http, &self.llm, text, max_words, min_words).await
    }
}

#[async_trait]
impl PairScorer for LlmClient {
    async fn score_pairs(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        rerank::score_pairs(&self.http, &self.reranker, query, candidates).await
    }
}

#[async_trait]
impl InsightGenerator for LlmClient {
    async fn generate_insight(
        &self,
        dish_name: &str,
        summaries: &[String],
        user_query: Option<&str>,
    ) -> Result<String> {
        let prompt = insight::build_insight_prompt(dish_name, summaries, user_query);
        let text =
            insight::chat_completion(&self.http, &self.llm, CRITIC_PERSONA, &prompt, 200).await?;
        let text = text.trim().to_string();
        if text.is_empty() {
            anyhow::bail!("Insight generation returned empty text");
        }
        Ok(text)
    }

    async fn generate_structured(&self, prompt: &str) -> Result<serde_json::Value> {
        let text =
            insight::chat_completion(&self.http, &self.llm, CULINARY_PERSONA, prompt, 500).await?;
        insight::extract_json_object(&text)
    }
}
