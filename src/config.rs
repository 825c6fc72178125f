use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration (embeddings, condensation, generation)
    pub llm: LlmConfig,
    /// Cross-encoder reranker configuration
    pub reranker: RerankerConfig,
    /// Retrieval / summarization pipeline knobs
    pub pipeline: PipelineConfig,
    /// External data source configuration
    pub fetch: FetchConfig,
    /// TTL for cached decode-menu bundles, in seconds
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for chat (condensation, insight generation)
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "all-minilm".to_string(),
            api_key: None,
            embedding_dim: 384,
        }
    }
}

/// Configuration for the cross-encoder reranker sidecar
/// (e.g. llama-server with a reranker model behind `/v1/rerank`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL for the reranker API (e.g. "http://127.0.0.1:8082").
    /// If None, re-ranking is skipped and merge order stands.
    pub base_url: Option<String>,
    /// Model name to send in the rerank request.
    pub model: Option<String>,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: None,
            timeout_secs: 10,
        }
    }
}

/// Which retrieval legs feed the candidate merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Lexical + vector, merged with the configured weights.
    Hybrid,
    /// Vector leg only; the lexical index is not consulted.
    VectorOnly,
}

/// How the retained top texts are condensed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStrategy {
    /// Per-item condensation of long texts, then one joint pass.
    Cascade,
    /// Join texts in batches of five and condense each batch.
    Batched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub retrieval_mode: RetrievalMode,
    pub summary_strategy: SummaryStrategy,
    /// Weight of the lexical leg in the hybrid merge
    pub lexical_weight: f32,
    /// Weight of the vector leg in the hybrid merge
    pub vector_weight: f32,
    /// How many texts survive re-ranking into dedup + summarization
    pub top_k: usize,
    /// Cosine similarity above which two texts count as duplicates (strict >)
    pub dedup_threshold: f32,
    /// Word bound for the final summarization pass
    pub max_summary_words: usize,
    /// Batch size for bulk embedding during indexing
    pub embed_batch_size: usize,
    /// Deadline for a bulk indexing fan-out, in seconds
    pub index_timeout_secs: u64,
    /// Vector index capacity; further appends are rejected once reached
    pub max_vector_entries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval_mode: RetrievalMode::Hybrid,
            summary_strategy: SummaryStrategy::Cascade,
            lexical_weight: 0.6,
            vector_weight: 0.4,
            top_k: 5,
            dedup_threshold: 0.85,
            max_summary_words: 200,
            embed_batch_size: 100,
            index_timeout_secs: 300,
            max_vector_entries: 500_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Yelp API key; fetches are skipped (empty contribution) if unset
    pub yelp_api_key: Option<String>,
    /// Yelp API base URL
    pub yelp_base_url: String,
    /// Reddit API base URL
    pub reddit_base_url: String,
    /// Subreddits queried for dish opinions
    pub subreddits: Vec<String>,
    /// Deadline for the whole social fetch fan-out, in seconds
    pub fetch_timeout_secs: u64,
    /// Deadline for the suggestion/customization generation pair, in seconds
    pub generate_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            yelp_api_key: None,
            yelp_base_url: "https://api.yelp.com/v3".to_string(),
            reddit_base_url: "https://www.reddit.com".to_string(),
            subreddits: vec![
                "food".to_string(),
                "restaurants".to_string(),
                "Cooking".to_string(),
                "AskCulinary".to_string(),
            ],
            fetch_timeout_secs: 15,
            generate_timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            pipeline: PipelineConfig::default(),
            fetch: FetchConfig::default(),
            cache_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("DISH_INSIGHT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }

        // Reranker config
        if let Ok(url) = std::env::var("RERANKER_BASE_URL") {
            config.reranker.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("RERANKER_MODEL") {
            config.reranker.model = Some(model);
        }
        if let Ok(val) = std::env::var("RERANKER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.reranker.timeout_secs = v.min(30); // Cap at 30s
            }
        }

        // Pipeline knobs
        if let Ok(mode) = std::env::var("DISH_INSIGHT_RETRIEVAL_MODE") {
            match mode.as_str() {
                "hybrid" => config.pipeline.retrieval_mode = RetrievalMode::Hybrid,
                "vector_only" | "vector" => {
                    config.pipeline.retrieval_mode = RetrievalMode::VectorOnly;
                }
                other => tracing::warn!("Unknown retrieval mode '{other}', keeping default"),
            }
        }
        if let Ok(strategy) = std::env::var("DISH_INSIGHT_SUMMARY_STRATEGY") {
            match strategy.as_str() {
                "cascade" => config.pipeline.summary_strategy = SummaryStrategy::Cascade,
                "batched" => config.pipeline.summary_strategy = SummaryStrategy::Batched,
                other => tracing::warn!("Unknown summary strategy '{other}', keeping default"),
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_TOP_K") {
            if let Ok(v) = val.parse() {
                config.pipeline.top_k = v;
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_DEDUP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                config.pipeline.dedup_threshold = v;
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_MAX_VECTOR_ENTRIES") {
            if let Ok(v) = val.parse() {
                config.pipeline.max_vector_entries = v;
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_INDEX_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.pipeline.index_timeout_secs = v;
            }
        }

        // Fetcher config
        if let Ok(key) = std::env::var("YELP_API_KEY") {
            config.fetch.yelp_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("YELP_BASE_URL") {
            config.fetch.yelp_base_url = url;
        }
        if let Ok(url) = std::env::var("REDDIT_BASE_URL") {
            config.fetch.reddit_base_url = url;
        }
        if let Ok(subs) = std::env::var("DISH_INSIGHT_SUBREDDITS") {
            let parsed: Vec<String> = subs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.fetch.subreddits = parsed;
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_FETCH_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.fetch.fetch_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_GENERATE_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.fetch.generate_timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("DISH_INSIGHT_CACHE_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.cache_ttl_secs = v;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let p = PipelineConfig::default();
        assert!((p.lexical_weight + p.vector_weight - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_default_mode_is_hybrid_with_cascade() {
        let p = PipelineConfig::default();
        assert_eq!(p.retrieval_mode, RetrievalMode::Hybrid);
        assert_eq!(p.summary_strategy, SummaryStrategy::Cascade);
        assert_eq!(p.top_k, 5);
    }

    #[test]
    fn test_retrieval_mode_serde_is_snake_case() {
        let json = serde_json::to_value(RetrievalMode::VectorOnly).unwrap();
        assert_eq!(json, "vector_only");
    }
}
