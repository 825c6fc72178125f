use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::fetch::reddit::RedditClient;
use crate::fetch::yelp::YelpClient;
use crate::llm::client::LlmClient;
use crate::pipeline::InsightPipeline;

/// Shared application state.
///
/// Everything long-lived (the HTTP client, the model capability handles,
/// and the pipeline that owns the indexes) is constructed exactly once
/// here and injected downward. There is no global mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<InsightPipeline>,
    pub yelp: Arc<YelpClient>,
    pub reddit: Arc<RedditClient>,
    pub cache: Arc<ResponseCache>,
    /// Caps concurrent generation (insight + suggestions) across requests.
    pub generate_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let llm = Arc::new(LlmClient::new(
            http_client.clone(),
            config.llm.clone(),
            config.reranker.clone(),
        ));

        let pipeline = Arc::new(InsightPipeline::new(
            config.pipeline.clone(),
            llm.clone(),
            llm.clone(),
            llm.clone(),
            llm,
        ));

        let yelp = Arc::new(YelpClient::new(http_client.clone(), config.fetch.clone()));
        let reddit = Arc::new(RedditClient::new(http_client, config.fetch.clone()));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(
            config.cache_ttl_secs,
        )));

        Ok(Self {
            config,
            pipeline,
            yelp,
            reddit,
            cache,
            generate_semaphore: Arc::new(tokio::sync::Semaphore::new(3)),
        })
    }
}
