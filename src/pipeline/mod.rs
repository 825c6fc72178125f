//! The insight pipeline: indexing, hybrid retrieval, re-ranking,
//! deduplication, summarization, and insight generation, composed as one
//! degradation ladder.
//!
//! Every stage is allowed to fail; no failure escapes to the caller. The
//! terminal output is always a [`DishInsight`], possibly thinner than
//! hoped:
//!
//! - nothing new to index        → retrieve against the existing index
//! - retrieval comes up empty    → work on the raw fetched texts
//! - no retrieval AND no raw data→ explicit "no data found" outcome
//! - re-ranker unreachable       → keep the merge order
//! - condenser fails             → keep the uncondensed top texts
//! - generation fails            → fixed fallback insight string

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;

use crate::config::{PipelineConfig, RetrievalMode};
use crate::llm::{Condenser, Embedder, InsightGenerator, PairScorer};
use crate::models::{DishInsight, InsightSource, SourceText};
use crate::search::hybrid::weighted_merge;
use crate::search::lexical::LexicalIndex;
use crate::search::vector::VectorIndex;

pub mod dedup;
pub mod summarize;

use crate::llm::insight::INSIGHT_FALLBACK;

/// The consolidated orchestrator. Owns both indexes; all index mutation is
/// funneled through here, and the model capabilities arrive as injected
/// handles with an explicit lifecycle.
pub struct InsightPipeline {
    config: PipelineConfig,
    vector: Arc<VectorIndex>,
    lexical: Arc<LexicalIndex>,
    embedder: Arc<dyn Embedder>,
    scorer: Arc<dyn PairScorer>,
    condenser: Arc<dyn Condenser>,
    generator: Arc<dyn InsightGenerator>,
}

impl InsightPipeline {
    pub fn new(
        config: PipelineConfig,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn PairScorer>,
        condenser: Arc<dyn Condenser>,
        generator: Arc<dyn InsightGenerator>,
    ) -> Self {
        let vector = Arc::new(VectorIndex::new(config.max_vector_entries));
        let lexical = Arc::new(LexicalIndex::new());
        Self {
            config,
            vector,
            lexical,
            embedder,
            scorer,
            condenser,
            generator,
        }
    }

    pub fn vector_index(&self) -> &Arc<VectorIndex> {
        &self.vector
    }

    pub fn lexical_index(&self) -> &Arc<LexicalIndex> {
        &self.lexical
    }

    /// Index newly fetched texts into both indexes.
    ///
    /// Texts are embedded in batches issued concurrently; the whole fan-out
    /// runs under one deadline and is abandoned as a whole if it expires
    /// (no partial-result salvage, a known limitation). Each completed batch
    /// appends texts and embeddings under the vector index's single write
    /// lock, so the parallel arrays can never tear. The lexical corpus is
    /// extended once, after the fan-out joins.
    pub async fn index_new_data(&self, items: &[SourceText]) -> Result<usize> {
        let texts: Vec<String> = items
            .iter()
            .map(|i| i.text.clone())
            .filter(|t| !t.trim().is_empty())
            .collect();

        if texts.is_empty() {
            tracing::info!("No new data to index");
            return Ok(0);
        }

        let deadline = Duration::from_secs(self.config.index_timeout_secs);
        let batch_size = self.config.embed_batch_size.max(1);

        let fan_out = async {
            let batches: Vec<Vec<String>> =
                texts.chunks(batch_size).map(|c| c.to_vec()).collect();
            let futures = batches.into_iter().map(|batch| {
                let embedder = self.embedder.clone();
                let vector = self.vector.clone();
                async move {
                    let embeddings = embedder.embed(&batch).await?;
                    let count = batch.len();
                    vector.add(batch, embeddings)?;
                    Ok::<usize, anyhow::Error>(count)
                }
            });

            let mut indexed = 0usize;
            for result in join_all(futures).await {
                indexed += result?;
            }
            Ok::<usize, anyhow::Error>(indexed)
        };

        let indexed = tokio::time::timeout(deadline, fan_out)
            .await
            .map_err(|_| anyhow::anyhow!("Indexing fan-out exceeded {deadline:?}"))??;

        self.lexical.build_or_extend(&texts);

        tracing::info!(
            "Indexed {indexed} items (vector total: {}, lexical total: {})",
            self.vector.len(),
            self.lexical.len()
        );
        Ok(indexed)
    }

    /// Hybrid retrieval: encode the query, pull candidates from the vector
    /// leg (and the lexical leg in hybrid mode), merge with the configured
    /// weights, drop exact duplicates, score every (query, candidate) pair,
    /// and return texts by descending relevance.
    ///
    /// An empty candidate set short-circuits without invoking the scorer.
    /// Scorer failure keeps the merge order.
    pub async fn hybrid_search(&self, query: &str, k: usize) -> Vec<String> {
        // Vector leg: top-2k for re-ranker headroom.
        let vector_pairs = match self.embedder.embed(&[query.to_string()]).await {
            Ok(mut embeddings) if !embeddings.is_empty() => {
                let query_embedding = embeddings.remove(0);
                let hits = self.vector.search(&query_embedding, k * 2);
                self.vector.resolve(&hits)
            }
            Ok(_) => {
                tracing::warn!("Query embedding came back empty");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Query embedding failed, skipping vector leg: {e}");
                Vec::new()
            }
        };

        // Lexical leg, hybrid mode only. An unbuilt index is an empty
        // contribution here, not an error.
        let lexical_pairs = match self.config.retrieval_mode {
            RetrievalMode::Hybrid => match self.lexical.search(query, k) {
                Ok(hits) => self.lexical.resolve(&hits),
                Err(e) => {
                    tracing::warn!("Lexical leg skipped: {e}");
                    Vec::new()
                }
            },
            RetrievalMode::VectorOnly => Vec::new(),
        };

        let candidates = weighted_merge(
            &lexical_pairs,
            &vector_pairs,
            self.config.lexical_weight,
            self.config.vector_weight,
            k * 2,
        );

        if candidates.is_empty() {
            return Vec::new();
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

        match self.scorer.score_pairs(query, &texts).await {
            Ok(scores) if scores.len() == texts.len() => {
                let mut ranked: Vec<(String, f32)> = texts.into_iter().zip(scores).collect();
                // Stable sort: identical scores keep merge order, so
                // re-ranking the same list twice yields the same order.
                ranked.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
                });
                tracing::info!("Re-ranked {} candidates", ranked.len());
                ranked.into_iter().map(|(t, _)| t).collect()
            }
            Ok(scores) => {
                tracing::warn!(
                    "Re-ranker returned {} scores for {} candidates; keeping merge order",
                    scores.len(),
                    texts.len()
                );
                texts
            }
            Err(e) => {
                tracing::warn!("Re-ranking failed, keeping merge order: {e}");
                texts
            }
        }
    }

    /// The end-to-end insight computation.
    pub async fn compute_insight(
        &self,
        dish_name: &str,
        raw_texts: &[SourceText],
        user_query: Option<&str>,
    ) -> DishInsight {
        tracing::info!("Computing insight for '{dish_name}'");

        // ── Indexing ─────────────────────────────────────────
        if !raw_texts.is_empty() {
            if let Err(e) = self.index_new_data(raw_texts).await {
                tracing::warn!("Indexing failed, retrieving against existing index: {e}");
            }
        }

        // ── Retrieval + re-ranking ──────────────────────────
        let retrieved = self.hybrid_search(dish_name, self.config.top_k).await;
        tracing::info!("Retrieved {} items for '{dish_name}'", retrieved.len());

        let (working_set, source) = if !retrieved.is_empty() {
            let mode_tag = match self.config.retrieval_mode {
                RetrievalMode::Hybrid => InsightSource::Hybrid,
                RetrievalMode::VectorOnly => InsightSource::VectorOnly,
            };
            let top: Vec<String> = retrieved.into_iter().take(self.config.top_k).collect();
            (top, mode_tag)
        } else if !raw_texts.is_empty() {
            tracing::warn!("Retrieval came up empty; falling back to raw fetched texts");
            let top: Vec<String> = raw_texts
                .iter()
                .map(|t| t.text.clone())
                .filter(|t| !t.trim().is_empty())
                .take(self.config.top_k)
                .collect();
            (top, InsightSource::RawFallback)
        } else {
            tracing::warn!("No retrieved and no raw texts for '{dish_name}'");
            return DishInsight {
                dish_name: dish_name.to_string(),
                summaries: Vec::new(),
                insights: vec![format!("No opinions found for '{dish_name}'.")],
                source: InsightSource::NoData,
                generated_at: Utc::now(),
            };
        };

        // ── Deduplication ───────────────────────────────────
        let deduplicated = match dedup::semantic_deduplicate(
            self.embedder.as_ref(),
            &working_set,
            self.config.dedup_threshold,
        )
        .await
        {
            Ok(unique) => unique,
            Err(e) => {
                tracing::warn!("Deduplication failed, keeping all texts: {e}");
                working_set
            }
        };

        // ── Summarization ───────────────────────────────────
        let summaries = summarize::summarize(
            self.condenser.as_ref(),
            &deduplicated,
            self.config.max_summary_words,
            self.config.summary_strategy,
        )
        .await;

        // ── Insight generation ──────────────────────────────
        self.insight_from_summaries(dish_name, summaries, source, user_query)
            .await
    }

    /// The generation stage alone: used directly for cache hits, where the
    /// summaries are already known and only the insight text is recomputed.
    pub async fn insight_from_summaries(
        &self,
        dish_name: &str,
        summaries: Vec<String>,
        source: InsightSource,
        user_query: Option<&str>,
    ) -> DishInsight {
        let insight_text = match self
            .generator
            .generate_insight(dish_name, &summaries, user_query)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Insight generation failed: {e}");
                INSIGHT_FALLBACK.to_string()
            }
        };

        DishInsight {
            dish_name: dish_name.to_string(),
            summaries,
            insights: vec![insight_text],
            source,
            generated_at: Utc::now(),
        }
    }

    pub fn generator(&self) -> &Arc<dyn InsightGenerator> {
        &self.generator
    }
}
