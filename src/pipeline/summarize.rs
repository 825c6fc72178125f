//! Summarization strategies over the retained top texts.
//!
//! Both strategies are best-effort: any condenser failure falls back to the
//! original texts, because a missing summary degrades the insight while a
//! failed pipeline loses it.

use anyhow::Result;

use crate::config::SummaryStrategy;
use crate::llm::Condenser;

/// Texts longer than this many words get an individual stage-1 pass.
const STAGE1_WORD_THRESHOLD: usize = 40;
/// Bounds for the stage-1 per-item condensation.
const STAGE1_MAX_WORDS: usize = 150;
const STAGE1_MIN_WORDS: usize = 50;
/// Joined stage-1 output longer than this triggers the final pass.
const STAGE2_WORD_THRESHOLD: usize = 150;
/// Minimum words for the final condensation pass.
const STAGE2_MIN_WORDS: usize = 80;
/// Batch size for the batched strategy.
const BATCH_SIZE: usize = 5;

/// Condense `texts` with the configured strategy. Never fails: on any
/// condenser error the original texts are returned unchanged.
pub async fn summarize(
    condenser: &dyn Condenser,
    texts: &[String],
    max_words: usize,
    strategy: SummaryStrategy,
) -> Vec<String> {
    if texts.is_empty() {
        return Vec::new();
    }

    let result = match strategy {
        SummaryStrategy::Cascade => cascade(condenser, texts, max_words).await,
        SummaryStrategy::Batched => batched(condenser, texts, max_words).await,
    };

    match result {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::warn!("Summarization failed, falling back to raw texts: {e}");
            texts.to_vec()
        }
    }
}

/// Two-stage cascade: condense each long text individually, then run one
/// more pass over the joined output if it is still long.
async fn cascade(
    condenser: &dyn Condenser,
    texts: &[String],
    max_words: usize,
) -> Result<Vec<String>> {
    tracing::info!("Summarizing {} texts (cascade)", texts.len());

    // Stage 1: condense each text separately, if long.
    let mut stage1 = Vec::with_capacity(texts.len());
    for text in texts {
        if word_count(text) > STAGE1_WORD_THRESHOLD {
            let condensed = condenser
                .condense(text, STAGE1_MAX_WORDS, STAGE1_MIN_WORDS)
                .await?;
            stage1.push(condensed);
        } else {
            stage1.push(text.clone());
        }
    }

    // Stage 2: join and condense once more if the combined output is long.
    let combined = stage1.join(" ");
    if word_count(&combined) > STAGE2_WORD_THRESHOLD {
        tracing::info!("Performing final summarization pass");
        let final_summary = condenser
            .condense(&combined, max_words, STAGE2_MIN_WORDS)
            .await?;
        return Ok(vec![final_summary]);
    }

    Ok(stage1)
}

/// Alternate strategy: join texts in batches and condense each batch.
async fn batched(
    condenser: &dyn Condenser,
    texts: &[String],
    max_words: usize,
) -> Result<Vec<String>> {
    tracing::info!("Summarizing {} texts (batched)", texts.len());

    let mut summaries = Vec::new();
    for batch in texts.chunks(BATCH_SIZE) {
        let combined = batch.join(" ");
        let summary = condenser
            .condense(&combined, max_words, STAGE2_MIN_WORDS)
            .await?;
        summaries.push(summary);
    }
    Ok(summaries)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Condenser stub: counts calls and returns a recognizable marker.
    #[derive(Default)]
    struct MarkerCondenser {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Condenser for MarkerCondenser {
        async fn condense(&self, _text: &str, max_words: usize, _min: usize) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("condensed({max_words})"))
        }
    }

    /// Condenser stub that always fails.
    struct FailingCondenser;

    #[async_trait]
    impl Condenser for FailingCondenser {
        async fn condense(&self, _text: &str, _max: usize, _min: usize) -> Result<String> {
            anyhow::bail!("condenser unavailable")
        }
    }

    fn words(n: usize) -> String {
        vec!["tasty"; n].join(" ")
    }

    #[tokio::test]
    async fn test_forty_word_text_passes_through() {
        let condenser = MarkerCondenser::default();
        let input = vec![words(40)];
        let out = summarize(&condenser, &input, 200, SummaryStrategy::Cascade).await;
        assert_eq!(out, input);
        assert_eq!(condenser.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_forty_one_word_text_is_condensed() {
        let condenser = MarkerCondenser::default();
        let input = vec![words(41)];
        let out = summarize(&condenser, &input, 200, SummaryStrategy::Cascade).await;
        assert_eq!(out, vec!["condensed(150)".to_string()]);
        assert_eq!(condenser.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_long_joined_output_triggers_final_pass() {
        let condenser = MarkerCondenser::default();
        // Five 40-word texts pass stage 1 untouched but join to 200 words,
        // over the 150-word stage-2 trigger.
        let input: Vec<String> = (0..5).map(|_| words(40)).collect();
        let out = summarize(&condenser, &input, 200, SummaryStrategy::Cascade).await;
        assert_eq!(out, vec!["condensed(200)".to_string()]);
        assert_eq!(condenser.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_joined_output_returns_stage1_list() {
        let condenser = MarkerCondenser::default();
        let input = vec![words(10), words(20)];
        let out = summarize(&condenser, &input, 200, SummaryStrategy::Cascade).await;
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_original_texts() {
        let input = vec!["short text".to_string()];
        let out = summarize(&FailingCondenser, &input, 200, SummaryStrategy::Cascade).await;
        assert_eq!(out, vec!["short text".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_falls_back_even_for_long_texts() {
        let input = vec![words(100), words(60)];
        let out = summarize(&FailingCondenser, &input, 200, SummaryStrategy::Cascade).await;
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_batched_strategy_condenses_per_batch() {
        let condenser = MarkerCondenser::default();
        // Seven texts -> two batches (5 + 2).
        let input: Vec<String> = (0..7).map(|i| format!("review {i}")).collect();
        let out = summarize(&condenser, &input, 200, SummaryStrategy::Batched).await;
        assert_eq!(out.len(), 2);
        assert_eq!(condenser.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input_is_empty() {
        let condenser = MarkerCondenser::default();
        let out = summarize(&condenser, &[], 200, SummaryStrategy::Cascade).await;
        assert!(out.is_empty());
    }

    #[test]
    fn test_word_count_uses_whitespace() {
        assert_eq!(word_count("a b  c\nd"), 4);
        assert_eq!(word_count(""), 0);
    }
}
