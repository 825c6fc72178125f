//! Semantic deduplication by pairwise embedding similarity.

use anyhow::Result;

use crate::llm::Embedder;

/// Remove near-duplicate texts, preserving first-occurrence order.
///
/// All texts are embedded in one batch, a full pairwise cosine-similarity
/// matrix is computed, and the list is scanned greedily in original order:
/// an item is kept only if no earlier-kept item has already claimed it as
/// similar; keeping an item claims everything above the threshold
/// (strictly greater: similarity exactly at the threshold does NOT count
/// as duplicate). O(n²) in input size, which is fine because inputs arrive
/// pre-filtered to a small top-K by the re-ranking stage.
pub async fn semantic_deduplicate(
    embedder: &dyn Embedder,
    texts: &[String],
    threshold: f32,
) -> Result<Vec<String>> {
    if texts.len() <= 1 {
        return Ok(texts.to_vec());
    }

    let embeddings = embedder.embed(texts).await?;
    if embeddings.len() != texts.len() {
        anyhow::bail!(
            "embedder returned {} vectors for {} texts",
            embeddings.len(),
            texts.len()
        );
    }

    let similarities = similarity_matrix(&embeddings);
    let kept = claim_unique(&similarities, threshold);

    tracing::info!(
        "Deduplicated {} texts to {} unique (threshold {threshold})",
        texts.len(),
        kept.len()
    );

    Ok(kept.into_iter().map(|i| texts[i].clone()).collect())
}

/// Full pairwise cosine-similarity matrix.
fn similarity_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in 0..n {
            matrix[i][j] = if i == j {
                1.0
            } else {
                cosine_similarity(&embeddings[i], &embeddings[j])
            };
        }
    }
    matrix
}

/// Greedy first-occurrence claim scan over a similarity matrix. Returns
/// the indices kept, in original order.
fn claim_unique(similarities: &[Vec<f32>], threshold: f32) -> Vec<usize> {
    let n = similarities.len();
    let mut claimed = vec![false; n];
    let mut kept = Vec::new();

    for i in 0..n {
        if claimed[i] {
            continue;
        }
        kept.push(i);
        for j in 0..n {
            if similarities[i][j] > threshold {
                claimed[j] = true;
            }
        }
    }

    kept
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Embedder stub returning fixed vectors per known text.
    struct FixedEmbedder {
        vectors: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| self.vectors.get(t).cloned().unwrap_or(vec![0.0, 0.0, 1.0]))
                .collect())
        }
    }

    #[test]
    fn test_similarity_exactly_at_threshold_is_kept() {
        // Strict >: 0.85 is NOT a duplicate of 0.85-threshold scan.
        let similarities = vec![vec![1.0, 0.85], vec![0.85, 1.0]];
        let kept = claim_unique(&similarities, 0.85);
        assert_eq!(kept, vec![0, 1]);
    }

    #[test]
    fn test_similarity_above_threshold_is_claimed() {
        let similarities = vec![vec![1.0, 0.86], vec![0.86, 1.0]];
        let kept = claim_unique(&similarities, 0.85);
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn test_claim_is_transitive_through_first_keeper() {
        // Item 0 claims 1 and 2 even though 1 and 2 are dissimilar to each
        // other; neither gets a second chance.
        let similarities = vec![
            vec![1.0, 0.9, 0.9],
            vec![0.9, 1.0, 0.1],
            vec![0.9, 0.1, 1.0],
        ];
        let kept = claim_unique(&similarities, 0.85);
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn test_first_occurrence_order_preserved() {
        let similarities = vec![
            vec![1.0, 0.2, 0.9],
            vec![0.2, 1.0, 0.3],
            vec![0.9, 0.3, 1.0],
        ];
        let kept = claim_unique(&similarities, 0.85);
        assert_eq!(kept, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_burger_review_scenario() {
        // First and third reviews are near-duplicates (cosine 0.9); the
        // second is unrelated (0.5 to both). Expect exactly the first two
        // surviving, in order.
        let mut vectors = HashMap::new();
        vectors.insert(
            "Great burger, juicy patty".to_string(),
            vec![1.0, 0.0, 0.0],
        );
        vectors.insert("Bun was stale".to_string(), vec![0.5, 0.11471, 0.85840]);
        vectors.insert(
            "Great burger, juicy patty and fresh".to_string(),
            vec![0.9, 0.43589, 0.0],
        );

        let embedder = FixedEmbedder { vectors };
        let texts = vec![
            "Great burger, juicy patty".to_string(),
            "Bun was stale".to_string(),
            "Great burger, juicy patty and fresh".to_string(),
        ];

        let unique = semantic_deduplicate(&embedder, &texts, 0.85).await.unwrap();
        assert_eq!(
            unique,
            vec![
                "Great burger, juicy patty".to_string(),
                "Bun was stale".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_single_text_skips_embedding() {
        let embedder = FixedEmbedder {
            vectors: HashMap::new(),
        };
        let texts = vec!["only one".to_string()];
        let unique = semantic_deduplicate(&embedder, &texts, 0.85).await.unwrap();
        assert_eq!(unique, texts);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let embedder = FixedEmbedder {
            vectors: HashMap::new(),
        };
        let unique = semantic_deduplicate(&embedder, &[], 0.85).await.unwrap();
        assert!(unique.is_empty());
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
