use std::collections::HashMap;

/// A merged retrieval candidate, before re-ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub lexical_score: f32,
    pub vector_score: f32,
    /// Weighted combination of the normalized leg scores.
    pub combined_score: f32,
}

/// Weighted merge of the lexical and vector retrieval legs.
///
/// Each leg's scores are max-normalized to [0, 1] so the weights compare
/// like with like, then combined as
/// `lexical_weight * lexical + vector_weight * vector`. Candidates are
/// keyed by exact text: the same text surfacing in both legs (or twice in
/// one leg, for corpora with repeated entries) collapses to a single
/// candidate holding the max per-leg score; first-seen order is kept for
/// ties. Vector input is `(text, distance)`; distances are mapped to
/// similarities with `1 / (1 + d)` before normalizing.
pub fn weighted_merge(
    lexical: &[(String, f32)],
    vector: &[(String, f32)],
    lexical_weight: f32,
    vector_weight: f32,
    limit: usize,
) -> Vec<Candidate> {
    let lexical_norm = max_normalize(&lexical.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    let vector_sims: Vec<f32> = vector
        .iter()
        .map(|(_, d)| distance_to_similarity(*d))
        .collect();
    let vector_norm = max_normalize(&vector_sims);

    // Keyed by exact text; order vector preserves first-seen order.
    let mut by_text: HashMap<&str, usize> = HashMap::new();
    let mut merged: Vec<Candidate> = Vec::new();

    for (i, (text, _)) in lexical.iter().enumerate() {
        let idx = *by_text.entry(text.as_str()).or_insert_with(|| {
            merged.push(Candidate {
                text: text.clone(),
                lexical_score: 0.0,
                vector_score: 0.0,
                combined_score: 0.0,
            });
            merged.len() - 1
        });
        merged[idx].lexical_score = merged[idx].lexical_score.max(lexical_norm[i]);
    }

    for (i, (text, _)) in vector.iter().enumerate() {
        let idx = *by_text.entry(text.as_str()).or_insert_with(|| {
            merged.push(Candidate {
                text: text.clone(),
                lexical_score: 0.0,
                vector_score: 0.0,
                combined_score: 0.0,
            });
            merged.len() - 1
        });
        merged[idx].vector_score = merged[idx].vector_score.max(vector_norm[i]);
    }

    for c in &mut merged {
        c.combined_score = lexical_weight * c.lexical_score + vector_weight * c.vector_score;
    }

    // Stable sort keeps first-seen order among equal scores.
    merged.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(limit);
    merged
}

/// Scale scores so the max becomes 1.0. All-zero (or empty) input is
/// returned unchanged rather than dividing by zero.
fn max_normalize(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().cloned().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return scores.to_vec();
    }
    scores.iter().map(|s| s / max).collect()
}

/// Map an L2 distance to a similarity in (0, 1], monotonically decreasing.
fn distance_to_similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, f32)]) -> Vec<(String, f32)> {
        items.iter().map(|(t, s)| (t.to_string(), *s)).collect()
    }

    #[test]
    fn test_empty_inputs_merge_to_empty() {
        let merged = weighted_merge(&[], &[], 0.6, 0.4, 10);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_lexical_only_ranks_by_lexical_score() {
        let lexical = pairs(&[("juicy burger", 8.0), ("stale bun", 2.0)]);
        let merged = weighted_merge(&lexical, &[], 0.6, 0.4, 10);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "juicy burger");
        // Max-normalized: top lexical hit scores 0.6 * 1.0
        assert!((merged[0].combined_score - 0.6).abs() < 1e-6);
        assert!(merged[0].combined_score > merged[1].combined_score);
    }

    #[test]
    fn test_vector_only_ranks_by_ascending_distance() {
        let vector = pairs(&[("close match", 0.1), ("far match", 2.0)]);
        let merged = weighted_merge(&[], &vector, 0.6, 0.4, 10);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "close match");
        assert!(merged[0].vector_score > merged[1].vector_score);
    }

    #[test]
    fn test_text_in_both_legs_is_boosted_and_deduplicated() {
        let lexical = pairs(&[("great burger", 5.0), ("soggy fries", 4.0)]);
        let vector = pairs(&[("great burger", 0.2), ("thick shake", 0.5)]);
        let merged = weighted_merge(&lexical, &vector, 0.6, 0.4, 10);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text, "great burger");
        assert!(merged[0].lexical_score > 0.0);
        assert!(merged[0].vector_score > 0.0);
    }

    #[test]
    fn test_weights_decide_between_legs() {
        // One text tops the lexical leg, another tops the vector leg; with
        // lexical weighted higher the lexical winner must come out first.
        let lexical = pairs(&[("keyword hit", 9.0)]);
        let vector = pairs(&[("semantic hit", 0.0)]);

        let merged = weighted_merge(&lexical, &vector, 0.6, 0.4, 10);
        assert_eq!(merged[0].text, "keyword hit");

        let merged = weighted_merge(&lexical, &vector, 0.4, 0.6, 10);
        assert_eq!(merged[0].text, "semantic hit");
    }

    #[test]
    fn test_duplicate_text_within_one_leg_keeps_max_score() {
        let lexical = pairs(&[("same text", 3.0), ("same text", 9.0)]);
        let merged = weighted_merge(&lexical, &[], 1.0, 0.0, 10);

        assert_eq!(merged.len(), 1);
        assert!((merged[0].lexical_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_limit_respected() {
        let lexical: Vec<(String, f32)> = (0..20)
            .map(|i| (format!("text {i}"), 20.0 - i as f32))
            .collect();
        let merged = weighted_merge(&lexical, &[], 0.6, 0.4, 5);
        assert_eq!(merged.len(), 5);
    }

    #[test]
    fn test_first_seen_order_kept_for_ties() {
        let lexical = pairs(&[("first", 5.0), ("second", 5.0)]);
        let merged = weighted_merge(&lexical, &[], 0.6, 0.4, 10);
        assert_eq!(merged[0].text, "first");
        assert_eq!(merged[1].text, "second");
    }

    #[test]
    fn test_distance_zero_maps_to_similarity_one() {
        assert!((distance_to_similarity(0.0) - 1.0).abs() < 1e-6);
        assert!(distance_to_similarity(1.0) < distance_to_similarity(0.5));
    }

    #[test]
    fn test_max_normalize_handles_all_zero() {
        assert_eq!(max_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(max_normalize(&[]), Vec::<f32>::new());
    }
}
