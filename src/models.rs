use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which external source a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Yelp,
    Reddit,
}

/// A raw opinion fetched from an external source, before indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceText {
    pub text: String,
    pub source: Source,
    /// Upvote or rating score. Used only to pre-filter fetched data;
    /// ranking is established later by the re-ranker.
    pub score: Option<i64>,
}

impl SourceText {
    pub fn new(text: impl Into<String>, source: Source) -> Self {
        Self {
            text: text.into(),
            source,
            score: None,
        }
    }
}

/// Which retrieval strategy produced an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    /// Lexical + vector retrieval, re-ranked and summarized.
    Hybrid,
    /// Vector-only retrieval, re-ranked and summarized.
    VectorOnly,
    /// Retrieval came up empty; the raw fetched texts were used instead.
    RawFallback,
    /// Neither retrieval nor the fetchers produced any text.
    NoData,
}

impl InsightSource {
    /// Human-readable strategy tag carried in responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hybrid => "Hybrid (lexical + vector + summarization)",
            Self::VectorOnly => "Vector-only (vector + summarization)",
            Self::RawFallback => "Raw review fallback",
            Self::NoData => "No data found",
        }
    }
}

impl std::fmt::Display for InsightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Final output of the pipeline: condensed opinions about one dish.
#[derive(Debug, Clone, Serialize)]
pub struct DishInsight {
    pub dish_name: String,
    /// Condensed review texts, pre-generation. Kept so callers can feed
    /// them into follow-up generation without re-running retrieval.
    pub summaries: Vec<String>,
    /// Generated insight strings. Never empty: generation failures degrade
    /// to a fixed fallback message.
    pub insights: Vec<String>,
    pub source: InsightSource,
    pub generated_at: DateTime<Utc>,
}

/// Suggestion categories generated for a dish. Missing categories are
/// filled with a placeholder rather than omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub ingredients: Vec<String>,
    pub beverages: Vec<String>,
    pub flavors: Vec<String>,
    pub desserts: Vec<String>,
}

impl SuggestionSet {
    pub fn placeholder_for(field: &str) -> String {
        format!("No {field} suggestions available.")
    }

    /// A set with every category holding its placeholder.
    pub fn placeholders() -> Self {
        Self {
            ingredients: vec![Self::placeholder_for("ingredients")],
            beverages: vec![Self::placeholder_for("beverages")],
            flavors: vec![Self::placeholder_for("flavors")],
            desserts: vec![Self::placeholder_for("desserts")],
        }
    }
}

/// Query parameters for the decode-menu endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DecodeMenuParams {
    pub dish_name: String,
    pub restaurant_name: Option<String>,
    pub location: String,
    pub user_query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

/// Response envelope for the decode-menu endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DishResponse {
    pub name: String,
    pub dish_name: String,
    pub restaurant_name: String,
    pub location: String,
    pub summarized_reviews: Vec<String>,
    pub insights: Vec<String>,
    pub source: String,
    pub customizations: Vec<String>,
    pub ingredients: Vec<String>,
    pub beverages: Vec<String>,
    pub flavors: Vec<String>,
    pub desserts: Vec<String>,
}

/// Intermediate pipeline output cached between requests: everything up to
/// (but not including) the generation stages, which re-run per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedBundle {
    pub dish_name: String,
    pub summaries: Vec<String>,
    pub source: InsightSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serializes_to_snake_case() {
        let json = serde_json::to_value(Source::Yelp).unwrap();
        assert_eq!(json, "yelp");
        let json = serde_json::to_value(Source::Reddit).unwrap();
        assert_eq!(json, "reddit");
    }

    #[test]
    fn test_insight_source_labels() {
        assert!(InsightSource::Hybrid.label().starts_with("Hybrid"));
        assert_eq!(InsightSource::NoData.label(), "No data found");
    }

    #[test]
    fn test_cached_bundle_round_trips() {
        let bundle = CachedBundle {
            dish_name: "BBQ Burger".to_string(),
            summaries: vec!["juicy".to_string()],
            source: InsightSource::RawFallback,
        };
        let json = serde_json::to_string(&bundle).unwrap();
        let back: CachedBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dish_name, "BBQ Burger");
        assert_eq!(back.source, InsightSource::RawFallback);
    }

    #[test]
    fn test_placeholder_text_names_the_field() {
        assert_eq!(
            SuggestionSet::placeholder_for("beverages"),
            "No beverages suggestions available."
        );
    }
}
