use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use futures::future::join;

use crate::cache::cache_key;
use crate::llm::insight::{customizations_for, suggestions_for};
use crate::models::{
    CachedBundle, DecodeMenuParams, DishInsight, DishResponse, InsightSource, SuggestionSet,
};
use crate::state::AppState;

/// GET /decode-menu: decode a dish by aggregating Yelp and Reddit
/// opinions through the insight pipeline:
///   1. Cache check (fetch + retrieval + summarization are cached; the
///      generation stages always re-run)
///   2. Social fetch fan-out under one deadline
///   3. Index → retrieve → re-rank → dedup → summarize → insight
///   4. Customization + suggestion generation pair under one deadline
pub async fn decode_menu(
    State(state): State<AppState>,
    Query(params): Query<DecodeMenuParams>,
) -> Result<Json<DishResponse>, (StatusCode, String)> {
    let dish_name = params.dish_name.trim().to_string();
    let location = params.location.trim().to_string();
    if dish_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "dish_name is required".to_string()));
    }
    if location.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "location is required".to_string()));
    }

    let restaurant_name = params
        .restaurant_name
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();
    let user_query = params.user_query.as_deref().filter(|q| !q.trim().is_empty());
    let limit = params.limit.clamp(1, 50);

    tracing::info!("Decoding menu item: '{dish_name}' in '{location}'");

    // ── Step 1: Cache check ──────────────────────────────
    let key = cache_key(&dish_name, &restaurant_name, &location, limit);

    let insight: DishInsight = if let Some(bundle) = state.cache.get(&key) {
        tracing::info!("Serving '{dish_name}' from cached bundle");
        state
            .pipeline
            .insight_from_summaries(&dish_name, bundle.summaries, bundle.source, user_query)
            .await
    } else {
        // ── Step 2: Social fetch fan-out ─────────────────
        let term = if restaurant_name.is_empty() {
            dish_name.clone()
        } else {
            format!("{dish_name} at {restaurant_name}")
        };
        let fetch_deadline = Duration::from_secs(state.config.fetch.fetch_timeout_secs);

        let raw_texts = match tokio::time::timeout(
            fetch_deadline,
            join(
                state.yelp.fetch_reviews(&term, &location, limit),
                state.reddit.fetch_comments(&term),
            ),
        )
        .await
        {
            Ok((yelp_reviews, reddit_comments)) => {
                let mut raw = yelp_reviews;
                raw.extend(reddit_comments);
                raw
            }
            Err(_) => {
                // The fan-out is abandoned as a whole; the pipeline falls
                // back to whatever is already indexed.
                tracing::warn!("Social fetch fan-out exceeded {fetch_deadline:?}");
                Vec::new()
            }
        };

        // ── Step 3: Insight pipeline ─────────────────────
        let insight = state
            .pipeline
            .compute_insight(&dish_name, &raw_texts, user_query)
            .await;

        state.cache.set(
            &key,
            CachedBundle {
                dish_name: dish_name.clone(),
                summaries: insight.summaries.clone(),
                source: insight.source,
            },
        );

        insight
    };

    // ── Step 4: Customizations + suggestions ─────────────
    let (customizations, suggestions) = if insight.source == InsightSource::NoData {
        // Nothing to ground generation on; don't invent suggestions.
        (
            vec![SuggestionSet::placeholder_for("customization")],
            SuggestionSet::placeholders(),
        )
    } else {
        let _permit = state
            .generate_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Generation service at capacity".to_string(),
                )
            })?;

        let generator = state.pipeline.generator();
        let generate_deadline = Duration::from_secs(state.config.fetch.generate_timeout_secs);

        match tokio::time::timeout(
            generate_deadline,
            join(
                customizations_for(generator.as_ref(), &dish_name, &insight.summaries, user_query),
                suggestions_for(generator.as_ref(), &dish_name, &insight.summaries),
            ),
        )
        .await
        {
            Ok((customizations, suggestions)) => (customizations, suggestions),
            Err(_) => {
                tracing::warn!("Generation pair exceeded {generate_deadline:?}");
                (
                    vec![SuggestionSet::placeholder_for("customization")],
                    SuggestionSet::placeholders(),
                )
            }
        }
    };

    tracing::info!("Decoding '{dish_name}' completed ({})", insight.source);

    Ok(Json(DishResponse {
        name: dish_name.clone(),
        dish_name,
        restaurant_name: if restaurant_name.is_empty() {
            "Unknown".to_string()
        } else {
            restaurant_name
        },
        location,
        summarized_reviews: insight.summaries,
        insights: insight.insights,
        source: insight.source.label().to_string(),
        customizations,
        ingredients: suggestions.ingredients,
        beverages: suggestions.beverages,
        flavors: suggestions.flavors,
        desserts: suggestions.desserts,
    }))
}
