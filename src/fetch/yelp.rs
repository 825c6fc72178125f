//! Yelp business search + review aggregation.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::FetchConfig;
use crate::models::{Source, SourceText};

/// Yelp caps search pages at 50 results.
const PAGE_LIMIT: usize = 50;
/// Stop aggregating once at least this many reviews are collected.
const MIN_REVIEWS: usize = 3;

pub struct YelpClient {
    http: reqwest::Client,
    config: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<Business>,
}

#[derive(Deserialize)]
struct ReviewsResponse {
    #[serde(default)]
    reviews: Vec<Review>,
}

#[derive(Deserialize)]
struct Review {
    text: String,
    #[serde(default)]
    rating: Option<i64>,
}

impl YelpClient {
    pub fn new(http: reqwest::Client, config: FetchConfig) -> Self {
        Self { http, config }
    }

    /// Fetch reviews for a dish/restaurant query. Never fails: any error is
    /// logged and contributes an empty set.
    pub async fn fetch_reviews(&self, term: &str, location: &str, limit: usize) -> Vec<SourceText> {
        match self.try_fetch_reviews(term, location, limit).await {
            Ok(reviews) => {
                tracing::info!("Fetched {} Yelp reviews for '{term}'", reviews.len());
                reviews
            }
            Err(e) => {
                tracing::warn!("Yelp fetch failed for '{term}': {e}");
                Vec::new()
            }
        }
    }

    async fn try_fetch_reviews(
        &self,
        term: &str,
        location: &str,
        limit: usize,
    ) -> Result<Vec<SourceText>> {
        let businesses = self.search_businesses(term, location, limit).await?;
        if businesses.is_empty() {
            tracing::info!("No Yelp businesses for '{term}' in '{location}'");
            return Ok(Vec::new());
        }
        self.reviews_for_businesses(&businesses).await
    }

    /// Paginated business search, up to `limit` results, best-match order.
    async fn search_businesses(
        &self,
        term: &str,
        location: &str,
        limit: usize,
    ) -> Result<Vec<Business>> {
        let api_key = self
            .config
            .yelp_api_key
            .as_deref()
            .context("Yelp API key not configured")?;

        let url = format!("{}/businesses/search", self.config.yelp_base_url);
        let mut results: Vec<Business> = Vec::new();
        let mut offset = 0usize;

        while results.len() < limit {
            let page = PAGE_LIMIT.min(limit - results.len());
            let resp = self
                .http
                .get(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .query(&[
                    ("term", term),
                    ("location", location),
                    ("limit", &page.to_string()),
                    ("offset", &offset.to_string()),
                    ("sort_by", "best_match"),
                ])
                .send()
                .await
                .context("Failed to call Yelp search API")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("Yelp search API returned {status}: {body}");
            }

            let body: SearchResponse = resp
                .json()
                .await
                .context("Failed to parse Yelp search response")?;

            if body.businesses.is_empty() {
                break;
            }
            offset += body.businesses.len();
            results.extend(body.businesses);
        }

        results.truncate(limit);
        tracing::info!("Found {} Yelp businesses for '{term}'", results.len());
        Ok(results)
    }

    /// Fetch reviews business by business, returning early once the
    /// minimum aggregate count is reached.
    async fn reviews_for_businesses(&self, businesses: &[Business]) -> Result<Vec<SourceText>> {
        let api_key = self
            .config
            .yelp_api_key
            .as_deref()
            .context("Yelp API key not configured")?;

        let mut aggregated: Vec<SourceText> = Vec::new();

        for business in businesses {
            let url = format!(
                "{}/businesses/{}/reviews",
                self.config.yelp_base_url, business.id
            );
            let resp = self
                .http
                .get(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .send()
                .await;

            let resp = match resp {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    tracing::warn!(
                        "Yelp reviews call for '{}' returned {}",
                        business.name,
                        r.status()
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Yelp reviews call for '{}' failed: {e}", business.name);
                    continue;
                }
            };

            let body: ReviewsResponse = match resp.json().await {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!("Failed to parse Yelp reviews for '{}': {e}", business.name);
                    continue;
                }
            };

            aggregated.extend(body.reviews.into_iter().map(|r| SourceText {
                text: r.text,
                source: Source::Yelp,
                score: r.rating,
            }));

            if aggregated.len() >= MIN_REVIEWS {
                break;
            }
        }

        Ok(aggregated)
    }
}
