//! Reddit post search + comment collection over the public JSON API.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Deserialize;

use crate::config::FetchConfig;
use crate::models::{Source, SourceText};

/// Posts kept per query after the score-descending pre-filter.
const TOP_POSTS: usize = 10;
/// Posts requested per subreddit.
const POSTS_PER_SUBREDDIT: usize = 5;

pub struct RedditClient {
    http: reqwest::Client,
    config: FetchConfig,
}

#[derive(Debug, Clone)]
struct Post {
    id: String,
    score: i64,
    subreddit: String,
}

// Reddit's listing envelope: { data: { children: [ { data: {...} } ] } }

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: ChildData,
}

#[derive(Deserialize)]
struct ChildData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    body: Option<String>,
}

impl RedditClient {
    pub fn new(http: reqwest::Client, config: FetchConfig) -> Self {
        Self { http, config }
    }

    /// Fetch comment texts for a dish query across the configured
    /// subreddits. Never fails: errors are logged and contribute an empty
    /// set.
    pub async fn fetch_comments(&self, query: &str) -> Vec<SourceText> {
        // Fan out one search per subreddit; results join in issue order.
        let searches = self
            .config
            .subreddits
            .iter()
            .map(|sub| self.search_subreddit(sub, query));

        let mut posts: Vec<Post> = Vec::new();
        for result in join_all(searches).await {
            match result {
                Ok(found) => posts.extend(found),
                Err(e) => tracing::warn!("Reddit search failed: {e}"),
            }
        }

        // Remove duplicate posts by id, keeping the first occurrence.
        let mut seen = std::collections::HashSet::new();
        posts.retain(|p| seen.insert(p.id.clone()));

        // Pre-filter: highest-score posts only. This is the one place the
        // upvote score is consulted; relevance ranking happens later.
        posts.sort_by_key(|p| std::cmp::Reverse(p.score));
        posts.truncate(TOP_POSTS);

        tracing::info!("Fetched {} Reddit posts for '{query}'", posts.len());

        let comment_fetches = posts.iter().map(|p| self.comments_for_post(p));
        let mut comments: Vec<SourceText> = Vec::new();
        for result in join_all(comment_fetches).await {
            match result {
                Ok(found) => comments.extend(found),
                Err(e) => tracing::warn!("Reddit comment fetch failed: {e}"),
            }
        }

        tracing::info!("Fetched {} Reddit comments for '{query}'", comments.len());
        comments
    }

    async fn search_subreddit(&self, subreddit: &str, query: &str) -> Result<Vec<Post>> {
        let url = format!("{}/r/{subreddit}/search.json", self.config.reddit_base_url);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", &POSTS_PER_SUBREDDIT.to_string()),
                ("sort", "relevance"),
                ("restrict_sr", "1"),
            ])
            .send()
            .await
            .context("Failed to call Reddit search API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Reddit search for r/{subreddit} returned {status}");
        }

        let body: Listing = resp
            .json()
            .await
            .context("Failed to parse Reddit search response")?;

        Ok(body
            .data
            .children
            .into_iter()
            .filter(|c| !c.data.id.is_empty())
            .map(|c| Post {
                id: c.data.id,
                score: c.data.score,
                subreddit: subreddit.to_string(),
            })
            .collect())
    }

    async fn comments_for_post(&self, post: &Post) -> Result<Vec<SourceText>> {
        let url = format!(
            "{}/r/{}/comments/{}.json",
            self.config.reddit_base_url, post.subreddit, post.id
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to call Reddit comments API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Reddit comments for post {} returned {status}", post.id);
        }

        // The comments endpoint returns two listings: the post itself,
        // then its top-level comments.
        let listings: Vec<Listing> = resp
            .json()
            .await
            .context("Failed to parse Reddit comments response")?;

        let comments = listings
            .into_iter()
            .nth(1)
            .map(|l| l.data.children)
            .unwrap_or_default();

        Ok(comments
            .into_iter()
            .filter_map(|c| {
                c.data.body.and_then(|body| {
                    if body.trim().is_empty() {
                        None
                    } else {
                        Some(SourceText {
                            text: body,
                            source: Source::Reddit,
                            score: Some(c.data.score),
                        })
                    }
                })
            })
            .collect())
    }
}
