//! # dish-insight
//!
//! A Rust web service that aggregates unstructured opinions about a food
//! dish (Yelp reviews, Reddit comments) and distills them into a condensed
//! insight with a hybrid retrieval, re-ranking, and summarization pipeline.
//!
//! ## Architecture
//!
//! The insight pipeline is a linear ladder where every stage degrades
//! gracefully instead of failing the request:
//!
//! ```text
//!        ┌──────────────┐   ┌────────────────┐
//!        │ Yelp reviews  │   │ Reddit comments │
//!        └──────┬───────┘   └───────┬────────┘
//!               └─────────┬─────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │      Indexing        │  batch embeddings → vector index
//!              │  (300 s deadline)    │  whitespace BM25 → lexical index
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Hybrid retrieval    │  vector top-2k  (+ lexical top-k)
//!              │  lexical 0.6 / 0.4   │  weighted merge, exact dedup
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │     Re-ranking       │  cross-encoder pair scores
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │ Semantic dedup       │  pairwise cosine > 0.85
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │ Summarization        │  per-item cascade, then one
//!              │ (falls back to raw)  │  joint pass over the join
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │ Insight generation   │  LLM; fixed fallback string
//!              └─────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, LLM, reranker, and pipeline knobs
//! - [`models`] - Shared data types: `SourceText`, `DishInsight`, `SuggestionSet`, request/response types
//! - [`fetch`] - Thin Yelp and Reddit clients with logged-and-empty degradation
//! - [`search::vector`] - In-memory flat vector index, parallel text array, L2 search
//! - [`search::lexical`] - In-memory whitespace BM25 index, rebuild-on-extend
//! - [`search::hybrid`] - Weighted merge of the lexical and vector legs with exact dedup
//! - [`llm`] - Injected model capabilities (embed, condense, pair-score, generate) and their HTTP client
//! - [`pipeline`] - The orchestrator: indexing, retrieval, dedup, summarization, generation
//! - [`cache`] - TTL cache of intermediate bundles keyed by request parameters
//! - [`api`] - Axum HTTP handler for decode-menu
//! - [`state`] - Shared application state holding the pipeline, clients, and cache

pub mod api;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod state;
