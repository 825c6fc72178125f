use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Hard cap on characters sent per text to the embedding API. Reviews and
/// comments are prose (~4 chars per token), so this stays far inside small
/// embedding models' context windows; anything longer is clipped at a
/// UTF-8 char boundary rather than rejected.
const MAX_EMBED_CHARS: usize = 3_000;

/// Per-request batch ceilings. Ollama's `/api/embed` degrades with large
/// batches; OpenAI-compatible endpoints take bigger ones.
const OLLAMA_BATCH: usize = 32;
const OPENAI_BATCH: usize = 64;

/// Embed a batch of texts with the configured provider. Returns one vector
/// per input, in input order; an empty input is an empty output. The whole
/// call fails if any chunk fails (no partial results).
pub async fn embed_batch(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let clipped: Vec<String> = texts.iter().map(|t| clip_chars(t).to_owned()).collect();

    let chunk_size = match config.provider.as_str() {
        "ollama" => OLLAMA_BATCH,
        "openai" => OPENAI_BATCH,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    };

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(clipped.len());
    for chunk in clipped.chunks(chunk_size) {
        let mut got = match config.provider.as_str() {
            "ollama" => ollama_embed(client, config, chunk).await?,
            _ => openai_embed(client, config, chunk).await?,
        };
        if got.len() != chunk.len() {
            anyhow::bail!(
                "embedding endpoint returned {} vectors for {} texts",
                got.len(),
                chunk.len()
            );
        }
        vectors.append(&mut got);
    }

    Ok(vectors)
}

/// Clip to `MAX_EMBED_CHARS`, backing up to a UTF-8 char boundary.
fn clip_chars(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut cut = MAX_EMBED_CHARS;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    /// Have Ollama clip over-long inputs itself instead of replying 400.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn ollama_embed(
    client: &reqwest::Client,
    config: &LlmConfig,
    chunk: &[String],
) -> Result<Vec<Vec<f32>>> {
    let resp = client
        .post(format!("{}/api/embed", config.base_url))
        .json(&OllamaEmbedRequest {
            model: &config.embedding_model,
            input: chunk,
            truncate: true,
        })
        .send()
        .await
        .context("Failed to call Ollama embed API")?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama embed API returned {status}: {detail}");
    }

    let parsed: OllamaEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama embed response")?;
    Ok(parsed.embeddings)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedEntry>,
}

#[derive(Deserialize)]
struct OpenAiEmbedEntry {
    embedding: Vec<f32>,
}

async fn openai_embed(
    client: &reqwest::Client,
    config: &LlmConfig,
    chunk: &[String],
) -> Result<Vec<Vec<f32>>> {
    let resp = client
        .post(format!("{}/v1/embeddings", config.base_url))
        .bearer_auth(config.api_key.as_deref().unwrap_or_default())
        .json(&OpenAiEmbedRequest {
            model: &config.embedding_model,
            input: chunk,
        })
        .send()
        .await
        .context("Failed to call OpenAI embed API")?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI embed API returned {status}: {detail}");
    }

    let parsed: OpenAiEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI embed response")?;
    Ok(parsed.data.into_iter().map(|e| e.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_short_text_unchanged() {
        assert_eq!(clip_chars("short review"), "short review");
    }

    #[test]
    fn test_clip_respects_char_boundary() {
        // Multi-byte chars straddling the cut point must not split.
        let text = "é".repeat(MAX_EMBED_CHARS);
        let cut = clip_chars(&text);
        assert!(cut.len() <= MAX_EMBED_CHARS);
        assert!(cut.is_char_boundary(cut.len()));
    }

    #[test]
    fn test_clip_long_ascii() {
        let text = "a".repeat(MAX_EMBED_CHARS + 100);
        assert_eq!(clip_chars(&text).len(), MAX_EMBED_CHARS);
    }
}
