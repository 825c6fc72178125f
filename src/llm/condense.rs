//! Bounded text condensation via a single chat completion.
//!
//! The condenser is best-effort: callers in the summarization stage treat
//! any failure here as "keep the original text", so this module only has
//! to produce a condensed string or a describable error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Condense `text` to roughly `max_words` words (at least `min_words`).
pub async fn condense(
    client: &reqwest::Client,
    config: &LlmConfig,
    text: &str,
    max_words: usize,
    min_words: usize,
) -> Result<String> {
    let prompt = build_condense_prompt(text, max_words, min_words);

    let response = match config.provider.as_str() {
        "ollama" => call_ollama(client, config, &prompt).await?,
        "openai" => call_openai(client, config, &prompt).await?,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    };

    let condensed = response.trim().to_string();
    if condensed.is_empty() {
        anyhow::bail!("Condensation returned empty text");
    }
    Ok(condensed)
}

fn build_condense_prompt(text: &str, max_words: usize, min_words: usize) -> String {
    format!(
        "Condense the following customer feedback into a faithful summary of \
         at most {max_words} words (aim for at least {min_words}). Keep concrete \
         details about taste, texture, and preparation. Respond with ONLY the \
         condensed text, no preamble.\n\n{text}"
    )
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: vec![Message {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        stream: false,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API for condensation")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp.json().await?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: vec![OpenAiMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        temperature: 0.0,
        max_tokens: 400,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API for condensation")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp.json().await?;
    Ok(body
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_bounds_and_text() {
        let prompt = build_condense_prompt("the patty was dry", 150, 50);
        assert!(prompt.contains("150 words"));
        assert!(prompt.contains("at least 50"));
        assert!(prompt.contains("the patty was dry"));
    }
}
