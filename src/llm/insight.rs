//! Insight, customization, and suggestion generation.
//!
//! Prompts mirror a food-critic assistant persona; model output is parsed
//! with strict serde into typed shapes. Anything malformed degrades to the
//! documented placeholders; model text is data here, never evaluated.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::models::SuggestionSet;

use super::InsightGenerator;

/// Fixed fallback when insight generation fails outright.
pub const INSIGHT_FALLBACK: &str = "Could not generate insights at this time.";

// ─── Prompts ─────────────────────────────────────────────

pub fn build_insight_prompt(
    dish_name: &str,
    summaries: &[String],
    user_query: Option<&str>,
) -> String {
    let joined = summaries.join("\n- ");
    let query_line = match user_query {
        Some(q) if !q.trim().is_empty() => format!("Also answer this question: \"{q}\"\n"),
        _ => String::new(),
    };
    format!(
        "Summarize the customer feedback on the dish '{dish_name}' using the \
         following condensed reviews:\n- {joined}\n{query_line}\
         Focus on taste, uniqueness, and commonly mentioned highlights. \
         Generate one concise, grounded insight paragraph."
    )
}

pub fn build_customizations_prompt(
    dish_name: &str,
    insights: &[String],
    user_query: Option<&str>,
) -> String {
    let joined = insights.join("\n- ");
    let query = user_query.unwrap_or("No specific query");
    format!(
        "The following are insights about the dish \"{dish_name}\":\n- {joined}\n\n\
         User query (if provided): \"{query}\"\n\n\
         Based on the insights and user query, generate three customization \
         suggestions that could enhance the user's experience with this dish. \
         Focus on additions (toppings, condiments), substitutions (bun, patty), \
         and dietary adjustments (vegan, gluten-free options).\n\n\
         Return ONLY a JSON object:\n\
         {{\"customizations\": [\"Suggestion 1\", \"Suggestion 2\", \"Suggestion 3\"]}}"
    )
}

pub fn build_suggestions_prompt(dish_name: &str, insights: &[String]) -> String {
    let joined = insights.join("\n- ");
    format!(
        "The following are insights about the dish \"{dish_name}\":\n- {joined}\n\n\
         Based on this, provide creative suggestions in the following \
         categories: 3 ingredient substitutions, 3 beverage pairings, \
         3 flavor enhancements, 3 dessert pairings.\n\n\
         Return ONLY a valid JSON object:\n\
         {{\"ingredients\": [...], \"beverages\": [...], \"flavors\": [...], \"desserts\": [...]}}"
    )
}

// ─── Parsing ─────────────────────────────────────────────

/// Pull the first JSON object out of free-form model text and parse it.
/// Models often wrap JSON in prose or markdown fences; anything between the
/// outermost braces is tried as-is.
pub fn extract_json_object(content: &str) -> Result<serde_json::Value> {
    if let Ok(v) = serde_json::from_str(content) {
        return Ok(v);
    }
    let start = content.find('{').context("No JSON object in model output")?;
    let end = content.rfind('}').context("No closing brace in model output")?;
    if end < start {
        anyhow::bail!("Malformed JSON braces in model output");
    }
    serde_json::from_str(&content[start..=end]).context("Failed to parse model output as JSON")
}

#[derive(Deserialize)]
struct RawCustomizations {
    customizations: Option<Vec<String>>,
}

/// Parse a customizations payload; a missing or empty list becomes the
/// single placeholder entry.
pub fn parse_customizations(value: &serde_json::Value) -> Vec<String> {
    let parsed: RawCustomizations = match serde_json::from_value(value.clone()) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Customizations payload did not match schema: {e}");
            return vec![SuggestionSet::placeholder_for("customization")];
        }
    };
    match parsed.customizations {
        Some(list) if !list.is_empty() => list,
        _ => vec![SuggestionSet::placeholder_for("customization")],
    }
}

#[derive(Deserialize)]
struct RawSuggestions {
    ingredients: Option<Vec<String>>,
    beverages: Option<Vec<String>>,
    flavors: Option<Vec<String>>,
    desserts: Option<Vec<String>>,
}

/// Parse a suggestions payload, filling the placeholder for every missing
/// or empty category.
pub fn parse_suggestions(value: &serde_json::Value) -> SuggestionSet {
    let parsed: RawSuggestions = match serde_json::from_value(value.clone()) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Suggestions payload did not match schema: {e}");
            return SuggestionSet::placeholders();
        }
    };

    let fill = |field: &str, list: Option<Vec<String>>| -> Vec<String> {
        match list {
            Some(l) if !l.is_empty() => l,
            _ => vec![SuggestionSet::placeholder_for(field)],
        }
    };

    SuggestionSet {
        ingredients: fill("ingredients", parsed.ingredients),
        beverages: fill("beverages", parsed.beverages),
        flavors: fill("flavors", parsed.flavors),
        desserts: fill("desserts", parsed.desserts),
    }
}

// ─── Generation wrappers (never error) ───────────────────

/// Generate customization suggestions. Any failure (transport, schema,
/// missing keys) degrades to the placeholder list.
pub async fn customizations_for(
    generator: &dyn InsightGenerator,
    dish_name: &str,
    insights: &[String],
    user_query: Option<&str>,
) -> Vec<String> {
    let prompt = build_customizations_prompt(dish_name, insights, user_query);
    match generator.generate_structured(&prompt).await {
        Ok(value) => parse_customizations(&value),
        Err(e) => {
            tracing::warn!("Customization generation failed: {e}");
            vec![SuggestionSet::placeholder_for("customization")]
        }
    }
}

/// Generate the four-category suggestion set. Any failure degrades to
/// per-category placeholders.
pub async fn suggestions_for(
    generator: &dyn InsightGenerator,
    dish_name: &str,
    insights: &[String],
) -> SuggestionSet {
    let prompt = build_suggestions_prompt(dish_name, insights);
    match generator.generate_structured(&prompt).await {
        Ok(value) => parse_suggestions(&value),
        Err(e) => {
            tracing::warn!("Suggestion generation failed: {e}");
            SuggestionSet::placeholders()
        }
    }
}

// ─── HTTP chat plumbing ──────────────────────────────────

/// One chat completion with a food-critic system persona.
pub async fn chat_completion(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    prompt: &str,
    max_tokens: u32,
) -> Result<String> {
    match config.provider.as_str() {
        "ollama" => call_ollama(client, config, system, prompt).await,
        "openai" => call_openai(client, config, system, prompt, max_tokens).await,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    }
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    prompt: &str,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url);

    let req = OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ],
        stream: false,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API for generation")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp.json().await?;
    Ok(body.message.content)
}

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
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
    system: &str,
    prompt: &str,
    max_tokens: u32,
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            },
        ],
        temperature: 0.7,
        max_tokens,
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API for generation")?;

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
    fn test_extract_clean_json() {
        let v = extract_json_object(r#"{"customizations": ["extra cheese"]}"#).unwrap();
        assert_eq!(v["customizations"][0], "extra cheese");
    }

    #[test]
    fn test_extract_json_embedded_in_prose() {
        let input = "Sure! Here you go:\n```json\n{\"ingredients\": [\"brioche bun\"]}\n```\nEnjoy!";
        let v = extract_json_object(input).unwrap();
        assert_eq!(v["ingredients"][0], "brioche bun");
    }

    #[test]
    fn test_extract_garbage_errors() {
        assert!(extract_json_object("I can't answer that.").is_err());
        assert!(extract_json_object("} backwards {").is_err());
    }

    #[test]
    fn test_parse_suggestions_fills_missing_fields() {
        let v: serde_json::Value =
            serde_json::from_str(r#"{"ingredients": ["swap beef for turkey"]}"#).unwrap();
        let set = parse_suggestions(&v);
        assert_eq!(set.ingredients, vec!["swap beef for turkey"]);
        assert_eq!(set.beverages, vec!["No beverages suggestions available."]);
        assert_eq!(set.flavors, vec!["No flavors suggestions available."]);
        assert_eq!(set.desserts, vec!["No desserts suggestions available."]);
    }

    #[test]
    fn test_parse_suggestions_empty_lists_become_placeholders() {
        let v: serde_json::Value = serde_json::from_str(
            r#"{"ingredients": [], "beverages": ["lemonade"], "flavors": [], "desserts": []}"#,
        )
        .unwrap();
        let set = parse_suggestions(&v);
        assert_eq!(set.beverages, vec!["lemonade"]);
        assert_eq!(
            set.ingredients,
            vec!["No ingredients suggestions available."]
        );
    }

    #[test]
    fn test_parse_suggestions_wrong_shape_is_all_placeholders() {
        let v: serde_json::Value = serde_json::from_str(r#"{"ingredients": "not a list"}"#).unwrap();
        let set = parse_suggestions(&v);
        assert_eq!(
            set.ingredients,
            vec!["No ingredients suggestions available."]
        );
    }

    #[test]
    fn test_parse_customizations_happy_path() {
        let v: serde_json::Value =
            serde_json::from_str(r#"{"customizations": ["add bacon", "gluten-free bun"]}"#)
                .unwrap();
        assert_eq!(
            parse_customizations(&v),
            vec!["add bacon", "gluten-free bun"]
        );
    }

    #[test]
    fn test_parse_customizations_missing_key_is_placeholder() {
        let v: serde_json::Value = serde_json::from_str(r#"{"something_else": true}"#).unwrap();
        assert_eq!(
            parse_customizations(&v),
            vec!["No customization suggestions available."]
        );
    }

    #[test]
    fn test_insight_prompt_includes_query_when_present() {
        let p = build_insight_prompt("BBQ Burger", &["smoky".to_string()], Some("is it spicy?"));
        assert!(p.contains("BBQ Burger"));
        assert!(p.contains("is it spicy?"));

        let p = build_insight_prompt("BBQ Burger", &["smoky".to_string()], None);
        assert!(!p.contains("Also answer"));
    }
}
