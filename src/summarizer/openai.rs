use crate::config::SummarizerSettings;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes GitHub repositories. \
     Analyze the README and extract key information.";

/// The structured result the completion API is contracted to return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
    pub summary: String,
    pub cool_facts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
    response_format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

fn user_prompt(readme: &str) -> String {
    format!(
        "Analyze this GitHub repository based on its README file and provide:\n\
         1. A concise summary (2-3 sentences)\n\
         2. At least 3 cool or interesting facts/features\n\n\
         README Content:\n{readme}"
    )
}

/// JSON schema binding the model to `{summary, cool_facts[>=3]}`
fn output_schema() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "repo_summary",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "A concise summary of the repository from its README (2-3 sentences)"
                    },
                    "cool_facts": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 3,
                        "description": "A list of at least 3 cool or interesting facts/features from the README"
                    }
                },
                "required": ["summary", "cool_facts"],
                "additionalProperties": false
            }
        }
    })
}

/// Issue one blocking structured-completion request. No streaming, no
/// retries; any transport, status, or schema failure surfaces as an error.
pub async fn complete_summary(
    client: &reqwest::Client,
    settings: &SummarizerSettings,
    readme: &str,
) -> Result<RepoSummary> {
    let api_key = settings
        .api_key
        .as_deref()
        .ok_or_else(|| Error::Summarization("No completion API key configured".to_string()))?;

    let request = ChatRequest {
        model: settings.model.clone(),
        temperature: settings.temperature,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_prompt(readme),
            },
        ],
        response_format: output_schema(),
    };

    let url = format!(
        "{}/v1/chat/completions",
        settings.api_base_url.trim_end_matches('/')
    );
    debug!("Completion request: POST {} (model {})", url, settings.model);

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::Summarization(format!("Completion request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(Error::Summarization(format!(
            "Completion API error {status}: {body}"
        )));
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| Error::Summarization(format!("Invalid completion response: {e}")))?;

    let content = parsed
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .ok_or_else(|| Error::Summarization("Completion returned no content".to_string()))?;

    serde_json::from_str(content)
        .map_err(|e| Error::Summarization(format!("Completion violated output schema: {e}")))
}
