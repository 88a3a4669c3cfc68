//! Ollama-backed [`LanguageModel`] implementation.
//!
//! Talks to the Ollama `/api/chat` endpoint (non-streaming), renders a
//! contract's inputs into a chat prompt, and parses the labelled output
//! fields back out of the response text.

use crate::error::LlmError;
use crate::llm::contract::{LanguageModel, PromptContract, StructuredOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 300,
        }
    }
}

/// Chat message for the Ollama API.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// HTTP client invoking prompt contracts against a local Ollama server.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        info!(
            "Initializing Ollama client for model {} at {}",
            config.model, config.url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn invoke(
        &self,
        contract: &PromptContract,
        inputs: &BTreeMap<String, String>,
    ) -> Result<StructuredOutput, LlmError> {
        let url = format!("{}/api/chat", self.config.url);

        let request = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: render_system_prompt(contract),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: render_user_prompt(contract, inputs),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Invoking contract '{}' via Ollama", contract.name);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.config.timeout_seconds,
                    }
                } else if e.is_connect() {
                    LlmError::Connect {
                        url: self.config.url.clone(),
                    }
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        parse_structured(&chat_response.message.content, contract)
    }
}

/// Render the contract instructions plus the output-format section of
/// the system prompt.
fn render_system_prompt(contract: &PromptContract) -> String {
    let mut prompt = String::new();
    prompt.push_str(contract.instructions.trim());
    prompt.push_str("\n\nRespond with exactly these fields, each starting on its own line:\n");
    for field in &contract.outputs {
        prompt.push_str(&format!("{}: {}\n", field.name, field.desc));
    }
    prompt.push_str("\nDo not add any other sections.");
    prompt
}

/// Render the projected inputs as labelled sections.
fn render_user_prompt(contract: &PromptContract, inputs: &BTreeMap<String, String>) -> String {
    let mut prompt = String::new();
    // Contract order, not map order, so the goal reads last for agents
    // whose instructions reference it.
    for field in &contract.inputs {
        if let Some(value) = inputs.get(&field.name) {
            prompt.push_str(&format!("## {}\n{}\n\n", field.name, value));
        }
    }
    prompt
}

/// Parse labelled output fields out of the model's response text.
///
/// Each field starts a section with `field_name:` (markdown emphasis
/// around the label is tolerated); the section runs until the next
/// field label. All declared output fields must be present.
fn parse_structured(
    content: &str,
    contract: &PromptContract,
) -> Result<StructuredOutput, LlmError> {
    let mut output = StructuredOutput::new();
    let mut current_field: Option<String> = None;
    let mut current_value = String::new();

    for line in content.lines() {
        if let Some((field, rest)) = match_field_label(line, contract) {
            if let Some(prev) = current_field.take() {
                output.insert(&prev, finalize_value(&current_value));
            }
            current_field = Some(field);
            current_value = rest.to_string();
            if !current_value.is_empty() {
                current_value.push('\n');
            }
        } else if current_field.is_some() {
            current_value.push_str(line);
            current_value.push('\n');
        }
    }
    if let Some(prev) = current_field.take() {
        output.insert(&prev, finalize_value(&current_value));
    }

    for field in contract.output_names() {
        if output.get(field).is_none() {
            return Err(LlmError::MissingField {
                field: field.to_string(),
            });
        }
    }

    Ok(output)
}

/// Check whether a line starts a new output-field section. Returns the
/// field name and the remainder of the line after the label.
fn match_field_label<'a>(line: &'a str, contract: &PromptContract) -> Option<(String, &'a str)> {
    let stripped = line.trim_start().trim_start_matches(['#', '*', '-', ' ']);
    for field in contract.output_names() {
        if stripped.len() >= field.len()
            && stripped.is_char_boundary(field.len())
            && stripped[..field.len()].eq_ignore_ascii_case(field)
        {
            let after = &stripped[field.len()..];
            let after = after.trim_start_matches('*');
            if let Some(rest) = after.strip_prefix(':') {
                return Some((field.to_string(), rest.trim_start_matches(['*', ' '])));
            }
        }
    }
    None
}

/// Trim a section value and strip a surrounding markdown code fence.
fn finalize_value(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(body) = trimmed.strip_prefix("```") {
        // Drop the fence's language tag line and the closing fence.
        let body = match body.split_once('\n') {
            Some((_, rest)) => rest,
            None => body,
        };
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompts;

    #[test]
    fn test_parse_planner_response() {
        let contract = prompts::analytical_planner();
        let content = "plan: preprocessing_agent->sk_learn_agent\nplan_desc: preprocess first, then model.";

        let output = parse_structured(content, &contract).unwrap();
        assert_eq!(
            output.get("plan"),
            Some("preprocessing_agent->sk_learn_agent")
        );
        assert_eq!(
            output.get("plan_desc"),
            Some("preprocess first, then model.")
        );
    }

    #[test]
    fn test_parse_multiline_code_section() {
        let contract = prompts::preprocessing_agent();
        let content = "commentary: Loading and cleaning the data.\ncode:\n```python\nimport pandas as pd\ndf = df_name.copy()\n```";

        let output = parse_structured(content, &contract).unwrap();
        assert_eq!(output.get("commentary"), Some("Loading and cleaning the data."));
        assert_eq!(
            output.get("code"),
            Some("import pandas as pd\ndf = df_name.copy()")
        );
    }

    #[test]
    fn test_parse_tolerates_markdown_labels() {
        let contract = prompts::goal_refiner_agent();
        let content = "**refined_goal:** Predict fare per airline using a regression model.";

        let output = parse_structured(content, &contract).unwrap();
        assert_eq!(
            output.get("refined_goal"),
            Some("Predict fare per airline using a regression model.")
        );
    }

    #[test]
    fn test_parse_missing_field_fails() {
        let contract = prompts::preprocessing_agent();
        let content = "commentary: I could not produce code.";

        assert!(matches!(
            parse_structured(content, &contract),
            Err(LlmError::MissingField { field }) if field == "code"
        ));
    }

    #[test]
    fn test_render_prompts_follow_contract_order() {
        let contract = prompts::analytical_planner();
        let mut inputs = BTreeMap::new();
        inputs.insert("goal".to_string(), "find outliers".to_string());
        inputs.insert("dataset".to_string(), "df_name: bookings".to_string());
        inputs.insert("Agent_desc".to_string(), "agents...".to_string());

        let user = render_user_prompt(&contract, &inputs);
        let dataset_pos = user.find("## dataset").unwrap();
        let goal_pos = user.find("## goal").unwrap();
        assert!(dataset_pos < goal_pos);

        let system = render_system_prompt(&contract);
        assert!(system.contains("plan:"));
        assert!(system.contains("plan_desc:"));
    }
}
