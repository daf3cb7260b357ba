//! OpenAI-compatible schema inferrer.
//!
//! Talks to any server exposing `/chat/completions` (OpenAI itself, a proxy,
//! or a self-hosted model behind an OpenAI-shaped API).
//!
//! # Example
//!
//! ```rust,ignore
//! use quake_parser::inference::OpenAiInferrer;
//!
//! let inferrer = OpenAiInferrer::new("sk-...")
//!     .with_base_url("http://localhost:9999/v1")
//!     .with_model("gpt-4o");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompt::{build_schema_prompt, parse_schema_response, SYSTEM_PROMPT};
use crate::error::{InferenceError, InferenceResult};
use crate::security::SecretString;
use crate::traits::inferrer::SchemaInferrer;
use crate::types::PageSchema;

/// Schema inferrer backed by a chat completion model.
#[derive(Clone)]
pub struct OpenAiInferrer {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiInferrer {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
        }
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, prompt: String) -> InferenceResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Schema inference request failed");
                InferenceError::Http(Box::new(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "Schema inference API error");
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Schema inference completion"
        );

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(InferenceError::EmptyResponse)
    }
}

#[async_trait]
impl SchemaInferrer for OpenAiInferrer {
    async fn infer(&self, html: &str, title: &str, domain: &str) -> InferenceResult<PageSchema> {
        let reply = self.chat(build_schema_prompt(html, title)).await?;
        parse_schema_response(&reply, domain)
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
