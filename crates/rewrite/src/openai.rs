//! OpenAI-compatible chat completion backend

use crate::service::{parse_response, CompletionRequest, CompletionService};
use crate::ServiceError;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiCompletionService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    /// Extra attempts when the reply is not a JSON object
    retries: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiCompletionService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4000,
            retries: 1,
        }
    }

    /// Configure from `OPENAI_API_KEY`, `OPENAI_CHAT_MODEL` and
    /// `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self, ServiceError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ServiceError::NotConfigured("OPENAI_API_KEY is not set".into()))?;
        let model = std::env::var("OPENAI_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let mut service = Self::new(api_key, model);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            service.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(service)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn chat(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": request.system_instruction},
                {"role": "user", "content": request.user_prompt()},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Response(e.to_string()))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "{}".to_string()))
    }
}

impl CompletionService for OpenAiCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let mut attempt = 0;
        loop {
            let content = self.chat(request).await?;
            if parse_response(&content).is_some() || attempt >= self.retries {
                return Ok(content);
            }
            attempt += 1;
            warn!("Model did not return a JSON object, retrying ({}/{})", attempt, self.retries);
        }
    }
}
