//! The text-completion seam

use crate::ServiceError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// System instruction sent with every batch
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You rewrite paragraphs of a German or English \
quality-management manual. Answer with a single JSON object whose keys are the given block ids \
and whose values are the rewritten plain texts. Do not add, drop or rename keys.";

/// One paragraph sent for rewriting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPrompt {
    pub id: String,
    pub text: String,
}

/// A single request to the completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub blocks: Vec<BlockPrompt>,
    pub user_instruction: String,
    pub guardrail_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_profile: Option<serde_json::Value>,
}

impl CompletionRequest {
    /// User message carrying the blocks, instruction and context as JSON
    pub fn user_prompt(&self) -> String {
        serde_json::json!({
            "instruction": self.user_instruction,
            "guardrails": self.guardrail_summary,
            "companyProfile": self.company_profile,
            "blocks": self.blocks,
        })
        .to_string()
    }
}

/// A prompt-in/text-out completion backend
#[trait_variant::make(Send)]
pub trait CompletionService: Send + Sync {
    /// Return the raw response text for one batch
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}

/// Strip an optional Markdown code fence around a response
pub fn strip_fence(text: &str) -> &str {
    let mut cleaned = text.trim();
    if cleaned.starts_with("```") {
        cleaned = cleaned.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        if let Some(inner) = cleaned.trim_end().strip_suffix("```") {
            cleaned = inner;
        }
    }
    cleaned.trim()
}

/// Parse a response as a JSON object of strings. Anything else is `None`.
pub fn parse_response(raw: &str) -> Option<BTreeMap<String, String>> {
    let value: serde_json::Value = serde_json::from_str(strip_fence(raw)).ok()?;
    let object = value.as_object()?;
    object
        .iter()
        .map(|(key, value)| value.as_str().map(|s| (key.clone(), s.to_string())))
        .collect()
}

/// Replays canned responses in order, for tests and offline runs
#[derive(Debug, Default)]
pub struct ScriptedCompletionService {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(self, raw: impl Into<String>) -> Self {
        self.push(Ok(raw.into()));
        self
    }

    pub fn fail_with(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    fn push(&self, response: Result<String, String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl CompletionService for ScriptedCompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| ServiceError::Transport("scripted service poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(ServiceError::Transport(message)),
            None => Err(ServiceError::Response("no scripted response left".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence() {
        assert_eq!(strip_fence("```json\n{\"a\": \"b\"}\n```"), "{\"a\": \"b\"}");
        assert_eq!(strip_fence("  {\"a\": \"b\"} "), "{\"a\": \"b\"}");
    }

    #[test]
    fn test_parse_response_requires_object_of_strings() {
        let parsed = parse_response("```\n{\"x\": \"neu\"}\n```").unwrap();
        assert_eq!(parsed.get("x").map(String::as_str), Some("neu"));
        assert!(parse_response("[\"x\"]").is_none());
        assert!(parse_response("{\"x\": 1}").is_none());
        assert!(parse_response("not json").is_none());
    }

    #[tokio::test]
    async fn test_scripted_service_replays_in_order() {
        let service = ScriptedCompletionService::new()
            .respond_with("{}")
            .fail_with("boom");
        let request = CompletionRequest {
            system_instruction: String::new(),
            blocks: Vec::new(),
            user_instruction: "kürzer".into(),
            guardrail_summary: String::new(),
            company_profile: None,
        };
        assert_eq!(service.complete(&request).await.unwrap(), "{}");
        assert!(service.complete(&request).await.is_err());
        assert_eq!(service.requests().len(), 2);
    }
}
