//! HTTP decision provider
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The model is
//! asked for a bare JSON object `{action_type, destination, content}`.

use std::time::Duration;

use serde_json::Value;

use crate::config::ProviderConfig;
use crate::state::RawAction;

use super::{CompactState, DecisionProvider, ProviderError};

const SYSTEM_PROMPT: &str = "You control a robot in Loopforge City. Return ONLY a JSON object with keys \
'action_type' (move|work|talk|recharge|inspect|idle), 'destination' (or null), \
and 'content' (short note or null). Keep actions realistic for the rooms.";

pub struct HttpDecisionProvider {
    endpoint: String,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

impl HttpDecisionProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder().timeout_global(Some(timeout)).build().into();
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            agent,
        }
    }

    /// Build from config; the API key comes from the configured env var
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} is not set", config.api_key_env)))?;
        Ok(Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs.max(1)),
        ))
    }

    fn request_body(&self, state: &CompactState) -> Result<String, ProviderError> {
        let state_json = serde_json::to_string(state).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let request = serde_json::json!({
            "model": self.model,
            "temperature": 0.2,
            "max_tokens": 256,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Robot state:\n{}\nDecide the next action. Only return JSON.", state_json)},
            ],
        });
        serde_json::to_string(&request).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

impl DecisionProvider for HttpDecisionProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn propose(&self, state: &CompactState) -> Result<RawAction, ProviderError> {
        let body = self.request_body(state)?;

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let response_body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        parse_reply(&response_body)
    }
}

fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn optional_string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pull the proposal out of a chat-completions response body
pub fn parse_reply(body: &str) -> Result<RawAction, ProviderError> {
    let response: Value = serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(ProviderError::MissingField("choices[0].message.content"))?;

    let proposal: Value =
        serde_json::from_str(strip_fences(content)).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    if !proposal.is_object() {
        return Err(ProviderError::Malformed("reply is not a JSON object".to_string()));
    }

    let action_type = optional_string(&proposal, "action_type").ok_or(ProviderError::MissingField("action_type"))?;

    Ok(RawAction {
        action_type: action_type.to_lowercase(),
        destination: optional_string(&proposal, "destination"),
        content: optional_string(&proposal, "content"),
    })
}
