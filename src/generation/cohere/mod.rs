
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::pipeline::AnswerGenerator;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Client for a Cohere-style chat-completion endpoint. One prompt in, one
/// generated text out; no conversation state, no streaming, no retries.
#[derive(Debug, Clone)]
pub struct CohereClient {
    base_url: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

impl CohereClient {
    /// Build a client from the loaded configuration. Fails when the API key
    /// is absent from the environment; the key itself is never inspected.
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .chat
            .endpoint_url()
            .map_err(|e| RagError::Config(e.to_string()))?;
        let api_key = config
            .require_chat_api_key()
            .map_err(|e| RagError::Config(e.to_string()))?
            .to_string();

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.chat.model.clone(),
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Submit a single prompt and return the generated text verbatim.
    #[inline]
    pub fn chat(&self, prompt: &str) -> Result<String> {
        debug!(
            "Requesting chat completion from model {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let url = self
            .base_url
            .join("/v1/chat")
            .map_err(|e| RagError::Generation(format!("Failed to build chat URL: {}", e)))?;

        let request = ChatRequest {
            model: self.model.clone(),
            message: prompt.to_string(),
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Generation(format!("Failed to serialize chat request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => {
                    warn!("Chat service returned HTTP {}", status);
                    RagError::Generation(format!("Chat service returned HTTP {}", status))
                }
                other => RagError::Generation(format!("Chat request failed: {}", other)),
            })?;

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("Failed to parse chat response: {}", e)))?;

        debug!(
            "Received generated text ({} bytes)",
            chat_response.text.len()
        );
        Ok(chat_response.text)
    }
}

impl AnswerGenerator for CohereClient {
    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(prompt)
    }
}
