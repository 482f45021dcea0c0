// src/extraction/ollama_model.rs

//! [`ReserveModel`] adapter for an Ollama-compatible chat endpoint. The
//! endpoint is asked for strict JSON at temperature 0; whatever comes back is
//! parsed into a [`CandidateEstimate`] or dropped by the pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::ReserveModel;
use crate::errors::ExtractionError;
use crate::types::CandidateEstimate;

pub struct OllamaReserveModel {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaReserveModel {
    pub fn new(host: String, model: String) -> Self {
        Self { client: reqwest::Client::new(), host, model }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl ReserveModel for OllamaReserveModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn estimate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CandidateEstimate, ExtractionError> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "format": "json",
            "options": {"temperature": 0.0},
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });
        let response: ChatResponse = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::ModelEndpoint(e.to_string()))?
            .json()
            .await
            .map_err(|e| ExtractionError::ModelEndpoint(e.to_string()))?;

        let content = response.message.content.trim();
        if content.is_empty() {
            return Err(ExtractionError::ModelEndpoint(format!(
                "empty response from model {}",
                self.model
            )));
        }
        debug!(model = %self.model, bytes = content.len(), "model responded");
        serde_json::from_str(content).map_err(|e| {
            ExtractionError::ModelEndpoint(format!("invalid JSON from model {}: {e}", self.model))
        })
    }
}
