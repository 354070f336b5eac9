//! Ollama client - the local prompt-expansion endpoint.
//!
//! Talks to `POST {base_url}/api/generate` with a fixed model and
//! `stream: false`; a 200 response carries the full completion in the
//! `response` field.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::OllamaConfig;
use crate::provider::{ProviderError, ProviderResult, TextModel};

/// Client for a local Ollama instance.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Build the generate request body.
    fn build_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        })
    }

    /// Pull the completion text out of a generate response.
    fn parse_response(body: Value) -> ProviderResult<String> {
        body["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ProviderError::InvalidResponse("missing 'response' field".to_string()))
    }
}

#[async_trait]
impl TextModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.build_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("not JSON: {}", e)))?;
        Self::parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OllamaClient {
        OllamaClient::new(&OllamaConfig::default()).unwrap()
    }

    #[test]
    fn test_build_body() {
        let client = test_client();
        let body = client.build_body("A cat playing piano");

        assert_eq!(body["model"], "gnokit/improve-prompt");
        assert_eq!(body["prompt"], "A cat playing piano");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_parse_response() {
        let body = json!({ "response": "  A grand piano under moonlight...  " });
        let text = OllamaClient::parse_response(body).unwrap();
        assert_eq!(text, "A grand piano under moonlight...");
    }

    #[test]
    fn test_parse_response_missing_field() {
        let body = json!({ "error": "model not found" });
        let result = OllamaClient::parse_response(body);
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = OllamaConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_generate_unreachable_endpoint_errors() {
        // Nothing listens on this port; the call must surface a transport
        // error instead of panicking.
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 1_000,
            ..Default::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let result = client.generate("test").await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
    }
}
