use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Incremental text fragments, in the order the server produced them.
pub type TextStream = BoxStream<'static, String>;

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_name: String,
    pub base_url: String,
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    /// Longest wait for the response headers and for each piece of the body.
    pub read_timeout: Duration,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "devstral".to_string(),
            base_url: "http://localhost:11434".to_string(),
            auth_token: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(300),
        }
    }
}

impl ModelConfig {
    pub fn base_url_for(host: &str, port: u16) -> String {
        format!("http://{}:{}", host, port)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("generation endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no response from {url} within {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("failed to send request to {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[async_trait]
pub trait StreamingGenerator: Send + Sync {
    /// Starts a generation and returns its fragments as they arrive.
    ///
    /// Fails before yielding anything if the server rejects the request.
    async fn stream_generate(&self, prompt: &str, system_prompt: Option<&str>)
        -> Result<TextStream>;

    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_is_omitted_when_absent() {
        let request = GenerateRequest {
            model: "devstral".to_string(),
            prompt: "def f(): pass".to_string(),
            system: None,
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"model": "devstral", "prompt": "def f(): pass", "stream": true})
        );
    }

    #[test]
    fn base_url_from_host_and_port() {
        assert_eq!(
            ModelConfig::base_url_for("localhost", 11434),
            "http://localhost:11434"
        );
    }
}
