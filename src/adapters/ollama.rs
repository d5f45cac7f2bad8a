use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::adapters::llm::{
    GenerateRequest, LlmError, ModelConfig, StreamingGenerator, TextStream,
};

pub struct OllamaClient {
    client: Client,
    config: ModelConfig,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug, PartialEq)]
enum LineOutcome {
    Skip,
    Fragment { text: String, done: bool },
    Stop,
}

impl OllamaClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let url = format!("{}/api/generate", config.base_url.trim_end_matches('/'));

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            url,
        })
    }
}

#[async_trait]
impl StreamingGenerator for OllamaClient {
    async fn stream_generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<TextStream> {
        let request = GenerateRequest {
            model: self.config.model_name.clone(),
            prompt: prompt.to_string(),
            system: system_prompt
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            stream: true,
        };

        info!(
            "Sending request to {} (model: {}, authorization: {})",
            self.url,
            request.model,
            if self.config.auth_token.is_some() { "***" } else { "none" }
        );

        let mut builder = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = tokio::time::timeout(self.config.read_timeout, builder.send())
            .await
            .map_err(|_| {
                error!(
                    "No response headers from {} within {:?}",
                    self.url, self.config.read_timeout
                );
                LlmError::Timeout {
                    url: self.url.clone(),
                    after: self.config.read_timeout,
                }
            })?
            .map_err(|source| LlmError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Error: {} - Response: {}", status, body);
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(fragment_stream(
            response.bytes_stream().boxed(),
            self.config.read_timeout,
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

struct LineReader {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
    read_timeout: Duration,
    body_done: bool,
}

impl LineReader {
    /// Next complete line of the body, or the unterminated tail once the body ends.
    async fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
            if self.body_done {
                if self.buffer.is_empty() {
                    return None;
                }
                let rest = std::mem::take(&mut self.buffer);
                return Some(String::from_utf8_lossy(&rest).into_owned());
            }

            match tokio::time::timeout(self.read_timeout, self.body.next()).await {
                Ok(Some(Ok(chunk))) => self.buffer.extend_from_slice(&chunk),
                Ok(Some(Err(e))) => {
                    error!("Stream error: {}", e);
                    return None;
                }
                Ok(None) => self.body_done = true,
                Err(_) => {
                    error!(
                        "No data from generation endpoint for {:?}, giving up",
                        self.read_timeout
                    );
                    return None;
                }
            }
        }
    }
}

fn fragment_stream(
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    read_timeout: Duration,
) -> TextStream {
    let reader = LineReader {
        body,
        buffer: Vec::new(),
        read_timeout,
        body_done: false,
    };

    // The bool marks that a `done` chunk has already been yielded.
    stream::unfold((reader, false), |(mut reader, finished)| async move {
        if finished {
            return None;
        }
        loop {
            let line = reader.next_line().await?;
            match parse_line(&line) {
                LineOutcome::Skip => continue,
                LineOutcome::Stop => return None,
                LineOutcome::Fragment { text, done } => return Some((text, (reader, done))),
            }
        }
    })
    .boxed()
}

fn parse_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    let chunk: GenerateChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            error!("JSON decode error: {}", e);
            return LineOutcome::Stop;
        }
    };

    if let Some(message) = chunk.error {
        error!("Generation failed: {}", message);
        return LineOutcome::Stop;
    }

    let text = chunk.response.unwrap_or_default();
    match (text.is_empty(), chunk.done) {
        (true, true) => {
            debug!("Generation finished");
            LineOutcome::Stop
        }
        (true, false) => LineOutcome::Skip,
        (false, done) => LineOutcome::Fragment { text, done },
    }
}
