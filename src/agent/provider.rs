//! Model provider abstraction for different LLM APIs
//!
//! Supports:
//! - Ollama (local models, streaming `/api/generate`)
//! - OpenAI (hosted chat completions)
//! - Anthropic (selectable, not implemented; fails fast)
//!
//! # Examples
//!
//! ```no_run
//! use ai_cli::agent::provider::create_provider;
//! use ai_cli::config::{ModelConfig, ModelProvider as ProviderType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = create_provider(ProviderType::Ollama, &ModelConfig::ollama())?;
//! let command = provider.complete("list all files including hidden ones").await?;
//! println!("{}", command);
//! # Ok(())
//! # }
//! ```

use crate::config::{ModelConfig, ModelProvider as ProviderType};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Backend unreachable, non-2xx, malformed payload or deadline expired
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unsupported backend: {0} is not implemented")]
    Unsupported(ProviderType),

    #[error("Backend {0} is not configured")]
    NotConfigured(ProviderType),

    #[error("Authentication error: {0}")]
    AuthError(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(format!("malformed payload: {}", e))
    }
}

/// Model provider trait
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Complete a prompt into a single response text
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the provider type
    fn provider_type(&self) -> ProviderType;
}

/// Create a model provider from configuration
pub fn create_provider(
    provider: ProviderType,
    config: &ModelConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    match provider {
        ProviderType::Ollama => Ok(Arc::new(OllamaProvider::new(config.clone()))),
        ProviderType::OpenAI => Ok(Arc::new(OpenAIProvider::new(config.clone())?)),
        ProviderType::Anthropic => Err(ProviderError::Unsupported(ProviderType::Anthropic)),
    }
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_default()
}

// ============================================================================
// Ollama Provider
// ============================================================================

pub struct OllamaProvider {
    config: ModelConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<usize>,
}

/// One line of the `/api/generate` stream
#[derive(Debug, Deserialize)]
pub struct OllamaChunk {
    pub model: String,
    pub created_at: String,
    pub response: String,
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
}

/// Reassembles a newline-delimited JSON stream into the full response.
///
/// Bytes may arrive split anywhere, including inside a line or a UTF-8
/// sequence, so complete lines are only parsed once their `\n` is seen.
#[derive(Debug, Default)]
pub struct OllamaStreamDecoder {
    buffer: Vec<u8>,
    response: String,
    done: bool,
}

impl OllamaStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes; returns `true` once a chunk with `done=true` was seen
    pub fn push(&mut self, bytes: &[u8]) -> Result<bool, ProviderError> {
        if self.done {
            return Ok(true);
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if self.consume_line(&line)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Flush a trailing line without newline and return the trimmed text
    pub fn finish(mut self) -> Result<String, ProviderError> {
        if !self.done && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.consume_line(&rest)?;
        }
        Ok(self.response.trim().to_string())
    }

    fn consume_line(&mut self, line: &[u8]) -> Result<bool, ProviderError> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }

        let chunk: OllamaChunk = serde_json::from_str(text)?;
        self.response.push_str(&chunk.response);
        if chunk.done {
            if let Some(reason) = chunk.done_reason.as_deref() {
                tracing::debug!("Ollama stream finished: {}", reason);
            }
            self.done = true;
        }
        Ok(self.done)
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.config.url.trim_end_matches('/'));

        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: true,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let mut decoder = OllamaStreamDecoder::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if decoder.push(&chunk?)? {
                break;
            }
        }

        decoder.finish()
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ollama
    }
}

// ============================================================================
// OpenAI Provider
// ============================================================================

pub struct OpenAIProvider {
    config: ModelConfig,
    client: Client,
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(config: ModelConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| ProviderError::AuthError("OpenAI API key not found".to_string()))?;

        Ok(Self {
            config,
            client: http_client(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.url.trim_end_matches('/'));

        let request = OpenAIRequest {
            model: &self.config.model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let body = response.text().await?;
        let openai_response: OpenAIResponse = serde_json::from_str(&body)?;

        openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Transport("No choices in response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }
}
