use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::Provider;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model used for generation
    model: String,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: None,
            stream: Some(false),
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        match &mut self.options {
            Some(options) => options.temperature = Some(temperature),
            None => {
                self.options = Some(GenerationOptions {
                    temperature: Some(temperature),
                });
            }
        }
        self
    }
}

impl Ollama {
    /// Create a new Ollama client for `host` and `port`
    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>) -> Self {
        let host = host.into();

        let base_url = match host.split_once("://") {
            Some((scheme, host_part)) if host_part.contains(':') => format!("{}://{}", scheme, host_part),
            Some((scheme, host_part)) => format!("{}://{}:{}", scheme, host_part, port),
            None => format!("http://{}:{}", host, port),
        };

        Self::from_url(base_url, model)
    }

    /// Create a new Ollama client from a complete URL
    pub fn from_url(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            // Ollama speaks HTTP/1.1
            client: Client::builder().http1_only().build().unwrap_or_default(),
            model: model.into(),
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model used for generation
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text from the Ollama API (single request, no retries)
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let response_text = response.text().await?;
        Self::parse_generation(&response_text)
    }

    /// Parse a generate reply, accepting a streamed JSONL body as well
    pub fn parse_generation(response_text: &str) -> Result<GenerationResponse, ProviderError> {
        match serde_json::from_str::<GenerationResponse>(response_text) {
            Ok(generated) => Ok(generated),
            Err(e) => {
                let lines: Vec<serde_json::Value> = response_text
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .filter_map(|line| serde_json::from_str(line).ok())
                    .collect();

                if lines.is_empty() {
                    let preview: String = response_text.chars().take(500).collect();
                    error!("Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}", e, preview);
                    return Err(ProviderError::ParseError(format!("invalid Ollama response: {}", e)));
                }

                // Streaming responses carry the text in pieces
                let full_response: String = lines
                    .iter()
                    .filter_map(|obj| obj.get("response").and_then(|v| v.as_str()))
                    .collect();

                let last = &lines[lines.len() - 1];
                Ok(GenerationResponse {
                    model: last.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                    response: full_response,
                    done: last.get("done").and_then(|v| v.as_bool()).unwrap_or(true),
                    prompt_eval_count: last.get("prompt_eval_count").and_then(|v| v.as_u64()),
                    eval_count: last.get("eval_count").and_then(|v| v.as_u64()),
                })
            }
        }
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url).send().await?.json().await?;

        let version = response["version"].as_str()
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))?
            .to_string();

        Ok(version)
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = GenerationRequest;
    type Response = GenerationResponse;

    fn build_request(&self, prompt: &str, temperature: f32) -> GenerationRequest {
        GenerationRequest::new(self.model.clone(), prompt).temperature(temperature)
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        self.generate(request).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.version().await.map(|_| ())
    }

    fn extract_text(response: &Self::Response) -> String {
        response.response.clone()
    }
}
