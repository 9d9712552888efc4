/*!
 * The seam between the engine and a text-generation service.
 *
 * `TranslationPort` is all the engine knows about a provider: send a
 * prompt, get text or a typed failure. `ProviderPort` adapts the concrete
 * HTTP clients to it and applies the per-call timeout. Retrying is never
 * done here.
 */

use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::providers::anthropic::Anthropic;
use crate::providers::gemini::Gemini;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;

/// Abstract text-generation capability used by the engine
#[async_trait]
pub trait TranslationPort: Send + Sync {
    /// Send one prompt and return the raw reply text
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError>;

    /// Human readable name for logs
    fn name(&self) -> String;
}

/// Parse an endpoint string into host and port
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    let host = url.host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?
        .to_string();

    let port = url.port().unwrap_or(if url.scheme() == "https" { 443 } else { 80 });

    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// Concrete provider clients
#[derive(Debug)]
enum ProviderClient {
    Ollama(Ollama),
    OpenAI(OpenAI),
    LMStudio(OpenAI),
    Anthropic(Anthropic),
    Gemini(Gemini),
}

/// `TranslationPort` backed by one of the configured HTTP providers
#[derive(Debug)]
pub struct ProviderPort {
    client: ProviderClient,
    provider: TranslationProvider,
    model: String,
    timeout: Duration,
}

impl ProviderPort {
    /// Build the port for the active provider.
    ///
    /// Returns `Ok(None)` when a hosted provider has no API key; the engine
    /// then reports the service as unavailable.
    pub fn from_config(config: &TranslationConfig) -> Result<Option<Self>> {
        let provider = config.provider.clone();
        let model = config.get_model();
        let endpoint = config.get_endpoint();
        let api_key = config.get_api_key();

        if provider.requires_api_key() && api_key.is_empty() {
            warn!("No API key for {}, translation service unavailable", provider.display_name());
            return Ok(None);
        }

        let client = match provider {
            TranslationProvider::Ollama => {
                let (host, port) = parse_endpoint(&endpoint)?;
                ProviderClient::Ollama(Ollama::new(host, port, model.clone()))
            }
            TranslationProvider::OpenAI => ProviderClient::OpenAI(OpenAI::new(api_key, endpoint, model.clone())),
            TranslationProvider::LMStudio => {
                // LM Studio ignores the key but the header must be present
                let api_key = if api_key.is_empty() { "lm-studio".to_string() } else { api_key };
                ProviderClient::LMStudio(OpenAI::new(api_key, endpoint, model.clone()))
            }
            TranslationProvider::Anthropic => ProviderClient::Anthropic(Anthropic::new(api_key, endpoint, model.clone())),
            TranslationProvider::Gemini => ProviderClient::Gemini(Gemini::new(api_key, endpoint, model.clone())),
        };

        Ok(Some(Self {
            client,
            provider,
            model,
            timeout: Duration::from_secs(config.get_timeout_secs()),
        }))
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check that the provider answers at all
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.client {
            ProviderClient::Ollama(client) => client.test_connection().await,
            ProviderClient::OpenAI(client) | ProviderClient::LMStudio(client) => client.test_connection().await,
            ProviderClient::Anthropic(client) => client.test_connection().await,
            ProviderClient::Gemini(client) => client.test_connection().await,
        }
    }
}

async fn complete_text<P: Provider>(client: &P, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
    let request = client.build_request(prompt, temperature);
    let response = client.complete(request).await?;
    Ok(P::extract_text(&response))
}

#[async_trait]
impl TranslationPort for ProviderPort {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, ProviderError> {
        let call = async {
            match &self.client {
                ProviderClient::Ollama(client) => complete_text(client, prompt, temperature).await,
                ProviderClient::OpenAI(client) | ProviderClient::LMStudio(client) => {
                    complete_text(client, prompt, temperature).await
                }
                ProviderClient::Anthropic(client) => complete_text(client, prompt, temperature).await,
                ProviderClient::Gemini(client) => complete_text(client, prompt, temperature).await,
            }
        };

        let text = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))??;

        debug!("{} returned {} characters", self.name(), text.len());
        Ok(text)
    }

    fn name(&self) -> String {
        format!("{} ({})", self.provider.display_name(), self.model)
    }
}
