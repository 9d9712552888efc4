use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language (ISO code or English name)
    pub source_language: String,

    /// Target language (ISO code or English name)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Engine settings (batching, retries, delays)
    #[serde(default)]
    pub engine: EngineConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: Google Gemini
    Gemini,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
            Self::Gemini => "Gemini",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::Gemini => "gemini".to_string(),
        }
    }

    // @returns: Whether the provider is a hosted API that needs a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic | Self::Gemini)
    }

    // @returns: Environment variable consulted when the config has no key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Ollama | Self::LMStudio => None,
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            "gemini" => Ok(Self::Gemini),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint, timeout_secs) = match provider_type {
            TranslationProvider::Ollama => (default_ollama_model(), default_ollama_endpoint(), default_timeout_secs()),
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint(), default_hosted_timeout_secs()),
            TranslationProvider::Anthropic => (default_anthropic_model(), default_anthropic_endpoint(), default_hosted_timeout_secs()),
            TranslationProvider::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint(), default_timeout_secs()),
            TranslationProvider::Gemini => (default_gemini_model(), default_gemini_endpoint(), default_hosted_timeout_secs()),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Temperature parameter for text generation
    /// Kept low so that the segment layout of the reply stays predictable
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
        }
    }
}

/// What to do when the provider returns an empty reply
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmptyResponsePolicy {
    /// Count it as a failed attempt and try again
    Retry,
    /// Stop retrying the slice and go straight to splitting / fallback
    #[default]
    Abandon,
}

/// Settings of the chunked translation engine
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Maximum number of cues per translation request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Retries after the first attempt of a slice
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts of the same slice
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Delay before starting each batch after the first
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Number of batches translated at the same time
    #[serde(default = "default_concurrent_batches")]
    pub concurrent_batches: usize,

    /// Handling of empty provider replies
    #[serde(default)]
    pub empty_response_policy: EmptyResponsePolicy,

    /// Preferred delimiter between cue texts in a request
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            concurrent_batches: default_concurrent_batches(),
            empty_response_policy: EmptyResponsePolicy::default(),
            delimiter: default_delimiter(),
        }
    }
}

impl EngineConfig {
    /// Engine settings without any delays, for tests and local providers
    pub fn without_delays(mut self) -> Self {
        self.retry_delay_ms = 0;
        self.batch_delay_ms = 0;
        self
    }
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// Directory for translated files; next to the input when unset
    #[serde(default)]
    pub directory: Option<String>,

    /// Write the captured engine log next to each output file
    #[serde(default)]
    pub write_log_file: bool,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_hosted_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.1
}

fn default_chunk_size() -> usize {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_concurrent_batches() -> usize {
    1
}

fn default_delimiter() -> String {
    "<--->".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// Upper bound for `engine.max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 20;

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::resolve_language_name(&self.source_language)?;
        crate::language_utils::resolve_language_name(&self.target_language)?;

        if self.engine.chunk_size == 0 {
            return Err(anyhow!("engine.chunk_size must be at least 1"));
        }
        if self.engine.concurrent_batches == 0 {
            return Err(anyhow!("engine.concurrent_batches must be at least 1"));
        }
        if self.engine.delimiter.trim().is_empty() {
            return Err(anyhow!("engine.delimiter must not be blank"));
        }
        if self.engine.max_retries > MAX_RETRIES_LIMIT {
            return Err(anyhow!(
                "engine.max_retries must be at most {}, got {}",
                MAX_RETRIES_LIMIT,
                self.engine.max_retries
            ));
        }
        if let Some(provider) = self.translation.available_providers.iter().find(|p| p.timeout_secs == 0) {
            return Err(anyhow!("timeout_secs for provider '{}' must be at least 1", provider.provider_type));
        }

        let temperature = self.translation.common.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", temperature));
        }

        // A missing key is reported at run time as an unavailable service
        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            warn!(
                "No API key configured for {}; translation will not be available",
                self.translation.provider.display_name()
            );
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
            translation: TranslationConfig::default(),
            engine: EngineConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created on demand
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_model(),
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::LMStudio => default_lmstudio_model(),
            TranslationProvider::Gemini => default_gemini_model(),
        }
    }

    /// Get the API key for the active provider, falling back to the
    /// provider's environment variable
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        self.provider.api_key_env_var()
            .and_then(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Ollama => default_ollama_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::LMStudio => default_lmstudio_endpoint(),
            TranslationProvider::Gemini => default_gemini_endpoint(),
        }
    }

    /// Get the per-call timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        if let Some(provider_config) = self.get_active_provider_config() {
            if provider_config.timeout_secs > 0 {
                return provider_config.timeout_secs;
            }
        }

        if self.provider.requires_api_key() {
            default_hosted_timeout_secs()
        } else {
            default_timeout_secs()
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::LMStudio),
                ProviderConfig::new(TranslationProvider::Gemini),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
