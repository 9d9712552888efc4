/*!
 * Tests for provider reply decoding and port wiring
 */

use std::time::Duration;

use cuelingo::app_config::{TranslationConfig, TranslationProvider};
use cuelingo::providers::Provider;
use cuelingo::providers::anthropic::{Anthropic, AnthropicResponse};
use cuelingo::providers::gemini::{Gemini, GeminiResponse};
use cuelingo::providers::ollama::Ollama;
use cuelingo::providers::openai::{OpenAI, OpenAIResponse};
use cuelingo::translation::{ProviderPort, TranslationPort};

#[test]
fn test_ollama_parseGeneration_withSingleObject_shouldReturnResponse() {
    let body = r#"{"model":"llama3.2:3b","response":"Hello\n<--->\nBye","done":true}"#;
    let generated = Ollama::parse_generation(body).unwrap();
    assert_eq!(Ollama::extract_text(&generated), "Hello\n<--->\nBye");
}

#[test]
fn test_openai_extractText_shouldReadFirstChoice() {
    let body = r#"{
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "Hello"}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
    }"#;
    let response: OpenAIResponse = serde_json::from_str(body).unwrap();
    assert_eq!(OpenAI::extract_text(&response), "Hello");
}

#[test]
fn test_anthropic_extractText_shouldJoinTextBlocks() {
    let body = r#"{
        "content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": " there"}],
        "usage": {"input_tokens": 5, "output_tokens": 2}
    }"#;
    let response: AnthropicResponse = serde_json::from_str(body).unwrap();
    assert_eq!(Anthropic::extract_text(&response), "Hello there");
}

#[test]
fn test_gemini_extractText_withBlockedPrompt_shouldBeEmpty() {
    let blocked = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
    let response: GeminiResponse = serde_json::from_str(blocked).unwrap();
    assert_eq!(Gemini::extract_text(&response), "");

    let answered = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Hello"}]}, "finishReason": "STOP"}]}"#;
    let response: GeminiResponse = serde_json::from_str(answered).unwrap();
    assert_eq!(Gemini::extract_text(&response), "Hello");
}

#[test]
fn test_providerPort_forLmStudio_shouldNotNeedKey() {
    let config = TranslationConfig {
        provider: TranslationProvider::LMStudio,
        ..TranslationConfig::default()
    };

    let port = ProviderPort::from_config(&config).unwrap().unwrap();
    assert!(port.name().starts_with("LM Studio"));
    assert_eq!(port.timeout(), Duration::from_secs(60));
}

#[test]
fn test_providerPort_forGeminiWithKey_shouldUseHostedTimeout() {
    let mut config = TranslationConfig {
        provider: TranslationProvider::Gemini,
        ..TranslationConfig::default()
    };
    config.active_provider_config_mut().api_key = "test-key".to_string();

    let port = ProviderPort::from_config(&config).unwrap().unwrap();
    assert_eq!(port.name(), "Gemini (gemini-2.5-flash)");
    assert_eq!(port.timeout(), Duration::from_secs(120));
}
