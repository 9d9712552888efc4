/*!
 * Mock translation port for testing.
 *
 * This module provides a scripted provider that simulates the ways a real
 * model misbehaves:
 * - `MockProvider::echo()` - Answers every prompt with its own input (identity translation)
 * - `MockProvider::prefixed(tag)` - Prefixes every segment, keeping the segment count
 * - `MockProvider::drop_last_segment()` - Loses one segment of every multi-segment prompt
 * - `MockProvider::single_line_only()` - Only answers single-line prompts correctly
 * - `MockProvider::empty()` - Always returns an empty reply
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::translation::TranslationPort;
use crate::translation::prompts::{INPUT_HEADER, OUTPUT_HEADER};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Returns the input texts unchanged, with the prompt's delimiter
    Echo,
    /// Returns every input segment with a prefix
    Prefix(&'static str),
    /// Drops the last segment whenever there is more than one
    DropLastSegment,
    /// Batch prompts get a merged single segment, single-line prompts are echoed
    SingleLineOnly,
    /// Fails intermittently (every Nth request), echoes otherwise
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout and cancellation testing)
    Slow { delay_ms: u64 },
    /// Custom reply function
    Custom(fn(&str) -> Result<String, ProviderError>),
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every prompt received, shared between clones
    prompts: Arc<Mutex<Vec<String>>>,
}

/// Input texts found in a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInput {
    /// Delimiter announced by a batch prompt, `None` for single-line prompts
    pub delimiter: Option<String>,
    /// Texts between the input and output headers
    pub segments: Vec<String>,
}

impl PromptInput {
    /// Join segments back with the prompt's delimiter
    pub fn join(&self, segments: &[String]) -> String {
        match &self.delimiter {
            Some(delimiter) => segments.join(&format!("\n{}\n", delimiter)),
            None => segments.join("\n"),
        }
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Identity translation
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Segment-preserving translation that tags each segment
    pub fn prefixed(tag: &'static str) -> Self {
        Self::new(MockBehavior::Prefix(tag))
    }

    /// Always returns one segment too few for batch prompts
    pub fn drop_last_segment() -> Self {
        Self::new(MockBehavior::DropLastSegment)
    }

    /// Only the simplified single-line prompt succeeds
    pub fn single_line_only() -> Self {
        Self::new(MockBehavior::SingleLineOnly)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Echo after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Reply with a custom function of the prompt
    pub fn custom(reply: fn(&str) -> Result<String, ProviderError>) -> Self {
        Self::new(MockBehavior::Custom(reply))
    }

    /// Number of calls made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every prompt received
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Extract the delimiter and input texts from a prompt built by the engine
    pub fn parse_prompt(prompt: &str) -> PromptInput {
        let delimiter = prompt
            .split_once("separated by '")
            .and_then(|(_, rest)| rest.split_once('\''))
            .map(|(delimiter, _)| delimiter.to_string());

        let body = prompt
            .rsplit_once(INPUT_HEADER)
            .map(|(_, rest)| rest)
            .unwrap_or(prompt);
        let body = body
            .rsplit_once(OUTPUT_HEADER)
            .map(|(input, _)| input)
            .unwrap_or(body)
            .trim();

        let segments = match &delimiter {
            Some(delimiter) => body.split(delimiter.as_str()).map(|s| s.trim().to_string()).collect(),
            None => vec![body.to_string()],
        };

        PromptInput { delimiter, segments }
    }

    fn echo_reply(prompt: &str) -> String {
        let input = Self::parse_prompt(prompt);
        input.join(&input.segments)
    }

    fn reply(&self, prompt: &str, count: usize) -> Result<String, ProviderError> {
        match self.behavior {
            MockBehavior::Echo => Ok(Self::echo_reply(prompt)),

            MockBehavior::Prefix(tag) => {
                let input = Self::parse_prompt(prompt);
                let tagged: Vec<String> = input.segments.iter().map(|s| format!("{}{}", tag, s)).collect();
                Ok(input.join(&tagged))
            }

            MockBehavior::DropLastSegment => {
                let input = Self::parse_prompt(prompt);
                let mut segments = input.segments.clone();
                if segments.len() > 1 {
                    segments.pop();
                }
                Ok(input.join(&segments))
            }

            MockBehavior::SingleLineOnly => {
                let input = Self::parse_prompt(prompt);
                match &input.delimiter {
                    // A one-cue batch answered with a duplicated segment
                    Some(delimiter) if input.segments.len() == 1 => {
                        let segment = &input.segments[0];
                        Ok(format!("{}\n{}\n{}", segment, delimiter, segment))
                    }
                    // Several cues merged into one segment
                    Some(_) => Ok(input.segments.join(" ")),
                    None => Ok(input.segments.join("\n")),
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::echo_reply(prompt))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { .. } => Ok(Self::echo_reply(prompt)),

            MockBehavior::Custom(reply) => reply(prompt),
        }
    }
}

#[async_trait]
impl TranslationPort for MockProvider {
    async fn invoke(&self, prompt: &str, _temperature: f32) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        if let MockBehavior::Slow { delay_ms } = self.behavior {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
        }

        self.reply(prompt, count)
    }

    fn name(&self) -> String {
        format!("Mock ({:?})", self.behavior)
    }
}
