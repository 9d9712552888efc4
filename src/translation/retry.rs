/*!
 * Bounded retry of a single translation request.
 *
 * One slice of cues (a whole batch, a half after a split, or a single cue)
 * is sent up to `max_retries + 1` times with a fixed pause in between. Each
 * reply is classified; only a reply that splits into exactly the expected
 * number of segments counts as success. Running out of attempts is a normal
 * outcome handed back to the caller, never an error.
 */

use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{EmptyResponsePolicy, EngineConfig};
use crate::errors::ProviderError;

use super::cancellation::CancellationToken;
use super::log_capture::LogCapture;
use super::port::TranslationPort;
use super::prompts;

/// Classification of one provider reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Reply split into exactly the expected number of segments
    Success(Vec<String>),
    /// Reply split into the wrong number of segments
    CountMismatch { expected: usize, actual: usize },
    /// Reply was empty or whitespace only (often a content filter)
    EmptyResponse,
    /// The call itself failed
    TransportError(String),
}

impl AttemptOutcome {
    /// Whether this outcome may be followed by another attempt
    pub fn is_retryable(&self, policy: EmptyResponsePolicy) -> bool {
        match self {
            AttemptOutcome::Success(_) => false,
            AttemptOutcome::CountMismatch { .. } | AttemptOutcome::TransportError(_) => true,
            AttemptOutcome::EmptyResponse => policy == EmptyResponsePolicy::Retry,
        }
    }
}

/// Classify a provider reply.
///
/// With a delimiter the reply is split on it, first counting every
/// delimiter and then ignoring stray ones at the edges. Without one
/// (single-cue prompts) the whole reply is the one segment.
pub fn classify_response(raw: &str, delimiter: Option<&str>, expected: usize) -> AttemptOutcome {
    if prompts::strip_wrapping(raw).is_empty() {
        return AttemptOutcome::EmptyResponse;
    }

    let segments = match delimiter {
        Some(delimiter) => {
            let exact = prompts::split_response_exact(raw, delimiter);
            if exact.len() == expected {
                exact
            } else {
                prompts::split_response(raw, delimiter)
            }
        }
        None => vec![prompts::strip_wrapping(raw).to_string()],
    };

    if segments.len() == expected {
        AttemptOutcome::Success(segments)
    } else {
        AttemptOutcome::CountMismatch {
            expected,
            actual: segments.len(),
        }
    }
}

/// Classify a transport result
pub fn classify_call(result: Result<String, ProviderError>, delimiter: Option<&str>, expected: usize) -> AttemptOutcome {
    match result {
        Ok(raw) => classify_response(&raw, delimiter, expected),
        Err(e) => AttemptOutcome::TransportError(e.to_string()),
    }
}

/// Retry limits shared by every slice
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub empty_response_policy: EmptyResponsePolicy,
}

impl RetryPolicy {
    /// Total attempts allowed per slice
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl From<&EngineConfig> for RetryPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            empty_response_policy: config.empty_response_policy,
        }
    }
}

/// Result of running one slice through the retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryResult {
    /// Segments on success, `None` when every attempt failed
    pub segments: Option<Vec<String>>,
    /// Provider calls made
    pub attempts: u32,
}

/// Drives the attempts for one slice against a port
pub struct RetryController {
    port: Arc<dyn TranslationPort>,
    policy: RetryPolicy,
    temperature: f32,
    cancel: CancellationToken,
    log: LogCapture,
}

impl RetryController {
    pub fn new(
        port: Arc<dyn TranslationPort>,
        policy: RetryPolicy,
        temperature: f32,
        cancel: CancellationToken,
        log: LogCapture,
    ) -> Self {
        Self {
            port,
            policy,
            temperature,
            cancel,
            log,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `prompt` until a reply with `expected` segments arrives or the
    /// budget runs out. `label` names the slice in log lines.
    pub async fn run(&self, prompt: &str, delimiter: Option<&str>, expected: usize, label: &str) -> RetryResult {
        let max_attempts = self.policy.max_attempts();
        let mut attempts = 0;

        while attempts < max_attempts {
            if attempts > 0 {
                self.log.warn(format!("{}: retrying (attempt {}/{})", label, attempts + 1, max_attempts));
                if !self.policy.retry_delay.is_zero() {
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
            }

            // Checked after the pause so a cancel during it starts no new call
            if self.cancel.is_cancelled() {
                self.log.warn(format!("{}: cancelled before attempt {}", label, attempts + 1));
                break;
            }

            attempts += 1;
            let outcome = classify_call(self.port.invoke(prompt, self.temperature).await, delimiter, expected);
            let retryable = outcome.is_retryable(self.policy.empty_response_policy);

            match outcome {
                AttemptOutcome::Success(segments) => {
                    self.log.debug(format!("{}: translated on attempt {}", label, attempts));
                    return RetryResult {
                        segments: Some(segments),
                        attempts,
                    };
                }
                AttemptOutcome::CountMismatch { expected, actual } => {
                    self.log.warn(format!(
                        "{}: attempt {} failed, mismatched segment count (got {}, expected {})",
                        label, attempts, actual, expected
                    ));
                }
                AttemptOutcome::EmptyResponse if !retryable => {
                    self.log.error(format!(
                        "{}: empty response on attempt {} (possible content filter), not retrying",
                        label, attempts
                    ));
                }
                AttemptOutcome::EmptyResponse => {
                    self.log.warn(format!("{}: empty response on attempt {}", label, attempts));
                }
                AttemptOutcome::TransportError(message) => {
                    self.log.error(format!("{}: attempt {} failed: {}", label, attempts, message));
                }
            }

            if !retryable {
                break;
            }
        }

        RetryResult {
            segments: None,
            attempts,
        }
    }
}
