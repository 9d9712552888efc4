/*!
 * Error types for the cuelingo application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a text-generation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not complete within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::ConnectionError(format!("timeout: {}", error))
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur during subtitle parsing
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubtitleError {
    /// No block of the input contained a timestamp-range line
    #[error("No valid subtitle cues found in the input")]
    NoValidCues,
}

/// Whole-job translation failures.
///
/// Per-cue and per-batch problems never show up here; they are recovered
/// by retry and bisection and at worst leave a cue in its source language.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// No translation provider is configured
    #[error("Translation service is not available")]
    ServiceUnavailable,

    /// The input track has no cues
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Reassembled output does not account for every input cue exactly once
    #[error("Reconstruction failed: expected {expected} cues, got {actual}")]
    Reconstruction {
        /// Number of cues parsed from the input
        expected: usize,
        /// Number of distinct cue indices after reassembly
        actual: usize,
    },
}
