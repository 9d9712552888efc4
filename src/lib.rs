/*!
 * # cuelingo - resilient chunked subtitle translation
 *
 * A Rust library for translating WebVTT subtitle tracks with language
 * model providers, without ever losing, reordering or retiming a cue.
 *
 * ## Features
 *
 * - WebVTT parsing and serialization with verbatim timestamps
 * - Fixed-size batches joined with a delimiter the model must echo back
 * - Bounded retries, recursive halving of failing batches and a
 *   single-line fallback prompt; unrecoverable cues keep their source text
 * - Providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and LM Studio
 *   - Anthropic API
 *   - Google Gemini API
 * - ISO 639-1 and ISO 639-2 language code support
 * - Cooperative cancellation and a per-run report
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `cue_track`: WebVTT cue codec
 * - `translation`: the translation engine:
 *   - `translation::batch`: batch planning and scheduling
 *   - `translation::retry`: bounded attempts per request
 *   - `translation::recovery`: split and single-line recovery
 *   - `translation::core`: engine entry point and reassembly
 *   - `translation::port`: the seam between engine and providers
 * - `providers`: Client implementations for various LLM providers
 * - `app_config`: Configuration management
 * - `app_controller`: File and folder workflow
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod cue_track;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use cue_track::{Cue, CueStatus, CueTrack};
pub use errors::{ProviderError, SubtitleError, TranslationError};
pub use language_utils::{resolve_language_code, resolve_language_name};
pub use translation::{TranslationEngine, TranslationOutcome, TranslationPort, TranslationReport};
