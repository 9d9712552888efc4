/*!
 * Resilient chunked translation of cue tracks.
 *
 * This module is split into several submodules:
 *
 * - `core`: the engine, run report and reassembly
 * - `batch`: batch planning and batch-level concurrency
 * - `recovery`: bisection of failing slices and single-line fallback
 * - `retry`: bounded retries and reply classification
 * - `prompts`: prompt building, delimiter choice and reply splitting
 * - `port`: the provider seam and its HTTP-backed implementation
 * - `cancellation`: cooperative cancellation token
 * - `log_capture`: in-memory capture of engine log lines
 */

// Re-export main types for easier usage
pub use self::batch::{BatchTranslator, plan_batches};
pub use self::cancellation::CancellationToken;
pub use self::core::{TranslationEngine, TranslationOutcome, TranslationReport, reassemble};
pub use self::log_capture::{LogCapture, LogEntry};
pub use self::port::{ProviderPort, TranslationPort};
pub use self::recovery::{RecoveryStats, ResolvedCue};
pub use self::retry::{AttemptOutcome, RetryController, RetryPolicy, classify_response};

// Submodules
pub mod batch;
pub mod cancellation;
pub mod core;
pub mod log_capture;
pub mod port;
pub mod prompts;
pub mod recovery;
pub mod retry;
