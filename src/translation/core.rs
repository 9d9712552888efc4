/*!
 * Core translation engine.
 *
 * `TranslationEngine` takes a cue track (as text or as parsed cues),
 * plans batches, resolves each one through retry and bisection, and
 * reassembles the result. The output always has exactly the input cues,
 * in input order, with their timestamps untouched; only text changes.
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::app_config::{Config, EngineConfig};
use crate::cue_track::{self, Cue, CueStatus};
use crate::errors::{SubtitleError, TranslationError};
use crate::language_utils;

use super::batch::{BatchTranslator, plan_batches};
use super::cancellation::CancellationToken;
use super::log_capture::LogCapture;
use super::port::{ProviderPort, TranslationPort};
use super::recovery::{RecoveryStats, ResolvedCue};
use super::retry::{RetryController, RetryPolicy};

/// Figures about one translation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationReport {
    /// Cues in the input
    pub cues: usize,
    /// Cues whose text came from the provider
    pub translated: usize,
    /// Cues left with their source text
    pub fallback: usize,
    /// Batches planned
    pub batches: usize,
    /// Slices split in two during recovery
    pub splits: usize,
    /// Cues that reached the single-line prompt
    pub single_line_fallbacks: usize,
    /// Provider calls made
    pub attempts: u32,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    /// Whether the run was cancelled before finishing
    pub cancelled: bool,
}

impl TranslationReport {
    /// Generate a human readable summary
    pub fn summary(&self) -> String {
        format!(
            "Translation Summary:\n\
             Cues: {}\n\
             Translated: {}\n\
             Kept original: {}\n\
             Batches: {}\n\
             Splits: {}\n\
             Single-line fallbacks: {}\n\
             Provider calls: {}\n\
             Elapsed time: {:.2}s{}",
            self.cues,
            self.translated,
            self.fallback,
            self.batches,
            self.splits,
            self.single_line_fallbacks,
            self.attempts,
            self.elapsed.as_secs_f64(),
            if self.cancelled { "\nRun was cancelled" } else { "" }
        )
    }
}

/// Result of a translation run
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// Serialized output track
    pub text: String,
    /// Cues in input order with their status
    pub cues: Vec<ResolvedCue>,
    /// Run figures
    pub report: TranslationReport,
}

impl TranslationOutcome {
    /// Output cues without status
    pub fn translated_cues(&self) -> Vec<Cue> {
        self.cues.iter().map(|resolved| resolved.cue.clone()).collect()
    }
}

/// Put resolved cues back in input order and check that every input cue
/// is present exactly once.
pub fn reassemble(mut resolved: Vec<ResolvedCue>, input: &[Cue]) -> Result<Vec<ResolvedCue>, TranslationError> {
    resolved.sort_by_key(|r| r.cue.index);

    let expected: Vec<usize> = input.iter().map(|cue| cue.index).collect::<BTreeSet<_>>().into_iter().collect();
    let actual: Vec<usize> = resolved.iter().map(|r| r.cue.index).collect();

    if expected.len() != input.len() || actual != expected {
        let distinct = actual.iter().collect::<BTreeSet<_>>().len();
        return Err(TranslationError::Reconstruction {
            expected: input.len(),
            actual: distinct,
        });
    }

    Ok(resolved)
}

/// Chunked translation engine
pub struct TranslationEngine {
    /// Port to the text-generation service, `None` when not configured
    port: Option<Arc<dyn TranslationPort>>,

    /// Batching and retry settings
    settings: EngineConfig,

    /// Sampling temperature passed to every call
    temperature: f32,

    /// English name of the source language
    source_language: String,

    /// English name of the target language
    target_language: String,

    cancel: CancellationToken,
    log: LogCapture,
}

impl TranslationEngine {
    /// Create an engine around a port
    pub fn new(
        port: Option<Arc<dyn TranslationPort>>,
        settings: EngineConfig,
        temperature: f32,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            port,
            settings,
            temperature,
            source_language: source_language.into(),
            target_language: target_language.into(),
            cancel: CancellationToken::new(),
            log: LogCapture::new(),
        }
    }

    /// Create an engine for the configured provider and languages
    pub fn from_config(config: &Config) -> Result<Self> {
        let source_language = language_utils::resolve_language_name(&config.source_language)
            .context("Invalid source language")?;
        let target_language = language_utils::resolve_language_name(&config.target_language)
            .context("Invalid target language")?;

        let port = ProviderPort::from_config(&config.translation)?
            .map(|port| Arc::new(port) as Arc<dyn TranslationPort>);

        Ok(Self::new(
            port,
            config.engine.clone(),
            config.translation.common.temperature,
            source_language,
            target_language,
        ))
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Use an externally owned log capture
    pub fn with_log_capture(mut self, log: LogCapture) -> Self {
        self.log = log;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn log_capture(&self) -> &LogCapture {
        &self.log
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Number of batches `cue_count` cues are planned into
    pub fn batch_count(&self, cue_count: usize) -> usize {
        cue_count.div_ceil(self.settings.chunk_size.max(1))
    }

    /// Translate subtitle text
    pub async fn translate_text(&self, text: &str) -> Result<TranslationOutcome, TranslationError> {
        self.translate_text_with_progress(text, |_, _| {}).await
    }

    /// Translate subtitle text, reporting (finished, total) batches
    pub async fn translate_text_with_progress(
        &self,
        text: &str,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Result<TranslationOutcome, TranslationError> {
        self.require_port()?;
        let cues = cue_track::parse(text)?;
        self.translate_cues(&cues, progress_callback).await
    }

    /// Translate already parsed cues
    pub async fn translate_cues(
        &self,
        cues: &[Cue],
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Result<TranslationOutcome, TranslationError> {
        let port = self.require_port()?;
        if cues.is_empty() {
            return Err(SubtitleError::NoValidCues.into());
        }

        let start_time = Instant::now();
        let batches = plan_batches(cues, self.settings.chunk_size);
        self.log.info(format!(
            "Starting translation of {} cues in {} batches of up to {} ({} -> {}, {})",
            cues.len(),
            batches.len(),
            self.settings.chunk_size,
            self.source_language,
            self.target_language,
            port.name()
        ));

        let retry = RetryController::new(
            port,
            RetryPolicy::from(&self.settings),
            self.temperature,
            self.cancel.clone(),
            self.log.clone(),
        );
        let translator = BatchTranslator::new(
            retry,
            self.source_language.clone(),
            self.target_language.clone(),
            self.settings.delimiter.clone(),
            self.settings.concurrent_batches,
            Duration::from_millis(self.settings.batch_delay_ms),
            self.cancel.clone(),
            self.log.clone(),
        );

        let (resolved, stats) = translator.translate_batches(&batches, progress_callback).await;
        let resolved = reassemble(resolved, cues)?;

        let report = self.build_report(&resolved, batches.len(), stats, start_time.elapsed());
        self.log.info(format!(
            "All batches processed: {} translated, {} kept original",
            report.translated, report.fallback
        ));

        let output: Vec<Cue> = resolved.iter().map(|r| r.cue.clone()).collect();
        Ok(TranslationOutcome {
            text: cue_track::serialize(&output),
            cues: resolved,
            report,
        })
    }

    fn require_port(&self) -> Result<Arc<dyn TranslationPort>, TranslationError> {
        match &self.port {
            Some(port) => Ok(port.clone()),
            None => {
                self.log.error("Translation model is not available");
                Err(TranslationError::ServiceUnavailable)
            }
        }
    }

    fn build_report(&self, resolved: &[ResolvedCue], batches: usize, stats: RecoveryStats, elapsed: Duration) -> TranslationReport {
        let translated = resolved.iter().filter(|r| r.status == CueStatus::Translated).count();
        TranslationReport {
            cues: resolved.len(),
            translated,
            fallback: resolved.len() - translated,
            batches,
            splits: stats.splits,
            single_line_fallbacks: stats.single_line_fallbacks,
            attempts: stats.attempts,
            elapsed,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}
