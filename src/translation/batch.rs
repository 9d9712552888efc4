/*!
 * Batch planning and batch-level concurrency.
 *
 * The cue list is cut into contiguous batches of at most `chunk_size`
 * cues. Batches are independent: each one is resolved by the recovery
 * engine and the results are put back together by batch index.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::cue_track::Cue;

use super::cancellation::CancellationToken;
use super::log_capture::LogCapture;
use super::recovery::{BatchResolution, RecoveryEngine, RecoveryStats, ResolvedCue};
use super::retry::RetryController;

/// Split cues into contiguous batches of at most `chunk_size` cues.
///
/// Order is preserved and every cue lands in exactly one batch. A chunk
/// size of zero is treated as one.
pub fn plan_batches(cues: &[Cue], chunk_size: usize) -> Vec<Vec<Cue>> {
    cues.chunks(chunk_size.max(1)).map(|chunk| chunk.to_vec()).collect()
}

/// Batch translator for processing cue batches, optionally concurrently
pub struct BatchTranslator {
    retry: RetryController,
    source_language: String,
    target_language: String,
    delimiter: String,
    concurrent_batches: usize,
    batch_delay: Duration,
    cancel: CancellationToken,
    log: LogCapture,
}

impl BatchTranslator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retry: RetryController,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        delimiter: impl Into<String>,
        concurrent_batches: usize,
        batch_delay: Duration,
        cancel: CancellationToken,
        log: LogCapture,
    ) -> Self {
        Self {
            retry,
            source_language: source_language.into(),
            target_language: target_language.into(),
            delimiter: delimiter.into(),
            concurrent_batches: concurrent_batches.max(1),
            batch_delay,
            cancel,
            log,
        }
    }

    /// Translate all batches.
    ///
    /// Returns the resolved cues of every batch in batch order plus the
    /// summed counters. `progress_callback` receives (finished, total)
    /// after each batch. Batch starts are at least `batch_delay` apart,
    /// also when several batches are in flight.
    pub async fn translate_batches(
        &self,
        batches: &[Vec<Cue>],
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> (Vec<ResolvedCue>, RecoveryStats) {
        let total_batches = batches.len();
        let processed_batches = Arc::new(AtomicUsize::new(0));
        let last_start: Mutex<Option<Instant>> = Mutex::new(None);

        let results = stream::iter(batches.iter().enumerate())
            .map(|(batch_index, batch)| {
                let processed_batches = processed_batches.clone();
                let progress_callback = progress_callback.clone();
                let last_start = &last_start;

                async move {
                    self.wait_for_start_slot(last_start).await;

                    let label = format!("Batch {}/{}", batch_index + 1, total_batches);
                    let resolution = if self.cancel.is_cancelled() {
                        self.log.warn(format!("{}: cancelled, keeping original text", label));
                        BatchResolution::all_fallback(batch)
                    } else {
                        self.log.info(format!("{}: translating {} cues", label, batch.len()));
                        let start_time = Instant::now();
                        let engine = RecoveryEngine::new(
                            &self.retry,
                            &self.source_language,
                            &self.target_language,
                            &self.delimiter,
                            &self.cancel,
                            &self.log,
                        );
                        let resolution = engine.resolve(batch, &label).await;
                        self.log.info(format!("{}: completed in {:?}", label, start_time.elapsed()));
                        resolution
                    };

                    let current = processed_batches.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_batches);

                    (batch_index, resolution)
                }
            })
            .buffer_unordered(self.concurrent_batches)
            .collect::<Vec<_>>()
            .await;

        // Sort results by batch index to maintain original order
        let mut sorted_results = results;
        sorted_results.sort_by_key(|(idx, _)| *idx);

        let mut all_cues = Vec::new();
        let mut stats = RecoveryStats::default();
        for (_, resolution) in sorted_results {
            all_cues.extend(resolution.cues);
            stats.merge(resolution.stats);
        }

        (all_cues, stats)
    }

    /// Hold a batch back until `batch_delay` has passed since the previous start
    async fn wait_for_start_slot(&self, last_start: &Mutex<Option<Instant>>) {
        if self.batch_delay.is_zero() {
            return;
        }

        // The lock stays held while sleeping so starts queue up one by one
        let mut last = last_start.lock().await;
        if let Some(previous) = *last {
            if !self.cancel.is_cancelled() {
                tokio::time::sleep_until((previous + self.batch_delay).into()).await;
            }
        }
        *last = Some(Instant::now());
    }
}
