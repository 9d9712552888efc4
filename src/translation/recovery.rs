/*!
 * Bisection recovery for a batch.
 *
 * A slice that cannot be translated as a whole is split into two halves
 * (left gets the extra cue) and each half is tried on its own. A single
 * cue that still fails gets one more round with a simplified prompt and
 * otherwise keeps its source text. Every input cue comes out exactly once,
 * in input order, whatever happens along the way.
 */

use crate::cue_track::{Cue, CueStatus};

use super::cancellation::CancellationToken;
use super::log_capture::LogCapture;
use super::prompts;
use super::retry::RetryController;

/// A cue together with how its text was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCue {
    pub cue: Cue,
    pub status: CueStatus,
}

impl ResolvedCue {
    pub fn translated(cue: Cue) -> Self {
        Self { cue, status: CueStatus::Translated }
    }

    pub fn fallback(cue: Cue) -> Self {
        Self { cue, status: CueStatus::Fallback }
    }
}

/// Counters collected while resolving one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Provider calls made
    pub attempts: u32,
    /// Slices split in two
    pub splits: usize,
    /// Cues that reached the single-line prompt
    pub single_line_fallbacks: usize,
}

impl RecoveryStats {
    pub fn merge(&mut self, other: RecoveryStats) {
        self.attempts += other.attempts;
        self.splits += other.splits;
        self.single_line_fallbacks += other.single_line_fallbacks;
    }
}

/// Resolved cues of one batch plus its counters
#[derive(Debug, Clone, Default)]
pub struct BatchResolution {
    pub cues: Vec<ResolvedCue>,
    pub stats: RecoveryStats,
}

impl BatchResolution {
    /// Every cue kept as-is; used when the batch never starts
    pub fn all_fallback(cues: &[Cue]) -> Self {
        Self {
            cues: cues.iter().cloned().map(ResolvedCue::fallback).collect(),
            stats: RecoveryStats::default(),
        }
    }
}

/// Resolves batches with retry, bisection and single-line fallback
pub struct RecoveryEngine<'a> {
    retry: &'a RetryController,
    source_language: &'a str,
    target_language: &'a str,
    preferred_delimiter: &'a str,
    cancel: &'a CancellationToken,
    log: &'a LogCapture,
}

impl<'a> RecoveryEngine<'a> {
    pub fn new(
        retry: &'a RetryController,
        source_language: &'a str,
        target_language: &'a str,
        preferred_delimiter: &'a str,
        cancel: &'a CancellationToken,
        log: &'a LogCapture,
    ) -> Self {
        Self {
            retry,
            source_language,
            target_language,
            preferred_delimiter,
            cancel,
            log,
        }
    }

    /// Resolve every cue of `batch`.
    ///
    /// Halves are processed depth-first, left before right, from an explicit
    /// worklist so arbitrarily large batches cannot grow the stack.
    pub async fn resolve(&self, batch: &[Cue], label: &str) -> BatchResolution {
        let mut resolution = BatchResolution::default();
        let mut worklist: Vec<&[Cue]> = vec![batch];

        while let Some(slice) = worklist.pop() {
            if slice.is_empty() {
                continue;
            }

            if self.cancel.is_cancelled() {
                resolution.cues.extend(slice.iter().cloned().map(ResolvedCue::fallback));
                continue;
            }

            let slice_label = slice_label(label, slice);
            let texts: Vec<&str> = slice.iter().map(|cue| cue.text.as_str()).collect();
            let delimiter = prompts::choose_delimiter(self.preferred_delimiter, &texts);
            if delimiter != self.preferred_delimiter {
                self.log.debug(format!("{}: delimiter collides with cue text, using '{}'", slice_label, delimiter));
            }

            let prompt = prompts::build_batch_prompt(self.source_language, self.target_language, delimiter, &texts);
            let result = self.retry.run(&prompt, Some(delimiter), slice.len(), &slice_label).await;
            resolution.stats.attempts += result.attempts;

            if let Some(segments) = result.segments {
                resolution.cues.extend(apply_segments(slice, &segments));
                continue;
            }

            if self.cancel.is_cancelled() {
                resolution.cues.extend(slice.iter().cloned().map(ResolvedCue::fallback));
                continue;
            }

            if slice.len() == 1 {
                resolution.stats.single_line_fallbacks += 1;
                let (resolved, attempts) = self.single_line(&slice[0], &slice_label).await;
                resolution.stats.attempts += attempts;
                resolution.cues.push(resolved);
                continue;
            }

            let mid = slice.len().div_ceil(2);
            let (left, right) = slice.split_at(mid);
            self.log.warn(format!(
                "{}: failed after all attempts, splitting into {} + {} cues",
                slice_label,
                left.len(),
                right.len()
            ));
            resolution.stats.splits += 1;
            worklist.push(right);
            worklist.push(left);
        }

        resolution.cues.sort_by_key(|resolved| resolved.cue.index);
        resolution
    }

    async fn single_line(&self, cue: &Cue, label: &str) -> (ResolvedCue, u32) {
        let prompt = prompts::build_single_prompt(self.source_language, self.target_language, &cue.text);
        let result = self.retry.run(&prompt, None, 1, &format!("{} (single line)", label)).await;

        let resolved = match result.segments.as_deref() {
            Some([segment]) => resolve_segment(cue, segment),
            _ => {
                self.log.error(format!("{}: keeping original text for cue {}", label, cue.index + 1));
                ResolvedCue::fallback(cue.clone())
            }
        };

        (resolved, result.attempts)
    }
}

fn slice_label(label: &str, slice: &[Cue]) -> String {
    match (slice.first(), slice.last()) {
        (Some(first), Some(last)) if first.index != last.index => {
            format!("{} [cues {}-{}]", label, first.index + 1, last.index + 1)
        }
        (Some(first), _) => format!("{} [cue {}]", label, first.index + 1),
        _ => label.to_string(),
    }
}

fn resolve_segment(cue: &Cue, segment: &str) -> ResolvedCue {
    let cleaned = prompts::clean_segment(&cue.text, segment);
    if segment.trim().is_empty() && !cue.text.trim().is_empty() {
        ResolvedCue::fallback(cue.with_text(cleaned))
    } else {
        ResolvedCue::translated(cue.with_text(cleaned))
    }
}

fn apply_segments(slice: &[Cue], segments: &[String]) -> Vec<ResolvedCue> {
    slice
        .iter()
        .zip(segments)
        .map(|(cue, segment)| resolve_segment(cue, segment))
        .collect()
}
