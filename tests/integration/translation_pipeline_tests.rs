/*!
 * Integration tests for the chunked translation engine
 *
 * Every run uses the scripted mock provider and zero delays.
 */

use std::sync::Arc;
use std::time::Duration;

use cuelingo::app_config::EmptyResponsePolicy;
use cuelingo::cue_track::{self, CueStatus};
use cuelingo::errors::{ProviderError, SubtitleError, TranslationError};
use cuelingo::providers::mock::MockProvider;
use cuelingo::translation::{CancellationToken, LogCapture, TranslationEngine};
use crate::common;

fn timestamps(text: &str) -> Vec<String> {
    cue_track::parse(text)
        .unwrap()
        .into_iter()
        .map(|cue| cue.timestamp)
        .collect()
}

#[tokio::test]
async fn test_echoProvider_shouldReturnIdenticalTrack() {
    common::init_logging();
    let provider = MockProvider::echo();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(2, 3));

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert_eq!(outcome.text, common::SAMPLE_TRACK);
    assert_eq!(outcome.report.cues, 3);
    assert_eq!(outcome.report.translated, 3);
    assert_eq!(outcome.report.batches, 2);
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_prefixedProvider_shouldTranslateTextAndKeepTimestamps() {
    let provider = MockProvider::prefixed("EN: ");
    let engine = common::engine_with(Arc::new(provider), common::engine_settings(50, 3));

    let track = common::numbered_track(12);
    let outcome = engine.translate_text(&track).await.unwrap();
    let cues = outcome.translated_cues();

    assert_eq!(cues.len(), 12);
    assert_eq!(timestamps(&outcome.text), timestamps(&track));
    for (i, cue) in cues.iter().enumerate() {
        assert_eq!(cue.index, i);
        assert_eq!(cue.text, format!("EN: line {}", i + 1));
    }
    assert!(outcome.cues.iter().all(|r| r.status == CueStatus::Translated));
}

#[tokio::test]
async fn test_batchPrompt_shouldCarryLanguagesAndDelimiter() {
    let provider = MockProvider::echo();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(50, 0));

    engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Japanese text to English"));
    assert!(prompts[0].contains("こんにちは\n<--->\n元気ですか？\n<--->\n<i>さようなら</i>"));
}

#[tokio::test]
async fn test_failingProvider_shouldKeepEveryCueWithOriginalText() {
    let provider = MockProvider::failing();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(3, 0));

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert_eq!(outcome.text, common::SAMPLE_TRACK);
    assert_eq!(outcome.report.fallback, 3);
    assert_eq!(outcome.report.translated, 0);
    assert_eq!(outcome.report.splits, 2);
    assert_eq!(outcome.report.single_line_fallbacks, 3);
    // [1-3], [1-2], then a batch call and a single-line call per cue
    assert_eq!(provider.request_count(), 8);
    assert_eq!(outcome.report.attempts, 8);
    assert!(outcome.cues.iter().all(|r| r.status == CueStatus::Fallback));
}

#[tokio::test]
async fn test_failingProvider_withRetries_shouldUseFullBudgetPerSlice() {
    let provider = MockProvider::failing();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(1, 2));

    let track = common::numbered_track(2);
    let outcome = engine.translate_text(&track).await.unwrap();

    // Per cue: 3 batch attempts then 3 single-line attempts
    assert_eq!(provider.request_count(), 12);
    assert_eq!(outcome.report.fallback, 2);
}

#[tokio::test]
async fn test_dropLastSegmentProvider_shouldRecoverByBisection() {
    let provider = MockProvider::drop_last_segment();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(3, 3));

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert_eq!(outcome.report.translated, 3);
    assert_eq!(outcome.report.splits, 2);
    assert_eq!(outcome.report.single_line_fallbacks, 0);
    // 4 attempts on [1-3], 4 on [1-2], one each for the single cues
    assert_eq!(provider.request_count(), 11);
    assert_eq!(outcome.text, common::SAMPLE_TRACK);
}

#[tokio::test]
async fn test_dropLastSegmentProvider_withLargerTrack_shouldTerminateWithAllCues() {
    let provider = MockProvider::drop_last_segment();
    let engine = common::engine_with(Arc::new(provider), common::engine_settings(7, 1));

    let track = common::numbered_track(20);
    let outcome = engine.translate_text(&track).await.unwrap();

    assert_eq!(outcome.report.cues, 20);
    assert_eq!(outcome.report.batches, 3);
    assert_eq!(outcome.report.translated, 20);
    assert_eq!(timestamps(&outcome.text), timestamps(&track));
}

#[tokio::test]
async fn test_singleLineOnlyProvider_shouldReachSimplifiedPrompt() {
    let provider = MockProvider::single_line_only();
    let engine = common::engine_with(Arc::new(provider), common::engine_settings(2, 1));

    let track = common::numbered_track(3);
    let outcome = engine.translate_text(&track).await.unwrap();

    assert_eq!(outcome.report.translated, 3);
    assert_eq!(outcome.report.single_line_fallbacks, 3);
    assert_eq!(outcome.report.splits, 1);
    let texts: Vec<String> = outcome.translated_cues().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["line 1", "line 2", "line 3"]);
}

#[tokio::test]
async fn test_emptyProvider_withAbandonPolicy_shouldNotRetry() {
    let provider = MockProvider::empty();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(3, 3));

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert_eq!(outcome.report.fallback, 3);
    assert_eq!(provider.request_count(), 8);
}

#[tokio::test]
async fn test_emptyProvider_withRetryPolicy_shouldSpendEveryAttempt() {
    let provider = MockProvider::empty();
    let mut settings = common::engine_settings(3, 3);
    settings.empty_response_policy = EmptyResponsePolicy::Retry;
    let engine = common::engine_with(Arc::new(provider.clone()), settings);

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert_eq!(outcome.report.fallback, 3);
    assert_eq!(provider.request_count(), 32);
}

#[tokio::test]
async fn test_intermittentProvider_shouldRecoverThroughRetries() {
    let provider = MockProvider::intermittent(2);
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(2, 3));

    let track = common::numbered_track(6);
    let outcome = engine.translate_text(&track).await.unwrap();

    assert_eq!(outcome.report.translated, 6);
    assert_eq!(outcome.report.splits, 0);
    assert!(outcome.report.attempts > outcome.report.batches as u32);
}

#[tokio::test]
async fn test_delimiterInsideCueText_shouldSwitchDelimiter() {
    let provider = MockProvider::echo();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(50, 0));

    let track = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nleft <---> right\n\n00:00:03.000 --> 00:00:04.000\nplain\n";
    let outcome = engine.translate_text(track).await.unwrap();

    assert_eq!(outcome.text, track);
    assert_eq!(outcome.report.translated, 2);
    assert_eq!(provider.request_count(), 1);
    assert!(!provider.prompts()[0].contains("separated by '<--->'"));
}

#[tokio::test]
async fn test_customProvider_shouldCleanNotesAndFences() {
    fn noisy(prompt: &str) -> Result<String, ProviderError> {
        let input = MockProvider::parse_prompt(prompt);
        let noted: Vec<String> = input
            .segments
            .iter()
            .map(|s| format!("{} (Note: literal translation)", s))
            .collect();
        Ok(format!("```text\n{}\n```", input.join(&noted)))
    }

    let provider = MockProvider::custom(noisy);
    let engine = common::engine_with(Arc::new(provider), common::engine_settings(50, 0));

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert_eq!(outcome.text, common::SAMPLE_TRACK);
    assert_eq!(outcome.report.translated, 3);
}

#[tokio::test]
async fn test_customProvider_withCrlfBlankLines_shouldSurviveReparse() {
    fn crlf_paragraphs(prompt: &str) -> Result<String, ProviderError> {
        let input = MockProvider::parse_prompt(prompt);
        let replies: Vec<String> = input
            .segments
            .iter()
            .map(|s| format!("{} first\r\n\r\nsecond part", s))
            .collect();
        Ok(input.join(&replies))
    }

    let provider = MockProvider::custom(crlf_paragraphs);
    let engine = common::engine_with(Arc::new(provider), common::engine_settings(50, 0));

    let outcome = engine.translate_text(&common::numbered_track(2)).await.unwrap();

    let reparsed: Vec<String> = cue_track::parse(&outcome.text)
        .unwrap()
        .into_iter()
        .map(|cue| cue.text)
        .collect();
    assert_eq!(reparsed, vec!["line 1 first\nsecond part", "line 2 first\nsecond part"]);
    assert_eq!(reparsed, outcome.translated_cues().into_iter().map(|c| c.text).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_echoProvider_withPunctuationOnlyCues_shouldKeepThemUnchanged() {
    let track = "WEBVTT

00:00:01.000 --> 00:00:02.000
...

00:00:02.000 --> 00:00:03.000
♪

00:00:03.000 --> 00:00:04.000
（笑）

00:00:04.000 --> 00:00:05.000
こんにちは
";
    let provider = MockProvider::echo();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(50, 0));

    let outcome = engine.translate_text(track).await.unwrap();

    assert_eq!(outcome.text, track);
    assert_eq!(provider.request_count(), 1);
    let texts: Vec<String> = outcome.translated_cues().into_iter().map(|c| c.text).collect();
    assert_eq!(texts, vec!["...", "♪", "（笑）", "こんにちは"]);
    assert!(outcome.cues.iter().all(|r| r.status == CueStatus::Translated));
}

#[tokio::test]
async fn test_concurrentBatches_shouldKeepInputOrder() {
    let provider = MockProvider::prefixed("> ");
    let mut settings = common::engine_settings(1, 0);
    settings.concurrent_batches = 4;
    let engine = common::engine_with(Arc::new(provider), settings);

    let track = common::numbered_track(9);
    let outcome = engine.translate_text(&track).await.unwrap();

    let texts: Vec<String> = outcome.translated_cues().into_iter().map(|c| c.text).collect();
    let expected: Vec<String> = (1..=9).map(|i| format!("> line {}", i)).collect();
    assert_eq!(texts, expected);
    assert_eq!(outcome.report.batches, 9);
}

#[tokio::test]
async fn test_concurrentBatches_withBatchDelay_shouldSpaceStarts() {
    let provider = MockProvider::echo();
    let mut settings = common::engine_settings(1, 0);
    settings.concurrent_batches = 4;
    settings.batch_delay_ms = 50;
    let engine = common::engine_with(Arc::new(provider.clone()), settings);

    let started = std::time::Instant::now();
    let outcome = engine.translate_text(&common::numbered_track(4)).await.unwrap();

    assert_eq!(outcome.report.translated, 4);
    assert_eq!(provider.request_count(), 4);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_progressCallback_shouldReachTotal() {
    let engine = common::engine_with(Arc::new(MockProvider::echo()), common::engine_settings(2, 0));
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let recorder = seen.clone();
    engine
        .translate_text_with_progress(&common::numbered_track(5), move |done, total| recorder.lock().push((done, total)))
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_emptyInput_shouldFailWithNoValidCues() {
    let engine = common::engine_with(Arc::new(MockProvider::echo()), common::engine_settings(50, 0));

    let result = engine.translate_text("WEBVTT\n\n").await;

    assert!(matches!(result, Err(TranslationError::Subtitle(SubtitleError::NoValidCues))));
}

#[tokio::test]
async fn test_missingPort_shouldBeServiceUnavailable() {
    let log = LogCapture::new();
    let engine = TranslationEngine::new(None, common::engine_settings(50, 0), 0.1, "Japanese", "English")
        .with_log_capture(log.clone());

    let result = engine.translate_text(common::SAMPLE_TRACK).await;

    assert!(matches!(result, Err(TranslationError::ServiceUnavailable)));
    assert_eq!(log.count(log::Level::Error), 1);
}

#[tokio::test]
async fn test_cancelledBeforeStart_shouldWriteSourceTextWithoutCalls() {
    let provider = MockProvider::echo();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(2, 3))
        .with_cancellation(cancel);

    let outcome = engine.translate_text(common::SAMPLE_TRACK).await.unwrap();

    assert!(outcome.report.cancelled);
    assert_eq!(outcome.report.fallback, 3);
    assert_eq!(outcome.text, common::SAMPLE_TRACK);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_cancelledDuringRun_shouldStillReturnEveryCue() {
    let provider = MockProvider::slow(100);
    let engine = common::engine_with(Arc::new(provider.clone()), common::engine_settings(1, 0));
    let cancel = engine.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
    });

    let track = common::numbered_track(5);
    let outcome = engine.translate_text(&track).await.unwrap();

    assert!(outcome.report.cancelled);
    assert_eq!(outcome.report.cues, 5);
    assert!(outcome.report.fallback >= 1);
    assert!(provider.request_count() < 5);
    assert_eq!(timestamps(&outcome.text), timestamps(&track));
}

#[tokio::test]
async fn test_logCapture_shouldRecordSplits() {
    let log = LogCapture::new();
    let engine = common::engine_with(Arc::new(MockProvider::drop_last_segment()), common::engine_settings(2, 0))
        .with_log_capture(log.clone());

    engine.translate_text(&common::numbered_track(2)).await.unwrap();

    assert!(log.entries().iter().any(|e| e.message.contains("splitting into 1 + 1 cues")));
    assert!(log.render().contains("[WARN]"));
}
