/*!
 * Integration tests for the controller file and folder workflow
 */

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use cuelingo::app_config::Config;
use cuelingo::app_controller::{Controller, FileOutcome, FolderSummary};
use cuelingo::providers::mock::MockProvider;
use cuelingo::translation::CancellationToken;
use crate::common;

fn controller_with(config: Config, provider: MockProvider) -> Result<Controller> {
    Ok(Controller::with_config(config)?
        .with_port(Arc::new(provider))
        .without_progress())
}

/// Test the controller initialization with default config
#[test]
fn test_controller_initialization_withDefaultConfig_shouldSucceed() {
    assert!(Controller::with_config(common::test_config()).is_ok());
}

#[test]
fn test_controller_withInvalidConfig_shouldFail() {
    let mut config = common::test_config();
    config.engine.chunk_size = 0;
    assert!(Controller::with_config(config).is_err());
}

#[tokio::test]
async fn test_runFile_shouldWriteTranslatedTrackNextToInput() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "audio-episode1.vtt")?;
    let controller = controller_with(common::test_config(), MockProvider::prefixed("EN: "))?;

    let outcome = controller.run_file(input.clone(), None, false).await?;

    let expected_path = temp_dir.path().join("transcript_translated_episode1_ja_en.vtt");
    assert_eq!(outcome.output_path(), expected_path.as_path());
    match &outcome {
        FileOutcome::Written { report, .. } => assert_eq!(report.translated, 3),
        other => panic!("unexpected outcome: {:?}", other),
    }

    let written = fs::read_to_string(&expected_path)?;
    assert!(written.starts_with("WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nEN: こんにちは\n"));
    assert!(written.ends_with("EN: <i>さようなら</i>\n"));

    // Input stays untouched
    assert_eq!(fs::read_to_string(&input)?, common::SAMPLE_TRACK);
    Ok(())
}

#[tokio::test]
async fn test_runFile_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "talk.vtt")?;
    let existing = common::create_test_file(temp_dir.path(), "transcript_translated_talk_ja_en.vtt", "old")?;
    let provider = MockProvider::echo();
    let controller = controller_with(common::test_config(), provider.clone())?;

    let skipped = controller.run_file(input.clone(), None, false).await?;
    assert!(matches!(skipped, FileOutcome::Skipped { .. }));
    assert_eq!(fs::read_to_string(&existing)?, "old");
    assert_eq!(provider.request_count(), 0);

    let forced = controller.run_file(input, None, true).await?;
    assert!(matches!(forced, FileOutcome::Written { .. }));
    assert_eq!(fs::read_to_string(&existing)?, common::SAMPLE_TRACK);
    Ok(())
}

#[tokio::test]
async fn test_runFile_withOutputDirAndLanguageNames_shouldUseShortCodes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "lesson.vtt")?;
    let out_dir = temp_dir.path().join("out");

    let mut config = common::test_config();
    config.source_language = "japanese".to_string();
    config.target_language = "fre".to_string();
    let controller = controller_with(config, MockProvider::echo())?;

    let outcome = controller.run_file(input, Some(out_dir.clone()), false).await?;

    assert_eq!(outcome.output_path(), out_dir.join("transcript_translated_lesson_ja_fr.vtt").as_path());
    assert!(out_dir.join("transcript_translated_lesson_ja_fr.vtt").is_file());
    Ok(())
}

#[tokio::test]
async fn test_runFile_withFailingProvider_shouldStillWriteSourceText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "rough.vtt")?;
    let mut config = common::test_config();
    config.engine.max_retries = 0;
    let controller = controller_with(config, MockProvider::failing())?;

    let outcome = controller.run_file(input, None, false).await?;

    match outcome {
        FileOutcome::Written { path, report } => {
            assert_eq!(report.fallback, 3);
            assert_eq!(fs::read_to_string(path)?, common::SAMPLE_TRACK);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_runFile_withLogFileEnabled_shouldWriteEngineLog() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "logged.vtt")?;
    let mut config = common::test_config();
    config.output.write_log_file = true;
    let controller = controller_with(config, MockProvider::echo())?;

    controller.run_file(input, None, false).await?;

    let log_path = temp_dir.path().join("transcript_translated_logged_ja_en.log");
    let content = fs::read_to_string(log_path)?;
    assert!(content.starts_with("Translation Log - "));
    assert!(content.contains("[INFO] Starting translation of 3 cues"));
    Ok(())
}

#[tokio::test]
async fn test_runFile_withoutCues_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "blank.vtt", "WEBVTT\n\n")?;
    let controller = controller_with(common::test_config(), MockProvider::echo())?;

    assert!(controller.run_file(input, None, false).await.is_err());
    assert!(!temp_dir.path().join("transcript_translated_blank_ja_en.vtt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withDirectory_shouldTranslateEveryTrackAndContinuePastErrors() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("tracks");
    fs::create_dir_all(input_dir.join("nested"))?;
    common::create_test_subtitle(&input_dir, "one.vtt")?;
    common::create_test_subtitle(&input_dir.join("nested"), "two.vtt")?;
    common::create_test_file(&input_dir, "broken.vtt", "nothing to see")?;
    common::create_test_subtitle(&input_dir, "transcript_translated_old_ja_en.vtt")?;
    let out_dir = temp_dir.path().join("out");

    let controller = controller_with(common::test_config(), MockProvider::echo())?;
    let summary = controller.run(input_dir, Some(out_dir.clone()), false).await?;

    assert_eq!(summary, FolderSummary { processed: 2, skipped: 0, errors: 1 });
    assert!(out_dir.join("transcript_translated_one_ja_en.vtt").is_file());
    assert!(out_dir.join("transcript_translated_two_ja_en.vtt").is_file());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_withoutTracks_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "readme.txt", "hi")?;
    let controller = controller_with(common::test_config(), MockProvider::echo())?;

    assert!(controller.run_folder(temp_dir.path().to_path_buf(), None, false).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_whenCancelled_shouldStopBeforeNextFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a.vtt")?;
    common::create_test_subtitle(temp_dir.path(), "b.vtt")?;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let controller = controller_with(common::test_config(), MockProvider::echo())?.with_cancellation(cancel);

    let summary = controller.run_folder(temp_dir.path().to_path_buf(), None, false).await?;

    assert_eq!(summary, FolderSummary::default());
    Ok(())
}

#[test]
fn test_format_duration_shouldPickUnits() {
    use std::time::Duration;
    assert_eq!(Controller::format_duration(Duration::from_millis(1500)), "1.500s");
    assert_eq!(Controller::format_duration(Duration::from_secs(125)), "2m 5s");
    assert_eq!(Controller::format_duration(Duration::from_secs(3725)), "1h 2m 5s");
}
