/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::Path;
use anyhow::Result;
use cuelingo::file_utils::{FileManager, FileType};
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));

    Ok(())
}

#[test]
fn test_clean_name_shouldStripAudioPrefixAndExtensions() {
    assert_eq!(FileManager::clean_name("/data/audio-episode1.vtt"), "episode1");
    assert_eq!(FileManager::clean_name("talk.en.vtt"), "talk");
    assert_eq!(FileManager::clean_name(".vtt"), "unknown");
}

/// Test that generate_output_path creates the correct path
#[test]
fn test_generate_output_path_withValidInputs_shouldCreateCorrectPath() {
    let input_file = Path::new("/tmp/input/audio-lecture.vtt");
    let output_dir = Path::new("/tmp/output");

    let output_path = FileManager::generate_output_path(input_file, output_dir, "ja", "en");

    assert_eq!(output_path, Path::new("/tmp/output/transcript_translated_lecture_ja_en.vtt"));
    assert!(FileManager::is_translation_output(&output_path));
    assert_eq!(
        FileManager::log_path_for(&output_path),
        Path::new("/tmp/output/transcript_translated_lecture_ja_en.log")
    );
}

#[test]
fn test_find_subtitle_files_shouldSkipPreviousOutputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("season1");
    fs::create_dir_all(&nested)?;

    common::create_test_subtitle(temp_dir.path(), "b.vtt")?;
    common::create_test_subtitle(&nested, "a.VTT")?;
    common::create_test_subtitle(temp_dir.path(), "transcript_translated_b_ja_en.vtt")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "not a track")?;

    let files = FileManager::find_subtitle_files(temp_dir.path())?;
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(names.len(), 2);
    assert!(names.contains(&"b.vtt".to_string()));
    assert!(names.contains(&"a.VTT".to_string()));

    Ok(())
}

#[test]
fn test_write_to_file_shouldCreateParentDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("deep").join("er").join("out.vtt");

    FileManager::write_to_file(&target, "WEBVTT\n")?;

    assert_eq!(FileManager::read_to_string(&target)?, "WEBVTT\n");
    Ok(())
}

#[test]
fn test_append_to_log_file_shouldAppendTimestampedLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log_path = temp_dir.path().join("run.log");

    FileManager::append_to_log_file(&log_path, "first")?;
    FileManager::append_to_log_file(&log_path, "second")?;

    let content = fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
    assert!(lines[1].ends_with("] second"));

    Ok(())
}

#[test]
fn test_detect_file_type_shouldLookAtExtensionThenContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let by_extension = common::create_test_file(temp_dir.path(), "x.vtt", "")?;
    let by_content = common::create_test_subtitle(temp_dir.path(), "track.txt")?;
    let other = common::create_test_file(temp_dir.path(), "readme.md", "# hello")?;

    assert_eq!(FileManager::detect_file_type(&by_extension)?, FileType::Subtitle);
    assert_eq!(FileManager::detect_file_type(&by_content)?, FileType::Subtitle);
    assert_eq!(FileManager::detect_file_type(&other)?, FileType::Unknown);
    assert!(FileManager::detect_file_type(temp_dir.path().join("missing.vtt")).is_err());

    Ok(())
}
