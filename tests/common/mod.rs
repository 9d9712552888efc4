/*!
 * Common test utilities for the cuelingo test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use cuelingo::app_config::{Config, EngineConfig};
use cuelingo::translation::{TranslationEngine, TranslationPort};

/// Three cue track used across the suite
pub const SAMPLE_TRACK: &str = "WEBVTT

00:00:01.000 --> 00:00:04.000
こんにちは

00:00:05.000 --> 00:00:09.000
元気ですか？

00:00:10.000 --> 00:00:14.000
<i>さようなら</i>
";

/// Route test output through env_logger, once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates the sample subtitle track in the specified directory
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_TRACK)
}

/// Track with `count` numbered cues, one second each
pub fn numbered_track(count: usize) -> String {
    let mut track = String::from("WEBVTT\n\n");
    for i in 0..count {
        track.push_str(&format!(
            "00:00:{:02}.000 --> 00:00:{:02}.500\nline {}\n\n",
            i % 60,
            i % 60,
            i + 1
        ));
    }
    track
}

/// Engine settings for tests: no delays, given chunk size and retries
pub fn engine_settings(chunk_size: usize, max_retries: u32) -> EngineConfig {
    EngineConfig {
        chunk_size,
        max_retries,
        ..EngineConfig::default().without_delays()
    }
}

/// Japanese to English engine around a test port
pub fn engine_with(port: Arc<dyn TranslationPort>, settings: EngineConfig) -> TranslationEngine {
    TranslationEngine::new(Some(port), settings, 0.1, "Japanese", "English")
}

/// Default configuration without delays
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.engine = config.engine.without_delays();
    config
}
