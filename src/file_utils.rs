use anyhow::{Result, Context};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @const: Prefix of every translated output file
pub const OUTPUT_PREFIX: &str = "transcript_translated_";

// @const: Extension of subtitle tracks handled by the application
pub const SUBTITLE_EXTENSION: &str = "vtt";

static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\d{1,2}:?\d{2}:\d{2}[.,]\d{3}\s+-->\s+\d{1,2}:?\d{2}:\d{2}[.,]\d{3}").unwrap()
});

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @returns: Input file name without "audio-" and without any extension
    pub fn clean_name<P: AsRef<Path>>(input_file: P) -> String {
        let file_name = input_file
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let cleaned = file_name.replace("audio-", "");
        match cleaned.split('.').next() {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => "unknown".to_string(),
        }
    }

    // @generates: Output path for a translated track
    // @params: input_file, output_dir, source_language, target_language (short codes)
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        source_language: &str,
        target_language: &str,
    ) -> PathBuf {
        let output_filename = format!(
            "{}{}_{}_{}.{}",
            OUTPUT_PREFIX,
            Self::clean_name(input_file),
            source_language,
            target_language,
            SUBTITLE_EXTENSION
        );

        output_dir.as_ref().join(output_filename)
    }

    // @returns: Log file path written next to an output file
    pub fn log_path_for<P: AsRef<Path>>(output_file: P) -> PathBuf {
        output_file.as_ref().with_extension("log")
    }

    // @checks: Whether a file was produced by a previous run
    pub fn is_translation_output<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(OUTPUT_PREFIX))
            .unwrap_or(false)
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(wanted) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Subtitle tracks below `dir` that still need translating
    pub fn find_subtitle_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        Ok(Self::find_files(dir, SUBTITLE_EXTENSION)?
            .into_iter()
            .filter(|path| !Self::is_translation_output(path))
            .collect())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        // Open file in append mode, create if it doesn't exist
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Detect whether a file looks like a subtitle track
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();
            if ext_str == SUBTITLE_EXTENSION || ext_str == "srt" {
                return Ok(FileType::Subtitle);
            }
        }

        // Fall back to examining file contents
        if let Ok(content) = fs::read_to_string(path) {
            if content.trim_start().starts_with(crate::cue_track::HEADER_MARKER) || TIMESTAMP_LINE.is_match(&content) {
                return Ok(FileType::Subtitle);
            }
        }

        Ok(FileType::Unknown)
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Subtitle track (WebVTT or SRT-like)
    Subtitle,
    /// Anything else
    Unknown,
}
