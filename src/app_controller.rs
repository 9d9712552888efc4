use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::{FileManager, FileType};
use crate::language_utils;
use crate::translation::{
    CancellationToken, LogCapture, LogEntry, TranslationEngine, TranslationPort, TranslationReport,
};

// @module: Application controller for subtitle translation

/// What happened to one input file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Translated track written to `path`
    Written { path: PathBuf, report: TranslationReport },
    /// Output already existed and overwriting was not requested
    Skipped { path: PathBuf },
}

impl FileOutcome {
    pub fn output_path(&self) -> &Path {
        match self {
            FileOutcome::Written { path, .. } | FileOutcome::Skipped { path } => path,
        }
    }
}

/// Totals of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Port used instead of the configured provider
    port_override: Option<Arc<dyn TranslationPort>>,

    // @field: Shared with the Ctrl-C handler
    cancel: CancellationToken,

    // @field: Draw progress bars on the terminal
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            port_override: None,
            cancel: CancellationToken::new(),
            show_progress: true,
        })
    }

    /// Use `port` instead of the provider named in the configuration
    pub fn with_port(mut self, port: Arc<dyn TranslationPort>) -> Self {
        self.port_override = Some(port);
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Disable terminal progress bars
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn build_engine(&self, log: LogCapture) -> Result<TranslationEngine> {
        let engine = match &self.port_override {
            Some(port) => TranslationEngine::new(
                Some(port.clone()),
                self.config.engine.clone(),
                self.config.translation.common.temperature,
                language_utils::resolve_language_name(&self.config.source_language)?,
                language_utils::resolve_language_name(&self.config.target_language)?,
            ),
            None => TranslationEngine::from_config(&self.config)?,
        };

        Ok(engine.with_cancellation(self.cancel.clone()).with_log_capture(log))
    }

    fn output_dir_for(&self, input_file: &Path, output_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = output_dir {
            return dir.to_path_buf();
        }
        if let Some(dir) = &self.config.output.directory {
            return PathBuf::from(dir);
        }
        input_file.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    /// Output path the given input would be written to
    pub fn output_path_for(&self, input_file: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
        let source_code = language_utils::resolve_language_code(&self.config.source_language)?;
        let target_code = language_utils::resolve_language_code(&self.config.target_language)?;
        Ok(FileManager::generate_output_path(
            input_file,
            self.output_dir_for(input_file, output_dir),
            &source_code,
            &target_code,
        ))
    }

    /// Translate a file, or every subtitle file below a directory
    pub async fn run(&self, input: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<FolderSummary> {
        if FileManager::dir_exists(&input) {
            return self.run_folder(input, output_dir, force_overwrite).await;
        }

        let outcome = self.run_file(input, output_dir, force_overwrite).await?;
        Ok(match outcome {
            FileOutcome::Written { .. } => FolderSummary { processed: 1, ..FolderSummary::default() },
            FileOutcome::Skipped { .. } => FolderSummary { skipped: 1, ..FolderSummary::default() },
        })
    }

    /// Translate one subtitle file and write the result
    pub async fn run_file(&self, input_file: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<FileOutcome> {
        let multi_progress = MultiProgress::new();
        self.run_file_with_progress(&input_file, output_dir.as_deref(), &multi_progress, force_overwrite).await
    }

    async fn run_file_with_progress(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<FileOutcome> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = self.output_path_for(input_file, output_dir)?;
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", input_file);
            return Ok(FileOutcome::Skipped { path: output_path });
        }

        if FileManager::detect_file_type(input_file)? != FileType::Subtitle {
            warn!("{:?} does not look like a subtitle file, trying anyway", input_file);
        }

        let content = FileManager::read_to_string(input_file)?;
        let log = if self.show_progress { LogCapture::quiet() } else { LogCapture::new() };
        let engine = self.build_engine(log.clone())?;

        let cue_count = crate::cue_track::parse(&content).map(|cues| cues.len()).unwrap_or(0);
        let progress_bar = if self.show_progress {
            multi_progress.add(ProgressBar::new(engine.batch_count(cue_count) as u64))
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(format!("{} -> {}", engine.source_language(), engine.target_language()));

        let bar = progress_bar.clone();
        let outcome = engine
            .translate_text_with_progress(&content, move |done, _total| bar.set_position(done as u64))
            .await
            .with_context(|| format!("Failed to translate {:?}", input_file))?;

        progress_bar.finish_and_clear();

        FileManager::write_to_file(&output_path, &outcome.text)?;
        info!("Translated track written to {:?}", output_path);
        info!("{}", outcome.report.summary().replace('\n', " | "));

        if outcome.report.cancelled {
            warn!("Translation was cancelled; untranslated cues keep their original text");
        }

        if self.config.output.write_log_file {
            let log_path = FileManager::log_path_for(&output_path);
            let context = format!(
                "{} -> {} ({}), duration {}",
                input_file.display(),
                output_path.display(),
                engine.target_language(),
                Self::format_duration(outcome.report.elapsed)
            );
            match Self::write_logs_to_file(&log.entries(), &log_path, &context) {
                Ok(()) => info!("Translation log written to {:?}", log_path),
                Err(e) => warn!("Failed to write translation log: {}", e),
            }
        }

        Ok(FileOutcome::Written {
            path: output_path,
            report: outcome.report,
        })
    }

    /// Translate every subtitle file below `input_dir`.
    ///
    /// Outputs of earlier runs are ignored, a failing file is logged and the
    /// run moves on.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let files = FileManager::find_subtitle_files(&input_dir)?;
        if files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = if self.show_progress {
            multi_progress.add(ProgressBar::new(files.len() as u64))
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(style.progress_chars("█▓▒░"));

        let mut summary = FolderSummary::default();

        for file in files.iter() {
            if self.cancel.is_cancelled() {
                warn!("Cancelled, {} file(s) left untouched", files.len() - (summary.processed + summary.skipped + summary.errors));
                break;
            }

            let file_name = file.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.run_file_with_progress(file, output_dir.as_deref(), &multi_progress, force_overwrite).await {
                Ok(FileOutcome::Written { .. }) => summary.processed += 1,
                Ok(FileOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.errors += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        let summary_message = format!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            summary.processed, summary.skipped, summary.errors
        );
        info!("{}", summary_message);

        if self.config.output.write_log_file {
            let log_file_path = input_dir.join("cuelingo.folder.log");
            let line = format!("{} - Duration: {}", summary_message, Self::format_duration(start_time.elapsed()));
            if let Err(e) = FileManager::append_to_log_file(&log_file_path, &line) {
                warn!("Failed to write folder log: {}", e);
            }
        }

        Ok(summary)
    }

    /// Format a duration for humans
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Write captured engine log entries with a header
    pub fn write_logs_to_file(logs: &[LogEntry], file_path: &Path, translation_context: &str) -> Result<()> {
        let mut log_content = String::new();

        log_content.push_str(&format!("Translation Log - {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        log_content.push_str(&format!("Context: {}\n\n", translation_context));

        for entry in logs {
            log_content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        FileManager::write_to_file(file_path, &log_content)
    }
}
