// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use cuelingo::app_config::{self, Config, TranslationProvider};
use cuelingo::app_controller::Controller;
use cuelingo::translation::{CancellationToken, ProviderPort, TranslationPort};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
    Gemini,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
            CliTranslationProvider::Gemini => TranslationProvider::Gemini,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate WebVTT subtitle tracks (default command)
    Translate(TranslateArgs),

    /// Check that the configured provider answers
    Check {
        /// Translation provider to check instead of the configured one
        #[arg(short, long, value_enum)]
        provider: Option<CliTranslationProvider>,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: String,
    },

    /// Generate shell completions for cuelingo
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code or name (e.g., 'ja', 'jpn', 'japanese')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name (e.g., 'en', 'es', 'french')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Directory for translated tracks (default: next to each input)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Number of cues sent per request
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// cuelingo - resilient subtitle translation with language models
///
/// Translates WebVTT subtitle tracks in batches, recovering from
/// misbehaving model replies without ever losing or reordering a cue.
#[derive(Parser, Debug)]
#[command(name = "cuelingo")]
#[command(version)]
#[command(about = "Resilient chunked WebVTT subtitle translation")]
#[command(long_about = "cuelingo translates WebVTT subtitle tracks with language model providers.

Cues are sent in batches. When a reply has the wrong number of segments the
batch is retried, split in halves and finally translated line by line; a cue
that still cannot be translated keeps its original text. The output always
has the same cues, in the same order, with the same timestamps.

EXAMPLES:
    cuelingo audio-episode1.vtt                   # Translate using default config
    cuelingo -f episode1.vtt                      # Force overwrite existing files
    cuelingo -p gemini -m gemini-2.5-flash ep.vtt # Use specific provider and model
    cuelingo -s ja -t fr episode1.vtt             # Translate from Japanese to French
    cuelingo -o out/ /subtitles/                  # Process a directory into out/
    cuelingo check -p ollama                      # Check that the provider answers
    cuelingo completions bash > cuelingo.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires OPENAI_API_KEY or api_key)
    anthropic - Anthropic API (requires ANTHROPIC_API_KEY or api_key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)
    gemini    - Google Gemini API (requires GEMINI_API_KEY or api_key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code or name (e.g., 'ja', 'jpn', 'japanese')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code or name (e.g., 'en', 'es', 'french')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Directory for translated tracks (default: next to each input)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Number of cues sent per request
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger accepts everything, `log::set_max_level` does the filtering
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌",
            Level::Warn => "🚧",
            Level::Info => "✅",
            Level::Debug => "🔍",
            Level::Trace => "📋",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cuelingo", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Check { provider, config_path }) => run_check(provider, &config_path).await,
        None => {
            // Default behavior - top-level args translate directly
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

            run_translate(TranslateArgs {
                input_path,
                force_overwrite: cli.force_overwrite,
                provider: cli.provider,
                model: cli.model,
                source_language: cli.source_language,
                target_language: cli.target_language,
                output_dir: cli.output_dir,
                chunk_size: cli.chunk_size,
                config_path: cli.config_path,
                log_level: cli.log_level,
            })
            .await
        }
    }
}

/// Load the configuration file, creating a default one when it is missing
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?;
        return Ok(config);
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();

    let config_json = serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
    std::fs::write(config_path, config_json).context(format!("Failed to write default config to file: {}", config_path))?;

    Ok(config)
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &options.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }

    if let Some(chunk_size) = options.chunk_size {
        config.engine.chunk_size = chunk_size;
    }

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_log_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(config_log_level.to_level_filter());
    }

    let mut config = load_config(&options.config_path)?;
    apply_overrides(&mut config, &options);

    config.validate().context("Configuration validation failed")?;

    // Just update the max level without reinitializing the logger
    log::set_max_level(config.log_level.to_level_filter());

    if !options.input_path.exists() {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with original text for unresolved cues");
            ctrl_c_token.cancel();
        }
    });

    let controller = Controller::with_config(config)?.with_cancellation(cancel);
    let summary = controller
        .run(options.input_path.clone(), options.output_dir.clone(), options.force_overwrite)
        .await?;

    info!(
        "Done: {} translated, {} skipped, {} failed",
        summary.processed, summary.skipped, summary.errors
    );

    if summary.errors > 0 && summary.processed == 0 {
        return Err(anyhow!("No file could be translated"));
    }

    Ok(())
}

async fn run_check(provider: Option<CliTranslationProvider>, config_path: &str) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(provider) = provider {
        config.translation.provider = provider.into();
    }

    let port = ProviderPort::from_config(&config.translation)?
        .ok_or_else(|| anyhow!("No API key configured for {}", config.translation.provider.display_name()))?;

    info!("Checking {} at {}", port.name(), config.translation.get_endpoint());
    port.test_connection()
        .await
        .with_context(|| format!("{} is not reachable", port.name()))?;
    info!("{} is available", port.name());

    Ok(())
}
