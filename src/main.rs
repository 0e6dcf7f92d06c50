// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use chunkwise::app_config::Config;
use chunkwise::jobs::{JobState, short_id, wait_until_finished};
use chunkwise::pipeline::{Pipeline, TranslateRequest, TranslateResponse};

/// Interval between two polls of a background job
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a text (read from stdin when TEXT is omitted)
    Translate(TranslateArgs),

    /// Generate shell completions for chunkwise
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Text to translate
    #[arg(value_name = "TEXT")]
    text: Option<String>,

    /// Source language code (e.g., 'en', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'de', 'es')
    #[arg(short, long)]
    target_language: Option<String>,

    /// CEFR level (A1, A2, B1, B2); required for German
    #[arg(short, long)]
    level: Option<String>,

    /// Owner of the stored translation
    #[arg(short, long, default_value_t = 0)]
    user_id: i64,

    /// Run as a background job regardless of length
    #[arg(short = 'a', long = "async")]
    force_async: bool,

    /// Longest wait for a background job, in seconds
    #[arg(long, default_value_t = 600)]
    job_timeout: u64,

    /// JSON configuration file; replaces flag and environment settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    settings: Config,
}

/// Chunkwise - chunked, cache-layered text translation
#[derive(Parser, Debug)]
#[command(name = "chunkwise")]
#[command(version)]
#[command(about = "Cache-layered text translation over LLM chat-completion APIs")]
#[command(long_about = "Chunkwise splits texts into sentence-aligned chunks, translates them through an
OpenRouter-compatible chat-completion API and keeps the results in a two-tier cache
and a local SQLite store.

EXAMPLES:
    chunkwise translate -t fr \"Hello world.\"         # English to French
    chunkwise translate -t de -l A1 \"Hello world.\"   # German at level A1
    cat book.txt | chunkwise translate -t es          # Read the text from stdin
    chunkwise translate --async -t it \"Ciao.\"         # Force a background job
    chunkwise completions bash > chunkwise.bash       # Generate bash completions

CONFIGURATION:
    Every setting has an environment variable (OPENROUTER_API_KEY, CACHE_URL,
    PARALLEL_CHUNK_LIMIT, ...) and a matching flag. With --config, settings are
    read from a JSON file instead.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
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
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
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
    // Initialize the logger once; the effective level is lowered to info
    // here and updated after loading the config
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "chunkwise", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_file(path)?,
        None => args.settings.clone(),
    };

    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    if config.api_key.is_empty() {
        warn!("No upstream API key configured; requests will likely be rejected");
    }

    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            buffer
        }
    };

    let pipeline = Pipeline::from_config(&config)?;

    let request = TranslateRequest {
        user_id: args.user_id,
        input_text: text,
        source_lang: args.source_language,
        target_lang: args.target_language,
        level: args.level,
        force_async: args.force_async,
    };

    let response = pipeline.dispatcher().handle(request).await;
    let response = if response.status == 202 {
        await_job(&pipeline, response, Duration::from_secs(args.job_timeout)).await?
    } else {
        response
    };

    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if response.status >= 400 {
        return Err(anyhow!("Translation failed with status {}", response.status));
    }

    Ok(())
}

/// Background jobs live in this process, so the CLI waits for them
async fn await_job(pipeline: &Pipeline, queued: TranslateResponse, timeout: Duration) -> Result<TranslateResponse> {
    let job_id = queued.body["task_id"]
        .as_str()
        .ok_or_else(|| anyhow!("Queued response carries no task id"))?
        .to_string();

    info!("Translation queued as job {}", short_id(&job_id));

    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("Translating in background");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let status = wait_until_finished(pipeline.queue().as_ref(), &job_id, JOB_POLL_INTERVAL, timeout)
        .await
        .ok_or_else(|| anyhow!("Job {} disappeared from the queue", job_id))?;

    let response = match status.state {
        JobState::Success => {
            spinner.finish_with_message("Translation complete");
            TranslateResponse {
                status: 200,
                body: serde_json::json!({ "translation": status.result.unwrap_or_default() }),
            }
        }
        JobState::Failure => {
            spinner.finish_with_message("Translation failed");
            TranslateResponse {
                status: 500,
                body: serde_json::json!({ "error": status.error.unwrap_or_default() }),
            }
        }
        JobState::Queued | JobState::Started => {
            spinner.abandon_with_message("Timed out waiting for the job");
            TranslateResponse {
                status: 504,
                body: serde_json::to_value(&status)?,
            }
        }
    };

    Ok(response)
}
