//! Ferret CLI — terminal interface for the Ferret research agent.
//!
//! Runs one query and exits, or starts an interactive loop that keeps the
//! conversation history across questions.

mod commands;
mod repl;

use clap::Parser;
use ferret_core::FerretConfig;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Ferret: ask a question, get an answer, a report, and a spoken summary
#[derive(Parser, Debug)]
#[command(name = "ferret", version, about, long_about = None)]
struct Cli {
    /// Query to answer (starts interactive mode if omitted)
    query: Option<String>,

    /// Workspace directory (its .ferret/config.toml is loaded)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Text generation provider: gemini, openai, mock
    #[arg(long)]
    llm: Option<String>,

    /// Search provider: serper, tavily, duckduckgo, mock
    #[arg(long)]
    search: Option<String>,

    /// Speech provider: gtts, openai, elevenlabs, mock, none
    #[arg(long)]
    speech: Option<String>,

    /// Directory for exported reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write the spoken answer (mp3) to this file
    #[arg(long)]
    audio_out: Option<PathBuf>,

    /// Print each response as JSON
    #[arg(long)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Stream a direct answer from the configured model, without research
    Chat {
        /// Prompt to send
        prompt: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply_overrides(&self, config: &mut FerretConfig) {
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(llm) = &self.llm {
            config.llm.provider = llm.clone();
        }
        if let Some(search) = &self.search {
            config.search.provider = search.clone();
        }
        if let Some(speech) = &self.speech {
            config.speech.provider = speech.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.report.output_dir = dir.clone();
        }
    }

    fn output_options(&self) -> repl::OutputOptions {
        repl::OutputOptions {
            audio_out: self.audio_out.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "ferret", "ferret")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ferret.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config = ferret_core::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    cli.apply_overrides(&mut config);

    let options = cli.output_options();
    if let Some(command) = cli.command {
        return commands::handle_command(command, &config, &workspace).await;
    }

    if let Some(query) = cli.query {
        repl::run_single_query(&query, &config, &options).await
    } else {
        repl::run_interactive(&config, &options).await
    }
}
