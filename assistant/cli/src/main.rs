//! Claims Chat - Terminal Client for the Claims Assistant
//!
//! Streams answers from the claims assistant backend, showing the agent's
//! pipeline stages as they run and the answer as it is written.
//!
//! # Usage
//!
//! ```bash
//! # One question, streamed
//! claims-chat ask "What is the deductible for in-network services?"
//!
//! # Interactive chat
//! claims-chat chat
//!
//! # Another backend
//! claims-chat --url https://claims.example.com chat
//!
//! # Backend endpoints
//! claims-chat health
//! claims-chat upload claims.csv
//!
//! # Verbose logging
//! RUST_LOG=debug claims-chat ask "Top diagnosis codes?"
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): Cancel the answer in progress; leave the chat when idle

mod render;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use claims_chat_core::{
    load_config_from_path, ChatBackend, ChatController, ChatMessage, ChatRequest, ClientConfig,
    ConfigOverrides, ControllerConfig, ConversationId, HttpBackend, SessionOutcome, UploadKind,
};

use render::{render_message, Output, UpdateRenderer};
use repl::{emit, pump, run_chat, spawn_interrupt_handler};

/// Fallback wrap width when `COLUMNS` is unset
const DEFAULT_WIDTH: usize = 100;

/// Claims Chat - streaming terminal client for the claims assistant
#[derive(Parser, Debug)]
#[command(name = "claims-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (overrides config file and environment)
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "CLAIMS_ASSISTANT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed the chat with the demo conversation
    #[arg(long, global = true)]
    demo_history: bool,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask one question and stream the answer
    Ask {
        /// The question
        query: String,

        /// Wait for the complete answer instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
    /// Interactive chat
    Chat,
    /// Show backend health
    Health,
    /// Show backend configuration
    Config,
    /// Show the claims database schema
    Schema,
    /// List loaded datasets
    Datasets,
    /// List indexed documents
    Documents,
    /// Show a stored conversation
    History {
        /// Conversation identifier
        id: String,
    },
    /// Upload a claims CSV or plan document PDF
    Upload {
        /// File to upload (.csv or .pdf)
        path: PathBuf,
    },
}

/// Initialize logging to stderr
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("claims_chat={level},claims_chat_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration: file, then environment, then flags
fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let path = args
        .config
        .clone()
        .or_else(claims_chat_core::default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = &args.url {
        overrides = overrides.with_base_url(url.clone());
    }
    if args.demo_history {
        overrides = overrides.with_seed_demo_history(true);
    }
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        base_url = %config.base_url,
        source = %config.source(),
        "Configuration resolved"
    );
    Ok(config)
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&w| w >= 20)
        .unwrap_or(DEFAULT_WIDTH)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = resolve_config(&args)?;
    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let width = terminal_width();

    match args.command {
        Command::Ask { query, no_stream } => {
            if no_stream {
                ask_once(&backend, query, width).await
            } else {
                ask(backend, &config, query, width).await
            }
        }
        Command::Chat => chat(backend, &config, width).await,
        Command::Health => print_json(&backend.health().await?).await,
        Command::Config => print_json(&backend.config().await?).await,
        Command::Schema => print_json(&backend.schema().await?).await,
        Command::Datasets => print_json(&backend.datasets().await?).await,
        Command::Documents => print_json(&backend.documents().await?).await,
        Command::History { id } => {
            let history = backend.history(&ConversationId(id)).await?;
            let outputs = history
                .messages
                .iter()
                .map(|message| Output::Stdout(render_message(message, width)))
                .collect();
            emit(outputs).await
        }
        Command::Upload { path } => {
            let kind = UploadKind::from_path(&path)
                .with_context(|| format!("{} is not a .csv or .pdf file", path.display()))?;
            let response = backend.upload(&path, kind).await?;
            print_json(&response).await
        }
    }
}

/// Stream one answer; Ctrl-C cancels it
async fn ask(backend: HttpBackend, config: &ClientConfig, query: String, width: usize) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(config.update_buffer);
    let mut controller = ChatController::new(backend, ControllerConfig::from(config), tx);
    let _quit = spawn_interrupt_handler(controller.canceller());
    let mut renderer = UpdateRenderer::new(width);

    let outcome = pump(controller.submit(query), &mut rx, &mut renderer).await??;
    debug!(?outcome, "Answer finished");

    match outcome {
        SessionOutcome::Failed { message } => anyhow::bail!(message),
        SessionOutcome::Finalized { .. } | SessionOutcome::Cancelled => Ok(()),
    }
}

/// Fetch one complete answer without streaming
async fn ask_once(backend: &HttpBackend, query: String, width: usize) -> Result<()> {
    let request = ChatRequest::new(query, ConversationId::new());
    let response = backend.send(&request).await?;
    emit(vec![Output::Stdout(render_message(
        &ChatMessage::from_response(response),
        width,
    ))])
    .await
}

async fn chat(backend: HttpBackend, config: &ClientConfig, width: usize) -> Result<()> {
    if !backend.health_check().await {
        warn!(url = %backend.base_url(), "Backend health check failed");
        emit(vec![Output::Stderr(format!(
            "warning: {} is not responding; questions will fail until it is up\n",
            backend.base_url()
        ))])
        .await?;
    }

    let (tx, mut rx) = mpsc::channel(config.update_buffer);
    let mut controller = ChatController::new(backend, ControllerConfig::from(config), tx);
    run_chat(&mut controller, &mut rx, width).await
}

async fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    emit(vec![Output::Stdout(format!("{text}\n"))]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let args = Args::try_parse_from(["claims-chat", "ask", "What is covered?"]).unwrap();
        match args.command {
            Command::Ask { query, no_stream } => {
                assert_eq!(query, "What is covered?");
                assert!(!no_stream);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "claims-chat",
            "chat",
            "--url",
            "http://10.0.0.5:8000",
            "--demo-history",
        ])
        .unwrap();
        assert_eq!(args.url.as_deref(), Some("http://10.0.0.5:8000"));
        assert!(args.demo_history);
        assert!(matches!(args.command, Command::Chat));
    }

    #[test]
    fn test_upload_requires_path() {
        assert!(Args::try_parse_from(["claims-chat", "upload"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
