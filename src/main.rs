//! fingraph: financial knowledge graphs from free text, with grounded Q&A

use anyhow::Context;
use clap::{Parser, Subcommand};
use fingraph_core::{AllowedTypes, BindMode, FingraphConfig, ProviderKind};
use fingraph_gateway::start_server;
use fingraph_kg::{KnowledgePipeline, NOT_FOUND_ANSWER};
use fingraph_llm::{AnthropicProvider, LlmProvider, MockBehavior, MockProvider, OpenAiProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "fingraph",
    version,
    about = "Extract knowledge graphs from financial text and query them"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "fingraph.toml")]
    config: PathBuf,

    /// Also write logs to this file, rotated daily
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// lan | loopback
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Build a graph from text, print its triplets and cache it
    Generate {
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        file: Option<PathBuf>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Ask one question against the cached graph
    Query { question: String },
    /// Print the allowed entity types, predicates and metrics
    Types,
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref());

    let mut config = FingraphConfig::load(&cli.config);
    config.apply_env();

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        bind: None,
    }) {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = BindMode::parse(&bind);
            }
            let pipeline = KnowledgePipeline::from_config(&config, build_provider(&config));
            start_server(&config, pipeline).await?;
        }

        Commands::Generate { file, text } => {
            let text = match (file, text) {
                (Some(path), _) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, Some(text)) => text,
                (None, None) => anyhow::bail!("either --file or --text is required"),
            };
            let pipeline = KnowledgePipeline::from_config(&config, build_provider(&config));
            let record = pipeline.generate(&text).await?;
            info!(
                "Cached {} entities, {} measurements, {} facts to {}",
                record.kg.entities.len(),
                record.kg.measurements.len(),
                record.kg.facts.len(),
                config.storage.cache_path.display()
            );
            println!("{}", record.factual_triples);
        }

        Commands::Query { question } => {
            let pipeline = KnowledgePipeline::from_config(&config, build_provider(&config));
            let answer = pipeline.query(&question).await?;
            println!("{answer}");
        }

        Commands::Types => {
            let types = AllowedTypes::current();
            println!("{}", serde_json::to_string_pretty(&types)?);
        }

        Commands::Config => {
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}

/// stderr always; a daily-rolling file when `log_file` is given. The guard
/// must outlive the program so buffered lines are flushed.
fn init_logging(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "fingraph.log".into());
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fingraph=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// `None` when the selected provider has no API key. The pipeline then
/// reports a configuration error on model-backed operations.
fn build_provider(config: &FingraphConfig) -> Option<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.model.timeout_secs);
    let base_url = config.model.base_url.trim();

    match config.model.provider {
        ProviderKind::Mock => {
            info!("Using the offline mock provider");
            Some(Arc::new(offline_provider()))
        }
        ProviderKind::OpenAi => {
            let Some(key) = config.api_key() else {
                warn!("{} is not set; model client not initialized", config.model.api_key_env);
                return None;
            };
            let mut provider = OpenAiProvider::new(key).with_timeout(timeout);
            if !base_url.is_empty() {
                provider = provider.with_base_url(base_url);
            }
            Some(Arc::new(provider))
        }
        ProviderKind::Anthropic => {
            let key = config
                .api_key()
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()));
            let Some(key) = key else {
                warn!("No Anthropic API key set; model client not initialized");
                return None;
            };
            let mut provider = AnthropicProvider::new(key).with_timeout(timeout);
            if !base_url.is_empty() {
                provider = provider.with_base_url(base_url);
            }
            Some(Arc::new(provider))
        }
    }
}

/// Answers every stage without a network: an empty graph, no triplets,
/// and the not-found reply to every question.
fn offline_provider() -> MockProvider {
    MockProvider::constant(MockBehavior::handler(|req| {
        let system = req.system().unwrap_or_default();
        let reply = if system.contains("KNOWLEDGE GRAPH:") {
            String::new()
        } else if system.contains("FACTUAL TRIPLES:") {
            NOT_FOUND_ANSWER.to_string()
        } else {
            r#"{"entities": {}, "measurements": {}, "facts": []}"#.to_string()
        };
        Ok(reply)
    }))
}
