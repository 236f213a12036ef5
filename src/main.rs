use anyhow::{Context, Result};
use docrag::cli::init::{self, InitConfig, InitResult};
use docrag::cli::output::Output;
use docrag::cli::{Cli, Commands};
use docrag::utils::toml_config::{DocragConfig, LoggingConfig};
use docrag::RagManager;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    // init runs before any config exists
    let command = match cli.command {
        Commands::Init { path, force } => {
            return match init::run(InitConfig { path, force }, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!("init failed: {e}"),
            };
        }
        command => command,
    };

    let config = DocragConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging, cli.verbose);

    let manager = RagManager::from_config(&config)
        .await
        .context("Failed to open the document index")?;

    match command {
        Commands::Init { .. } => {}
        Commands::Ingest { path, no_recursive } => {
            let processed = if path.is_dir() {
                let cancel = CancellationToken::new();
                let on_signal = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        on_signal.cancel();
                    }
                });
                manager
                    .process_directory_with_cancel(&path, !no_recursive, cancel)
                    .await
                    .with_context(|| format!("Failed to ingest {}", path.display()))?
            } else {
                vec![manager
                    .process_document(&path)
                    .await
                    .with_context(|| format!("Failed to ingest {}", path.display()))?]
            };
            output.ingested(&processed);
        }
        Commands::Query {
            text,
            n_results,
            min_score,
            json,
        } => {
            let response = manager
                .query(
                    &text,
                    n_results.unwrap_or(config.rag.n_results),
                    min_score.unwrap_or(config.rag.min_relevance_score),
                )
                .await
                .context("Query failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                output.query_response(&response);
            }
        }
        Commands::Stats { json } => {
            let stats = manager.statistics().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                output.statistics(&stats);
            }
        }
        Commands::Delete { ids } => {
            let removed = manager.delete_chunks(&ids).await?;
            output.success(&format!("Removed {} of {} chunks", removed, ids.len()));
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level; `--verbose` raises the
/// configured level to debug. Logs go to stderr so JSON output stays clean.
fn init_tracing(config: &LoggingConfig, verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.level)
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
