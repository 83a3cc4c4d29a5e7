use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glyphgate::config::GlyphgateConfig;
use glyphgate::http::{AppState, HttpServer};
use glyphgate::ocr::{BatchRecognizer, TesseractCli};
use glyphgate::ratelimit::{spawn_sweeper, RateLimiter};

#[derive(Parser)]
#[command(name = "glyphgate", version, about = "Contact intake and OCR tooling")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP contact service
    Serve {
        /// Address to listen on, overriding the configuration
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Recognize text in images and print it
    Ocr {
        /// Tesseract language code, e.g. `eng` or `eng+deu`
        #[arg(long, short)]
        language: Option<String>,

        /// Images to recognize, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("glyphgate=info,tower_http=info"));
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    let config = GlyphgateConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Ocr { language, images } => ocr(config, language, images).await,
    }
}

async fn serve(mut config: GlyphgateConfig, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    if let Some(addr) = bind {
        config.server.http_addr = addr;
    }

    info!("Starting Glyphgate contact service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        http_addr = %config.server.http_addr,
        max_requests = config.rate_limiting.max_requests,
        window_ms = config.rate_limiting.window_ms,
        "Configuration loaded"
    );

    // One limiter per process, shared by every handler
    let rate_limiter = Arc::new(RateLimiter::new());
    let sweeper = spawn_sweeper(rate_limiter.clone(), config.rate_limiting.sweep_interval());
    info!("Rate limiter initialized");

    let state = AppState::from_config(&config, rate_limiter);
    let server = HttpServer::new(config.server.http_addr, state);

    let result = server.serve_with_shutdown(shutdown_signal()).await;
    sweeper.shutdown().await;
    result?;

    info!("Glyphgate contact service stopped");
    Ok(())
}

async fn ocr(
    config: GlyphgateConfig,
    language: Option<String>,
    images: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let language = language.unwrap_or(config.ocr.default_language);
    let mut batch = BatchRecognizer::new(TesseractCli::new(config.ocr.tesseract_path));

    let text = batch
        .recognize_batch(&images, &language, |index, total, progress| {
            info!(
                image = index + 1,
                total = total,
                status = %progress.status,
                progress = progress.progress,
                "OCR progress"
            );
        })
        .await;
    batch.terminate().await?;

    println!("{}", text?);
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
