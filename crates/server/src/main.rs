//! Folio Server
//!
//! Serves LinuxFr.org articles and their comments as EPUB books. A request
//! for `/news/<slug>.epub` fetches `/news/<slug>` from the configured host
//! and answers with the packaged document.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use folio_core::Converter;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;

const DEFAULT_FILTER: &str = "folio_server=info,folio_core=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "folio-server")]
#[command(version)]
#[command(about = "Serve LinuxFr.org articles as EPUB books", long_about = None)]
struct Args {
    /// Bind to this address:port
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    addr: String,

    /// Append logs to this file ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    logs: String,

    /// Fetch pages from this host
    #[arg(short = 'H', long, default_value = "linuxfr.org")]
    host: String,

    /// Scheme used to reach the host
    #[arg(long, default_value = "https")]
    scheme: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.logs)?;

    let converter = Converter::builder()
        .host(&args.host)
        .scheme(&args.scheme)
        .build()
        .context("Failed to build HTTP client")?;
    let app = routes::router(converter);

    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, host = %args.host, "listening on http://{}/", args.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_tracing(logs: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if logs == "-" {
        subscriber.init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs)
            .with_context(|| format!("Failed to open log file {}", logs))?;
        subscriber.with_writer(Mutex::new(file)).with_ansi(false).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
