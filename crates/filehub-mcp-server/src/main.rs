//! MCP server for filehub.
//!
//! This server:
//! - Loads the storage table (JSON file or built-in defaults)
//! - Builds one adapter per enabled storage (local, NAS, WebDAV, Android)
//! - Serves list_storages, search_files, read_file and list_files over
//!   MCP Streamable HTTP at /mcp

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use filehub_search::{DefaultDriverFactory, FileHubMcp, StorageRegistry};
use filehub_storage_backends::{
    AdbOptions, CommandRunner, MountOptions, ProcessRunner, TesseractExtractor,
};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod handlers;

use config::Config;
use handlers::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    info!("Starting filehub-mcp-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Host: {}", config.host);
    info!("  Port: {}", config.port);
    info!("  OCR languages: {}", config.ocr_languages);
    info!(
        "  Search: depth {}, {}",
        config.search_depth,
        if config.sequential_search {
            "sequential"
        } else {
            "parallel"
        }
    );

    let storages = config.load_storages()?;
    match &config.storages {
        Some(path) => info!("  Storage table: {}", path.display()),
        None => info!("  Storage table: built-in"),
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let factory = DefaultDriverFactory::new(
        runner.clone(),
        MountOptions {
            mount_base: config.mount_base.clone(),
            use_sudo: config.mount_with_sudo,
        },
        AdbOptions {
            binary: config.adb_bin.clone(),
            serial: config.adb_serial.clone(),
        },
        Duration::from_secs(config.http_timeout_secs),
    );
    let ocr = Arc::new(TesseractExtractor::new(runner, config.tesseract_bin.clone()));
    let registry = Arc::new(StorageRegistry::new(
        storages,
        &factory,
        ocr,
        &config.ocr_languages,
    ));

    for storage in registry.descriptors() {
        info!(
            "  [{}] {} ({}) {}",
            if storage.enabled { "on" } else { "off" },
            storage.id,
            storage.kind,
            storage.path
        );
    }
    if registry.adapters().is_empty() {
        error!("No enabled storages configured; every search will be empty");
    }

    let mcp = FileHubMcp::new(registry, !config.sequential_search, config.search_depth);
    let names: Vec<_> = mcp.tools().into_iter().map(|t| t.name.to_string()).collect();
    info!("  Tools: {}", names.join(", "));

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(AppState { mcp })
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Bind and serve
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{} (MCP endpoint: /mcp)", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
