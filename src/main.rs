//! linux-process-exporter
//!
//! Polls the OS process table on each scrape and republishes per-process CPU
//! and memory usage as Prometheus metrics over HTTP, optionally protected by
//! basic authentication and/or served over TLS.

mod cli;
mod collector;
mod config;
mod handlers;
mod metrics;
mod state;
mod system;

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info};

use crate::cli::Args;
use crate::collector::ProcessCollector;
use crate::config::WebConfig;
use crate::handlers::auth::basic_auth_middleware;
use crate::handlers::metrics::metrics_handler;
use crate::metrics::ProcessMetrics;
use crate::state::AppState;

/// Initializes the tracing logging subsystem with the configured log level.
fn setup_logging(args: &Args) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level.as_tracing_level())
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }
}

/// Resolves to completion when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logging(&args);

    info!("Starting linux-process-exporter");

    // Any failure to read or parse the web configuration is fatal; there is
    // no fallback to defaults for an explicitly requested file.
    let web_config = match &args.web_config_file {
        Some(path) => match WebConfig::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded web configuration");
                config
            }
            Err(e) => {
                error!("Error loading web config file: {:#}", e);
                std::process::exit(1);
            }
        },
        None => WebConfig::default(),
    };

    let addr = match cli::parse_listen_address(&args.web_listen_address) {
        Ok(addr) => addr,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Explicit registry and collector wiring; no global registration
    let registry = Registry::new();
    let process_metrics = match ProcessMetrics::new(&registry) {
        Ok(metrics) => metrics,
        Err(e) => {
            error!("Error registering metrics: {:#}", e);
            std::process::exit(1);
        }
    };
    let process_collector = ProcessCollector::new("/proc");
    debug!("Prometheus registry and process collector initialized");

    let shared_state = Arc::new(AppState {
        registry,
        metrics: process_metrics,
        collector: process_collector,
    });

    let mut app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(shared_state);

    if web_config.basic_auth_enabled() {
        let users = Arc::new(web_config.basic_auth_users.clone());
        app = app.layer(middleware::from_fn_with_state(users, basic_auth_middleware));
        info!("Basic authentication enabled");
    }

    // A config file that only sets basic auth still serves plain HTTP with
    // auth applied; TLS requires both cert and key paths.
    if let Some((cert_file, key_file)) = web_config.tls_paths() {
        let tls_config = match RustlsConfig::from_pem_file(cert_file, key_file).await {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading TLS certificate or key: {}", e);
                std::process::exit(1);
            }
        };

        info!("Starting HTTPS server with TLS certificate on {}", addr);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(5)));
        });

        if let Err(e) = axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
        {
            error!("Server error: {}", e);
            std::process::exit(1);
        }
    } else {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Error binding listener on {}: {}", addr, e);
                std::process::exit(1);
            }
        };

        info!("Starting HTTP server on {}", addr);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            std::process::exit(1);
        }
    }

    info!("linux-process-exporter stopped gracefully");
}
