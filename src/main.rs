//! # Transcribe Relay - Main Application Entry Point
//!
//! This is the main entry point for the transcribe-relay web server.
//! It accepts recorded audio from browsers and relays it to a speech-to-text API:
//!
//! ```text
//! POST /api/transcribe → decode payload → encode multipart → POST upstream → { text }
//! ```
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: Each request suspends once, while waiting for the upstream API
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Arc**: Configuration and the relay are shared read-only between workers
//!
//! ## Application Architecture:
//! - **config**: Handles application configuration (TOML files + environment variables)
//! - **audio**: Decodes and validates inbound audio payloads
//! - **multipart**: Builds the multipart/form-data body sent upstream
//! - **transcription**: Relays encoded audio to the transcription API
//! - **state**: Shared application state and metrics
//! - **health**: Health and metrics endpoints
//! - **middleware**: Request logging, metrics, CORS
//! - **handlers**: HTTP request handlers and the routing table
//! - **error**: Custom error types and HTTP error responses

// Module declarations - These tell Rust about our other source files
mod audio;          // Payload decoding (audio/ directory)
mod config;         // Configuration management (config.rs)
mod error;          // Error handling types (error.rs)
mod handlers;       // HTTP request handlers (handlers/ directory)
mod health;         // Health check endpoints (health.rs)
mod middleware;     // Custom middleware (middleware/ directory)
mod multipart;      // Multipart body encoding (multipart.rs)
mod state;          // Application state management (state.rs)
mod transcription;  // Upstream relay (transcription/ directory)

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::AppState;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Builds the transcription relay** from that configuration
/// 4. **Configures the HTTP server** with middleware and routes
/// 5. **Handles graceful shutdown** when receiving system signals
///
/// ## Error Handling:
/// If any step fails (config loading, server binding, etc.), the function returns an error
/// and the program exits with an error message.
#[actix_web::main]
async fn main() -> Result<()> {
    // .ok() means "ignore errors" - it's fine if there's no .env file
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting transcribe-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    info!(
        endpoint = %config.upstream.endpoint,
        model = %config.upstream.model,
        language = %config.upstream.language,
        "Upstream transcription API"
    );
    if config.upstream.api_key.is_none() {
        // Not fatal: health checks still work, transcriptions answer 500
        warn!("OPENAI_API_KEY is not set; transcription requests will fail");
    }

    // The relay is built here, once, with the API key injected from config
    let app_state = AppState::from_config(config.clone())?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let shutdown = shutdown_signal();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Middleware executes in reverse order of registration for requests
            .wrap(middleware::cors_policy(&app_state.config.server))
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Wait for either the server to finish OR a shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown(shutdown) => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "transcribe_relay=debug")
/// - If not set, defaults to "transcribe_relay=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcribe_relay=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Listen for SIGTERM/SIGINT in a background task.
///
/// ## Why a watch channel:
/// The receiver wakes as soon as the flag flips, so no polling loop is needed.
/// If a signal handler cannot be installed, the error is logged and that
/// signal is simply never observed.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = tx.send(true);
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            // Sender dropped without signalling; never shut down on our own
            std::future::pending::<()>().await;
        }
    }
}
