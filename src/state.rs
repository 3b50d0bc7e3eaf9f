//! # Application State Management
//!
//! This module manages state shared by all HTTP request handlers.
//!
//! ## What is shared:
//! - **Configuration**: read-only after startup, so a plain `Arc` is enough
//! - **Transcription relay**: read-only; its `reqwest::Client` pools connections internally
//! - **Metrics**: counters updated by every request, guarded by `Arc<RwLock<T>>`
//!
//! ## Arc<RwLock<T>> Pattern
//! - **Arc**: Multiple ownership (every worker thread holds a clone of `AppState`)
//! - **RwLock**: Multiple readers OR one writer
//! - **T**: The actual data type being protected
//!
//! Per-request data (decoded audio, multipart bodies) never lives here.

use crate::config::AppConfig;
use crate::transcription::TranscriptionRelay;
use std::collections::HashMap;       // For storing per-endpoint metrics
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;              // For tracking server uptime

/// The main application state that's shared across all HTTP request handlers.
///
/// ## Rust Concepts:
/// - **#[derive(Debug, Clone)]**: Cloning only bumps reference counts, the data is shared
/// - **Instant**: A point in time (for measuring uptime)
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration, fixed after startup
    pub config: Arc<AppConfig>,

    /// Relay to the upstream transcription API, built from `config`
    pub relay: Arc<TranscriptionRelay>,

    /// Request metrics, updated by the metrics middleware and the transcribe handler
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Metrics collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **request_count / error_count**: overall load and reliability
/// - **transcription_count**: clips successfully transcribed
/// - **upstream_error_count**: failures reported by the transcription API itself
/// - **endpoint_metrics**: per-endpoint statistics
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub transcription_count: u64,
    pub upstream_error_count: u64,
    pub audio_bytes_relayed: u64,

    /// Key: endpoint name (e.g., "POST /api/transcribe")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Performance metrics for a specific API endpoint.
///
/// ## Performance calculations:
/// - **Average response time**: total_duration_ms / request_count
/// - **Error rate**: error_count / request_count
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    /// Create a new AppState with the given configuration and relay.
    ///
    /// ## What this does:
    /// 1. Freezes the config behind an `Arc`
    /// 2. Creates empty metrics
    /// 3. Records the current time as the server start time
    pub fn new(config: AppConfig, relay: TranscriptionRelay) -> Self {
        Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Build the relay from the config, then the state.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let relay = TranscriptionRelay::new(&config)?;
        Ok(Self::new(config, relay))
    }

    /// Acquire the metrics for writing.
    ///
    /// ## Poisoning:
    /// A panic while holding the lock leaves counters that are still meaningful,
    /// so a poisoned lock is recovered instead of propagating the panic.
    fn metrics_mut(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(|e| e.into_inner())
    }

    fn metrics_ref(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        self.metrics_mut().request_count += 1;
    }

    /// Increment the total error counter (any 4xx or 5xx response).
    pub fn increment_error_count(&self) {
        self.metrics_mut().error_count += 1;
    }

    /// Record a completed transcription and the size of the clip it carried.
    pub fn record_transcription(&self, audio_bytes: usize) {
        let mut metrics = self.metrics_mut();
        metrics.transcription_count += 1;
        metrics.audio_bytes_relayed += audio_bytes as u64;
    }

    /// Record a failure reported by the transcription API.
    pub fn record_upstream_error(&self) {
        self.metrics_mut().upstream_error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// ## Parameters:
    /// - **endpoint**: The API endpoint (e.g., "GET /health", "POST /api/transcribe")
    /// - **duration_ms**: How long the request took to process
    /// - **is_error**: Whether this request resulted in an error
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_mut();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Get a snapshot of current metrics.
    ///
    /// ## Why a snapshot:
    /// Cloning releases the lock before the response is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_ref().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        ratio(self.error_count, self.request_count)
    }
}

impl EndpointMetric {
    /// Calculate the average response time for this endpoint.
    pub fn average_duration_ms(&self) -> f64 {
        ratio(self.total_duration_ms, self.request_count)
    }

    /// Calculate the error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        ratio(self.error_count, self.request_count)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}
