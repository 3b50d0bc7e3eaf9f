//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **Option<T>**: A value that may be missing (the API key is optional until a request needs it)
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special environment variables (HOST, PORT, OPENAI_API_KEY)
//! 2. Environment variables (APP_SERVER__PORT, APP_AUDIO__MAX_BYTES, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;              // Better error handling with context
use serde::{Deserialize, Serialize};  // For converting to/from TOML, JSON, etc.
use std::env;                    // For reading environment variables

/// One mebibyte, used for the size defaults below.
const MIB: usize = 1024 * 1024;

/// Main application configuration that contains all settings.
///
/// ## Rust Concepts:
/// - **#[derive(...)]**: Automatically implements common traits:
///   - `Debug`: Allows printing with {:?} for debugging
///   - `Clone`: Allows making copies of the struct
///   - `Serialize`: Can convert this struct to JSON, TOML, etc.
///   - `Deserialize`: Can create this struct from JSON, TOML, etc.
///
/// ## Sections:
/// - `server`: where to listen and how large a request may be
/// - `audio`: plausibility limits for inbound audio clips
/// - `upstream`: the transcription API the relay forwards to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub upstream: UpstreamConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to (e.g., "127.0.0.1", "0.0.0.0")
/// - `port`: TCP port number to listen on
/// - `environment`: "development" exposes internal error details in responses, anything else hides them
/// - `max_request_bytes`: upper bound for a JSON request body (base64 inflates audio by 4/3)
/// - `cors_max_age_secs`: how long browsers may cache a CORS preflight answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub max_request_bytes: usize,
    pub cors_max_age_secs: usize,
}

/// Limits applied to every decoded audio clip.
///
/// ## Fields:
/// - `min_bytes`: anything smaller is not a plausible recording
/// - `max_bytes`: the upstream API refuses files above 25 MiB
/// - `default_mime_type`: used when the client does not declare one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub min_bytes: usize,
    pub max_bytes: usize,
    pub default_mime_type: String,
}

/// Settings for the upstream transcription API.
///
/// ## Fields:
/// - `endpoint`: full URL of the transcription endpoint
/// - `api_key`: bearer token; `None` means every transcription fails with a configuration error
/// - `model`: value of the `model` form field
/// - `language`: value of the `language` form field
/// - `timeout_secs`: bound on one upstream round trip
///
/// ## Security note:
/// `api_key` is skipped when serializing, so it never shows up in a dumped config.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub language: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration file exists.
/// They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),  // Localhost only (safe for development)
                port: 8080,
                environment: "production".to_string(),
                max_request_bytes: 40 * MIB,    // 25 MiB of audio is ~33.4 MiB of base64
                cors_max_age_secs: 3600,
            },
            audio: AudioConfig {
                min_bytes: 100,
                max_bytes: 25 * MIB,
                default_mime_type: "audio/webm".to_string(),
            },
            upstream: UpstreamConfig {
                endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                api_key: None,
                model: "whisper-1".to_string(),
                language: "en".to_string(),
                timeout_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST, PORT and OPENAI_API_KEY
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP_AUDIO__MAX_BYTES=10485760`: Lower the size limit to 10 MiB
    /// - `APP_UPSTREAM__MODEL=whisper-1`: Override the model form field
    /// - `PORT=3000`: Special case for deployment platforms
    /// - `OPENAI_API_KEY=sk-...`: The upstream bearer token
    ///
    /// ## Why a double underscore:
    /// Field names such as `max_bytes` already contain `_`, so nesting uses `__`.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        // OPENAI_API_KEY wins over `upstream.api_key` from config.toml or APP_UPSTREAM__API_KEY
        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            if !api_key.trim().is_empty() {
                settings = settings.set_override("upstream.api_key", api_key)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Size limits are ordered and non-zero
    /// - The JSON body limit can carry a maximum-size clip in base64
    /// - The upstream endpoint, model and timeout are usable
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.audio.max_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum audio size must be greater than 0"));
        }

        if self.audio.min_bytes > self.audio.max_bytes {
            return Err(anyhow::anyhow!(
                "Minimum audio size ({}) exceeds maximum audio size ({})",
                self.audio.min_bytes,
                self.audio.max_bytes
            ));
        }

        if self.server.max_request_bytes < base64_len(self.audio.max_bytes) {
            return Err(anyhow::anyhow!(
                "Request limit of {} bytes cannot carry {} bytes of base64 audio",
                self.server.max_request_bytes,
                self.audio.max_bytes
            ));
        }

        if self.upstream.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("Upstream endpoint cannot be empty"));
        }

        if self.upstream.model.trim().is_empty() {
            return Err(anyhow::anyhow!("Upstream model cannot be empty"));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Upstream timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Whether internal error details may be returned to clients.
    pub fn exposes_error_details(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("development")
    }
}

/// Length of the padded base64 encoding of `n` bytes.
fn base64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}
