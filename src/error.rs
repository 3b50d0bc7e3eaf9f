//! # Error Handling
//!
//! This module defines the application error type and how it's converted to HTTP responses.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Result<T, E> Type
//! - **Purpose**: Forces you to handle both success and failure cases
//! - **No exceptions**: Rust doesn't have try/catch, it uses Result instead
//!
//! ### Traits for Error Conversion
//! - **From trait**: Automatically converts domain errors (decode, relay) into `AppError`
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted as strings
//!
//! ## Response shape:
//! Every failure is reported the same way, so clients only need one parser:
//! ```json
//! { "error": "Audio data too small", "details": "...", "success": false, "timestamp": "..." }
//! ```

use actix_web::http::StatusCode;               // Type-safe HTTP status codes
use actix_web::{HttpResponse, ResponseError};  // Web framework error handling
use serde_json::json;                          // For creating JSON error responses
use std::fmt;                                  // For implementing Display trait

use crate::audio::payload::DecodeError;
use crate::transcription::relay::RelayError;

/// Application errors, one variant per failure category.
///
/// ## Error Categories:
/// - **Validation**: Missing, malformed or implausible audio, bad content types (400)
/// - **MethodNotAllowed**: Anything but POST/OPTIONS on the transcribe route (405)
/// - **Upstream**: The transcription API refused the request; its status is mirrored
/// - **Config**: The server is missing something it needs, like the API key (500)
/// - **Internal**: Anything else (500); `details` is only sent in development
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::Validation("Unsupported content type".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    Validation(String),

    MethodNotAllowed,

    Upstream {
        status: u16,
        message: String,
        details: String,
    },

    Config(String),

    Internal {
        message: String,
        details: Option<String>,
    },
}

impl AppError {
    /// Drop internal details unless the deployment allows exposing them.
    ///
    /// ## Why only Internal:
    /// Upstream details are the transcription API's own error body, which the
    /// caller needs to understand the failure. Internal details may contain
    /// anything (transport errors, parser output) and stay server-side in production.
    pub fn for_environment(self, expose_details: bool) -> Self {
        match self {
            AppError::Internal { message, .. } if !expose_details => AppError::Internal {
                message,
                details: None,
            },
            other => other,
        }
    }
}

/// Implementation of the Display trait for AppError.
///
/// ## Purpose:
/// This trait defines how errors are formatted as human-readable strings.
/// It's used when errors are logged by the request middleware.
impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::MethodNotAllowed => write!(f, "Method not allowed"),
            AppError::Upstream { status, message, .. } => {
                write!(f, "Upstream error ({}): {}", status, message)
            }
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

/// Implementation of the ResponseError trait for AppError.
///
/// ## HTTP Status Code Mapping:
/// - Validation → 400 (Bad Request)
/// - MethodNotAllowed → 405 (Method Not Allowed)
/// - Upstream → the upstream status (falls back to 502 if it is not a valid code)
/// - Config/Internal → 500 (Internal Server Error)
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Config(_) | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Map each variant to the message and optional details sent to the client
        let (message, details) = match self {
            AppError::Validation(msg) => (msg.clone(), None),
            AppError::MethodNotAllowed => ("Method not allowed".to_string(), None),
            AppError::Upstream { message, details, .. } => {
                (message.clone(), Some(details.clone()))
            }
            AppError::Config(msg) => (msg.clone(), None),
            AppError::Internal { message, details } => (message.clone(), details.clone()),
        };

        let mut body = json!({
            "error": message,
            "success": false,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Every decode failure is the client's fault, so it becomes a 400.
impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Relay failures map onto the taxonomy above.
///
/// ## Upstream messages:
/// The transcription API reports errors as `{"error": {"message": "..."}}`.
/// When that message is present it becomes the `error` field; the raw body
/// always goes into `details`.
impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Decode(err) => err.into(),
            RelayError::MissingApiKey => {
                AppError::Config("Transcription API key not set".to_string())
            }
            RelayError::Upstream { status, body } => AppError::Upstream {
                status,
                message: upstream_message(&body)
                    .unwrap_or_else(|| "Transcription API error".to_string()),
                details: body,
            },
            other => AppError::Internal {
                message: "Transcription failed".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}

/// Malformed JSON bodies are client errors.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", err))
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::Validation(format!("Invalid multipart upload: {}", err))
    }
}

impl From<actix_web::error::PayloadError> for AppError {
    fn from(err: actix_web::error::PayloadError) -> Self {
        AppError::Validation(format!("Failed to read request body: {}", err))
    }
}

/// Pull `error.message` out of an upstream JSON error body.
fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
        .map(str::to_string)
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn test_validation_error_shape() {
        let (status, body) = body_json(DecodeError::MissingData.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No audio data provided");
        assert_eq!(body["success"], false);
        assert!(body.get("details").is_none());
    }

    #[actix_web::test]
    async fn test_upstream_error_is_mirrored() {
        let err: AppError = RelayError::Upstream {
            status: 401,
            body: r#"{"error":{"message":"invalid key"}}"#.to_string(),
        }
        .into();
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid key");
        assert_eq!(body["details"], r#"{"error":{"message":"invalid key"}}"#);
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn test_upstream_error_without_json_message() {
        let err: AppError = RelayError::Upstream {
            status: 503,
            body: "Service Unavailable".to_string(),
        }
        .into();
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Transcription API error");
        assert_eq!(body["details"], "Service Unavailable");
    }

    #[actix_web::test]
    async fn test_missing_api_key_is_config_error() {
        let (status, body) = body_json(RelayError::MissingApiKey.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Transcription API key not set");
    }

    #[actix_web::test]
    async fn test_internal_details_hidden_in_production() {
        let err = AppError::Internal {
            message: "Transcription failed".to_string(),
            details: Some("connection reset".to_string()),
        };

        let (_, body) = body_json(err.for_environment(false)).await;
        assert!(body.get("details").is_none());

        let err = AppError::Internal {
            message: "Transcription failed".to_string(),
            details: Some("connection reset".to_string()),
        };
        let (status, body) = body_json(err.for_environment(true)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "connection reset");
    }

    #[test]
    fn test_method_not_allowed_status() {
        assert_eq!(
            AppError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
