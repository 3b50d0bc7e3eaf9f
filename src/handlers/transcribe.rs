//! # Transcription Endpoint
//!
//! `POST /api/transcribe` accepts audio in one of two shapes:
//! - **JSON**: `{ "audio": "<base64>", "mimeType": "audio/webm" }` (a missing
//!   `Content-Type` is treated as JSON)
//! - **multipart/form-data**: a file field named `audio`; its part content type
//!   is used as the MIME type
//!
//! `OPTIONS` answers CORS preflights with 200; every other method gets 405.

use actix_multipart::Multipart;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::audio::payload::{AudioPayload, AudioRequest, DecodeError, PayloadDecoder};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::transcription::RelayError;

/// Multipart field holding the uploaded recording.
const UPLOAD_FIELD: &str = "audio";

/// Methods the transcribe route answers.
const ALLOWED_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, Serialize)]
struct TranscriptionResponse {
    text: String,
    success: bool,
}

/// Handle `POST /api/transcribe`.
pub async fn transcribe(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let expose_details = state.config.exposes_error_details();
    relay_transcription(req, payload, &state)
        .await
        .map_err(|err| err.for_environment(expose_details))
}

/// Handle `OPTIONS /api/transcribe`.
pub async fn preflight(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
        .insert_header((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"))
        .insert_header((
            header::ACCESS_CONTROL_MAX_AGE,
            state.config.server.cors_max_age_secs.to_string(),
        ))
        .finish()
}

/// Fallback for any other method on the transcribe route.
pub async fn method_not_allowed() -> HttpResponse {
    let mut response = AppError::MethodNotAllowed.error_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

async fn relay_transcription(
    req: HttpRequest,
    payload: web::Payload,
    state: &AppState,
) -> AppResult<HttpResponse> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let result = if content_type.is_empty() || content_type.starts_with("application/json") {
        let body = read_body(payload, state.config.server.max_request_bytes).await?;
        let request: AudioRequest = serde_json::from_slice(&body)?;
        info!(
            encoded_chars = request.audio.as_ref().map_or(0, String::len),
            mime_type = ?request.mime_type,
            "Transcription request received"
        );
        state.relay.transcribe(&request).await
    } else if content_type.starts_with("multipart/form-data") {
        let audio = read_upload(&req, payload, state.relay.decoder()).await?;
        debug!(audio_bytes = audio.len(), mime_type = %audio.mime_type, "Audio upload decoded");
        state.relay.transcribe_payload(audio).await
    } else {
        return Err(AppError::Validation(format!(
            "Unsupported content type: {}",
            content_type
        )));
    };

    match result {
        Ok(transcription) => {
            state.record_transcription(transcription.audio_bytes);
            Ok(HttpResponse::Ok().json(TranscriptionResponse {
                text: transcription.text,
                success: true,
            }))
        }
        Err(err) => {
            if matches!(err, RelayError::Upstream { .. }) {
                state.record_upstream_error();
            }
            Err(err.into())
        }
    }
}

/// Collect a request body, refusing anything longer than `limit` bytes.
async fn read_body(mut payload: web::Payload, limit: usize) -> AppResult<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::Validation(format!(
                "Request body exceeds {} bytes",
                limit
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Pull the `audio` file out of a multipart upload.
async fn read_upload(
    req: &HttpRequest,
    payload: web::Payload,
    decoder: &PayloadDecoder,
) -> AppResult<AudioPayload> {
    let mut multipart = Multipart::new(req.headers(), payload);

    while let Some(field) = multipart.next().await {
        let mut field = field?;
        if field.name() != Some(UPLOAD_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        // Generic binary types say nothing about the container
        let mime_type = field
            .content_type()
            .map(|mime| mime.to_string())
            .filter(|mime| mime != "application/octet-stream");

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            let size = data.len() + chunk.len();
            if size > decoder.max_bytes() {
                return Err(DecodeError::TooLarge {
                    size,
                    max: decoder.max_bytes(),
                }
                .into());
            }
            data.extend_from_slice(&chunk);
        }

        info!(audio_bytes = data.len(), mime_type = ?mime_type, "Audio upload received");
        return Ok(decoder.from_bytes(data, mime_type.as_deref())?);
    }

    Err(DecodeError::MissingData.into())
}
