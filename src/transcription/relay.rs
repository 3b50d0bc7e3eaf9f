//! # Transcription Relay
//!
//! Forwards one decoded audio clip to the upstream transcription API and
//! relays the outcome.
//!
//! ## Request Flow:
//! 1. Decode and validate the inbound payload ([`PayloadDecoder`])
//! 2. Encode `file`, `model` and `language` as multipart ([`MultipartEncoder`])
//! 3. POST it with the bearer token and the matching `Content-Type`
//! 4. Return the `text` field, or the upstream status and body on failure
//!
//! There are no retries: one upstream call either succeeds or the request fails.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audio::payload::{AudioPayload, AudioRequest, DecodeError, PayloadDecoder};
use crate::config::AppConfig;
use crate::multipart::MultipartEncoder;

/// Name of the multipart field carrying the audio file.
const FILE_FIELD: &str = "file";

/// Failure modes of a relayed transcription.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("transcription API key is not configured")]
    MissingApiKey,

    #[error("transcription API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("transcription request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected transcription response: {0}")]
    InvalidResponse(String),
}

/// Successful transcription as returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,

    /// Size of the clip that was relayed; not part of the upstream response
    #[serde(skip)]
    pub audio_bytes: usize,
}

/// Decodes, encodes and forwards audio to the transcription endpoint.
///
/// Built once at startup from configuration and shared read-only between requests.
#[derive(Clone)]
pub struct TranscriptionRelay {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: String,
    decoder: PayloadDecoder,
    encoder: MultipartEncoder,
}

impl std::fmt::Debug for TranscriptionRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionRelay")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .field("model", &self.model)
            .field("language", &self.language)
            .finish()
    }
}

impl TranscriptionRelay {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.upstream.endpoint.clone(),
            api_key: config.upstream.api_key.clone(),
            model: config.upstream.model.clone(),
            language: config.upstream.language.clone(),
            decoder: PayloadDecoder::new(&config.audio),
            encoder: MultipartEncoder::new(),
        })
    }

    pub fn decoder(&self) -> &PayloadDecoder {
        &self.decoder
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Transcribe a base64 JSON request.
    pub async fn transcribe(&self, request: &AudioRequest) -> Result<Transcription, RelayError> {
        let payload = self.decoder.decode(request)?;
        self.transcribe_payload(payload).await
    }

    /// Transcribe an already validated payload.
    pub async fn transcribe_payload(
        &self,
        payload: AudioPayload,
    ) -> Result<Transcription, RelayError> {
        let api_key = self.api_key.as_deref().ok_or(RelayError::MissingApiKey)?;

        let audio_bytes = payload.len();
        let format = payload.format();
        let filename = format.filename();
        info!(
            audio_bytes,
            mime_type = %payload.mime_type,
            extension = format.extension(),
            "Relaying audio to transcription API"
        );

        let fields = [("model", self.model.as_str()), ("language", self.language.as_str())];
        let body = self.encoder.encode(&payload, &fields, FILE_FIELD, &filename);
        drop(payload);

        let content_type = body.content_type();
        debug!(body_bytes = body.len(), boundary = %body.boundary, "Multipart body encoded");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, content_type)
            .body(body.bytes)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "Transcription API responded");

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "Failed to read transcription API error body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), body = %body, "Transcription API error");
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let mut transcription: Transcription = serde_json::from_slice(&bytes)
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        transcription.audio_bytes = audio_bytes;

        info!(text_chars = transcription.text.chars().count(), "Transcription successful");
        Ok(transcription)
    }
}
