//! # Audio Payload Decoding
//!
//! Turns the body of a transcription request into an [`AudioPayload`] the
//! multipart encoder can embed.
//!
//! ## Validation Order:
//! 1. The data field must be present and non-empty
//! 2. The declared MIME type must be safe to place in a header
//! 3. The base64 text must decode strictly (standard alphabet, canonical padding)
//! 4. The decoded size must lie within `[min_bytes, max_bytes]`
//!
//! Strings that cannot possibly decode to `max_bytes` or fewer are rejected
//! before any bytes are allocated.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use thiserror::Error;

use crate::audio::format::AudioFormat;
use crate::config::AudioConfig;

/// JSON body accepted by `POST /api/transcribe`.
///
/// `data` is accepted as an alias of `audio`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest {
    #[serde(alias = "data")]
    pub audio: Option<String>,
    pub mime_type: Option<String>,
}

/// A decoded, size-checked audio clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioPayload {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::from_mime(&self.mime_type)
    }
}

/// Reasons an inbound payload is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("No audio data provided")]
    MissingData,

    #[error("Invalid base64 audio data: {0}")]
    InvalidEncoding(String),

    #[error("Audio data too small: {size} bytes (minimum {min} bytes)")]
    TooSmall { size: usize, min: usize },

    #[error("Audio data too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("MIME type must not contain line breaks")]
    InvalidMimeType,
}

/// Validates and decodes audio payloads against configured limits.
#[derive(Debug, Clone)]
pub struct PayloadDecoder {
    min_bytes: usize,
    max_bytes: usize,
    default_mime_type: String,
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self::new(&crate::config::AppConfig::default().audio)
    }
}

impl PayloadDecoder {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            min_bytes: config.min_bytes,
            max_bytes: config.max_bytes,
            default_mime_type: config.default_mime_type.clone(),
        }
    }

    /// Decode a JSON request body into a payload.
    pub fn decode(&self, request: &AudioRequest) -> Result<AudioPayload, DecodeError> {
        let encoded = match request.audio.as_deref() {
            Some(data) if !data.is_empty() => data,
            _ => return Err(DecodeError::MissingData),
        };

        let mime_type = self.resolve_mime(request.mime_type.as_deref())?;

        // Padded base64 carries 3 bytes per 4 characters, minus at most 2 of padding
        let smallest_possible = (encoded.len() / 4 * 3).saturating_sub(2);
        if smallest_possible > self.max_bytes {
            return Err(DecodeError::TooLarge {
                size: smallest_possible,
                max: self.max_bytes,
            });
        }

        let data = STANDARD
            .decode(encoded)
            .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;

        self.check_size(data.len())?;
        Ok(AudioPayload { data, mime_type })
    }

    /// Validate raw bytes taken from a native multipart upload.
    pub fn from_bytes(
        &self,
        data: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<AudioPayload, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::MissingData);
        }
        let mime_type = self.resolve_mime(mime_type)?;
        self.check_size(data.len())?;
        Ok(AudioPayload { data, mime_type })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn resolve_mime(&self, declared: Option<&str>) -> Result<String, DecodeError> {
        match declared {
            Some(mime) if mime.contains(['\r', '\n']) => Err(DecodeError::InvalidMimeType),
            Some(mime) if !mime.trim().is_empty() => Ok(mime.trim().to_string()),
            _ => Ok(self.default_mime_type.clone()),
        }
    }

    fn check_size(&self, size: usize) -> Result<(), DecodeError> {
        if size < self.min_bytes {
            return Err(DecodeError::TooSmall {
                size,
                min: self.min_bytes,
            });
        }
        if size > self.max_bytes {
            return Err(DecodeError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn request(audio: &str, mime_type: Option<&str>) -> AudioRequest {
        AudioRequest {
            audio: Some(audio.to_string()),
            mime_type: mime_type.map(str::to_string),
        }
    }

    fn clip(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_missing_data() {
        let decoder = PayloadDecoder::default();
        assert_eq!(
            decoder.decode(&AudioRequest::default()),
            Err(DecodeError::MissingData)
        );
        assert_eq!(decoder.decode(&request("", None)), Err(DecodeError::MissingData));
    }

    #[test]
    fn test_round_trip_preserves_encoding() {
        let decoder = PayloadDecoder::default();
        for len in [100, 101, 102, 4096] {
            let encoded = STANDARD.encode(clip(len));
            let payload = decoder.decode(&request(&encoded, None)).unwrap();
            assert_eq!(payload.len(), len);
            assert_eq!(STANDARD.encode(&payload.data), encoded);
        }
    }

    #[test]
    fn test_invalid_encoding_is_rejected() {
        let decoder = PayloadDecoder::default();
        let valid = STANDARD.encode(clip(150));

        let cases = [
            format!("{}!!", &valid[..valid.len() - 4]),
            format!("{}*", valid),
            format!("{} ", valid),
            valid.trim_end_matches('=').to_string() + "=",
            "not base64 at all".to_string(),
        ];
        for case in cases {
            match decoder.decode(&request(&case, None)) {
                Err(DecodeError::InvalidEncoding(_)) => {}
                other => panic!("expected InvalidEncoding for {:?}, got {:?}", case, other),
            }
        }
    }

    #[test]
    fn test_minimum_threshold() {
        let decoder = PayloadDecoder::default();

        let small = STANDARD.encode(clip(50));
        assert_eq!(
            decoder.decode(&request(&small, None)),
            Err(DecodeError::TooSmall { size: 50, min: 100 })
        );

        let exact = STANDARD.encode(clip(100));
        assert!(decoder.decode(&request(&exact, None)).is_ok());
    }

    #[test]
    fn test_maximum_threshold() {
        let decoder = PayloadDecoder::default();
        let encoded = STANDARD.encode(vec![0u8; 26 * MIB]);
        match decoder.decode(&request(&encoded, None)) {
            Err(DecodeError::TooLarge { max, .. }) => assert_eq!(max, 25 * MIB),
            other => panic!("expected TooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_maximum_threshold_after_decoding() {
        let decoder = PayloadDecoder::new(&AudioConfig {
            min_bytes: 1,
            max_bytes: 10,
            default_mime_type: "audio/webm".to_string(),
        });

        // 11 bytes encode to 16 characters; the early estimate (10) does not reject them
        let encoded = STANDARD.encode(clip(11));
        assert_eq!(
            decoder.decode(&request(&encoded, None)),
            Err(DecodeError::TooLarge { size: 11, max: 10 })
        );

        let encoded = STANDARD.encode(clip(10));
        assert!(decoder.decode(&request(&encoded, None)).is_ok());
    }

    #[test]
    fn test_mime_type_resolution() {
        let decoder = PayloadDecoder::default();
        let encoded = STANDARD.encode(clip(200));

        let payload = decoder.decode(&request(&encoded, None)).unwrap();
        assert_eq!(payload.mime_type, "audio/webm");

        let payload = decoder.decode(&request(&encoded, Some(""))).unwrap();
        assert_eq!(payload.mime_type, "audio/webm");

        let payload = decoder
            .decode(&request(&encoded, Some("audio/ogg;codecs=opus")))
            .unwrap();
        assert_eq!(payload.mime_type, "audio/ogg;codecs=opus");
        assert_eq!(payload.format(), AudioFormat::Ogg);
    }

    #[test]
    fn test_mime_type_header_injection() {
        let decoder = PayloadDecoder::default();
        let encoded = STANDARD.encode(clip(200));
        for mime in [
            "audio/wav\r\nX-Evil: 1",
            "audio/wav\nX-Evil: 1",
            "audio\r/wav",
            "audio/wav\r\n",
            "\naudio/wav",
        ] {
            assert_eq!(
                decoder.decode(&request(&encoded, Some(mime))),
                Err(DecodeError::InvalidMimeType)
            );
        }
        assert_eq!(
            decoder.from_bytes(clip(200), Some("audio/mp4\r\n")),
            Err(DecodeError::InvalidMimeType)
        );
    }

    #[test]
    fn test_request_accepts_data_alias() {
        let json = r#"{"data": "AAAA", "mimeType": "audio/wav"}"#;
        let request: AudioRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.audio.as_deref(), Some("AAAA"));
        assert_eq!(request.mime_type.as_deref(), Some("audio/wav"));
    }

    #[test]
    fn test_from_bytes() {
        let decoder = PayloadDecoder::default();

        let payload = decoder.from_bytes(clip(300), Some("audio/mp4")).unwrap();
        assert_eq!(payload.mime_type, "audio/mp4");

        assert_eq!(decoder.from_bytes(Vec::new(), None), Err(DecodeError::MissingData));
        assert_eq!(
            decoder.from_bytes(clip(99), None),
            Err(DecodeError::TooSmall { size: 99, min: 100 })
        );
    }
}
