//! # Transcription Module
//!
//! Relays decoded audio to the upstream speech-to-text API.

pub mod relay;

pub use relay::{RelayError, TranscriptionRelay};
