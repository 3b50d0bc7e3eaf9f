//! # Audio Module
//!
//! Turns inbound request bodies into validated audio clips.
//!
//! ## Key Components:
//! - **Payload Decoder** (`payload`): base64 decoding, size limits, MIME checks
//! - **Audio Format** (`format`): maps a MIME type to the file extension the upstream API expects
//!
//! ## Size Policy:
//! Clips must be at least 100 bytes (anything smaller cannot hold a real recording)
//! and at most 25 MiB (the upstream upload limit). Both bounds are configurable.

pub mod format;     // MIME type → container format
pub mod payload;    // Payload decoding and validation
