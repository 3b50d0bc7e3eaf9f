//! # Multipart Body Encoding
//!
//! Builds `multipart/form-data` request bodies byte by byte, so the exact
//! layout sent upstream is under our control and can be tested precisely.
//!
//! ## Layout:
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="file"; filename="audio.webm"\r\n
//! Content-Type: audio/webm\r\n
//! \r\n
//! {raw bytes}\r\n
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="model"\r\n
//! \r\n
//! whisper-1\r\n
//! --{boundary}--\r\n
//! ```
//!
//! The boundary is a fixed prefix plus a fresh UUID v4 for every body, and is
//! regenerated if it ever appears inside a field value.

use uuid::Uuid;

use crate::audio::payload::AudioPayload;

/// Prefix shared by every generated boundary.
pub const BOUNDARY_PREFIX: &str = "----TranscribeRelayBoundary";

/// One part of a multipart form.
#[derive(Debug, Clone, Copy)]
pub struct FormField<'a> {
    pub name: &'a str,
    pub value: &'a [u8],
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
}

impl<'a> FormField<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            value: value.as_bytes(),
            filename: None,
            content_type: None,
        }
    }

    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, value: &'a [u8]) -> Self {
        Self {
            name,
            value,
            filename: Some(filename),
            content_type: Some(content_type),
        }
    }

    fn header(&self, boundary: &str) -> String {
        let mut header = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
            boundary,
            escape_quoted(self.name)
        );
        if let Some(filename) = self.filename {
            header.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
        }
        header.push_str("\r\n");
        if let Some(content_type) = self.content_type {
            header.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        header.push_str("\r\n");
        header
    }
}

/// An encoded body together with the boundary that delimits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub bytes: Vec<u8>,
}

impl MultipartBody {
    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Serializes form fields into a [`MultipartBody`].
#[derive(Debug, Clone, Default)]
pub struct MultipartEncoder;

impl MultipartEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode an audio payload as the first part, followed by text fields in order.
    pub fn encode(
        &self,
        payload: &AudioPayload,
        fields: &[(&str, &str)],
        file_field_name: &str,
        filename: &str,
    ) -> MultipartBody {
        let mut parts = Vec::with_capacity(fields.len() + 1);
        parts.push(FormField::file(
            file_field_name,
            filename,
            &payload.mime_type,
            &payload.data,
        ));
        parts.extend(fields.iter().map(|&(name, value)| FormField::text(name, value)));
        self.encode_fields(&parts)
    }

    /// Encode an arbitrary ordered list of parts.
    pub fn encode_fields(&self, fields: &[FormField<'_>]) -> MultipartBody {
        let boundary = loop {
            let candidate = generate_boundary();
            let collides = fields
                .iter()
                .any(|field| contains_subslice(field.value, candidate.as_bytes()));
            if !collides {
                break candidate;
            }
        };

        let headers: Vec<String> = fields.iter().map(|field| field.header(&boundary)).collect();
        let closing = format!("--{}--\r\n", boundary);

        let total = headers
            .iter()
            .zip(fields)
            .map(|(header, field)| header.len() + field.value.len() + 2)
            .sum::<usize>()
            + closing.len();

        let mut bytes = Vec::with_capacity(total);
        for (header, field) in headers.iter().zip(fields) {
            bytes.extend_from_slice(header.as_bytes());
            bytes.extend_from_slice(field.value);
            bytes.extend_from_slice(b"\r\n");
        }
        bytes.extend_from_slice(closing.as_bytes());

        MultipartBody { boundary, bytes }
    }
}

fn generate_boundary() -> String {
    format!("{}{}", BOUNDARY_PREFIX, Uuid::new_v4().simple())
}

/// Escape a name or filename for a quoted Content-Disposition parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty()
        && haystack.len() >= needle.len()
        && haystack.windows(needle.len()).any(|window| window == needle)
}
