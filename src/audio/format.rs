//! Container format detection from a declared MIME type.
//!
//! The upstream API picks its demuxer from the uploaded file name, so the
//! extension must agree with the bytes the browser recorded. Browsers report
//! MIME types with codec parameters (`audio/webm;codecs=opus`), so matching is
//! done by substring rather than exact comparison.

/// Audio containers the relay knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Webm,
    Mp4,
    Mp3,
    Ogg,
    Wav,
}

impl AudioFormat {
    /// Resolve a MIME type to a format, falling back to WebM.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        if mime.contains("mp4") {
            AudioFormat::Mp4
        } else if mime.contains("mpeg") {
            AudioFormat::Mp3
        } else if mime.contains("ogg") {
            AudioFormat::Ogg
        } else if mime.contains("wav") {
            AudioFormat::Wav
        } else {
            AudioFormat::Webm
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Webm => "webm",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wav => "wav",
        }
    }

    /// File name sent in the multipart `filename` parameter.
    pub fn filename(self) -> String {
        format!("audio.{}", self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(AudioFormat::from_mime("audio/mp4"), AudioFormat::Mp4);
        assert_eq!(AudioFormat::from_mime("audio/mpeg"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_mime("audio/ogg"), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_mime("audio/wav"), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_mime("audio/x-wav"), AudioFormat::Wav);
    }

    #[test]
    fn test_codec_parameters_and_case() {
        assert_eq!(AudioFormat::from_mime("audio/webm;codecs=opus"), AudioFormat::Webm);
        assert_eq!(AudioFormat::from_mime("audio/ogg; codecs=opus"), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_mime("AUDIO/MP4"), AudioFormat::Mp4);
    }

    #[test]
    fn test_unknown_falls_back_to_webm() {
        let format = AudioFormat::from_mime("application/octet-stream");
        assert_eq!(format, AudioFormat::Webm);
        assert_eq!(format.filename(), "audio.webm");
    }

    #[test]
    fn test_filename() {
        assert_eq!(AudioFormat::Mp3.filename(), "audio.mp3");
        assert_eq!(AudioFormat::Wav.filename(), "audio.wav");
    }
}
