// SPDX-License-Identifier: MPL-2.0
//! Errors reported by decoder sessions.

use std::fmt;

/// Failure of a [`DecoderSession`](crate::application::port::DecoderSession).
///
/// Every variant is fatal for the frame source: the engine only recovers from
/// damaged *content*, never from a decoder that cannot open, seek or parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// The input could not be opened or probed.
    OpenFailed(String),

    /// The input contains no video stream.
    NoVideoStream,

    /// No decoder is available for the stream's codec.
    UnsupportedCodec(String),

    /// Repositioning the byte cursor failed.
    SeekFailed(String),

    /// The decoder could not be (re)created or fed.
    DecodingFailed(String),

    /// Generic error with raw message.
    Other(String),
}

impl DecoderError {
    /// Classifies a raw decoder message into a specific variant.
    ///
    /// Used by adapters whose backends only report free-form strings.
    pub fn from_message(msg: &str) -> Self {
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("codec") || msg_lower.contains("decoder") {
            if let Some(codec) = Self::extract_codec_name(&msg_lower) {
                return DecoderError::UnsupportedCodec(codec);
            } else if msg_lower.contains("not found") || msg_lower.contains("unsupported") {
                return DecoderError::DecodingFailed(msg.to_string());
            }
        }

        if msg_lower.contains("no such file")
            || msg_lower.contains("permission denied")
            || msg_lower.contains("i/o error")
        {
            return DecoderError::OpenFailed(msg.to_string());
        }

        if msg_lower.contains("no video stream") {
            return DecoderError::NoVideoStream;
        }

        if msg_lower.contains("seek") {
            return DecoderError::SeekFailed(msg.to_string());
        }

        if msg_lower.contains("packet") || msg_lower.contains("decode") {
            return DecoderError::DecodingFailed(msg.to_string());
        }

        DecoderError::Other(msg.to_string())
    }

    fn extract_codec_name(msg: &str) -> Option<String> {
        let codecs = ["mpeg2", "h264", "hevc", "h265"];
        for codec in codecs {
            if msg.contains(codec) {
                return Some(codec.to_uppercase());
            }
        }
        None
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::OpenFailed(msg) => write!(f, "Failed to open input: {}", msg),
            DecoderError::NoVideoStream => write!(f, "No video stream found"),
            DecoderError::UnsupportedCodec(codec) => {
                write!(f, "Unsupported video codec: {}", codec)
            }
            DecoderError::SeekFailed(msg) => write!(f, "Seek failed: {}", msg),
            DecoderError::DecodingFailed(msg) => write!(f, "Decoding failed: {}", msg),
            DecoderError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for DecoderError {}
