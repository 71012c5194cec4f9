// SPDX-License-Identifier: MPL-2.0
use std::fmt;

pub use crate::domain::error::DecoderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Io(String),
    Config(String),
    Manifest(String),
    Decoder(DecoderError),

    /// The expected-frame timeline violates its invariants.
    InvalidTimeline(String),

    /// The decoder's sample depth cannot be narrowed to the output depth.
    UnsupportedConversion { source_depth: u8, output_depth: u8 },

    /// More than the allowed share of the timeline had to be substituted.
    TooManyFailedFrames { failed: usize, total: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O Error: {}", e),
            Error::Config(e) => write!(f, "Config Error: {}", e),
            Error::Manifest(e) => write!(f, "Manifest Error: {}", e),
            Error::Decoder(e) => write!(f, "Decoder Error: {}", e),
            Error::InvalidTimeline(e) => write!(f, "Invalid Timeline: {}", e),
            Error::UnsupportedConversion {
                source_depth,
                output_depth,
            } => write!(
                f,
                "Unsupported conversion: {}-bit to {}-bit",
                source_depth, output_depth
            ),
            Error::TooManyFailedFrames { failed, total } => write!(
                f,
                "Too many undecodable frames: {} of {} frames could not be decoded",
                failed, total
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<DecoderError> for Error {
    fn from(err: DecoderError) -> Self {
        Error::Decoder(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl<T: fmt::Debug> From<ciborium::de::Error<T>> for Error {
    fn from(err: ciborium::de::Error<T>) -> Self {
        Error::Manifest(err.to_string())
    }
}

impl<T: fmt::Debug> From<ciborium::ser::Error<T>> for Error {
    fn from(err: ciborium::ser::Error<T>) -> Self {
        Error::Manifest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
