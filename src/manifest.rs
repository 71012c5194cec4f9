// SPDX-License-Identifier: MPL-2.0
//! Source manifest: everything needed to reopen a frame source later.
//!
//! The manifest is produced once the stream has been analyzed and is stored
//! as CBOR next to the intermediate files. It names the container and the side
//! PCM file, carries the expected-frame timeline and the audio index, and
//! records which decoder implementation to prefer per codec.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::domain::audio::AudioFrame;
use crate::domain::timeline::{Timeline, TimelineFrame};
use crate::error::Result;

/// Video codecs the stream may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    Mpeg2,
    H264,
    Hevc,
}

impl VideoCodec {
    /// Prefix of the hardware decoder names for this codec.
    fn hardware_prefix(self) -> &'static str {
        match self {
            VideoCodec::Mpeg2 => "mpeg2",
            VideoCodec::H264 => "h264",
            VideoCodec::Hevc => "hevc",
        }
    }
}

/// Decoder implementation preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    /// The library's default (software) decoder.
    #[default]
    Default,
    /// Intel Quick Sync.
    Qsv,
    /// NVIDIA CUVID.
    Cuvid,
}

impl DecoderKind {
    /// Name of the decoder to request for `codec`, or `None` for the default.
    #[must_use]
    pub fn decoder_name(self, codec: VideoCodec) -> Option<String> {
        let suffix = match self {
            DecoderKind::Default => return None,
            DecoderKind::Qsv => "qsv",
            DecoderKind::Cuvid => "cuvid",
        };
        Some(format!("{}_{}", codec.hardware_prefix(), suffix))
    }
}

/// Decoder preference per codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderSettings {
    #[serde(default)]
    pub mpeg2: DecoderKind,
    #[serde(default)]
    pub h264: DecoderKind,
    #[serde(default)]
    pub hevc: DecoderKind,
}

impl DecoderSettings {
    #[must_use]
    pub fn kind_for(&self, codec: VideoCodec) -> DecoderKind {
        match codec {
            VideoCodec::Mpeg2 => self.mpeg2,
            VideoCodec::H264 => self.h264,
            VideoCodec::Hevc => self.hevc,
        }
    }
}

/// Output video geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    /// False for interlaced content.
    pub progressive: bool,
}

/// Side PCM file format. Always 16-bit stereo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
}

/// Persistent description of a frame source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    /// Transport stream to decode.
    pub source_path: PathBuf,
    /// Side PCM file, if the source has audio.
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    pub video: VideoFormat,
    #[serde(default)]
    pub audio: Option<AudioFormat>,
    /// Expected-frame timeline.
    pub frames: Vec<TimelineFrame>,
    /// Audio index.
    #[serde(default)]
    pub audio_frames: Vec<AudioFrame>,
    #[serde(default)]
    pub decoders: DecoderSettings,
}

impl SourceManifest {
    /// Validated timeline built from [`frames`](Self::frames).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidTimeline`] if the frame list is invalid.
    pub fn timeline(&self) -> Result<Timeline> {
        Timeline::new(self.frames.clone())
    }

    /// Writes the manifest to `path` as CBOR, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] or [`crate::Error::Manifest`] on failure.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        ciborium::into_writer(self, writer)?;
        Ok(())
    }

    /// Reads a manifest written by [`save_to_path`](Self::save_to_path).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the file cannot be opened and
    /// [`crate::Error::Manifest`] if it is not a valid manifest.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let manifest = ciborium::from_reader(reader)?;
        Ok(manifest)
    }
}
