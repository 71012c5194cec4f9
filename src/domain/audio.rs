// SPDX-License-Identifier: MPL-2.0
//! Audio index entries.

use serde::{Deserialize, Serialize};

/// Bytes per PCM sample frame (16-bit stereo).
pub const BYTES_PER_SAMPLE: usize = 4;

/// Channel count of the side PCM file.
pub const CHANNELS: u16 = 2;

/// Samples per audio frame when no entry carries data.
pub const DEFAULT_SAMPLES_PER_FRAME: usize = 1024;

/// Location of one audio frame's PCM data in the side file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFrame {
    /// Byte offset of the frame's samples.
    pub wave_offset: u64,
    /// Length of the frame's samples in bytes; zero marks a silent frame.
    pub wave_length: u32,
}

impl AudioFrame {
    #[must_use]
    pub fn new(wave_offset: u64, wave_length: u32) -> Self {
        Self {
            wave_offset,
            wave_length,
        }
    }

    /// Frame with no stored samples.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.wave_length != 0
    }
}

/// Samples per audio frame for an index.
///
/// Taken from the first entry with data, since silent entries have length
/// zero.
#[must_use]
pub fn samples_per_frame(frames: &[AudioFrame]) -> usize {
    frames
        .iter()
        .find(|frame| frame.has_data())
        .map_or(DEFAULT_SAMPLES_PER_FRAME, |frame| {
            (frame.wave_length as usize / BYTES_PER_SAMPLE).max(1)
        })
}
