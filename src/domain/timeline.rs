// SPDX-License-Identifier: MPL-2.0
//! Expected-frame timeline.
//!
//! The timeline is built upstream (demultiplexing and stream reform) before a
//! frame source is created, and is immutable for the life of the session. Each
//! entry describes one *output* frame: which decoder timestamp produces it,
//! where decoding can restart for it, and whether it is reconstructed from two
//! adjacent decoded frames.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Width of the decoder clock in bits.
pub const PTS_BITS: u32 = 33;

/// Length of one decoder clock period.
pub const PTS_WRAP: i64 = 1 << PTS_BITS;

/// Mask selecting the significant bits of a decoder timestamp.
pub const PTS_MASK: i64 = PTS_WRAP - 1;

/// Size of an MPEG transport stream packet; byte seeks land on this grid.
pub const TS_PACKET_SIZE: u64 = 188;

/// Reduces a raw decoder timestamp to the 33-bit clock domain.
///
/// Decoders disagree on how they extend wrapped timestamps, so only the low
/// bits are trusted.
#[must_use]
pub fn mask_pts(pts: i64) -> i64 {
    pts & PTS_MASK
}

/// Rounds a byte offset down to the start of its transport packet.
#[must_use]
pub fn align_to_packet(byte_offset: u64) -> u64 {
    byte_offset / TS_PACKET_SIZE * TS_PACKET_SIZE
}

/// Descriptor of one output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineFrame {
    /// Presentation timestamp as emitted by the decoder, before any drop
    /// correction. Unwrapped: values past one clock wrap exceed [`PTS_WRAP`].
    pub original_pts: i64,

    /// Index of the nearest preceding frame from which decoding can restart.
    pub sync_point_index: usize,

    /// Byte position of the frame's data in the container.
    pub byte_offset: u64,

    /// Built from the top field of the previous decoded frame and the bottom
    /// field of the current one instead of being taken verbatim.
    pub interlace_merge: bool,
}

impl TimelineFrame {
    /// Creates a descriptor for a verbatim (non-merged) frame.
    #[must_use]
    pub fn new(original_pts: i64, sync_point_index: usize, byte_offset: u64) -> Self {
        Self {
            original_pts,
            sync_point_index,
            byte_offset,
            interlace_merge: false,
        }
    }

    /// Marks this descriptor as an interlace-merge slot.
    #[must_use]
    pub fn merged(mut self) -> Self {
        self.interlace_merge = true;
        self
    }
}

/// Ordered, validated sequence of [`TimelineFrame`]s.
///
/// Guaranteed non-empty, and every descriptor's sync point lies at or before
/// its own index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    frames: Vec<TimelineFrame>,
}

impl Timeline {
    /// Validates and wraps a descriptor list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTimeline`] if the list is empty or a descriptor
    /// references a sync point after itself.
    pub fn new(frames: Vec<TimelineFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::InvalidTimeline("timeline has no frames".into()));
        }
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(index, frame)| frame.sync_point_index > *index)
        {
            return Err(Error::InvalidTimeline(format!(
                "frame {} references sync point {} after itself",
                index, frame.sync_point_index
            )));
        }
        Ok(Self { frames })
    }

    /// Number of output frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the final output frame.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.frames.len() - 1
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TimelineFrame> {
        self.frames.get(index)
    }

    #[must_use]
    pub fn frames(&self) -> &[TimelineFrame] {
        &self.frames
    }

    /// Descriptor at `index`, clamped to the valid range.
    #[must_use]
    pub fn frame(&self, index: usize) -> &TimelineFrame {
        &self.frames[index.min(self.last_index())]
    }

    #[must_use]
    pub fn first_pts(&self) -> i64 {
        self.frames[0].original_pts
    }

    #[must_use]
    pub fn last_pts(&self) -> i64 {
        self.frames[self.last_index()].original_pts
    }

    /// First index whose timestamp is not less than `pts`; `len()` if none.
    #[must_use]
    pub fn lower_bound(&self, pts: i64) -> usize {
        self.frames.partition_point(|frame| frame.original_pts < pts)
    }

    /// Packet-aligned byte offset at which to reopen the decoder for `sync`.
    #[must_use]
    pub fn seek_offset(&self, sync: usize) -> u64 {
        align_to_packet(self.frame(sync).byte_offset)
    }
}
