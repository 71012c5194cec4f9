// SPDX-License-Identifier: MPL-2.0
//! Decoder session port definition.
//!
//! This module defines the [`DecoderSession`] trait: a strictly sequential
//! producer of decoded pictures that can be repositioned at a byte offset.
//! Infrastructure adapters (like `FFmpeg`) implement this trait.
//!
//! # Design Notes
//!
//! - The session is **stateful**: it owns the byte cursor and codec context
//! - Positioning and decoder state are separate: [`open`] moves the cursor,
//!   [`reset`] discards everything the codec has buffered
//! - Packet-level damage is the session's business; it logs and keeps going.
//!   An `Err` means the session itself is unusable
//!
//! [`open`]: DecoderSession::open
//! [`reset`]: DecoderSession::reset

use crate::domain::error::DecoderError;
use crate::domain::picture::{Picture, PictureFormat, PictureType};

/// One picture as emitted by the decoder, before timeline matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Decoder presentation timestamp. Only the low 33 bits are meaningful.
    pub pts: i64,

    /// Whether the decoder believes this picture starts a clean run.
    ///
    /// Unreliable: some hardware decoders never set it, in which case the
    /// adapter derives it from the first key packet's timestamp.
    pub is_sync_hint: bool,

    /// Decoded samples at the decoder's native depth.
    pub picture: Picture,
}

impl RawFrame {
    #[must_use]
    pub fn new(pts: i64, is_sync_hint: bool, picture: Picture) -> Self {
        Self {
            pts,
            is_sync_hint,
            picture,
        }
    }

    #[must_use]
    pub fn picture_type(&self) -> PictureType {
        self.picture.picture_type()
    }
}

/// Port for sequential decoding with byte-offset repositioning.
///
/// # Thread Safety
///
/// Implementations must be `Send` so a frame source can be shared across
/// threads behind its lock. They need not be `Sync`.
///
/// # Lifecycle
///
/// 1. Construct the adapter (opens the container)
/// 2. [`open`](Self::open) at a packet-aligned byte offset
/// 3. [`reset`](Self::reset) to start from a clean codec state
/// 4. Call [`next_raw_frame`](Self::next_raw_frame) until it returns `None`
pub trait DecoderSession: Send {
    /// Moves the byte cursor to `byte_offset`.
    ///
    /// The caller aligns offsets to transport packet boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::SeekFailed`] if the container cannot be
    /// repositioned.
    fn open(&mut self, byte_offset: u64) -> Result<(), DecoderError>;

    /// Decodes the next picture in stream order.
    ///
    /// Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns a [`DecoderError`] if the session can no longer produce
    /// pictures at all.
    fn next_raw_frame(&mut self) -> Result<Option<RawFrame>, DecoderError>;

    /// Discards all codec state so decoding restarts cleanly at the cursor.
    ///
    /// # Errors
    ///
    /// Returns a [`DecoderError`] if the codec cannot be recreated.
    fn reset(&mut self) -> Result<(), DecoderError>;

    /// Geometry and depth of the pictures the frame source hands out.
    fn output_format(&self) -> PictureFormat;

    /// Sample depth of the pictures [`next_raw_frame`](Self::next_raw_frame)
    /// returns. Defaults to the output depth.
    fn source_bit_depth(&self) -> u8 {
        self.output_format().bit_depth
    }
}
