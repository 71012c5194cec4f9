// SPDX-License-Identifier: MPL-2.0
//! Synthetic transport stream and decoder double shared by integration tests.
//!
//! Raw frame `i` is a flat picture whose luma equals `i`, so tests can tell
//! which decoded frame(s) an output was built from.

#![allow(dead_code)]

use std::ops::Range;
use std::sync::{Arc, Mutex};

use ts_frame_source::application::port::{DecoderSession, RawFrame};
use ts_frame_source::domain::error::DecoderError;
use ts_frame_source::domain::picture::{ChromaLayout, Picture, PictureFormat, PictureType, Plane};
use ts_frame_source::domain::timeline::{mask_pts, Timeline, TimelineFrame, TS_PACKET_SIZE};
use ts_frame_source::manifest::VideoFormat;

/// 29.97 fps in 90 kHz ticks.
pub const STEP: i64 = 3003;

/// Sync point spacing.
pub const GOP: usize = 30;

/// Bytes per frame in the synthetic container.
pub const FRAME_BYTES: u64 = 4 * TS_PACKET_SIZE;

/// Luma value of stray frames.
pub const STRAY_VALUE: u16 = 9999;

pub fn format() -> PictureFormat {
    PictureFormat::new(16, 8, ChromaLayout::Yuv420, 8)
}

pub fn video_format() -> VideoFormat {
    VideoFormat {
        width: 16,
        height: 8,
        frame_rate_num: 30000,
        frame_rate_den: 1001,
        progressive: true,
    }
}

/// Byte position of frame `index`; deliberately not packet-aligned.
pub fn position(index: usize) -> u64 {
    index as u64 * FRAME_BYTES + 100
}

/// Timeline matching [`SyntheticStream::linear`].
pub fn timeline(len: usize, start_pts: i64) -> Timeline {
    timeline_with(len, start_pts, |_| false)
}

/// Timeline whose slots are interlace merges where `merged(index)` holds.
pub fn timeline_with(len: usize, start_pts: i64, merged: impl Fn(usize) -> bool) -> Timeline {
    let frames = (0..len)
        .map(|i| {
            let frame = TimelineFrame::new(start_pts + i as i64 * STEP, i / GOP * GOP, position(i));
            if merged(i) {
                frame.merged()
            } else {
                frame
            }
        })
        .collect();
    Timeline::new(frames).expect("valid synthetic timeline")
}

/// Luma value of a picture's first sample.
pub fn luma(picture: &Picture) -> u16 {
    picture.plane(0).samples()[0]
}

#[derive(Debug, Clone)]
struct StreamFrame {
    pts: i64,
    sync: bool,
    value: u16,
    position: u64,
    decodable: bool,
}

/// Description of the frames a synthetic container holds.
#[derive(Debug, Clone)]
pub struct SyntheticStream {
    frames: Vec<StreamFrame>,
}

impl SyntheticStream {
    /// `len` frames starting at `start_pts`, sync points every [`GOP`].
    pub fn linear(len: usize, start_pts: i64) -> Self {
        let frames = (0..len)
            .map(|i| StreamFrame {
                pts: start_pts + i as i64 * STEP,
                sync: i % GOP == 0,
                value: i as u16,
                position: position(i),
                decodable: true,
            })
            .collect();
        Self { frames }
    }

    /// Frames in `range` never come out of the decoder.
    pub fn with_undecodable(mut self, range: Range<usize>) -> Self {
        for frame in &mut self.frames[range] {
            frame.decodable = false;
        }
        self
    }

    /// Inserts a frame with an off-timeline timestamp after frame `index`.
    pub fn with_stray_frame_after(mut self, index: usize) -> Self {
        let previous = self.frames[index].clone();
        self.frames.insert(
            index + 1,
            StreamFrame {
                pts: previous.pts + 1,
                sync: false,
                value: STRAY_VALUE,
                position: previous.position,
                decodable: true,
            },
        );
        self
    }

    /// Creates a decoder over this stream plus a log of the offsets it was
    /// opened at.
    pub fn session(&self) -> (SyntheticSession, Arc<Mutex<Vec<u64>>>) {
        let opens = Arc::new(Mutex::new(Vec::new()));
        let session = SyntheticSession {
            frames: self.frames.clone(),
            cursor: self.frames.len(),
            opens: Arc::clone(&opens),
        };
        (session, opens)
    }
}

/// Decoder double reading a [`SyntheticStream`].
pub struct SyntheticSession {
    frames: Vec<StreamFrame>,
    cursor: usize,
    opens: Arc<Mutex<Vec<u64>>>,
}

impl DecoderSession for SyntheticSession {
    fn open(&mut self, byte_offset: u64) -> Result<(), DecoderError> {
        self.opens.lock().expect("open log").push(byte_offset);
        self.cursor = self
            .frames
            .iter()
            .position(|frame| frame.position >= byte_offset)
            .unwrap_or(self.frames.len());
        Ok(())
    }

    fn next_raw_frame(&mut self) -> Result<Option<RawFrame>, DecoderError> {
        while let Some(frame) = self.frames.get(self.cursor) {
            self.cursor += 1;
            if !frame.decodable {
                continue;
            }
            let format = format();
            let planes = (0..3)
                .map(|index| {
                    let (width, height) = format.plane_size(index);
                    Plane::filled(width, height, if index == 0 { frame.value } else { 128 })
                })
                .collect();
            let picture = Picture::from_planes(format, PictureType::Unknown, planes);
            return Ok(Some(RawFrame::new(mask_pts(frame.pts), frame.sync, picture)));
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<(), DecoderError> {
        Ok(())
    }

    fn output_format(&self) -> PictureFormat {
        format()
    }
}
