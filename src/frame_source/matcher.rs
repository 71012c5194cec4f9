// SPDX-License-Identifier: MPL-2.0
//! Matching of decoded frames to timeline slots.
//!
//! The decoder emits pictures in presentation order with its own timestamps.
//! The matcher finds the timeline slot each one belongs to, builds the output
//! frame(s) and stores them in the cache. A single decoded picture can feed
//! zero, one or two slots:
//!
//! - zero: unknown timestamp, or a half-delay slot with no previous picture
//! - one: a verbatim slot, or a half-delay slot merged with the previous picture
//! - two: when the next slot repeats the same timestamp
//!
//! # Timestamp wraparound
//!
//! Decoder timestamps are masked to 33 bits, while the timeline is unwrapped.
//! A query smaller than the first slot is retried one clock period later.
//! Only a single wrap inside the timeline is handled.

use std::sync::Arc;

use crate::application::port::RawFrame;
use crate::domain::picture::PictureFormat;
use crate::domain::timeline::{mask_pts, Timeline, PTS_WRAP};

use super::field_merge::FieldMerger;
use super::frame_cache::FrameCache;
use super::stats::DecodeStats;

/// Where a decoder timestamp falls on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Exact match with slot `index`.
    Slot(usize),

    /// Later than the final slot.
    ///
    /// `reached_goal` is true when being past the end is more plausible than
    /// being before the start, meaning decoding has run through the timeline.
    PastEnd { reached_goal: bool },

    /// Within the timeline but matching no slot (packet loss, corruption).
    Unknown { pts: i64 },
}

/// Locates a decoder timestamp on the timeline.
#[must_use]
pub fn resolve(timeline: &Timeline, raw_pts: i64) -> Resolution {
    let mut pts = mask_pts(raw_pts);
    let mut head_diff = 0;
    let mut index = timeline.lower_bound(pts);

    if index == 0 && pts < timeline.first_pts() {
        head_diff = timeline.first_pts() - pts;
        pts += PTS_WRAP;
        index = timeline.lower_bound(pts);
    }

    if index == timeline.len() {
        let tail_diff = pts - timeline.last_pts();
        return Resolution::PastEnd {
            reached_goal: head_diff == 0 || head_diff > tail_diff,
        };
    }

    if timeline.frame(index).original_pts != pts {
        return Resolution::Unknown { pts };
    }

    Resolution::Slot(index)
}

/// Mutable decode progress of a session.
#[derive(Debug, Default)]
pub struct DecodeState {
    /// Highest timeline index produced since the last reset.
    pub last_decoded: Option<usize>,

    /// Previous decoded picture, kept for half-delay merges.
    ///
    /// Cleared on any discontinuity so a merge never splices unrelated
    /// pictures.
    pub previous_raw: Option<RawFrame>,
}

impl DecodeState {
    /// Forgets all progress, as after a seek.
    pub fn reset(&mut self) {
        self.last_decoded = None;
        self.previous_raw = None;
    }
}

/// Turns decoded pictures into cached output frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameMatcher {
    merger: FieldMerger,
    output: PictureFormat,
}

impl FrameMatcher {
    #[must_use]
    pub fn new(merger: FieldMerger, output: PictureFormat) -> Self {
        Self { merger, output }
    }

    /// Output geometry of every produced frame.
    #[must_use]
    pub fn output_format(&self) -> PictureFormat {
        self.output
    }

    /// Matches one decoded picture and caches whatever it produces.
    ///
    /// Updates `state.last_decoded` for every slot produced or found already
    /// cached, and keeps `raw` as the merge partner for the next picture unless
    /// continuity was broken.
    pub fn on_frame(
        &self,
        raw: RawFrame,
        timeline: &Timeline,
        state: &mut DecodeState,
        cache: &mut FrameCache,
        stats: &mut DecodeStats,
    ) -> Resolution {
        let resolution = resolve(timeline, raw.pts);

        let index = match resolution {
            Resolution::Slot(index) => index,
            Resolution::PastEnd { reached_goal } => {
                if reached_goal {
                    state.last_decoded = Some(timeline.last_index());
                }
                state.previous_raw = None;
                return resolution;
            }
            Resolution::Unknown { pts } => {
                log::warn!("Unknown PTS frame {}", pts);
                stats.unknown_pts += 1;
                state.previous_raw = None;
                return resolution;
            }
        };

        let slot = timeline.frame(index);
        if slot.interlace_merge {
            if cache.touch(index) {
                state.last_decoded = Some(index);
            } else if let Some(previous) = &state.previous_raw {
                let merged = self.merger.merge(&previous.picture, &raw.picture, self.output);
                cache.put(index, Arc::new(merged));
                stats.merged_frames += 1;
                state.last_decoded = Some(index);
            } else {
                log::trace!("No previous picture for half-delay frame {}", index);
            }
        } else {
            if !cache.touch(index) {
                self.put_verbatim(index, &raw, cache);
            }
            state.last_decoded = Some(index);
        }

        let next = index + 1;
        if timeline
            .get(next)
            .is_some_and(|frame| frame.original_pts == slot.original_pts)
        {
            if !cache.touch(next) {
                self.put_verbatim(next, &raw, cache);
            }
            state.last_decoded = Some(next);
        }

        state.previous_raw = Some(raw);
        resolution
    }

    fn put_verbatim(&self, index: usize, raw: &RawFrame, cache: &mut FrameCache) {
        let picture = self.merger.merge(&raw.picture, &raw.picture, self.output);
        cache.put(index, Arc::new(picture));
    }
}
