// SPDX-License-Identifier: MPL-2.0
//! Decode controller: turns random frame requests into sequential decoding.
//!
//! For each request the controller picks the cheapest way to get the frame:
//!
//! 1. **Cache**: the frame was already produced
//! 2. **Substitute**: the frame lies in a registered failure range
//! 3. **Forward**: the frame is a short distance past the last decoded one
//! 4. **Seek**: reposition at the frame's sync point, stepping back on failure
//!
//! When every seek attempt fails the affected range is registered in the
//! [`FailureMap`] and a neighbouring frame is served from then on. Exceeding
//! the failure budget poisons the controller.

use std::sync::Arc;

use crate::application::port::DecoderSession;
use crate::config::SourceConfig;
use crate::domain::newtypes::Lookahead;
use crate::domain::picture::{Picture, PictureFormat};
use crate::domain::timeline::Timeline;
use crate::error::{Error, Result};

use super::failure_map::FailureMap;
use super::field_merge::FieldMerger;
use super::frame_cache::FrameCache;
use super::matcher::{DecodeState, FrameMatcher};
use super::stats::{DecodeStats, SourceStats};

/// Owns a decoder session and everything needed to serve frames from it.
pub struct DecodeController<D: DecoderSession> {
    session: D,
    timeline: Timeline,
    matcher: FrameMatcher,
    cache: FrameCache,
    failures: FailureMap,
    state: DecodeState,
    lookahead: Lookahead,
    config: SourceConfig,
    stats: DecodeStats,
    /// Raw frames are dropped until one carries a sync hint.
    awaiting_sync: bool,
    poisoned: Option<Error>,
}

impl<D: DecoderSession> DecodeController<D> {
    /// Creates a controller over `session`.
    ///
    /// The session is not positioned until the first request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedConversion`] if the session's sample depth
    /// cannot be converted to its output depth.
    pub fn new(session: D, timeline: Timeline, config: SourceConfig) -> Result<Self> {
        let output = session.output_format();
        let merger = FieldMerger::select(session.source_bit_depth(), output.bit_depth)?;
        let lookahead = config.initial_lookahead;

        Ok(Self {
            session,
            timeline,
            matcher: FrameMatcher::new(merger, output),
            cache: FrameCache::new(lookahead.cache_capacity(), output),
            failures: FailureMap::new(),
            state: DecodeState::default(),
            lookahead,
            config,
            stats: DecodeStats::default(),
            awaiting_sync: true,
            poisoned: None,
        })
    }

    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    #[must_use]
    pub fn output_format(&self) -> PictureFormat {
        self.matcher.output_format()
    }

    #[must_use]
    pub fn lookahead(&self) -> Lookahead {
        self.lookahead
    }

    /// Index served in place of `index`, if its range failed to decode.
    #[must_use]
    pub fn replacement(&self, index: usize) -> Option<usize> {
        self.failures.replacement(index)
    }

    #[must_use]
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            decode: self.stats,
            cache: self.cache.stats(),
            cache_capacity: self.cache.capacity(),
            lookahead: self.lookahead.value(),
            substituted_frames: self.failures.len(),
        }
    }

    /// Returns output frame `n`, or its substitute.
    ///
    /// `n` is clamped to the timeline. A picture is always returned unless
    /// the decoder session fails or the failure budget is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::Decoder`] if the session cannot be repositioned or read
    /// - [`Error::TooManyFailedFrames`] once too much of the timeline has
    ///   been substituted; every later call returns the same error
    pub fn request_frame(&mut self, n: usize) -> Result<Arc<Picture>> {
        if let Some(error) = &self.poisoned {
            return Err(error.clone());
        }

        let result = self.serve(n.min(self.timeline.last_index()));
        if let Err(error @ Error::TooManyFailedFrames { .. }) = &result {
            self.poisoned = Some(error.clone());
        }
        result
    }

    fn serve(&mut self, n: usize) -> Result<Arc<Picture>> {
        let mut n = n;
        // Bounded in case later registrations chain replacements.
        for _ in 0..=self.failures.len() {
            if let Some(picture) = self.cache.get(n) {
                return Ok(picture);
            }
            match self.failures.replacement(n) {
                Some(replacement) if replacement != n => {
                    log::trace!("Frame {} substituted by {}", n, replacement);
                    n = replacement;
                }
                _ => break,
            }
        }

        if let Some(last) = self.state.last_decoded {
            if n > last && n - last <= self.lookahead.value() {
                self.stats.forward_decodes += 1;
                self.decode_until(n)?;
                if let Some(picture) = self.cache.get(n) {
                    return Ok(picture);
                }
                log::debug!("Forward decode from {} missed frame {}", last, n);
            }
        }

        self.seek_and_decode(n)
    }

    fn seek_and_decode(&mut self, n: usize) -> Result<Arc<Picture>> {
        let attempts = self.config.seek_attempts.value();
        let mut sync = self.timeline.frame(n).sync_point_index;
        let mut target = n;
        let mut registered = false;

        for attempt in 1..=attempts {
            self.seek_to(sync)?;
            self.decode_until(n)?;

            if self.cache.contains(n) {
                if self.lookahead.raise(n - sync) {
                    log::debug!("Lookahead raised to {}", self.lookahead.value());
                    self.cache.set_capacity(self.lookahead.cache_capacity());
                }
                break;
            }

            match self.state.last_decoded {
                Some(last) if last < n => {
                    self.register_failure(last + 1..self.timeline.len(), last);
                    target = last;
                    registered = true;
                    break;
                }
                last if sync == 0 || attempt == attempts => {
                    if let Some(last) = last {
                        self.register_failure(n..last, last);
                        target = last;
                        registered = true;
                    } else {
                        log::warn!("Nothing decoded from sync point {} toward frame {}", sync, n);
                    }
                    break;
                }
                _ => {
                    let previous = sync;
                    sync = self.back_off(sync);
                    log::debug!(
                        "Frame {} not reached from sync point {}, retrying from {}",
                        n,
                        previous,
                        sync
                    );
                }
            }
        }

        if registered {
            self.failures
                .check_budget(self.config.failure_budget, self.timeline.len())?;
        }
        Ok(self.cache.closest_or_empty(target))
    }

    fn seek_to(&mut self, sync: usize) -> Result<()> {
        let offset = self.timeline.seek_offset(sync);
        log::debug!("Seeking to sync point {} at byte {}", sync, offset);
        self.stats.seeks += 1;
        self.session.open(offset)?;
        self.session.reset()?;
        self.state.reset();
        self.awaiting_sync = true;
        Ok(())
    }

    /// Decodes until `n` is cached, decoding has passed it, or the stream
    /// ends.
    fn decode_until(&mut self, n: usize) -> Result<()> {
        while !self.cache.contains(n) && self.state.last_decoded.is_none_or(|last| last < n) {
            let Some(raw) = self.session.next_raw_frame()? else {
                log::debug!("End of stream before frame {}", n);
                return Ok(());
            };
            if self.awaiting_sync {
                if !raw.is_sync_hint {
                    self.stats.discarded_before_sync += 1;
                    continue;
                }
                self.awaiting_sync = false;
            }
            self.matcher.on_frame(
                raw,
                &self.timeline,
                &mut self.state,
                &mut self.cache,
                &mut self.stats,
            );
        }
        Ok(())
    }

    /// Sync point to retry from after `sync` failed. `sync` must be non-zero.
    fn back_off(&self, sync: usize) -> usize {
        let gop = sync - self.timeline.frame(sync - 1).sync_point_index;
        let step = gop.max(self.config.backoff.value());
        self.timeline.frame(sync.saturating_sub(step)).sync_point_index
    }

    fn register_failure(&mut self, range: std::ops::Range<usize>, replacement: usize) {
        if range.is_empty() {
            return;
        }
        self.stats.failure_registrations += 1;
        self.failures.register(range, replacement);
    }
}

impl<D: DecoderSession> std::fmt::Debug for DecodeController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeController")
            .field("frames", &self.timeline.len())
            .field("lookahead", &self.lookahead)
            .field("last_decoded", &self.state.last_decoded)
            .field("cache", &self.cache)
            .field("substituted", &self.failures.len())
            .field("poisoned", &self.poisoned.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::port::RawFrame;
    use crate::domain::error::DecoderError;
    use crate::domain::picture::{ChromaLayout, PictureType, Plane};
    use crate::domain::timeline::{TimelineFrame, TS_PACKET_SIZE};

    const STEP: i64 = 3003;
    const GOP: usize = 10;

    /// Emits frame `i` with sample value `i`, skipping `damaged` indices.
    struct ScriptedSession {
        len: usize,
        damaged: std::ops::Range<usize>,
        cursor: usize,
        opens: Vec<u64>,
        fail_open: bool,
        sync_hints: bool,
    }

    impl ScriptedSession {
        fn new(len: usize) -> Self {
            Self {
                len,
                damaged: 0..0,
                cursor: 0,
                opens: Vec::new(),
                fail_open: false,
                sync_hints: true,
            }
        }
    }

    fn format() -> PictureFormat {
        PictureFormat::new(2, 2, ChromaLayout::Gray, 8)
    }

    impl DecoderSession for ScriptedSession {
        fn open(&mut self, byte_offset: u64) -> std::result::Result<(), DecoderError> {
            if self.fail_open {
                return Err(DecoderError::SeekFailed("scripted".into()));
            }
            self.opens.push(byte_offset);
            self.cursor = (byte_offset / TS_PACKET_SIZE) as usize;
            Ok(())
        }

        fn next_raw_frame(&mut self) -> std::result::Result<Option<RawFrame>, DecoderError> {
            while self.damaged.contains(&self.cursor) {
                self.cursor += 1;
            }
            if self.cursor >= self.len {
                return Ok(None);
            }
            let index = self.cursor;
            self.cursor += 1;
            let picture = Picture::from_planes(
                format(),
                PictureType::Unknown,
                vec![Plane::filled(2, 2, index as u16)],
            );
            Ok(Some(RawFrame::new(
                index as i64 * STEP,
                self.sync_hints && index % GOP == 0,
                picture,
            )))
        }

        fn reset(&mut self) -> std::result::Result<(), DecoderError> {
            Ok(())
        }

        fn output_format(&self) -> PictureFormat {
            format()
        }
    }

    fn timeline(len: usize) -> Timeline {
        Timeline::new(
            (0..len)
                .map(|i| TimelineFrame::new(i as i64 * STEP, i / GOP * GOP, i as u64 * TS_PACKET_SIZE))
                .collect(),
        )
        .unwrap()
    }

    fn controller(session: ScriptedSession) -> DecodeController<ScriptedSession> {
        let len = session.len;
        DecodeController::new(session, timeline(len), SourceConfig::default()).unwrap()
    }

    fn value(picture: &Picture) -> u16 {
        picture.plane(0).samples()[0]
    }

    #[test]
    fn cold_request_seeks_to_sync_point() {
        let mut controller = controller(ScriptedSession::new(100));

        let picture = controller.request_frame(25).unwrap();

        assert_eq!(value(&picture), 25);
        assert_eq!(controller.session.opens, vec![20 * TS_PACKET_SIZE]);
        assert_eq!(controller.state.last_decoded, Some(25));
    }

    #[test]
    fn short_step_forward_does_not_seek() {
        let mut controller = controller(ScriptedSession::new(100));
        controller.request_frame(25).unwrap();

        let picture = controller.request_frame(30).unwrap();

        assert_eq!(value(&picture), 30);
        assert_eq!(controller.stats().decode.seeks, 1);
        assert_eq!(controller.stats().decode.forward_decodes, 1);
    }

    #[test]
    fn long_jump_forward_seeks() {
        let mut controller = controller(ScriptedSession::new(100));
        controller.request_frame(5).unwrap();

        controller.request_frame(80).unwrap();

        assert_eq!(controller.session.opens.last(), Some(&(80 * TS_PACKET_SIZE)));
    }

    #[test]
    fn out_of_range_request_is_clamped() {
        let mut controller = controller(ScriptedSession::new(40));
        assert_eq!(value(&controller.request_frame(1000).unwrap()), 39);
    }

    #[test]
    fn repeated_request_is_served_from_cache() {
        let mut controller = controller(ScriptedSession::new(40));
        let first = controller.request_frame(12).unwrap();
        let second = controller.request_frame(12).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(controller.stats().decode.seeks, 1);
    }

    #[test]
    fn success_far_from_sync_point_raises_lookahead() {
        let session = ScriptedSession::new(100);
        let timeline = Timeline::new(
            (0..100)
                .map(|i| TimelineFrame::new(i as i64 * STEP, 0, i as u64 * TS_PACKET_SIZE))
                .collect(),
        )
        .unwrap();
        let mut controller =
            DecodeController::new(session, timeline, SourceConfig::default()).unwrap();

        controller.request_frame(40).unwrap();

        assert_eq!(controller.lookahead().value(), 40);
        assert_eq!(controller.stats().cache_capacity, 60);
    }

    #[test]
    fn damaged_range_is_substituted_by_next_decodable_frame() {
        let mut session = ScriptedSession::new(100);
        session.damaged = 42..50;
        let mut controller = controller(session);

        let picture = controller.request_frame(45).unwrap();

        assert_eq!(value(&picture), 50);
        assert_eq!(controller.replacement(45), Some(50));
        assert_eq!(controller.replacement(49), Some(50));
        assert_eq!(controller.replacement(41), None);
        // Attempts from 40, 30 and 20.
        assert_eq!(controller.stats().decode.seeks, 3);

        let seeks = controller.stats().decode.seeks;
        assert_eq!(value(&controller.request_frame(47).unwrap()), 50);
        assert_eq!(controller.stats().decode.seeks, seeks);
    }

    #[test]
    fn truncated_stream_substitutes_last_frame() {
        let mut session = ScriptedSession::new(100);
        session.damaged = 90..100;
        let mut controller = controller(session);

        let picture = controller.request_frame(85).unwrap();
        assert_eq!(value(&picture), 85);

        let picture = controller.request_frame(95).unwrap();
        assert_eq!(value(&picture), 89);
        assert_eq!(controller.replacement(99), Some(89));
    }

    #[test]
    fn exhausted_budget_poisons_controller() {
        let mut session = ScriptedSession::new(100);
        session.damaged = 60..100;
        let mut controller = controller(session);

        let error = controller.request_frame(70).unwrap_err();
        assert_eq!(
            error,
            Error::TooManyFailedFrames {
                failed: 40,
                total: 100
            }
        );
        assert_eq!(controller.request_frame(0).unwrap_err(), error);
    }

    #[test]
    fn decoder_failure_is_propagated() {
        let mut session = ScriptedSession::new(10);
        session.fail_open = true;
        let mut controller = controller(session);

        assert!(matches!(
            controller.request_frame(3),
            Err(Error::Decoder(DecoderError::SeekFailed(_)))
        ));
    }

    #[test]
    fn frames_before_first_sync_hint_are_discarded() {
        // The timeline claims a sync point at 15 the decoder does not agree with.
        let timeline = Timeline::new(
            (0..40)
                .map(|i| {
                    let sync = if (15..20).contains(&i) { 15 } else { i / GOP * GOP };
                    TimelineFrame::new(i as i64 * STEP, sync, i as u64 * TS_PACKET_SIZE)
                })
                .collect(),
        )
        .unwrap();
        let mut controller =
            DecodeController::new(ScriptedSession::new(40), timeline, SourceConfig::default())
                .unwrap();

        let picture = controller.request_frame(18).unwrap();

        assert_eq!(value(&picture), 18);
        assert_eq!(controller.stats().decode.discarded_before_sync, 5);
        assert_eq!(
            controller.session.opens,
            vec![15 * TS_PACKET_SIZE, 10 * TS_PACKET_SIZE]
        );
    }

    #[test]
    fn damaged_range_in_first_gop_stops_after_one_seek() {
        let mut session = ScriptedSession::new(100);
        session.damaged = 3..8;
        let mut controller = controller(session);

        let picture = controller.request_frame(5).unwrap();

        assert_eq!(value(&picture), 8);
        assert_eq!(controller.session.opens, vec![0]);
        assert_eq!(controller.replacement(5), Some(8));
        assert_eq!(controller.replacement(7), Some(8));
        assert_eq!(controller.replacement(4), None);
        assert_eq!(controller.stats().decode.failure_registrations, 1);
    }

    #[test]
    fn session_without_sync_hints_yields_blank_picture() {
        let mut session = ScriptedSession::new(40);
        session.sync_hints = false;
        let mut controller = controller(session);

        let picture = controller.request_frame(5).unwrap();

        assert_eq!(picture.format(), format());
        assert_eq!(picture.planes().len(), 1);
        assert_eq!(controller.replacement(5), None);
        assert_eq!(controller.stats().substituted_frames, 0);
        assert_eq!(controller.stats().decode.seeks, 1);
        assert_eq!(controller.stats().decode.discarded_before_sync, 40);
    }

    #[test]
    fn session_without_sync_hints_retries_then_gives_up() {
        let mut session = ScriptedSession::new(40);
        session.sync_hints = false;
        let mut controller = controller(session);

        let picture = controller.request_frame(25).unwrap();

        assert_eq!(picture.format(), format());
        assert_eq!(
            controller.session.opens,
            vec![20 * TS_PACKET_SIZE, 10 * TS_PACKET_SIZE, 0]
        );
        assert_eq!(controller.stats().substituted_frames, 0);
    }
}
