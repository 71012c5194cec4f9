// SPDX-License-Identifier: MPL-2.0
//! Random-access frame source engine.
//!
//! This module turns a strictly sequential [`DecoderSession`] into a
//! frame-indexed source:
//!
//! - [`matcher`]: assigns decoded pictures to timeline slots
//! - [`frame_cache`]: LRU store of produced frames
//! - [`controller`]: forward decoding, seeking, retries and substitution
//! - [`source`]: the locked public API
//!
//! [`DecoderSession`]: crate::application::port::DecoderSession

pub mod audio;
pub mod controller;
pub mod failure_map;
pub mod field_merge;
pub mod frame_cache;
pub mod matcher;
pub mod source;
pub mod stats;

pub use audio::AudioSampleReader;
pub use controller::DecodeController;
pub use failure_map::FailureMap;
pub use field_merge::FieldMerger;
pub use frame_cache::{CacheStats, FrameCache};
pub use matcher::{DecodeState, FrameMatcher, Resolution};
pub use source::{AudioInfo, AudioInput, FrameSource, SourceInfo};
pub use stats::{DecodeStats, SourceStats};
