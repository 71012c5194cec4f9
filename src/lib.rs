// SPDX-License-Identifier: MPL-2.0
//! `ts_frame_source` exposes a frame-indexed, randomly seekable view over a
//! stream that can only be decoded sequentially.
//!
//! Consumers ask for frame `N` in any order. The engine decides whether to keep
//! decoding forward, restart from an earlier sync point, or hand back a
//! substitute frame when a region is provably undecodable. It always returns a
//! picture unless the session has exhausted its failure budget.
//!
//! The decoder itself sits behind the [`DecoderSession`] port; an `FFmpeg`
//! adapter is available with the `ffmpeg` feature.
//!
//! [`DecoderSession`]: application::port::DecoderSession

#![doc(html_root_url = "https://docs.rs/ts_frame_source/0.3.0")]

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod frame_source;
#[cfg(feature = "ffmpeg")]
pub mod infrastructure;
pub mod manifest;

pub use error::{Error, Result};
pub use frame_source::{FrameSource, SourceInfo, SourceStats};
