// SPDX-License-Identifier: MPL-2.0
//! Infrastructure layer adapters.
//!
//! This module contains concrete implementations of the port traits defined in
//! `application::port`.
//!
//! # Available Adapters
//!
//! - [`ffmpeg`]: Transport stream decoding via `FFmpeg` (implements [`DecoderSession`])
//!
//! [`DecoderSession`]: crate::application::port::DecoderSession

pub mod ffmpeg;

pub use ffmpeg::FfmpegDecoderSession;
