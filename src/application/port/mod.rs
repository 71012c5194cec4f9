// SPDX-License-Identifier: MPL-2.0
//! Port definitions (traits) for dependency inversion.
//!
//! # Available Ports
//!
//! - [`decoder`]: Sequential decoding from a byte position
//!
//! # Design Notes
//!
//! - Traits use domain types only (no `FFmpeg` types)
//! - Methods return `Result` with domain error types

pub mod decoder;

pub use decoder::{DecoderSession, RawFrame};
