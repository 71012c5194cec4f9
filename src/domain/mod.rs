// SPDX-License-Identifier: MPL-2.0
//! Domain layer - core value types of a frame source.
//!
//! This module contains pure data types and their invariants. Apart from
//! `serde` derives for manifest persistence it depends on nothing but `std`.
//!
//! # Modules
//!
//! - [`audio`]: Audio index entries ([`AudioFrame`](audio::AudioFrame))
//! - [`error`]: Domain error types ([`DecoderError`](error::DecoderError))
//! - [`newtypes`]: Tuning values ([`Lookahead`](newtypes::Lookahead),
//!   [`SeekAttempts`](newtypes::SeekAttempts), [`FailureBudget`](newtypes::FailureBudget))
//! - [`picture`]: Planar pictures ([`Picture`](picture::Picture))
//! - [`timeline`]: Expected-frame timeline ([`Timeline`](timeline::Timeline))

pub mod audio;
pub mod error;
pub mod newtypes;
pub mod picture;
pub mod timeline;
