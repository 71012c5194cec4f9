// SPDX-License-Identifier: MPL-2.0
//! Counters describing how a session has been decoding.

use super::frame_cache::CacheStats;

/// Decode-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Raw frames whose timestamp matched no timeline slot.
    pub unknown_pts: u64,

    /// Raw frames dropped after a reset while waiting for a sync point.
    pub discarded_before_sync: u64,

    /// Output frames built from two different decoded pictures.
    pub merged_frames: u64,

    /// Requests served by decoding forward without seeking.
    pub forward_decodes: u64,

    /// Decoder repositionings, retries included.
    pub seeks: u64,

    /// Failure ranges registered.
    pub failure_registrations: u64,
}

/// Snapshot of a frame source's state, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStats {
    pub decode: DecodeStats,
    pub cache: CacheStats,
    /// Current cache capacity.
    pub cache_capacity: usize,
    /// Current lookahead distance.
    pub lookahead: usize,
    /// Timeline indices currently served by a substitute.
    pub substituted_frames: usize,
}
