// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for frame source configuration.
//!
//! The clamping bounds themselves live next to the newtypes in
//! [`crate::domain::newtypes`]; this module re-exports the defaults under
//! flat names for configuration files and documentation.

use crate::domain::newtypes::{
    backoff_bounds, failure_budget_bounds, lookahead_bounds, seek_attempt_bounds,
};

// ==========================================================================
// Decode Controller Defaults
// ==========================================================================

/// Lookahead distance (frames past a sync point) a new session trusts.
pub const DEFAULT_LOOKAHEAD: usize = lookahead_bounds::DEFAULT;

/// Sync points tried before a region is registered as undecodable.
pub const DEFAULT_SEEK_ATTEMPTS: u32 = seek_attempt_bounds::DEFAULT;

/// Minimum number of frames a retry steps back.
pub const DEFAULT_BACKOFF_FRAMES: usize = backoff_bounds::DEFAULT;

// ==========================================================================
// Failure Budget Defaults
// ==========================================================================

/// Share of the timeline (percent) that may be substituted before the
/// session fails hard.
pub const DEFAULT_FAILURE_BUDGET_PERCENT: u32 = failure_budget_bounds::DEFAULT;
