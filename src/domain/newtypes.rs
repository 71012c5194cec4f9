// SPDX-License-Identifier: MPL-2.0
//! Frame source tuning newtypes.
//!
//! These wrappers keep decode tuning values inside their valid ranges so the
//! controller never has to re-check them.

use serde::{Deserialize, Serialize};

// =============================================================================
// Lookahead
// =============================================================================

/// Lookahead bounds.
pub mod lookahead_bounds {
    /// Smallest lookahead; a distance of zero would disable forward decoding.
    pub const MIN: usize = 1;
    /// Lookahead a new session starts with.
    pub const DEFAULT: usize = 10;
}

/// Farthest distance past a sync point known to decode successfully.
///
/// Only ever grows: [`Lookahead::raise`] ignores smaller distances. It bounds
/// cheap forward decoding and sizes the frame cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lookahead(usize);

impl Lookahead {
    /// Creates a lookahead, clamping to the minimum.
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self(value.max(lookahead_bounds::MIN))
    }

    #[must_use]
    pub fn value(self) -> usize {
        self.0
    }

    /// Widens the lookahead to `distance` if it is larger.
    ///
    /// Returns true if the value changed.
    pub fn raise(&mut self, distance: usize) -> bool {
        if distance > self.0 {
            self.0 = distance;
            true
        } else {
            false
        }
    }

    /// Frame cache capacity for this lookahead: `ceil(1.5 * lookahead)`.
    #[must_use]
    pub fn cache_capacity(self) -> usize {
        (self.0 * 3).div_ceil(2).max(1)
    }
}

impl Default for Lookahead {
    fn default() -> Self {
        Self(lookahead_bounds::DEFAULT)
    }
}

// =============================================================================
// SeekAttempts
// =============================================================================

/// Seek attempt bounds.
pub mod seek_attempt_bounds {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;
    pub const DEFAULT: u32 = 3;
}

/// Number of sync points tried before a region is declared undecodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekAttempts(u32);

impl SeekAttempts {
    /// Creates a new attempt count, clamping to valid range.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value.clamp(seek_attempt_bounds::MIN, seek_attempt_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for SeekAttempts {
    fn default() -> Self {
        Self(seek_attempt_bounds::DEFAULT)
    }
}

// =============================================================================
// Backoff
// =============================================================================

/// Backoff bounds, in frames.
pub mod backoff_bounds {
    pub const MIN: usize = 1;
    pub const MAX: usize = 300;
    pub const DEFAULT: usize = 5;
}

/// Minimum distance a retry steps back from the failed sync point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff(usize);

impl Backoff {
    /// Creates a new backoff, clamping to valid range.
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self(value.clamp(backoff_bounds::MIN, backoff_bounds::MAX))
    }

    #[must_use]
    pub fn value(self) -> usize {
        self.0
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self(backoff_bounds::DEFAULT)
    }
}

// =============================================================================
// FailureBudget
// =============================================================================

/// Failure budget bounds, in percent of the timeline.
pub mod failure_budget_bounds {
    pub const MIN: u32 = 0;
    pub const MAX: u32 = 100;
    pub const DEFAULT: u32 = 10;
}

/// Share of the timeline that may be silently substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBudget(u32);

impl FailureBudget {
    /// Creates a new budget in percent, clamping to valid range.
    #[must_use]
    pub fn new(percent: u32) -> Self {
        Self(percent.clamp(failure_budget_bounds::MIN, failure_budget_bounds::MAX))
    }

    #[must_use]
    pub fn percent(self) -> u32 {
        self.0
    }

    /// True once `failed` substituted frames exceed the budget for `total`.
    #[must_use]
    pub fn is_exceeded(self, failed: usize, total: usize) -> bool {
        failed as u128 * 100 > total as u128 * u128::from(self.0)
    }
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self(failure_budget_bounds::DEFAULT)
    }
}
