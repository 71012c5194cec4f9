// SPDX-License-Identifier: MPL-2.0
//! Permanent substitutions for undecodable timeline ranges.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::domain::newtypes::FailureBudget;
use crate::error::{Error, Result};

/// Append-only map from failed timeline index to the index served instead.
///
/// Entries are overwritten when a later registration covers them again but
/// never removed.
#[derive(Debug, Clone, Default)]
pub struct FailureMap {
    replacements: BTreeMap<usize, usize>,
}

impl FailureMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps every index in `range` to `replacement`.
    pub fn register(&mut self, range: Range<usize>, replacement: usize) {
        log::info!(
            "Frames {}-{} could not be decoded, substituting frame {}",
            range.start,
            range.end.saturating_sub(1),
            replacement
        );
        for index in range {
            self.replacements.insert(index, replacement);
        }
    }

    /// Index to serve in place of `index`, if it failed.
    #[must_use]
    pub fn replacement(&self, index: usize) -> Option<usize> {
        self.replacements.get(&index).copied()
    }

    /// Number of substituted indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Checks the substituted share of a `total`-frame timeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFailedFrames`] once `budget` is exceeded.
    pub fn check_budget(&self, budget: FailureBudget, total: usize) -> Result<()> {
        let failed = self.len();
        if budget.is_exceeded(failed, total) {
            log::warn!(
                "{} of {} frames could not be decoded (budget {}%)",
                failed,
                total,
                budget.percent()
            );
            return Err(Error::TooManyFailedFrames { failed, total });
        }
        Ok(())
    }
}
