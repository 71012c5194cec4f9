// SPDX-License-Identifier: MPL-2.0
//! Frame source configuration, loaded from and saved to a `frame_source.toml`
//! file.
//!
//! # Examples
//!
//! ```no_run
//! use ts_frame_source::config::{self, SourceConfig};
//! use ts_frame_source::domain::newtypes::SeekAttempts;
//!
//! let mut config = config::load().unwrap_or_default();
//! config.seek_attempts = SeekAttempts::new(5);
//! config::save(&config).expect("Failed to save config");
//! ```

mod defaults;

pub use defaults::*;

use crate::domain::newtypes::{Backoff, FailureBudget, Lookahead, SeekAttempts};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "frame_source.toml";
const APP_NAME: &str = "TsFrameSource";

/// Tuning of the decode controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Lookahead a new session starts with.
    #[serde(default)]
    pub initial_lookahead: Lookahead,
    /// Sync points tried per request before giving up on a region.
    #[serde(default)]
    pub seek_attempts: SeekAttempts,
    /// Minimum step back between retries.
    #[serde(default)]
    pub backoff: Backoff,
    /// Share of the timeline that may be substituted.
    #[serde(default)]
    pub failure_budget: FailureBudget,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            initial_lookahead: Lookahead::default(),
            seek_attempts: SeekAttempts::default(),
            backoff: Backoff::default(),
            failure_budget: FailureBudget::default(),
        }
    }
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

/// Loads the configuration from the platform config directory.
///
/// Returns defaults when no file exists.
pub fn load() -> Result<SourceConfig> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(SourceConfig::default())
}

/// Saves the configuration to the platform config directory.
pub fn save(config: &SourceConfig) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

/// Loads the configuration from `path`.
///
/// Out-of-range values are clamped by the newtypes; a malformed file is an
/// error rather than a silent default, since it usually means a typo.
pub fn load_from_path(path: &Path) -> Result<SourceConfig> {
    let content = fs::read_to_string(path)?;
    let config: SourceConfig = toml::from_str(&content)?;
    Ok(config.clamped())
}

pub fn save_to_path(config: &SourceConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

impl SourceConfig {
    // Deserialization bypasses the newtype constructors.
    fn clamped(self) -> Self {
        Self {
            initial_lookahead: Lookahead::new(self.initial_lookahead.value()),
            seek_attempts: SeekAttempts::new(self.seek_attempts.value()),
            backoff: Backoff::new(self.backoff.value()),
            failure_budget: FailureBudget::new(self.failure_budget.percent()),
        }
    }
}
