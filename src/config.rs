//! Runtime tuning, loaded from `XDG_CONFIG_HOME/flickd/config.json`.
//!
//! A missing file means defaults; a malformed file logs a warning and falls
//! back to defaults. Out-of-band values are clamped rather than rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::input::ScrubConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Visible fraction a slide must reach to become active. Higher values
    /// reduce flicker during fast scrolls, at the cost of slower activation.
    pub activation_threshold: f64,
    /// Step size for the seek keys, in seconds.
    pub seek_step_secs: f64,
    /// Pointer travel before a drag classifies as scrub or scroll.
    pub scrub_arm_px: f64,
    /// How long after a scrub the terminating tap is swallowed.
    pub scrub_click_guard_ms: u64,
    /// Poster fetch/decode worker threads.
    pub poster_workers: usize,
    /// Decoded posters kept in memory.
    pub poster_cache_capacity: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            activation_threshold: 0.75,
            seek_step_secs: 5.0,
            scrub_arm_px: 8.0,
            scrub_click_guard_ms: 250,
            poster_workers: 2,
            poster_cache_capacity: 64,
        }
    }
}

impl Tuning {
    /// Load from the default XDG location, falling back to defaults when
    /// the file is absent or unreadable.
    pub fn load_default() -> Self {
        let path = match Self::config_path() {
            Ok(path) => path,
            Err(err) => {
                warn!(error = ?err, "Could not determine config directory; using defaults");
                return Self::default();
            }
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(tuning) => tuning,
            Err(err) => {
                warn!(path = %path.display(), error = ?err, "Malformed config; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let tuning: Tuning = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(tuning.clamped())
    }

    /// Returns the default config file path based on XDG directories.
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "flickd")
            .context("Failed to determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    pub fn scrub_config(&self) -> ScrubConfig {
        ScrubConfig {
            arm_threshold_px: self.scrub_arm_px,
            click_guard: Duration::from_millis(self.scrub_click_guard_ms),
        }
    }

    fn clamped(mut self) -> Self {
        self.activation_threshold = if self.activation_threshold.is_finite() {
            self.activation_threshold.clamp(0.6, 0.95)
        } else {
            Self::default().activation_threshold
        };
        self.seek_step_secs = if self.seek_step_secs.is_finite() {
            self.seek_step_secs.clamp(1.0, 60.0)
        } else {
            Self::default().seek_step_secs
        };
        self.scrub_arm_px = if self.scrub_arm_px.is_finite() {
            self.scrub_arm_px.clamp(2.0, 64.0)
        } else {
            Self::default().scrub_arm_px
        };
        self.scrub_click_guard_ms = self.scrub_click_guard_ms.clamp(50, 2000);
        self.poster_workers = self.poster_workers.clamp(1, 4);
        self.poster_cache_capacity = self.poster_cache_capacity.clamp(8, 1024);
        self
    }
}
