// SPDX-License-Identifier: MPL-2.0
//! This module handles the core's configuration, including loading and saving
//! tuning values to a `settings.toml` file.
//!
//! # Examples
//!
//! ```no_run
//! use projectionist::config::{self, Config};
//!
//! // Load existing configuration (or defaults when none exists)
//! let mut config = config::load().unwrap_or_default();
//!
//! // Modify a setting
//! config.playback.startup_volume = 60;
//!
//! // Save the modified configuration
//! config::save(&config).expect("Failed to save config");
//! ```

pub mod defaults;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "Projectionist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            timeline: TimelineConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

/// Tuning for the adaptive render scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Tick interval used before any frame rate is known (ms).
    pub default_interval_ms: u64,
    /// Lower clamp for FPS-derived and backpressure-shrunk intervals (ms).
    pub min_interval_ms: u64,
    /// Upper clamp for FPS-derived intervals (ms).
    pub max_interval_ms: u64,
    /// Render requests grouped into one throughput measurement.
    pub check_interval_requests: u32,
    /// Interval multiplier applied when the consumer falls behind.
    pub shrink_factor: f64,
    /// Observed/configured ratio below which the consumer is falling behind.
    pub falling_behind_ratio: f64,
    /// Observed/base ratio at which a shrunk interval is restored.
    pub recovery_ratio: f64,
    /// Quiet period after the last resize signal (ms).
    pub resize_debounce_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: defaults::DEFAULT_RENDER_INTERVAL_MS,
            min_interval_ms: defaults::MIN_RENDER_INTERVAL_MS,
            max_interval_ms: defaults::MAX_RENDER_INTERVAL_MS,
            check_interval_requests: defaults::RENDER_CHECK_INTERVAL_REQUESTS,
            shrink_factor: defaults::RENDER_SHRINK_FACTOR,
            falling_behind_ratio: defaults::RENDER_FALLING_BEHIND_RATIO,
            recovery_ratio: defaults::RENDER_RECOVERY_RATIO,
            resize_debounce_ms: defaults::RESIZE_DEBOUNCE_MS,
        }
    }
}

impl RenderConfig {
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Returns a copy with nonsensical values pulled back to defaults.
    /// Parsed files are normalized so a hand-edited zero or inverted
    /// min/max pair cannot wedge the scheduler.
    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        let fallback = Self::default();
        if cfg.min_interval_ms == 0 {
            cfg.min_interval_ms = fallback.min_interval_ms;
        }
        if cfg.max_interval_ms < cfg.min_interval_ms {
            cfg.max_interval_ms = cfg.min_interval_ms.max(fallback.max_interval_ms);
        }
        if cfg.default_interval_ms < cfg.min_interval_ms
            || cfg.default_interval_ms > cfg.max_interval_ms
        {
            cfg.default_interval_ms =
                fallback.default_interval_ms.clamp(cfg.min_interval_ms, cfg.max_interval_ms);
        }
        if cfg.check_interval_requests == 0 {
            cfg.check_interval_requests = fallback.check_interval_requests;
        }
        if !(cfg.shrink_factor > 0.0 && cfg.shrink_factor < 1.0) {
            cfg.shrink_factor = fallback.shrink_factor;
        }
        if !(cfg.falling_behind_ratio > 0.0 && cfg.falling_behind_ratio < 1.0) {
            cfg.falling_behind_ratio = fallback.falling_behind_ratio;
        }
        if !(cfg.recovery_ratio > cfg.falling_behind_ratio && cfg.recovery_ratio <= 1.0) {
            cfg.recovery_ratio = fallback.recovery_ratio.max(cfg.falling_behind_ratio);
        }
        if cfg.resize_debounce_ms == 0 {
            cfg.resize_debounce_ms = fallback.resize_debounce_ms;
        }
        cfg
    }
}

/// Tuning for the timeline broadcaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Interval between progress broadcasts while playing (ms).
    pub interval_ms: u64,
    /// Length of the protection window opened by a user seek (ms).
    pub seek_protection_ms: u64,
    /// Allowed deviation from the protected target before it overrides the
    /// reported position (seconds).
    pub seek_protection_tolerance_secs: f64,
    /// Whether the protected target overrides deviating readings.
    pub seek_protection_enabled: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::TIMELINE_INTERVAL_MS,
            seek_protection_ms: defaults::SEEK_PROTECTION_PERIOD_MS,
            seek_protection_tolerance_secs: defaults::SEEK_PROTECTION_TOLERANCE_SECS,
            seek_protection_enabled: defaults::DEFAULT_SEEK_PROTECTION_ENABLED,
        }
    }
}

impl TimelineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn seek_protection_window(&self) -> Duration {
        Duration::from_millis(self.seek_protection_ms)
    }

    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        let fallback = Self::default();
        if cfg.interval_ms == 0 {
            cfg.interval_ms = fallback.interval_ms;
        }
        if cfg.seek_protection_ms == 0 {
            cfg.seek_protection_ms = fallback.seek_protection_ms;
        }
        if !(cfg.seek_protection_tolerance_secs > 0.0)
            || !cfg.seek_protection_tolerance_secs.is_finite()
        {
            cfg.seek_protection_tolerance_secs = fallback.seek_protection_tolerance_secs;
        }
        cfg
    }
}

/// Playback settings the shell persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume applied at startup; written back on every volume change.
    pub startup_volume: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            startup_volume: defaults::DEFAULT_STARTUP_VOLUME,
        }
    }
}

impl PlaybackConfig {
    pub fn normalized(&self) -> Self {
        Self {
            startup_volume: self.startup_volume.min(100),
        }
    }
}

impl Config {
    /// Returns a copy with every section normalized.
    pub fn normalized(&self) -> Self {
        Self {
            render: self.render.normalized(),
            timeline: self.timeline.normalized(),
            playback: self.playback.normalized(),
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

pub fn load() -> Result<Config> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(Config::default())
}

pub fn save(config: &Config) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let parsed: Config = toml::from_str(&content).unwrap_or_default();
    Ok(parsed.normalized())
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
