// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module serves as the single source of truth for default values
//! used across the playback core. Constants are organized by category.
//!
//! # Categories
//!
//! - **Render Scheduling**: tick interval bounds and backpressure tuning
//! - **Timeline**: progress tick rate and seek-protection window
//! - **Playback**: startup volume

// ==========================================================================
// Render Scheduling Defaults
// ==========================================================================

/// Default render tick interval when no frame rate has been reported (ms).
pub const DEFAULT_RENDER_INTERVAL_MS: u64 = 20;

/// Minimum render tick interval; floor for FPS-derived and shrunk intervals (ms).
pub const MIN_RENDER_INTERVAL_MS: u64 = 8;

/// Maximum render tick interval; ceiling for FPS-derived intervals (ms).
pub const MAX_RENDER_INTERVAL_MS: u64 = 42;

/// Number of render requests grouped into one throughput measurement.
pub const RENDER_CHECK_INTERVAL_REQUESTS: u32 = 10;

/// Multiplier applied to the tick interval when the consumer falls behind.
pub const RENDER_SHRINK_FACTOR: f64 = 0.75;

/// Observed/configured interval ratio below which the consumer counts as
/// falling behind.
pub const RENDER_FALLING_BEHIND_RATIO: f64 = 0.8;

/// Observed/base interval ratio at which a shrunk interval is restored.
pub const RENDER_RECOVERY_RATIO: f64 = 0.9;

/// Quiet period after the last resize signal before rendering resumes (ms).
pub const RESIZE_DEBOUNCE_MS: u64 = 100;

// ==========================================================================
// Timeline Defaults
// ==========================================================================

/// Interval between timeline progress broadcasts while playing (ms).
pub const TIMELINE_INTERVAL_MS: u64 = 100;

/// Length of the protection window opened by a user seek (ms).
pub const SEEK_PROTECTION_PERIOD_MS: u64 = 2000;

/// Allowed deviation between a reported position and the protected seek
/// target before the target overrides the reading (seconds).
pub const SEEK_PROTECTION_TOLERANCE_SECS: f64 = 2.0;

/// Whether the protected target overrides deviating readings on the
/// broadcast path.
pub const DEFAULT_SEEK_PROTECTION_ENABLED: bool = true;

// ==========================================================================
// Playback Defaults
// ==========================================================================

/// Volume applied at startup when no persisted value exists (0 to 100).
pub const DEFAULT_STARTUP_VOLUME: u8 = 100;

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    // Render interval validation
    assert!(MIN_RENDER_INTERVAL_MS > 0);
    assert!(MAX_RENDER_INTERVAL_MS >= MIN_RENDER_INTERVAL_MS);
    assert!(DEFAULT_RENDER_INTERVAL_MS >= MIN_RENDER_INTERVAL_MS);
    assert!(DEFAULT_RENDER_INTERVAL_MS <= MAX_RENDER_INTERVAL_MS);
    assert!(RENDER_CHECK_INTERVAL_REQUESTS > 0);
    assert!(RENDER_SHRINK_FACTOR > 0.0);
    assert!(RENDER_SHRINK_FACTOR < 1.0);
    assert!(RENDER_FALLING_BEHIND_RATIO > 0.0);
    assert!(RENDER_FALLING_BEHIND_RATIO < 1.0);
    assert!(RENDER_RECOVERY_RATIO > RENDER_FALLING_BEHIND_RATIO);
    assert!(RENDER_RECOVERY_RATIO <= 1.0);
    assert!(RESIZE_DEBOUNCE_MS > 0);

    // Timeline validation
    assert!(TIMELINE_INTERVAL_MS > 0);
    assert!(SEEK_PROTECTION_PERIOD_MS > 0);
    assert!(SEEK_PROTECTION_TOLERANCE_SECS > 0.0);

    // Playback validation
    assert!(DEFAULT_STARTUP_VOLUME <= 100);
};
