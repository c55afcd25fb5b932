// SPDX-License-Identifier: MPL-2.0
//! Playback value newtypes.
//!
//! This module provides type-safe wrappers for playback values, ensuring
//! they are always within valid ranges.

// =============================================================================
// Volume
// =============================================================================

/// Volume bounds (0 to 100).
pub mod volume_bounds {
    /// Minimum volume level (muted).
    pub const MIN: u8 = 0;
    /// Maximum volume level.
    pub const MAX: u8 = 100;
    /// Default volume level.
    pub const DEFAULT: u8 = 100;
    /// Volume adjustment step per key press.
    pub const STEP: u8 = 5;
}

/// Volume level, guaranteed to be within valid range (0–100).
///
/// This newtype enforces validity at the type level, making it impossible
/// to create an out-of-range volume. Engine-reported floating-point volumes
/// are rounded and clamped on the way in; caller-supplied values are
/// validated (not clamped) at the command boundary before construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume(u8);

impl Volume {
    /// Creates a new volume level, clamping to valid range.
    #[must_use]
    pub fn new(volume: u8) -> Self {
        Self(volume.min(volume_bounds::MAX))
    }

    /// Creates a volume from an engine-reported float, rounding and
    /// clamping. Non-finite values collapse to the minimum.
    #[must_use]
    pub fn from_engine(volume: f64) -> Self {
        if !volume.is_finite() {
            return Self(volume_bounds::MIN);
        }
        let rounded = volume.round().clamp(volume_bounds::MIN as f64, volume_bounds::MAX as f64);
        Self(rounded as u8)
    }

    /// Returns the volume value (0–100).
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns true if the volume is fully muted.
    #[must_use]
    pub fn is_muted(self) -> bool {
        self.0 == volume_bounds::MIN
    }

    /// Increases volume by one step, clamping to maximum.
    #[must_use]
    pub fn increase(self) -> Self {
        Self::new(self.0.saturating_add(volume_bounds::STEP))
    }

    /// Decreases volume by one step, clamping to minimum.
    #[must_use]
    pub fn decrease(self) -> Self {
        Self(self.0.saturating_sub(volume_bounds::STEP))
    }

    /// Returns true if this is the maximum volume.
    #[must_use]
    pub fn is_max(self) -> bool {
        self.0 >= volume_bounds::MAX
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(volume_bounds::DEFAULT)
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
