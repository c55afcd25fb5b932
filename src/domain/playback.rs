// SPDX-License-Identifier: MPL-2.0
//! The immutable playback session model.
//!
//! A [`PlaybackSession`] is a wholesale snapshot of playback truth: which
//! media is loaded, which lifecycle [`Phase`] it is in, how far along it is,
//! and the error/seeking/buffering flags that qualify the phase. Sessions are
//! never mutated; every change produces a replacement snapshot, and the
//! invariant `phase == Error ⟺ error is Some` is upheld by the construction
//! helpers here and their call sites.

use chrono::{DateTime, Utc};

use super::media::Media;
use super::newtypes::Volume;

// =============================================================================
// Phase
// =============================================================================

/// Closed set of playback lifecycle states.
///
/// `Idle` is both the initial state and the target of every explicit reset;
/// reset is a terminal-then-restart transition rather than a regular edge,
/// so routing into `Idle` always travels the reset path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing loaded; the engine is quiescent.
    Idle,
    /// A play request was issued and the engine is opening the media.
    Loading,
    Playing,
    Paused,
    /// Playback was stopped explicitly; media has been released.
    Stopped,
    /// The engine reached end-of-stream.
    Ended,
    /// A fatal engine error; the session carries the message.
    Error,
}

impl Phase {
    /// Parses the engine's free-form phase vocabulary. Unknown strings
    /// yield `None`; the adapter decides the fallback.
    #[must_use]
    pub fn from_engine_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "idle" => Some(Phase::Idle),
            "loading" => Some(Phase::Loading),
            "playing" => Some(Phase::Playing),
            "paused" => Some(Phase::Paused),
            "stopped" => Some(Phase::Stopped),
            "ended" => Some(Phase::Ended),
            "error" => Some(Phase::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::Stopped => "stopped",
            Phase::Ended => "ended",
            Phase::Error => "error",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Position within the current media, recomputed wholesale on every update.
#[derive(Debug, Clone)]
pub struct PlaybackProgress {
    /// Seconds from the start of the media; never negative.
    pub current_time: f64,
    /// Total length in seconds; zero when unknown.
    pub duration: f64,
    /// Derived `current_time / duration` in percent; zero when the
    /// duration is unknown.
    pub percentage: f64,
    pub updated_at: DateTime<Utc>,
}

impl PlaybackProgress {
    /// Builds a progress snapshot, clamping negative readings to zero and
    /// deriving the percentage.
    #[must_use]
    pub fn new(current_time: f64, duration: f64) -> Self {
        let current_time = current_time.max(0.0);
        let duration = duration.max(0.0);
        let percentage = if duration > 0.0 {
            (current_time / duration) * 100.0
        } else {
            0.0
        };
        Self {
            current_time,
            duration,
            percentage,
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Default for PlaybackProgress {
    fn default() -> Self {
        Self::zero()
    }
}

// =============================================================================
// Network buffering
// =============================================================================

/// Whether a network stream is currently stalled filling its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkBufferingState {
    pub is_buffering: bool,
    /// Fill level 0–100; meaningful only while buffering.
    pub percent: u8,
}

impl NetworkBufferingState {
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(percent: u8) -> Self {
        Self {
            is_buffering: true,
            percent: percent.min(100),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// Immutable snapshot of everything that is currently happening.
///
/// Construction sites maintain the invariant that `phase == Error` exactly
/// when `error` carries a message: [`with_phase`](Self::with_phase) clears
/// the error, [`with_error`](Self::with_error) sets the phase.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub media: Option<Media>,
    pub phase: Phase,
    pub progress: PlaybackProgress,
    pub volume: Volume,
    pub buffering: NetworkBufferingState,
    pub error: Option<String>,
    pub is_seeking: bool,
}

impl PlaybackSession {
    /// The reset shape: no media, zero progress, no error, not seeking,
    /// buffering cleared. Only the volume survives a reset.
    #[must_use]
    pub fn idle(volume: Volume) -> Self {
        Self {
            media: None,
            phase: Phase::Idle,
            progress: PlaybackProgress::zero(),
            volume,
            buffering: NetworkBufferingState::inactive(),
            error: None,
            is_seeking: false,
        }
    }

    /// Copy with a different (non-error) phase; any previous error is
    /// cleared. Routing into `Error` goes through [`with_error`](Self::with_error).
    #[must_use]
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            error: None,
            ..self.clone()
        }
    }

    /// Copy carrying a fatal engine error.
    #[must_use]
    pub fn with_error(&self, message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Error,
            error: Some(message.into()),
            ..self.clone()
        }
    }

    /// Playing or paused; the phases in which the media is loaded and the
    /// engine is positioned somewhere within it.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Playing | Phase::Paused)
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// A seek makes sense only with a known duration, an active phase, and
    /// no seek already in flight.
    #[must_use]
    pub fn can_seek(&self) -> bool {
        self.progress.duration > 0.0 && self.is_active() && !self.is_seeking
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::idle(Volume::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_parses_engine_vocabulary_case_insensitively() {
        assert_eq!(Phase::from_engine_str("playing"), Some(Phase::Playing));
        assert_eq!(Phase::from_engine_str("Paused"), Some(Phase::Paused));
        assert_eq!(Phase::from_engine_str("STOPPED"), Some(Phase::Stopped));
        assert_eq!(Phase::from_engine_str(" ended "), Some(Phase::Ended));
        assert_eq!(Phase::from_engine_str("borked"), None);
        assert_eq!(Phase::from_engine_str(""), None);
    }

    #[test]
    fn phase_round_trips_through_as_str() {
        for phase in [
            Phase::Idle,
            Phase::Loading,
            Phase::Playing,
            Phase::Paused,
            Phase::Stopped,
            Phase::Ended,
            Phase::Error,
        ] {
            assert_eq!(Phase::from_engine_str(phase.as_str()), Some(phase));
        }
    }

    #[test]
    fn progress_derives_percentage() {
        let progress = PlaybackProgress::new(25.0, 100.0);
        assert_eq!(progress.percentage, 25.0);
    }

    #[test]
    fn progress_without_duration_has_zero_percentage() {
        let progress = PlaybackProgress::new(25.0, 0.0);
        assert_eq!(progress.percentage, 0.0);
    }

    #[test]
    fn progress_clamps_negative_readings() {
        let progress = PlaybackProgress::new(-4.0, -1.0);
        assert_eq!(progress.current_time, 0.0);
        assert_eq!(progress.duration, 0.0);
    }

    #[test]
    fn buffering_active_clamps_percent() {
        let buffering = NetworkBufferingState::active(180);
        assert!(buffering.is_buffering);
        assert_eq!(buffering.percent, 100);
    }

    #[test]
    fn idle_session_is_the_reset_shape() {
        let session = PlaybackSession::idle(Volume::new(40));
        assert_eq!(session.phase, Phase::Idle);
        assert!(session.media.is_none());
        assert_eq!(session.progress.current_time, 0.0);
        assert_eq!(session.progress.duration, 0.0);
        assert!(session.error.is_none());
        assert!(!session.is_seeking);
        assert!(!session.buffering.is_buffering);
        assert_eq!(session.volume.value(), 40);
    }

    #[test]
    fn with_phase_clears_a_previous_error() {
        let errored = PlaybackSession::default().with_error("decode failed");
        assert_eq!(errored.phase, Phase::Error);
        assert!(errored.has_error());

        let recovered = errored.with_phase(Phase::Loading);
        assert_eq!(recovered.phase, Phase::Loading);
        assert!(!recovered.has_error());
    }

    #[test]
    fn with_error_sets_phase_and_message_together() {
        let session = PlaybackSession::default().with_error("network lost");
        assert_eq!(session.phase, Phase::Error);
        assert_eq!(session.error.as_deref(), Some("network lost"));
    }

    #[test]
    fn active_predicates_cover_playing_and_paused() {
        let playing = PlaybackSession::default().with_phase(Phase::Playing);
        let paused = PlaybackSession::default().with_phase(Phase::Paused);
        let stopped = PlaybackSession::default().with_phase(Phase::Stopped);
        assert!(playing.is_active() && playing.is_playing());
        assert!(paused.is_active() && paused.is_paused());
        assert!(!stopped.is_active());
    }

    #[test]
    fn can_seek_requires_duration_active_and_not_seeking() {
        let mut session = PlaybackSession::default().with_phase(Phase::Playing);
        session.progress = PlaybackProgress::new(5.0, 60.0);
        assert!(session.can_seek());

        let mut seeking = session.clone();
        seeking.is_seeking = true;
        assert!(!seeking.can_seek());

        let mut no_duration = session.clone();
        no_duration.progress = PlaybackProgress::zero();
        assert!(!no_duration.can_seek());

        let idle = PlaybackSession::idle(Volume::default());
        assert!(!idle.can_seek());
    }
}
