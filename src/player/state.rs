// SPDX-License-Identifier: MPL-2.0

//! The playback state machine.
//!
//! A single [`PlaybackStateMachine`] owns the authoritative
//! [`PlaybackSession`] for the player. Every mutation builds a fresh session,
//! swaps it in, and reports a [`StateProjection`] only when an observable
//! field actually changed. Callers fan that projection out to subscribers;
//! a `None` return means the update was absorbed silently.

use tracing::debug;

use crate::application::port::EngineStatus;
use crate::domain::{Media, Phase, PlaybackSession, Volume};
use crate::player::adapter;

/// Fallback message for error reports that arrive without one.
const GENERIC_ERROR_MESSAGE: &str = "Playback error";

/// The observable slice of a playback session.
///
/// Two sessions are considered equivalent for broadcasting purposes exactly
/// when all of these fields match. Derived values such as the progress
/// percentage and the snapshot timestamp are deliberately excluded, so a
/// re-reported but unchanged status does not wake subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StateProjection {
    pub phase: Phase,
    pub current_time: f64,
    pub duration: f64,
    pub volume: Volume,
    pub path: Option<String>,
    pub error: Option<String>,
    pub is_seeking: bool,
    pub is_network_buffering: bool,
    pub network_buffering_percent: u8,
}

impl From<&PlaybackSession> for StateProjection {
    fn from(session: &PlaybackSession) -> Self {
        Self {
            phase: session.phase,
            current_time: session.progress.current_time,
            duration: session.progress.duration,
            volume: session.volume,
            path: session.media.as_ref().map(|m| m.uri().to_string()),
            error: session.error.clone(),
            is_seeking: session.is_seeking,
            is_network_buffering: session.buffering.is_buffering,
            network_buffering_percent: session.buffering.percent,
        }
    }
}

/// Owns the current session and applies updates with change detection.
#[derive(Debug)]
pub struct PlaybackStateMachine {
    session: PlaybackSession,
}

impl PlaybackStateMachine {
    pub fn new(initial_volume: Volume) -> Self {
        Self {
            session: PlaybackSession::idle(initial_volume),
        }
    }

    /// The current session snapshot.
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// The observable projection of the current session.
    pub fn projection(&self) -> StateProjection {
        StateProjection::from(&self.session)
    }

    /// Applies a raw engine status report.
    ///
    /// The phase is derived via [`adapter::derive_phase`], the media value is
    /// reused when the reported path matches the current one (so the media id
    /// stays stable across consecutive reports), and an error phase without a
    /// message falls back to the previous message or a generic one.
    pub fn update_from_engine_status(&mut self, status: &EngineStatus) -> Option<StateProjection> {
        let derived = adapter::derive_phase(status, self.session.phase);
        let media = status.path.as_deref().map(|path| match &self.session.media {
            Some(current) if current.uri() == path => current.clone(),
            _ => Media::from_uri(path),
        });

        let mut next =
            adapter::session_from_status(status, media, Some(derived), self.session.volume);
        if next.phase == Phase::Error && next.error.is_none() {
            next.error = self
                .session
                .error
                .clone()
                .or_else(|| Some(GENERIC_ERROR_MESSAGE.to_string()));
        }
        self.commit(next)
    }

    /// Marks the given media as loading.
    ///
    /// Progress restarts at zero, any previous error is cleared, and the
    /// volume carries over.
    pub fn begin_loading(&mut self, media: Media) -> Option<StateProjection> {
        let mut next = PlaybackSession::idle(self.session.volume);
        next.media = Some(media);
        next.phase = Phase::Loading;
        self.commit(next)
    }

    /// Moves the session to `phase` directly.
    ///
    /// `Idle` routes through [`Self::reset_to_idle`] and drops any supplied
    /// message. An error phase carries `error`, falling back to the previous
    /// message or a generic one; every other phase clears the error field.
    pub fn set_phase(&mut self, phase: Phase, error: Option<String>) -> Option<StateProjection> {
        match phase {
            Phase::Idle => self.reset_to_idle(),
            Phase::Error => {
                let message = error
                    .or_else(|| self.session.error.clone())
                    .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
                self.commit(self.session.with_error(message))
            }
            _ => self.commit(self.session.with_phase(phase)),
        }
    }

    /// Moves the session to the error phase with `message`.
    ///
    /// Any in-flight seek flag is dropped; a failed operation must not leave
    /// the player looking like it is still seeking.
    pub fn set_error(&mut self, message: impl Into<String>) -> Option<StateProjection> {
        let mut next = self.session.with_error(message);
        next.is_seeking = false;
        self.commit(next)
    }

    /// Returns to the idle session, preserving only the volume.
    pub fn reset_to_idle(&mut self) -> Option<StateProjection> {
        self.commit(PlaybackSession::idle(self.session.volume))
    }

    fn commit(&mut self, next: PlaybackSession) -> Option<StateProjection> {
        let prev = StateProjection::from(&self.session);
        let next_projection = StateProjection::from(&next);
        self.session = next;

        if next_projection == prev {
            return None;
        }
        if next_projection.phase != prev.phase {
            debug!(
                "phase changed: {} -> {}",
                prev.phase, next_projection.phase
            );
        }
        Some(next_projection)
    }
}

impl Default for PlaybackStateMachine {
    fn default() -> Self {
        Self::new(Volume::default())
    }
}
