// SPDX-License-Identifier: MPL-2.0

//! Translation between raw engine status reports and playback sessions.
//!
//! The engine reports loosely typed, partially filled snapshots: numeric
//! fields may be absent mid-load, the phase arrives as a free-form string,
//! and error reports sometimes carry no message at all. The functions here
//! normalize those reports into well-formed values, so the state machine
//! only ever sees complete [`PlaybackSession`]s.

use crate::application::port::EngineStatus;
use crate::domain::{
    Media, NetworkBufferingState, Phase, PlaybackProgress, PlaybackSession, Volume,
};

/// Derives the coordinator phase from a raw status report.
///
/// Precedence, first match wins:
/// 1. an explicit `stopped` report, with or without a loaded path;
/// 2. an explicit `idle` report, or any report without a path;
/// 3. a recognized phase passes through unchanged;
/// 4. an unrecognized or missing phase keeps a current error phase sticky,
///    and otherwise falls back to idle.
pub fn derive_phase(status: &EngineStatus, current_phase: Phase) -> Phase {
    let reported = status.phase.as_deref().and_then(Phase::from_engine_str);
    match reported {
        Some(Phase::Stopped) => Phase::Stopped,
        Some(Phase::Idle) => Phase::Idle,
        _ if status.path.is_none() => Phase::Idle,
        Some(phase) => phase,
        None if current_phase == Phase::Error => Phase::Error,
        None => Phase::Idle,
    }
}

/// Builds a session from a status report.
///
/// `phase_override` replaces the engine's own phase string when the caller
/// has already derived the phase; without it the reported phase is parsed
/// and an unrecognized one maps to idle. Missing positions and durations
/// default to zero, a missing volume keeps `fallback_volume`, and an error
/// message is only carried when the resolved phase is [`Phase::Error`].
pub fn session_from_status(
    status: &EngineStatus,
    media: Option<Media>,
    phase_override: Option<Phase>,
    fallback_volume: Volume,
) -> PlaybackSession {
    let phase = phase_override
        .or_else(|| status.phase.as_deref().and_then(Phase::from_engine_str))
        .unwrap_or(Phase::Idle);
    let progress = PlaybackProgress::new(
        status.position.unwrap_or(0.0),
        status.duration.unwrap_or(0.0),
    );
    let volume = status
        .volume
        .map(Volume::from_engine)
        .unwrap_or(fallback_volume);
    let buffering = NetworkBufferingState {
        is_buffering: status.is_network_buffering,
        percent: status.network_buffering_percent.unwrap_or(0).min(100),
    };
    let error = if phase == Phase::Error {
        status.error_message.clone()
    } else {
        None
    };
    PlaybackSession {
        media,
        phase,
        progress,
        volume,
        buffering,
        error,
        is_seeking: status.is_seeking,
    }
}
