// SPDX-License-Identifier: MPL-2.0
//! Media engine port definition.
//!
//! This module defines the [`MediaEngine`] trait that engine bindings
//! (libmpv, gstreamer, a scripted test double) implement, plus the status
//! snapshot and event types flowing back from the engine.
//!
//! # Design Notes
//!
//! - The engine is the only truly parallel collaborator: it decodes and
//!   renders internally. The core never blocks on it.
//! - Dispatch methods hand a command over and return immediately; whether
//!   the command *took effect* is learned from subsequent status events.
//! - The engine owns the sending half of an event channel
//!   ([`EngineEventSender`]); the core consumes the receiving half.

use tokio::sync::mpsc;

use crate::domain::media::Media;
use crate::domain::newtypes::Volume;
use crate::error::EngineError;

// =============================================================================
// Status snapshot
// =============================================================================

/// A point-in-time snapshot of the engine's own view of playback.
///
/// Fields mirror what a native engine can answer without blocking; anything
/// it does not track at that instant stays `None` and the status adapter
/// picks the fallback. The `phase` string is the engine's own vocabulary,
/// resolved to the closed [`Phase`](crate::domain::Phase) set downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStatus {
    /// Playback position in seconds.
    pub position: Option<f64>,
    /// Media duration in seconds.
    pub duration: Option<f64>,
    /// Engine-side volume, 0.0–100.0.
    pub volume: Option<f64>,
    /// Path or URI of the loaded media, when any is loaded.
    pub path: Option<String>,
    /// Free-form engine phase ("playing", "paused", ...).
    pub phase: Option<String>,
    /// A seek is in flight inside the engine.
    pub is_seeking: bool,
    /// A network stream is stalled filling its cache.
    pub is_network_buffering: bool,
    /// Cache fill level 0–100 while buffering.
    pub network_buffering_percent: Option<u8>,
    /// Fatal playback error reported by the engine.
    pub error_message: Option<String>,
}

// =============================================================================
// Events
// =============================================================================

/// Asynchronous engine-to-core notifications.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The engine pushed a fresh status snapshot.
    Status(EngineStatus),
    /// The estimated video frame rate changed. `None` means the engine
    /// lost track of it (or it became invalid); the render scheduler then
    /// falls back to its default interval.
    FrameRate(Option<f64>),
}

/// Sending half handed to the engine binding at construction.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half handed to the player facade at construction.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Creates the engine event channel. The binding keeps the sender, the
/// player facade consumes the receiver.
#[must_use]
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

// =============================================================================
// MediaEngine Trait
// =============================================================================

/// Port for the native media engine.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the command runners dispatch
/// mutating operations while the render scheduler requests frames and the
/// facade reads status, all holding the same shared handle. Bindings are
/// expected to synchronize internally (native engines already do).
///
/// # Discipline
///
/// Only the command runners and the facade's own operation paths call the
/// mutating methods. The render scheduler and timeline are read-only
/// consumers: they call [`request_render_frame`](Self::request_render_frame)
/// and [`get_status`](Self::get_status) and nothing else.
///
/// # Errors
///
/// Dispatch methods return [`EngineError`] when the command cannot be
/// handed over at all (engine gone, command channel broken). Playback
/// failures arrive later as status events carrying an error message.
pub trait MediaEngine: Send + Sync {
    /// Loads and starts the given media.
    fn play(&self, media: &Media) -> Result<(), EngineError>;

    /// Pauses playback. Idempotent when already paused.
    fn pause(&self) -> Result<(), EngineError>;

    /// Resumes paused playback. Idempotent when already playing.
    fn resume(&self) -> Result<(), EngineError>;

    /// Stops playback and releases the loaded media.
    fn stop(&self) -> Result<(), EngineError>;

    /// Jumps to the given position in seconds.
    fn seek(&self, time: f64) -> Result<(), EngineError>;

    /// Applies a validated volume.
    fn set_volume(&self, volume: Volume) -> Result<(), EngineError>;

    /// Toggles HDR output.
    fn set_hdr_enabled(&self, enabled: bool) -> Result<(), EngineError>;

    /// Forwards a raw key to the engine's own input handling.
    fn send_key(&self, key: &str) -> Result<(), EngineError>;

    /// Current status, or `None` when the engine cannot answer (not yet
    /// initialized or already torn down).
    fn get_status(&self) -> Option<EngineStatus>;

    /// Asks the engine to composite one frame into its render surface.
    /// Fire-and-forget; the render scheduler never waits on it.
    fn request_render_frame(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Test that the trait is object-safe
    fn _assert_object_safe(_: &dyn MediaEngine) {}

    #[derive(Debug, PartialEq)]
    enum Call {
        Play(String),
        Pause,
        Resume,
        Stop,
        Seek(f64),
        SetVolume(u8),
        SetHdr(bool),
        SendKey(String),
        RenderFrame,
    }

    #[derive(Default)]
    struct MockEngine {
        calls: Mutex<Vec<Call>>,
        status: Mutex<Option<EngineStatus>>,
    }

    impl MockEngine {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl MediaEngine for MockEngine {
        fn play(&self, media: &Media) -> Result<(), EngineError> {
            self.record(Call::Play(media.uri().to_string()));
            Ok(())
        }

        fn pause(&self) -> Result<(), EngineError> {
            self.record(Call::Pause);
            Ok(())
        }

        fn resume(&self) -> Result<(), EngineError> {
            self.record(Call::Resume);
            Ok(())
        }

        fn stop(&self) -> Result<(), EngineError> {
            self.record(Call::Stop);
            Ok(())
        }

        fn seek(&self, time: f64) -> Result<(), EngineError> {
            self.record(Call::Seek(time));
            Ok(())
        }

        fn set_volume(&self, volume: Volume) -> Result<(), EngineError> {
            self.record(Call::SetVolume(volume.value()));
            Ok(())
        }

        fn set_hdr_enabled(&self, enabled: bool) -> Result<(), EngineError> {
            self.record(Call::SetHdr(enabled));
            Ok(())
        }

        fn send_key(&self, key: &str) -> Result<(), EngineError> {
            self.record(Call::SendKey(key.to_string()));
            Ok(())
        }

        fn get_status(&self) -> Option<EngineStatus> {
            self.status.lock().unwrap().clone()
        }

        fn request_render_frame(&self) {
            self.record(Call::RenderFrame);
        }
    }

    #[test]
    fn mock_engine_records_dispatches() {
        let engine = MockEngine::default();
        let media = Media::from_uri("/videos/clip.mp4");

        engine.play(&media).unwrap();
        engine.pause().unwrap();
        engine.seek(12.5).unwrap();
        engine.set_volume(Volume::new(70)).unwrap();
        engine.request_render_frame();

        let calls = engine.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                Call::Play("/videos/clip.mp4".to_string()),
                Call::Pause,
                Call::Seek(12.5),
                Call::SetVolume(70),
                Call::RenderFrame,
            ]
        );
    }

    #[test]
    fn get_status_reflects_engine_state() {
        let engine = MockEngine::default();
        assert!(engine.get_status().is_none());

        *engine.status.lock().unwrap() = Some(EngineStatus {
            phase: Some("playing".to_string()),
            path: Some("/videos/clip.mp4".to_string()),
            position: Some(3.0),
            ..EngineStatus::default()
        });

        let status = engine.get_status().unwrap();
        assert_eq!(status.phase.as_deref(), Some("playing"));
        assert_eq!(status.position, Some(3.0));
    }

    #[test]
    fn event_channel_delivers_in_order() {
        let (tx, mut rx) = engine_event_channel();
        tx.send(EngineEvent::FrameRate(Some(24.0))).unwrap();
        tx.send(EngineEvent::Status(EngineStatus::default())).unwrap();

        assert!(matches!(rx.try_recv(), Ok(EngineEvent::FrameRate(Some(f))) if f == 24.0));
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::Status(_))));
    }
}
