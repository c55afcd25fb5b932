// SPDX-License-Identifier: MPL-2.0

//! Periodic timeline broadcasts with seek protection.
//!
//! Progress reporting runs on its own channel, decoupled from the
//! change-driven state stream: while the player is in the playing phase a
//! ticker samples the current position on a fixed cadence and pushes it to
//! timeline subscribers. A user seek arms a protection window during which
//! stale position reports that deviate too far from the seek target are
//! overridden by the target, so the progress bar does not snap back while
//! the engine catches up.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::config::TimelineConfig;
use crate::domain::Phase;
use crate::player::observers::{ObserverId, Observers};
use crate::player::state::StateProjection;

/// One progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineTick {
    pub current_time: f64,
    pub duration: f64,
    pub updated_at: DateTime<Utc>,
}

/// An armed seek target and the instant it was set.
#[derive(Debug, Clone, Copy)]
struct SeekProtection {
    target: f64,
    armed_at: Instant,
}

/// Resolves the position to report while a protection window may be active.
///
/// Within the window, a reported position deviating from the target by more
/// than `tolerance` seconds is replaced by the target; positions close to it
/// pass through, since the engine has evidently caught up. An expired window
/// is cleared.
fn protected_position(
    protection: &mut Option<SeekProtection>,
    reported: f64,
    now: Instant,
    window: Duration,
    tolerance: f64,
) -> f64 {
    let Some(active) = *protection else {
        return reported;
    };
    if now.duration_since(active.armed_at) < window {
        if (reported - active.target).abs() > tolerance {
            active.target
        } else {
            reported
        }
    } else {
        *protection = None;
        reported
    }
}

struct Inner {
    current_time: f64,
    duration: f64,
    protection: Option<SeekProtection>,
    observers: Observers<TimelineTick>,
    ticker: Option<JoinHandle<()>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Clamps, stores and broadcasts one report.
fn emit(guard: &mut MutexGuard<'_, Inner>, current_time: f64, duration: f64) {
    guard.current_time = current_time.max(0.0);
    guard.duration = duration.max(0.0);
    let tick = TimelineTick {
        current_time: guard.current_time,
        duration: guard.duration,
        updated_at: Utc::now(),
    };
    guard.observers.emit(&tick);
}

/// Samples the state feed, applies seek protection, and broadcasts.
fn broadcast_current(
    inner: &Mutex<Inner>,
    state_rx: &watch::Receiver<StateProjection>,
    config: &TimelineConfig,
) {
    let projection = state_rx.borrow().clone();
    let mut guard = lock(inner);
    let position = if config.seek_protection_enabled {
        protected_position(
            &mut guard.protection,
            projection.current_time,
            Instant::now(),
            config.seek_protection_window(),
            config.seek_protection_tolerance_secs,
        )
    } else {
        projection.current_time
    };
    emit(&mut guard, position, projection.duration);
}

/// Owns the ticker, the protection window and the timeline subscribers.
pub struct TimelineBroadcaster {
    config: TimelineConfig,
    state_rx: watch::Receiver<StateProjection>,
    inner: Arc<Mutex<Inner>>,
}

impl TimelineBroadcaster {
    pub fn new(config: TimelineConfig, state_rx: watch::Receiver<StateProjection>) -> Self {
        Self {
            config,
            state_rx,
            inner: Arc::new(Mutex::new(Inner {
                current_time: 0.0,
                duration: 0.0,
                protection: None,
                observers: Observers::new(),
                ticker: None,
            })),
        }
    }

    pub fn subscribe(&self) -> (ObserverId, mpsc::UnboundedReceiver<TimelineTick>) {
        lock(&self.inner).observers.subscribe()
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        lock(&self.inner).observers.unsubscribe(id)
    }

    /// Reacts to a phase transition: the ticker runs exactly while playing,
    /// and entering idle or stopped forces a zero report so progress
    /// consumers reset immediately instead of showing the last position.
    pub fn handle_phase_change(&self, phase: Phase) {
        if phase == Phase::Playing {
            self.start_ticker();
        } else {
            self.stop_ticker();
        }
        if matches!(phase, Phase::Idle | Phase::Stopped) {
            let mut guard = lock(&self.inner);
            guard.protection = None;
            emit(&mut guard, 0.0, 0.0);
        }
    }

    /// Arms the protection window around a user seek target.
    pub fn mark_seek(&self, time: f64) {
        lock(&self.inner).protection = Some(SeekProtection {
            target: time.max(0.0),
            armed_at: Instant::now(),
        });
    }

    /// Broadcasts immediately instead of waiting for the next tick. Used
    /// right after a seek dispatch so the bar lands on the target at once.
    pub fn emit_now(&self) {
        broadcast_current(&self.inner, &self.state_rx, &self.config);
    }

    /// Stops the ticker without emitting anything.
    pub fn shutdown(&self) {
        self.stop_ticker();
    }

    fn start_ticker(&self) {
        let mut guard = lock(&self.inner);
        if guard.ticker.is_some() {
            return;
        }
        let inner = self.inner.clone();
        let state_rx = self.state_rx.clone();
        let config = self.config.clone();
        let period = self.config.interval();
        guard.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                broadcast_current(&inner, &state_rx, &config);
            }
        }));
        debug!("timeline ticker started ({:?})", period);
    }

    fn stop_ticker(&self) {
        if let Some(ticker) = lock(&self.inner).ticker.take() {
            ticker.abort();
            debug!("timeline ticker stopped");
        }
    }
}

impl Drop for TimelineBroadcaster {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Volume;

    fn projection(phase: Phase, current_time: f64, duration: f64) -> StateProjection {
        StateProjection {
            phase,
            current_time,
            duration,
            volume: Volume::default(),
            path: Some("/media/a.mkv".to_string()),
            error: None,
            is_seeking: false,
            is_network_buffering: false,
            network_buffering_percent: 0,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TimelineTick>) -> Vec<TimelineTick> {
        let mut ticks = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            ticks.push(tick);
        }
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn protection_overrides_deviating_positions_within_the_window() {
        let window = Duration::from_millis(2000);
        let armed_at = Instant::now();
        let mut protection = Some(SeekProtection {
            target: 100.0,
            armed_at,
        });

        // A stale report far from the target is overridden.
        let inside = armed_at + Duration::from_millis(500);
        assert_eq!(
            protected_position(&mut protection, 3.0, inside, window, 2.0),
            100.0
        );
        assert!(protection.is_some());

        // A report close to the target passes through.
        assert_eq!(
            protected_position(&mut protection, 99.5, inside, window, 2.0),
            99.5
        );

        // Past the window the protection clears and reports pass through.
        let after = armed_at + Duration::from_millis(2000);
        assert_eq!(
            protected_position(&mut protection, 3.0, after, window, 2.0),
            3.0
        );
        assert!(protection.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn no_protection_passes_reports_through() {
        let mut protection = None;
        assert_eq!(
            protected_position(
                &mut protection,
                42.0,
                Instant::now(),
                Duration::from_millis(2000),
                2.0
            ),
            42.0
        );
    }

    #[tokio::test]
    async fn idle_and_stopped_force_a_zero_report() {
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing, 55.0, 100.0));
        let timeline = TimelineBroadcaster::new(TimelineConfig::default(), state_rx);
        let (_, mut rx) = timeline.subscribe();

        timeline.handle_phase_change(Phase::Stopped);
        let ticks = drain(&mut rx);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].current_time, 0.0);
        assert_eq!(ticks[0].duration, 0.0);

        timeline.handle_phase_change(Phase::Idle);
        let ticks = drain(&mut rx);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].current_time, 0.0);
    }

    #[tokio::test]
    async fn pausing_does_not_force_a_zero_report() {
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing, 55.0, 100.0));
        let timeline = TimelineBroadcaster::new(TimelineConfig::default(), state_rx);
        let (_, mut rx) = timeline.subscribe();

        timeline.handle_phase_change(Phase::Paused);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_flow_while_playing_and_stop_when_paused() {
        let (state_tx, state_rx) = watch::channel(projection(Phase::Playing, 5.0, 100.0));
        let timeline = TimelineBroadcaster::new(TimelineConfig::default(), state_rx);
        let (_, mut rx) = timeline.subscribe();

        timeline.handle_phase_change(Phase::Playing);
        tokio::time::sleep(Duration::from_millis(350)).await;
        let ticks = drain(&mut rx);
        assert!(ticks.len() >= 3, "got {}", ticks.len());
        assert!(ticks.iter().all(|t| t.current_time == 5.0));
        assert!(ticks.iter().all(|t| t.duration == 100.0));

        timeline.handle_phase_change(Phase::Paused);
        tokio::time::sleep(Duration::from_millis(10)).await;
        drain(&mut rx);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(drain(&mut rx).is_empty(), "ticker must stop outside playing");

        let _ = state_tx;
    }

    #[tokio::test(start_paused = true)]
    async fn a_seek_pins_the_reported_position_to_the_target() {
        let (state_tx, state_rx) = watch::channel(projection(Phase::Playing, 3.0, 200.0));
        let timeline = TimelineBroadcaster::new(TimelineConfig::default(), state_rx);
        let (_, mut rx) = timeline.subscribe();

        timeline.mark_seek(100.0);
        timeline.emit_now();
        let ticks = drain(&mut rx);
        assert_eq!(ticks.last().map(|t| t.current_time), Some(100.0));

        // Engine caught up: close positions pass through.
        state_tx
            .send(projection(Phase::Playing, 99.4, 200.0))
            .unwrap();
        timeline.emit_now();
        let ticks = drain(&mut rx);
        assert_eq!(ticks.last().map(|t| t.current_time), Some(99.4));

        // Window expired: even a far-off report passes through again.
        state_tx
            .send(projection(Phase::Playing, 3.0, 200.0))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        timeline.emit_now();
        let ticks = drain(&mut rx);
        assert_eq!(ticks.last().map(|t| t.current_time), Some(3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn protection_can_be_disabled_by_configuration() {
        let config = TimelineConfig {
            seek_protection_enabled: false,
            ..TimelineConfig::default()
        };
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing, 3.0, 200.0));
        let timeline = TimelineBroadcaster::new(config, state_rx);
        let (_, mut rx) = timeline.subscribe();

        timeline.mark_seek(100.0);
        timeline.emit_now();
        let ticks = drain(&mut rx);
        assert_eq!(ticks.last().map(|t| t.current_time), Some(3.0));
    }

    #[tokio::test]
    async fn negative_reports_are_clamped_to_zero() {
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing, -4.0, -1.0));
        let timeline = TimelineBroadcaster::new(TimelineConfig::default(), state_rx);
        let (_, mut rx) = timeline.subscribe();

        timeline.emit_now();
        let ticks = drain(&mut rx);
        assert_eq!(ticks[0].current_time, 0.0);
        assert_eq!(ticks[0].duration, 0.0);
    }

    #[tokio::test]
    async fn unsubscribe_detaches_the_timeline_listener() {
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing, 1.0, 2.0));
        let timeline = TimelineBroadcaster::new(TimelineConfig::default(), state_rx);
        let (id, mut rx) = timeline.subscribe();

        assert!(timeline.unsubscribe(id));
        timeline.emit_now();
        assert!(drain(&mut rx).is_empty());
        assert!(!timeline.unsubscribe(id));
    }
}
