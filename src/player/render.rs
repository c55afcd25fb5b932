// SPDX-License-Identifier: MPL-2.0

//! Data-driven render pacing.
//!
//! The engine never pushes frames on its own; the shell asks for them. A
//! single loop ticks at an interval derived from the video frame rate and
//! decides from the current playback state, plus a handful of marks, whether
//! this tick should request a frame. Seeks and window resizes suppress
//! requests while in flight and force a single refresh once settled, and the
//! interval governor shrinks the tick when requests bunch up faster than the
//! configured cadence.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::application::port::MediaEngine;
use crate::config::RenderConfig;
use crate::domain::Phase;
use crate::player::state::StateProjection;

/// Render gating marks set by seek/resize notifications and consumed by the
/// pacing loop.
#[derive(Debug, Default, Clone, Copy)]
struct RenderMarks {
    is_resizing: bool,
    pending_seek_render: bool,
    pending_resize_render: bool,
}

/// Decides whether the current tick should request a frame.
///
/// The order is significant: an in-flight seek or resize suppresses
/// everything, a completed seek forces one render in any phase, a completed
/// resize forces one render only outside playback (the regular playing tick
/// covers it otherwise), and a plain playing phase renders.
fn should_render(marks: &mut RenderMarks, phase: Phase, is_seeking: bool) -> bool {
    if is_seeking {
        return false;
    }
    if marks.is_resizing {
        return false;
    }
    if marks.pending_seek_render {
        marks.pending_seek_render = false;
        return true;
    }
    if marks.pending_resize_render {
        marks.pending_resize_render = false;
        return phase != Phase::Playing;
    }
    phase == Phase::Playing
}

/// Adaptive tick interval.
///
/// The base interval is derived from the reported frame rate and clamped to
/// the configured bounds. Every `check_every` render requests the governor
/// compares the observed average request spacing against the current
/// interval: requests arriving appreciably faster than configured mean the
/// consumer is falling behind, so the interval shrinks; once the observed
/// cadence is back near the base, the interval is restored.
#[derive(Debug)]
struct IntervalGovernor {
    min: Duration,
    max: Duration,
    default: Duration,
    base: Duration,
    current: Duration,
    check_every: u32,
    shrink_factor: f64,
    falling_behind_ratio: f64,
    recovery_ratio: f64,
    request_count: u32,
    last_check: Option<Instant>,
}

impl IntervalGovernor {
    fn new(config: &RenderConfig) -> Self {
        let default = config.default_interval();
        Self {
            min: Duration::from_millis(config.min_interval_ms),
            max: Duration::from_millis(config.max_interval_ms),
            default,
            base: default,
            current: default,
            check_every: config.check_interval_requests,
            shrink_factor: config.shrink_factor,
            falling_behind_ratio: config.falling_behind_ratio,
            recovery_ratio: config.recovery_ratio,
            request_count: 0,
            last_check: None,
        }
    }

    fn current(&self) -> Duration {
        self.current
    }

    /// Re-derives the base interval from the reported frame rate and resets
    /// the throughput window.
    fn retune(&mut self, fps: Option<f64>) {
        self.base = match fps {
            Some(fps) if fps.is_finite() && fps > 0.1 => {
                Duration::from_millis((1000.0 / fps).round() as u64).clamp(self.min, self.max)
            }
            _ => self.default,
        };
        self.current = self.base;
        self.request_count = 0;
        self.last_check = None;
        debug!("render interval retuned to {:?} (fps {:?})", self.base, fps);
    }

    /// Accounts one render request at `now`.
    fn on_request(&mut self, now: Instant) {
        self.request_count += 1;
        if self.request_count < self.check_every {
            return;
        }
        self.request_count = 0;

        let Some(previous) = self.last_check.replace(now) else {
            // First full window only records the reference timestamp.
            return;
        };
        let average = now.duration_since(previous) / self.check_every;
        if average.is_zero() {
            return;
        }

        if average < self.current.mul_f64(self.falling_behind_ratio) {
            let shrunk = Duration::from_millis(
                self.current.mul_f64(self.shrink_factor).as_millis() as u64,
            )
            .max(self.min);
            if shrunk < self.current {
                info!(
                    "render requests bunching up (avg {:?}), shrinking interval {:?} -> {:?} (base {:?})",
                    average, self.current, shrunk, self.base
                );
                self.current = shrunk;
            }
        } else if average >= self.base.mul_f64(self.recovery_ratio) && self.current < self.base {
            info!(
                "render cadence recovered (avg {:?}), restoring interval to {:?}",
                average, self.base
            );
            self.current = self.base;
        }
    }
}

#[derive(Debug)]
struct Inner {
    marks: RenderMarks,
    governor: IntervalGovernor,
    resize_deadline: Option<Instant>,
    resize_debounce: Duration,
    loop_running: bool,
    // Bumped on every start so a loop from a previous start/stop cycle
    // cannot keep ticking next to its replacement.
    generation: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Owns the pacing loop and the render marks.
pub struct RenderScheduler {
    engine: Arc<dyn MediaEngine>,
    state_rx: watch::Receiver<StateProjection>,
    inner: Arc<Mutex<Inner>>,
    wake: Arc<Notify>,
}

impl RenderScheduler {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        config: RenderConfig,
        state_rx: watch::Receiver<StateProjection>,
    ) -> Self {
        Self {
            engine,
            state_rx,
            inner: Arc::new(Mutex::new(Inner {
                marks: RenderMarks::default(),
                governor: IntervalGovernor::new(&config),
                resize_deadline: None,
                resize_debounce: config.resize_debounce(),
                loop_running: false,
                generation: 0,
            })),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Starts the pacing loop. A second call while running is a no-op; the
    /// loop itself keeps running through every phase and renders only when
    /// the state says so.
    pub fn start(&self) {
        let (interval, generation) = {
            let mut guard = lock(&self.inner);
            if guard.loop_running {
                return;
            }
            guard.loop_running = true;
            guard.generation += 1;
            (guard.governor.current(), guard.generation)
        };
        info!("started render loop (interval {:?})", interval);
        tokio::spawn(run(
            self.engine.clone(),
            self.state_rx.clone(),
            self.inner.clone(),
            self.wake.clone(),
            generation,
        ));
    }

    /// Stops the loop and clears every mark.
    pub fn stop(&self) {
        {
            let mut guard = lock(&self.inner);
            if !guard.loop_running {
                return;
            }
            guard.loop_running = false;
            guard.marks = RenderMarks::default();
            guard.resize_deadline = None;
        }
        self.wake.notify_one();
        debug!("render loop stopping");
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner).loop_running
    }

    /// Current tick interval, after FPS retuning and backpressure.
    pub fn current_interval(&self) -> Duration {
        lock(&self.inner).governor.current()
    }

    /// Applies a frame-rate report; `None` falls back to the default
    /// interval. The loop picks the new cadence up immediately.
    pub fn update_fps(&self, fps: Option<f64>) {
        lock(&self.inner).governor.retune(fps);
        self.wake.notify_one();
    }

    /// Marks a completed seek; the next tick renders once in any phase.
    pub fn mark_seek_complete(&self) {
        lock(&self.inner).marks.pending_seek_render = true;
        debug!("seek completed, marked for render");
    }

    /// Marks a resize burst. Rendering is suppressed until no further resize
    /// arrives within the debounce window.
    pub fn mark_resize_start(&self) {
        let mut guard = lock(&self.inner);
        guard.marks.is_resizing = true;
        guard.resize_deadline = Some(Instant::now() + guard.resize_debounce);
    }
}

async fn run(
    engine: Arc<dyn MediaEngine>,
    state_rx: watch::Receiver<StateProjection>,
    inner: Arc<Mutex<Inner>>,
    wake: Arc<Notify>,
    generation: u64,
) {
    loop {
        let interval = {
            let guard = lock(&inner);
            if !guard.loop_running || guard.generation != generation {
                break;
            }
            guard.governor.current()
        };

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            // An interval change or a stop request invalidates this tick.
            _ = wake.notified() => continue,
        }

        let projection = state_rx.borrow().clone();
        let now = Instant::now();
        let request = {
            let mut guard = lock(&inner);
            if !guard.loop_running || guard.generation != generation {
                break;
            }
            if let Some(deadline) = guard.resize_deadline {
                if now >= deadline {
                    guard.resize_deadline = None;
                    guard.marks.is_resizing = false;
                    if projection.phase != Phase::Playing {
                        guard.marks.pending_resize_render = true;
                        debug!("resize stabilized, marked for render");
                    } else {
                        debug!("resize stabilized while playing, loop covers it");
                    }
                }
            }
            if should_render(&mut guard.marks, projection.phase, projection.is_seeking) {
                guard.governor.on_request(now);
                true
            } else {
                false
            }
        };
        if request {
            engine.request_render_frame();
        }
    }
    debug!("render loop stopped");
}
