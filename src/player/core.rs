// SPDX-License-Identifier: MPL-2.0

//! Player facade tying the engine port to the coordination machinery.
//!
//! [`Player`] owns the whole pipeline: an event pump feeding engine status
//! into the state machine, the gated command scheduler, the last-write-wins
//! scrub lane, the render scheduler and the timeline broadcaster. Shell code
//! talks to this type only; the engine is reached exclusively through the
//! [`MediaEngine`] port.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::port::{EngineEvent, EngineEventReceiver, EngineStatus, MediaEngine};
use crate::config::{self, Config};
use crate::domain::{Media, Phase, PlaybackSession, Volume};
use crate::error::{Error, Result};
use crate::player::gate::{CommandExecutor, CommandScheduler, PlayerCommand};
use crate::player::observers::{ObserverId, Observers};
use crate::player::queue::EnqueueStrategy;
use crate::player::render::RenderScheduler;
use crate::player::scrub::LastWriteWinsRunner;
use crate::player::state::{PlaybackStateMachine, StateProjection};
use crate::player::timeline::{TimelineBroadcaster, TimelineTick};

/// Queue id for the volume lane; rapid volume changes replace each other.
const VOLUME_TASK_ID: &str = "set-volume";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn validate_seek_time(time: f64) -> Result<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidSeekTime(time))
    }
}

fn validate_volume(volume: f64) -> Result<Volume> {
    if volume.is_finite() && (0.0..=100.0).contains(&volume) {
        Ok(Volume::new(volume.round() as u8))
    } else {
        Err(Error::InvalidVolume(volume))
    }
}

async fn await_completion(done: oneshot::Receiver<Result<()>>) -> Result<()> {
    match done.await {
        Ok(result) => result,
        Err(_) => Err(Error::Shutdown),
    }
}

/// State shared between the facade and its background tasks.
struct Shared {
    engine: Arc<dyn MediaEngine>,
    machine: Mutex<PlaybackStateMachine>,
    state_observers: Mutex<Observers<StateProjection>>,
    error_observers: Mutex<Observers<String>>,
    state_tx: watch::Sender<StateProjection>,
    timeline: TimelineBroadcaster,
    render: RenderScheduler,
    last_error: Mutex<Option<String>>,
}

impl Shared {
    /// Feeds one engine status report through the machine and fans out any
    /// resulting change.
    fn apply_status(&self, status: &EngineStatus) {
        let changed = lock(&self.machine).update_from_engine_status(status);
        if let Some(projection) = changed {
            self.fan_out(projection);
        }
    }

    /// Pulls a fresh status from the engine, for convergence right after a
    /// mutating dispatch instead of waiting for the next pushed event.
    fn refresh_status(&self) {
        if let Some(status) = self.engine.get_status() {
            self.apply_status(&status);
        }
    }

    /// Distributes one changed projection to every consumer: the internal
    /// watch feed, the render loop (started lazily on the first emission),
    /// the timeline and the external subscribers.
    fn fan_out(&self, projection: StateProjection) {
        let _ = self.state_tx.send(projection.clone());
        self.render.start();
        self.timeline.handle_phase_change(projection.phase);
        lock(&self.state_observers).emit(&projection);

        let mut last_error = lock(&self.last_error);
        if projection.error != *last_error {
            if let Some(message) = &projection.error {
                error!("playback error: {}", message);
                lock(&self.error_observers).emit(message);
            }
            *last_error = projection.error.clone();
        }
    }

    /// Executes one command against the engine. Runs inside the scheduler
    /// loop (or the scrub lane for coalesced seeks); completion is reported
    /// back through the task's channel.
    fn dispatch(&self, command: PlayerCommand) -> Result<()> {
        let label = command.label();
        let result = self.dispatch_inner(command);
        if let Err(dispatch_error) = &result {
            warn!("{} dispatch failed: {}", label, dispatch_error);
        }
        result
    }

    fn dispatch_inner(&self, command: PlayerCommand) -> Result<()> {
        match command {
            PlayerCommand::Play(media) => {
                let cleared = lock(&self.machine).reset_to_idle();
                if let Some(projection) = cleared {
                    self.fan_out(projection);
                }
                self.engine.play(&media)?;
                let loading = lock(&self.machine).begin_loading(media);
                if let Some(projection) = loading {
                    self.fan_out(projection);
                }
            }
            PlayerCommand::Pause => self.engine.pause()?,
            PlayerCommand::Resume => self.engine.resume()?,
            PlayerCommand::Stop => self.engine.stop()?,
            PlayerCommand::Seek(time) => {
                self.engine.seek(time)?;
                self.timeline.mark_seek(time);
                self.render.mark_seek_complete();
                self.refresh_status();
            }
            PlayerCommand::SetVolume(volume) => {
                self.engine.set_volume(volume)?;
                self.refresh_status();
            }
            PlayerCommand::SetHdrEnabled(enabled) => self.engine.set_hdr_enabled(enabled)?,
            PlayerCommand::SendKey(key) => self.engine.send_key(&key)?,
        }
        Ok(())
    }
}

/// The playback coordinator.
///
/// Construct with [`Player::new`] inside a Tokio runtime; the constructor
/// spawns the engine event pump and the command scheduler loop. Dropping the
/// player shuts everything down.
pub struct Player {
    shared: Arc<Shared>,
    scheduler: CommandScheduler,
    scrub: LastWriteWinsRunner<f64>,
    pump: JoinHandle<()>,
    config: Mutex<Config>,
    persist_path: Option<PathBuf>,
}

impl Player {
    /// Creates a player over `engine`, consuming its event stream. The
    /// configured startup volume seeds the initial session; nothing is
    /// written back to disk.
    pub fn new(engine: Arc<dyn MediaEngine>, events: EngineEventReceiver, config: Config) -> Self {
        Self::build(engine, events, config, None)
    }

    /// Like [`Player::new`], but volume changes are persisted to the
    /// configuration file at `path`.
    pub fn with_persistence(
        engine: Arc<dyn MediaEngine>,
        events: EngineEventReceiver,
        config: Config,
        path: PathBuf,
    ) -> Self {
        Self::build(engine, events, config, Some(path))
    }

    fn build(
        engine: Arc<dyn MediaEngine>,
        mut events: EngineEventReceiver,
        config: Config,
        persist_path: Option<PathBuf>,
    ) -> Self {
        let config = config.normalized();
        let machine = PlaybackStateMachine::new(Volume::new(config.playback.startup_volume));
        let (state_tx, state_rx) = watch::channel(machine.projection());
        let timeline = TimelineBroadcaster::new(config.timeline.clone(), state_rx.clone());
        let render = RenderScheduler::new(engine.clone(), config.render.clone(), state_rx.clone());

        let shared = Arc::new(Shared {
            engine,
            machine: Mutex::new(machine),
            state_observers: Mutex::new(Observers::new()),
            error_observers: Mutex::new(Observers::new()),
            state_tx,
            timeline,
            render,
            last_error: Mutex::new(None),
        });

        let executor: CommandExecutor = {
            let shared = shared.clone();
            Arc::new(move |command| {
                let shared = shared.clone();
                async move { shared.dispatch(command) }.boxed()
            })
        };
        let scheduler = CommandScheduler::spawn(executor, state_rx);

        let scrub = {
            let shared = shared.clone();
            LastWriteWinsRunner::new("scrub-seek", move |time: f64| {
                let shared = shared.clone();
                async move {
                    shared.dispatch(PlayerCommand::Seek(time))?;
                    shared.timeline.emit_now();
                    Ok(())
                }
                .boxed()
            })
        };

        let pump = {
            let shared = shared.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match event {
                        EngineEvent::Status(status) => shared.apply_status(&status),
                        EngineEvent::FrameRate(fps) => shared.render.update_fps(fps),
                    }
                }
                debug!("engine event stream closed");
            })
        };

        Self {
            shared,
            scheduler,
            scrub,
            pump,
            config: Mutex::new(config),
            persist_path,
        }
    }

    /// Starts playback of `uri`, clearing everything still queued. With a
    /// `start_time`, a phase-gated seek is queued behind the load and fires
    /// once the engine reaches playing or paused.
    pub async fn play(&self, uri: impl Into<String>, start_time: Option<f64>) -> Result<()> {
        if let Some(time) = start_time {
            validate_seek_time(time)?;
        }
        let media = Media::from_uri(uri);
        info!("play requested: {}", media.uri());

        let done = self.scheduler.schedule(
            PlayerCommand::Play(media),
            None,
            EnqueueStrategy::ClearAll,
            None,
        )?;
        if let Some(time) = start_time {
            // Parked until the load settles; the next play or stop clears it
            // if this one never does.
            let _ = self.scheduler.schedule(
                PlayerCommand::Seek(time),
                Some(Box::new(|phase| {
                    matches!(phase, Phase::Playing | Phase::Paused)
                })),
                EnqueueStrategy::Append,
                None,
            )?;
        }
        await_completion(done).await
    }

    pub async fn pause(&self) -> Result<()> {
        let done =
            self.scheduler
                .schedule(PlayerCommand::Pause, None, EnqueueStrategy::Append, None)?;
        await_completion(done).await
    }

    pub async fn resume(&self) -> Result<()> {
        let done =
            self.scheduler
                .schedule(PlayerCommand::Resume, None, EnqueueStrategy::Append, None)?;
        await_completion(done).await
    }

    /// Stops playback and clears everything still queued.
    pub async fn stop(&self) -> Result<()> {
        let done =
            self.scheduler
                .schedule(PlayerCommand::Stop, None, EnqueueStrategy::ClearAll, None)?;
        await_completion(done).await
    }

    /// Seeks to `time` through the scrub lane: a lone call runs immediately,
    /// a burst coalesces so only the newest target reaches the engine.
    pub fn seek(&self, time: f64) -> Result<()> {
        validate_seek_time(time)?;
        self.scrub.submit(time);
        Ok(())
    }

    /// Sets the volume. Queued with replacement, so a rapid sequence keeps
    /// only the newest value; on success the volume is written back to the
    /// configuration.
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = validate_volume(volume)?;
        let done = self.scheduler.schedule(
            PlayerCommand::SetVolume(volume),
            None,
            EnqueueStrategy::Replace,
            Some(VOLUME_TASK_ID),
        )?;
        await_completion(done).await?;
        self.persist_volume(volume);
        Ok(())
    }

    pub async fn set_hdr_enabled(&self, enabled: bool) -> Result<()> {
        let done = self.scheduler.schedule(
            PlayerCommand::SetHdrEnabled(enabled),
            None,
            EnqueueStrategy::Append,
            None,
        )?;
        await_completion(done).await
    }

    pub async fn send_key(&self, key: impl Into<String>) -> Result<()> {
        let done = self.scheduler.schedule(
            PlayerCommand::SendKey(key.into()),
            None,
            EnqueueStrategy::Append,
            None,
        )?;
        await_completion(done).await
    }

    /// Tells the render scheduler a window resize started, suppressing
    /// renders until the size stabilizes.
    pub fn notify_resize(&self) {
        self.shared.render.mark_resize_start();
    }

    /// Current session, refreshed from the engine first so the caller sees
    /// the newest reachable state rather than the last pushed event.
    pub fn current_session(&self) -> PlaybackSession {
        self.shared.refresh_status();
        lock(&self.shared.machine).session().clone()
    }

    pub fn current_projection(&self) -> StateProjection {
        lock(&self.shared.machine).projection()
    }

    /// Watch-style view of the state feed; always holds the latest
    /// projection.
    pub fn watch_state(&self) -> watch::Receiver<StateProjection> {
        self.shared.state_tx.subscribe()
    }

    /// Current pacing interval of the render loop.
    pub fn render_interval(&self) -> Duration {
        self.shared.render.current_interval()
    }

    pub fn subscribe_state(&self) -> (ObserverId, mpsc::UnboundedReceiver<StateProjection>) {
        lock(&self.shared.state_observers).subscribe()
    }

    pub fn unsubscribe_state(&self, id: ObserverId) -> bool {
        lock(&self.shared.state_observers).unsubscribe(id)
    }

    pub fn subscribe_timeline(&self) -> (ObserverId, mpsc::UnboundedReceiver<TimelineTick>) {
        self.shared.timeline.subscribe()
    }

    pub fn unsubscribe_timeline(&self, id: ObserverId) -> bool {
        self.shared.timeline.unsubscribe(id)
    }

    /// Error stream: fires once per newly surfaced playback error message.
    pub fn subscribe_errors(&self) -> (ObserverId, mpsc::UnboundedReceiver<String>) {
        lock(&self.shared.error_observers).subscribe()
    }

    pub fn unsubscribe_errors(&self, id: ObserverId) -> bool {
        lock(&self.shared.error_observers).unsubscribe(id)
    }

    /// Snapshot of the active configuration, including any volume written
    /// back since startup.
    pub fn config(&self) -> Config {
        lock(&self.config).clone()
    }

    /// Tears the pipeline down: the scrub lane stops accepting targets, the
    /// scheduler rejects everything queued, and the background loops stop.
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        info!("player shutting down");
        self.scrub.dispose();
        self.scheduler.shutdown();
        self.shared.render.stop();
        self.shared.timeline.shutdown();
        self.pump.abort();
    }

    fn persist_volume(&self, volume: Volume) {
        let snapshot = {
            let mut guard = lock(&self.config);
            guard.playback.startup_volume = volume.value();
            guard.clone()
        };
        if let Some(path) = &self.persist_path {
            if let Err(save_error) = config::save_to_path(&snapshot, path) {
                warn!("failed to persist volume: {}", save_error);
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shutdown();
    }
}
