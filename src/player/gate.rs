// SPDX-License-Identifier: MPL-2.0

//! Phase-gated execution of queued engine commands.
//!
//! Commands pass through a single scheduling loop: one task runs at a time,
//! strictly in queue order, and a gated task parks the whole queue until the
//! player reaches a phase its condition accepts. The loop wakes on new
//! submissions and on state changes, so a parked command resumes the moment
//! the phase it waits for arrives.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::{Media, Volume};
use crate::error::{Error, Result};
use crate::player::queue::{
    EnqueueStrategy, QueuedTask, TaskCondition, TaskQueue, REASON_QUEUE_DROPPED,
};
use crate::player::state::StateProjection;

/// A control command addressed to the engine.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    Play(Media),
    Pause,
    Resume,
    Stop,
    Seek(f64),
    SetVolume(Volume),
    SetHdrEnabled(bool),
    SendKey(String),
}

impl PlayerCommand {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Seek(_) => "seek",
            Self::SetVolume(_) => "set-volume",
            Self::SetHdrEnabled(_) => "set-hdr",
            Self::SendKey(_) => "send-key",
        }
    }
}

/// Runs one command to completion. The scheduler awaits the returned future
/// before touching the next task, so implementations may dispatch to the
/// engine and refresh state without racing a later command.
pub type CommandExecutor =
    Arc<dyn Fn(PlayerCommand) -> BoxFuture<'static, Result<()>> + Send + Sync>;

enum Submission {
    Task {
        task: QueuedTask<PlayerCommand>,
        strategy: EnqueueStrategy,
    },
    Shutdown,
}

/// Handle to the scheduling loop.
pub struct CommandScheduler {
    submit_tx: mpsc::UnboundedSender<Submission>,
    handle: JoinHandle<()>,
}

impl CommandScheduler {
    /// Spawns the scheduling loop. `state_rx` supplies the phase that gating
    /// conditions are checked against.
    pub fn spawn(executor: CommandExecutor, state_rx: watch::Receiver<StateProjection>) -> Self {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(submit_rx, state_rx, executor));
        Self { submit_tx, handle }
    }

    /// Queues `command` and returns a channel resolving once it ran or was
    /// rejected. `id` only matters for [`EnqueueStrategy::Replace`].
    pub fn schedule(
        &self,
        command: PlayerCommand,
        condition: Option<TaskCondition>,
        strategy: EnqueueStrategy,
        id: Option<&str>,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        let (completion, done_rx) = oneshot::channel();
        let task = QueuedTask {
            id: id.map(str::to_string),
            label: command.label(),
            payload: command,
            condition,
            completion,
        };
        self.submit_tx
            .send(Submission::Task { task, strategy })
            .map_err(|_| Error::Shutdown)?;
        Ok(done_rx)
    }

    /// Stops the loop. Everything still queued is rejected, and later
    /// [`Self::schedule`] calls fail with [`Error::Shutdown`].
    pub fn shutdown(&self) {
        let _ = self.submit_tx.send(Submission::Shutdown);
    }
}

impl Drop for CommandScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

enum Ingest {
    Open,
    Closed,
}

/// Moves every already-submitted task into the queue without blocking.
fn ingest_pending(
    submit_rx: &mut mpsc::UnboundedReceiver<Submission>,
    queue: &mut TaskQueue<PlayerCommand>,
) -> Ingest {
    loop {
        match submit_rx.try_recv() {
            Ok(Submission::Task { task, strategy }) => queue.add(task, strategy),
            Ok(Submission::Shutdown) => return Ingest::Closed,
            Err(mpsc::error::TryRecvError::Empty) => return Ingest::Open,
            Err(mpsc::error::TryRecvError::Disconnected) => return Ingest::Closed,
        }
    }
}

async fn run(
    mut submit_rx: mpsc::UnboundedReceiver<Submission>,
    mut state_rx: watch::Receiver<StateProjection>,
    executor: CommandExecutor,
) {
    let mut queue: TaskQueue<PlayerCommand> = TaskQueue::new();
    'main: loop {
        tokio::select! {
            submission = submit_rx.recv() => {
                match submission {
                    Some(Submission::Task { task, strategy }) => queue.add(task, strategy),
                    Some(Submission::Shutdown) | None => break 'main,
                }
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    // State source is gone; nothing can unblock a gate anymore.
                    break 'main;
                }
            }
        }

        // Drain the queue head-first while the head's condition holds. A
        // parked head blocks everything behind it until the next state
        // change. Fresh submissions are ingested between tasks so a replace
        // or clear-all lands before the task it displaces gets to run.
        loop {
            if matches!(ingest_pending(&mut submit_rx, &mut queue), Ingest::Closed) {
                break 'main;
            }
            let phase = state_rx.borrow().phase;
            match queue.peek() {
                None => break,
                Some(head) if !head.runnable_in(phase) => {
                    debug!(
                        "task blocked: {} (waiting for state match, current: {})",
                        head.label, phase
                    );
                    break;
                }
                Some(_) => {}
            }

            let Some(task) = queue.pop() else { break };
            let QueuedTask {
                label,
                payload,
                completion,
                ..
            } = task;

            debug!("executing task: {}", label);
            let result = (executor)(payload).await;
            if let Err(e) = &result {
                error!("task failed: {}: {}", label, e);
            }
            let _ = completion.send(result);
        }
    }

    // Reject whatever is still pending so no caller hangs on a completion.
    submit_rx.close();
    while let Some(submission) = submit_rx.recv().await {
        if let Submission::Task { task, .. } = submission {
            task.reject(REASON_QUEUE_DROPPED);
        }
    }
    queue.clear(REASON_QUEUE_DROPPED);
    debug!("command scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Phase;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    fn projection(phase: Phase) -> StateProjection {
        StateProjection {
            phase,
            current_time: 0.0,
            duration: 0.0,
            volume: Volume::default(),
            path: None,
            error: None,
            is_seeking: false,
            is_network_buffering: false,
            network_buffering_percent: 0,
        }
    }

    fn describe(command: &PlayerCommand) -> String {
        match command {
            PlayerCommand::SetVolume(v) => format!("set-volume:{}", v.value()),
            PlayerCommand::Seek(t) => format!("seek:{t}"),
            other => other.label().to_string(),
        }
    }

    fn recording_executor(calls: Arc<Mutex<Vec<String>>>) -> CommandExecutor {
        Arc::new(move |command| {
            let calls = calls.clone();
            async move {
                calls.lock().unwrap().push(describe(&command));
                Ok(())
            }
            .boxed()
        })
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn playing_paused() -> TaskCondition {
        Box::new(|phase| matches!(phase, Phase::Playing | Phase::Paused))
    }

    #[tokio::test]
    async fn ungated_commands_run_in_submission_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Idle));
        let scheduler = CommandScheduler::spawn(recording_executor(calls.clone()), state_rx);

        let first = scheduler
            .schedule(PlayerCommand::Pause, None, EnqueueStrategy::Append, None)
            .unwrap();
        let second = scheduler
            .schedule(PlayerCommand::Resume, None, EnqueueStrategy::Append, None)
            .unwrap();

        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(*calls.lock().unwrap(), vec!["pause", "resume"]);
    }

    #[tokio::test]
    async fn gated_command_waits_for_a_matching_phase() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (state_tx, state_rx) = watch::channel(projection(Phase::Loading));
        let scheduler = CommandScheduler::spawn(recording_executor(calls.clone()), state_rx);

        let done = scheduler
            .schedule(
                PlayerCommand::Seek(30.0),
                Some(playing_paused()),
                EnqueueStrategy::Append,
                None,
            )
            .unwrap();

        settle().await;
        assert!(calls.lock().unwrap().is_empty(), "seek must stay parked");

        state_tx.send(projection(Phase::Playing)).unwrap();
        assert!(done.await.unwrap().is_ok());
        assert_eq!(*calls.lock().unwrap(), vec!["seek:30"]);
    }

    #[tokio::test]
    async fn parked_head_blocks_tasks_behind_it() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (state_tx, state_rx) = watch::channel(projection(Phase::Loading));
        let scheduler = CommandScheduler::spawn(recording_executor(calls.clone()), state_rx);

        let gated = scheduler
            .schedule(
                PlayerCommand::Seek(12.0),
                Some(playing_paused()),
                EnqueueStrategy::Append,
                None,
            )
            .unwrap();
        let behind = scheduler
            .schedule(PlayerCommand::Pause, None, EnqueueStrategy::Append, None)
            .unwrap();

        settle().await;
        assert!(calls.lock().unwrap().is_empty(), "queue is strictly ordered");

        state_tx.send(projection(Phase::Paused)).unwrap();
        assert!(gated.await.unwrap().is_ok());
        assert!(behind.await.unwrap().is_ok());
        assert_eq!(*calls.lock().unwrap(), vec!["seek:12", "pause"]);
    }

    #[tokio::test]
    async fn one_command_runs_at_a_time() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let executor: CommandExecutor = {
            let concurrent = concurrent.clone();
            let peak = peak.clone();
            Arc::new(move |_command| {
                let concurrent = concurrent.clone();
                let peak = peak.clone();
                async move {
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            })
        };

        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing));
        let scheduler = CommandScheduler::spawn(executor, state_rx);

        let mut completions = Vec::new();
        for _ in 0..5 {
            completions.push(
                scheduler
                    .schedule(PlayerCommand::Pause, None, EnqueueStrategy::Append, None)
                    .unwrap(),
            );
        }
        for done in completions {
            assert!(done.await.unwrap().is_ok());
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failing_command_resolves_its_completion_and_the_queue_continues() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let executor: CommandExecutor = {
            let calls = calls.clone();
            Arc::new(move |command| {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(describe(&command));
                    if matches!(command, PlayerCommand::Pause) {
                        return Err(Error::Engine(
                            crate::error::EngineError::Command("pause refused".to_string()),
                        ));
                    }
                    Ok(())
                }
                .boxed()
            })
        };

        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing));
        let scheduler = CommandScheduler::spawn(executor, state_rx);

        let failing = scheduler
            .schedule(PlayerCommand::Pause, None, EnqueueStrategy::Append, None)
            .unwrap();
        let following = scheduler
            .schedule(PlayerCommand::Resume, None, EnqueueStrategy::Append, None)
            .unwrap();

        assert!(failing.await.unwrap().is_err());
        assert!(following.await.unwrap().is_ok());
        assert_eq!(*calls.lock().unwrap(), vec!["pause", "resume"]);
    }

    #[tokio::test]
    async fn replace_displaces_queued_but_not_running_commands() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let gate = Arc::new(Semaphore::new(0));
        let first_call = Arc::new(AtomicBool::new(true));
        let executor: CommandExecutor = {
            let calls = calls.clone();
            let gate = gate.clone();
            let first_call = first_call.clone();
            Arc::new(move |command| {
                let calls = calls.clone();
                let gate = gate.clone();
                let first_call = first_call.clone();
                async move {
                    if first_call.swap(false, Ordering::SeqCst) {
                        gate.acquire().await.unwrap().forget();
                    }
                    calls.lock().unwrap().push(describe(&command));
                    Ok(())
                }
                .boxed()
            })
        };

        let (_state_tx, state_rx) = watch::channel(projection(Phase::Playing));
        let scheduler = CommandScheduler::spawn(executor, state_rx);

        let running = scheduler
            .schedule(
                PlayerCommand::SetVolume(Volume::new(30)),
                None,
                EnqueueStrategy::Replace,
                Some("set-volume"),
            )
            .unwrap();
        settle().await;

        let displaced = scheduler
            .schedule(
                PlayerCommand::SetVolume(Volume::new(50)),
                None,
                EnqueueStrategy::Replace,
                Some("set-volume"),
            )
            .unwrap();
        let latest = scheduler
            .schedule(
                PlayerCommand::SetVolume(Volume::new(70)),
                None,
                EnqueueStrategy::Replace,
                Some("set-volume"),
            )
            .unwrap();

        gate.add_permits(1);

        assert!(running.await.unwrap().is_ok(), "in-flight command finishes");
        match displaced.await.unwrap() {
            Err(error) => assert!(error.is_cancellation()),
            Ok(()) => panic!("displaced command must be rejected"),
        }
        assert!(latest.await.unwrap().is_ok());
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["set-volume:30", "set-volume:70"]
        );
    }

    #[tokio::test]
    async fn shutdown_rejects_parked_commands_and_later_submissions() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (_state_tx, state_rx) = watch::channel(projection(Phase::Idle));
        let scheduler = CommandScheduler::spawn(recording_executor(calls.clone()), state_rx);

        let parked = scheduler
            .schedule(
                PlayerCommand::Seek(5.0),
                Some(playing_paused()),
                EnqueueStrategy::Append,
                None,
            )
            .unwrap();

        settle().await;
        scheduler.shutdown();

        match parked.await.unwrap() {
            Err(error) => assert!(error.is_cancellation()),
            Ok(()) => panic!("parked command must be rejected on shutdown"),
        }

        settle().await;
        let refused = scheduler.schedule(PlayerCommand::Pause, None, EnqueueStrategy::Append, None);
        assert!(matches!(refused, Err(Error::Shutdown)));
        assert!(calls.lock().unwrap().is_empty());
    }
}
