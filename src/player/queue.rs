// SPDX-License-Identifier: MPL-2.0

//! Passive pending-command queue.
//!
//! The queue only stores tasks and applies enqueue strategies; it never runs
//! anything itself. Execution order and gating live in the scheduler that
//! drains it. Every task carries a completion channel, and a task that is
//! displaced before running is rejected through that channel rather than
//! silently dropped.

use std::collections::VecDeque;

use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::Phase;
use crate::error::{Error, Result};

pub(crate) const REASON_CLEARED: &str = "Queue cleared by new task";
pub(crate) const REASON_REPLACED: &str = "Task replaced by new task";
pub(crate) const REASON_QUEUE_DROPPED: &str = "Task queue cleared";

/// Predicate deciding whether a task may run in the given phase.
pub type TaskCondition = Box<dyn Fn(Phase) -> bool + Send>;

/// How a new task is merged into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueStrategy {
    /// Push to the back; everything already queued stays.
    Append,
    /// Remove queued tasks sharing this task's id first, rejecting them.
    Replace,
    /// Reject everything queued, then push this task alone.
    ClearAll,
}

/// A pending command with its gating condition and completion channel.
pub struct QueuedTask<T> {
    pub id: Option<String>,
    pub label: &'static str,
    pub payload: T,
    pub condition: Option<TaskCondition>,
    pub completion: oneshot::Sender<Result<()>>,
}

impl<T> QueuedTask<T> {
    /// Whether the task is allowed to run while the player is in `phase`.
    /// Tasks without a condition run in any phase.
    pub fn runnable_in(&self, phase: Phase) -> bool {
        self.condition.as_ref().map_or(true, |condition| condition(phase))
    }

    pub(crate) fn reject(self, reason: &str) {
        debug!("rejecting queued task {}: {}", self.label, reason);
        let _ = self
            .completion
            .send(Err(Error::Cancelled(reason.to_string())));
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for QueuedTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedTask")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("payload", &self.payload)
            .field("gated", &self.condition.is_some())
            .finish()
    }
}

/// FIFO store of pending tasks.
pub struct TaskQueue<T> {
    entries: VecDeque<QueuedTask<T>>,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Adds `task` according to `strategy`.
    pub fn add(&mut self, task: QueuedTask<T>, strategy: EnqueueStrategy) {
        match strategy {
            EnqueueStrategy::Append => {}
            EnqueueStrategy::Replace => {
                if let Some(id) = task.id.clone() {
                    self.remove_by_id(&id, REASON_REPLACED);
                }
            }
            EnqueueStrategy::ClearAll => self.clear(REASON_CLEARED),
        }
        self.entries.push_back(task);
    }

    /// The task at the head of the queue, if any.
    pub fn peek(&self) -> Option<&QueuedTask<T>> {
        self.entries.front()
    }

    /// Removes and returns the head task.
    pub fn pop(&mut self) -> Option<QueuedTask<T>> {
        self.entries.pop_front()
    }

    /// Rejects every queued task with `reason` and empties the queue.
    pub fn clear(&mut self, reason: &str) {
        while let Some(task) = self.entries.pop_front() {
            task.reject(reason);
        }
    }

    fn remove_by_id(&mut self, id: &str, reason: &str) {
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for task in self.entries.drain(..) {
            if task.id.as_deref() == Some(id) {
                task.reject(reason);
            } else {
                kept.push_back(task);
            }
        }
        self.entries = kept;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
