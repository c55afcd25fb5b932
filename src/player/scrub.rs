// SPDX-License-Identifier: MPL-2.0

//! Last-write-wins execution for rapid-fire commands.
//!
//! A scrub of the progress bar can produce dozens of seek requests per
//! second. Only the newest one matters: each submission overwrites a single
//! pending slot, one task runs at a time, and when a run finishes the runner
//! picks up whatever is in the slot now. Intermediate payloads that were
//! overwritten before their turn are never executed.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use tracing::{debug, error};

use crate::error::Result;

type Action<P> = dyn Fn(P) -> BoxFuture<'static, Result<()>> + Send + Sync;

#[derive(Debug)]
struct Slot<P> {
    pending: Option<P>,
    running: bool,
    disposed: bool,
}

struct Inner<P> {
    label: &'static str,
    action: Box<Action<P>>,
    slot: Mutex<Slot<P>>,
}

impl<P> Inner<P> {
    fn slot(&self) -> MutexGuard<'_, Slot<P>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Coalescing runner: keeps at most one payload pending and runs the action
/// with the latest one.
pub struct LastWriteWinsRunner<P> {
    inner: Arc<Inner<P>>,
}

impl<P: Send + 'static> LastWriteWinsRunner<P> {
    pub fn new(
        label: &'static str,
        action: impl Fn(P) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                label,
                action: Box::new(action),
                slot: Mutex::new(Slot {
                    pending: None,
                    running: false,
                    disposed: false,
                }),
            }),
        }
    }

    /// Stores `payload` as the newest intent, starting a run if none is in
    /// flight. An already queued payload that has not started yet is
    /// overwritten and never executed.
    pub fn submit(&self, payload: P) {
        let start = {
            let mut slot = self.inner.slot();
            if slot.disposed {
                debug!("{}: submit ignored, runner disposed", self.inner.label);
                return;
            }
            slot.pending = Some(payload);
            if slot.running {
                false
            } else {
                slot.running = true;
                true
            }
        };
        if start {
            tokio::spawn(drive(self.inner.clone()));
        }
    }

    /// Stops accepting submissions and drops the payload still pending.
    /// A run already in flight completes normally.
    pub fn dispose(&self) {
        let mut slot = self.inner.slot();
        slot.disposed = true;
        slot.pending = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.slot().disposed
    }

    /// True when nothing is running and nothing is pending.
    pub fn is_idle(&self) -> bool {
        let slot = self.inner.slot();
        !slot.running && slot.pending.is_none()
    }
}

async fn drive<P: Send + 'static>(inner: Arc<Inner<P>>) {
    loop {
        let payload = {
            let mut slot = inner.slot();
            if slot.disposed {
                slot.running = false;
                return;
            }
            match slot.pending.take() {
                Some(payload) => payload,
                None => {
                    slot.running = false;
                    return;
                }
            }
        };

        debug!("{}: start task", inner.label);
        if let Err(e) = (inner.action)(payload).await {
            error!("{}: task failed: {}", inner.label, e);
        }
    }
}
