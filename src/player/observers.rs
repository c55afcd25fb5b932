// SPDX-License-Identifier: MPL-2.0

//! Fan-out registry for push-style subscribers.
//!
//! Each subscriber gets its own unbounded channel, keyed by an
//! [`ObserverId`] so it can be detached explicitly. Subscribers whose
//! receiving half has been dropped are pruned on the next emission, so a
//! leaked receiver cannot grow the registry forever.

use tokio::sync::mpsc;

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A set of live subscriber channels for values of type `T`.
#[derive(Debug)]
pub struct Observers<T> {
    next_id: u64,
    channels: Vec<(ObserverId, mpsc::UnboundedSender<T>)>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            channels: Vec::new(),
        }
    }

    /// Registers a new subscriber and returns its id with the receiving end.
    pub fn subscribe(&mut self) -> (ObserverId, mpsc::UnboundedReceiver<T>) {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.push((id, tx));
        (id, rx)
    }

    /// Removes the subscription with the given id.
    ///
    /// Returns `false` when the id is unknown or was already removed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.channels.len();
        self.channels.retain(|(channel_id, _)| *channel_id != id);
        self.channels.len() != before
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl<T: Clone> Observers<T> {
    /// Sends `value` to every live subscriber, dropping dead channels.
    pub fn emit(&mut self, value: &T) {
        self.channels
            .retain(|(_, tx)| tx.send(value.clone()).is_ok());
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}
