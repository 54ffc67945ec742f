use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use super::controller::Controller;

#[derive(Debug)]
struct Channel {
    sender: Sender<Arc<Controller>>,
    receiver: Receiver<Arc<Controller>>,
}

/// Multi-producer, single-consumer FIFO of controllers awaiting a drain.
///
/// Producers are the controllers themselves: a controller pushes itself at
/// most once per synced-to-dirty transition. The consumer calls
/// [`process`](Self::process) once per frame.
#[derive(Debug, Clone)]
pub struct UpdateQueue {
    channel: Arc<Channel>,
}

impl Default for UpdateQueue {
    fn default() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            channel: Arc::new(Channel { sender, receiver }),
        }
    }
}

impl UpdateQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a controller.
    pub fn push(&self, controller: Arc<Controller>) {
        push(&self.channel, controller);
    }

    /// Removes the oldest controller without waiting.
    #[must_use]
    pub fn poll(&self) -> Option<Arc<Controller>> {
        self.channel.receiver.try_recv().ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channel.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channel.receiver.is_empty()
    }

    /// Drains queued controllers until the queue is empty.
    ///
    /// Controllers re-queued while this runs are drained in the same call.
    /// Returns the number of drains performed.
    pub fn process(&self) -> usize {
        let mut drained = 0;
        while let Some(controller) = self.poll() {
            controller.drain();
            drained += 1;
        }
        if drained > 0 {
            trace!(drained, "update queue processed");
        }
        drained
    }

    /// Returns a link that does not keep the queue alive.
    pub(crate) fn link(&self) -> QueueLink {
        QueueLink(Arc::downgrade(&self.channel))
    }
}

fn push(channel: &Channel, controller: Arc<Controller>) {
    // Both ends live in the same allocation, so the send cannot observe a
    // disconnected receiver.
    let _ = channel.sender.send(controller);
}

/// Weak producer end held by each controller.
///
/// Queued controllers would otherwise keep their own queue alive.
#[derive(Debug, Clone)]
pub(crate) struct QueueLink(Weak<Channel>);

impl QueueLink {
    /// Pushes `controller`. Returns `false` if the queue no longer exists.
    pub(crate) fn push(&self, controller: Arc<Controller>) -> bool {
        match self.0.upgrade() {
            Some(channel) => {
                push(&channel, controller);
                true
            }
            None => false,
        }
    }
}
