//! Request queue between a device frontend and its I/O worker.
//!
//! Producers [`enqueue`](BioQueue::enqueue) requests from any thread; a
//! single worker takes them in FIFO order. Shutdown is a three-step
//! handshake over [`QueueState`]:
//!
//! 1. the owner calls [`begin_drain`](BioQueue::begin_drain): no new requests
//!    are admitted,
//! 2. the worker keeps taking requests until the FIFO is empty, then sees
//!    [`Take::Shutdown`] and calls [`finish_drain`](BioQueue::finish_drain),
//! 3. [`await_drained`](BioQueue::await_drained) returns in the owner.
//!
//! Every request admitted before step 1 is therefore processed before step 3.

use std::collections::VecDeque;

use log::trace;
use parking_lot::{Condvar, Mutex};

use crate::Bio;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum QueueState {
    /// Requests are admitted.
    Ready,
    /// No new requests are admitted; the worker is emptying the queue.
    Draining,
    /// The worker has processed everything and stopped.
    Drained,
}

/// Result of [`BioQueue::take_first_blocking`].
#[derive(Debug)]
pub enum Take {
    Bio(Bio),
    Shutdown,
}

struct Inner {
    bios: VecDeque<Bio>,
    state: QueueState,
}

pub struct BioQueue {
    inner: Mutex<Inner>,
    /// Signalled when a request arrives or draining starts.
    work: Condvar,
    /// Signalled when the worker reaches `Drained`.
    drained: Condvar,
}

impl Default for BioQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BioQueue {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                bios: VecDeque::new(),
                state: QueueState::Ready,
            }),
            work: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// Appends `bio` to the queue.
    ///
    /// # Errors
    /// Hands `bio` back un-admitted if the queue is no longer [`QueueState::Ready`].
    pub fn enqueue(&self, bio: Bio) -> Result<(), Bio> {
        let mut inner = self.inner.lock();
        if inner.state != QueueState::Ready {
            trace!("bioq: rejecting {:?} in state {:?}", bio.cmd(), inner.state);
            return Err(bio);
        }
        inner.bios.push_back(bio);
        drop(inner);

        self.work.notify_one();
        Ok(())
    }

    /// Removes the oldest request, blocking while the queue is empty.
    ///
    /// Returns [`Take::Shutdown`] once draining has begun and no request is
    /// left.
    pub fn take_first_blocking(&self) -> Take {
        let mut inner = self.inner.lock();
        loop {
            if let Some(bio) = inner.bios.pop_front() {
                return Take::Bio(bio);
            }
            if inner.state != QueueState::Ready {
                return Take::Shutdown;
            }
            self.work.wait(&mut inner);
        }
    }

    /// Stops admitting requests and wakes the worker.
    pub fn begin_drain(&self) {
        let mut inner = self.inner.lock();
        if inner.state == QueueState::Ready {
            inner.state = QueueState::Draining;
        }
        drop(inner);

        self.work.notify_all();
    }

    /// Marks the queue drained and wakes every [`await_drained`](Self::await_drained)
    /// caller. Called by the worker on [`Take::Shutdown`].
    pub fn finish_drain(&self) {
        self.inner.lock().state = QueueState::Drained;
        self.drained.notify_all();
    }

    /// Blocks until the worker has called [`finish_drain`](Self::finish_drain).
    pub fn await_drained(&self) {
        let mut inner = self.inner.lock();
        while inner.state != QueueState::Drained {
            self.drained.wait(&mut inner);
        }
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        self.inner.lock().state
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().bios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().bios.is_empty()
    }
}
