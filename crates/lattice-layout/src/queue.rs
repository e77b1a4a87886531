//! Cross-thread mutation queue.
//!
//! Layout state is only touched by the thread that owns the [`UiQueue`].
//! Other threads hold a [`UiQueueHandle`] and submit closures; the owner runs
//! them in submission order with [`UiQueue::drain`].

use std::fmt;
use std::sync::mpsc;

type Job = Box<dyn FnOnce() + Send>;

/// Consumer side, owned by the UI thread.
pub struct UiQueue {
    sender: mpsc::Sender<Job>,
    receiver: mpsc::Receiver<Job>,
}

impl fmt::Debug for UiQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiQueue").finish_non_exhaustive()
    }
}

impl Default for UiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl UiQueue {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// A cloneable producer handle.
    pub fn handle(&self) -> UiQueueHandle {
        UiQueueHandle {
            sender: self.sender.clone(),
        }
    }

    /// Run every queued closure, oldest first. Returns how many ran.
    ///
    /// Closures queued while draining run in the same call.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        if ran > 0 {
            lattice_core::trace!(ran, "ui queue drained");
        }
        ran
    }

    /// Block until one closure arrives and run it.
    ///
    /// Returns `false` only if every sender is gone, which cannot happen
    /// while `self` holds its own sender.
    pub fn run_one(&self) -> bool {
        match self.receiver.recv() {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }
}

/// Producer side; clone freely and send across threads.
#[derive(Clone)]
pub struct UiQueueHandle {
    sender: mpsc::Sender<Job>,
}

impl fmt::Debug for UiQueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiQueueHandle").finish_non_exhaustive()
    }
}

impl UiQueueHandle {
    /// Queue `job` for the owning thread.
    pub fn run_on_owning_thread(
        &self,
        job: impl FnOnce() + Send + 'static,
    ) -> Result<(), QueueClosed> {
        self.sender.send(Box::new(job)).map_err(|_| QueueClosed)
    }
}

/// The [`UiQueue`] was dropped before the closure could be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ui queue is closed")
    }
}

impl std::error::Error for QueueClosed {}
