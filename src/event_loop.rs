//! Cooperative event loop on which snapshot deliveries are applied.
//!
//! The remote store may invoke listeners from any thread. Sync components
//! never touch their state from there; they schedule a task instead, and the
//! task runs when the owner drives the loop. Tasks run in the order they were
//! scheduled.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::debug;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Accepts tasks for later execution.
///
/// A task must never run before `schedule` returns: mirrors rely on their
/// first snapshot landing after `start_listening` has returned.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: Task);
}

/// Single-consumer task queue driven by its owner.
pub struct EventLoop {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// A clonable handle that schedules onto this loop.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            sender: self.sender.clone(),
        }
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run the tasks queued right now. Tasks they schedule wait for the next
    /// call. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let queued = self.receiver.len();
        let mut ran = 0;
        while ran < queued {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    /// Run until the queue is empty, including tasks scheduled meanwhile.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            debug!(ran, "event loop idle");
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Schedules onto an [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    sender: Sender<Task>,
}

impl Scheduler for LoopHandle {
    fn schedule(&self, task: Task) {
        // The loop owns a sender too, so this only fails once it is dropped,
        // and then nobody is left to observe the task.
        if self.sender.send(task).is_err() {
            debug!("event loop gone, task discarded");
        }
    }
}
