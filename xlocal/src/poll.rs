//! Poll readiness masks and per-file wake queues.
//!
//! A file's [`PollWaitQueue`] is how code outside the file learns that its
//! readiness may have changed. Channel code calls [`PollWaitQueue::wake`] on
//! the *peer* file; pollers sleep in [`PollWaitQueue::wait_for`].

use std::time::{Duration, Instant};

use bitflags::bitflags;
use parking_lot::{Condvar, Mutex};

bitflags! {
    /// Readiness bits, using the Linux `poll(2)` values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PollEvents: u32 {
        /// Data available to read.
        const IN = 0x001;
        /// Urgent data.
        const PRI = 0x002;
        /// Space available to write.
        const OUT = 0x004;
        /// Error condition.
        const ERR = 0x008;
        /// Peer receiver gone; writes fail.
        const HUP = 0x010;
        /// Invalid descriptor.
        const NVAL = 0x020;
        /// Peer sender gone; reads hit end-of-stream.
        const RDHUP = 0x2000;
    }
}

impl Default for PollEvents {
    fn default() -> Self {
        PollEvents::empty()
    }
}

#[derive(Debug, Default)]
struct WakeState {
    seq: u64,
    pending: PollEvents,
}

/// Wake-up point for threads polling one file.
#[derive(Debug, Default)]
pub struct PollWaitQueue {
    state: Mutex<WakeState>,
    cond: Condvar,
}

impl PollWaitQueue {
    /// Creates a queue with no pollers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `events` and wakes every poller.
    pub fn wake(&self, events: PollEvents) {
        let mut state = self.state.lock();
        state.seq = state.seq.wrapping_add(1);
        state.pending |= events;
        self.cond.notify_all();
    }

    /// Number of wakes so far.
    pub fn sequence(&self) -> u64 {
        self.state.lock().seq
    }

    /// Returns and clears the events accumulated by [`wake`](Self::wake).
    pub fn take_pending(&self) -> PollEvents {
        core::mem::take(&mut self.state.lock().pending)
    }

    /// Blocks until `ready` reports a non-empty mask or `timeout` passes.
    ///
    /// `ready` is evaluated without the queue lock held. A wake that lands
    /// between evaluating `ready` and going to sleep is never lost, since the
    /// sequence number is sampled first.
    pub fn wait_for<F>(&self, mut ready: F, timeout: Option<Duration>) -> PollEvents
    where
        F: FnMut() -> PollEvents,
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let seen = self.sequence();
            let revents = ready();
            if !revents.is_empty() {
                return revents;
            }

            let mut state = self.state.lock();
            while state.seq == seen {
                let Some(deadline) = deadline else {
                    self.cond.wait(&mut state);
                    continue;
                };
                if self.cond.wait_until(&mut state, deadline).timed_out() {
                    drop(state);
                    return ready();
                }
            }
        }
    }
}
