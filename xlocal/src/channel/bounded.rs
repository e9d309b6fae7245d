//! Capacity-limited FIFO shared by one sending and one receiving file.

use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};

use crate::buffer::ByteRing;
use crate::file::File;
use crate::io::{ReadUio, WriteUio};
use crate::poll::PollEvents;
use crate::{BUFFER_CAPACITY, Error, ErrorKind, Result};

#[derive(Debug)]
struct State {
    queue: ByteRing<BUFFER_CAPACITY>,

    /// File allowed to write; never owned.
    sender: Option<Weak<File>>,

    /// File allowed to read; never owned.
    receiver: Option<Weak<File>>,
}

impl State {
    fn read_events(&self) -> PollEvents {
        let mut events = PollEvents::empty();
        events.set(PollEvents::IN, !self.queue.is_empty());
        events.set(PollEvents::RDHUP, self.sender.is_none());
        events
    }

    // HUP wins over OUT: never report writable once the reader is gone.
    fn write_events(&self) -> PollEvents {
        if self.receiver.is_none() {
            return PollEvents::HUP;
        }
        let mut events = PollEvents::empty();
        events.set(PollEvents::OUT, !self.queue.is_full());
        events
    }

    fn sender_file(&self) -> Option<Arc<File>> {
        self.sender.as_ref().and_then(Weak::upgrade)
    }

    fn receiver_file(&self) -> Option<Arc<File>> {
        self.receiver.as_ref().and_then(Weak::upgrade)
    }
}

/// One direction of a local stream socket.
///
/// The lock guards the queue and both role references. `may_read` is
/// signalled when data arrives or the sender leaves; `may_write` when space
/// frees up or the receiver leaves.
///
/// Peer files are woken only after the lock is released: the upgraded
/// `Arc<File>` may be the last reference, and dropping it closes that file,
/// which detaches from this channel.
#[derive(Debug)]
pub struct Channel {
    state: Mutex<State>,
    may_read: Condvar,
    may_write: Condvar,
}

impl Channel {
    /// Creates an empty, unattached channel.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: ByteRing::new(),
                sender: None,
                receiver: None,
            }),
            may_read: Condvar::new(),
            may_write: Condvar::new(),
        }
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `IN` when data is buffered, `RDHUP` when no sender is attached.
    pub fn read_events(&self) -> PollEvents {
        self.state.lock().read_events()
    }

    /// `HUP` when no receiver is attached, else `OUT` while space remains.
    pub fn write_events(&self) -> PollEvents {
        self.state.lock().write_events()
    }

    /// Registers `file` as the writing role.
    ///
    /// # Panics
    ///
    /// If a sender is already attached.
    pub fn attach_sender(&self, file: &Arc<File>) {
        let mut state = self.state.lock();
        assert!(state.sender.is_none(), "channel sender attached twice");
        state.sender = Some(Arc::downgrade(file));
    }

    /// Registers `file` as the reading role.
    ///
    /// # Panics
    ///
    /// If a receiver is already attached.
    pub fn attach_receiver(&self, file: &Arc<File>) {
        let mut state = self.state.lock();
        assert!(state.receiver.is_none(), "channel receiver attached twice");
        state.receiver = Some(Arc::downgrade(file));
    }

    /// Clears the writing role. Readers then see end-of-stream once drained.
    pub fn detach_sender(&self) {
        let peer = {
            let mut state = self.state.lock();
            if state.sender.take().is_none() {
                return;
            }
            log::debug!("channel sender detached, {} bytes left", state.queue.len());
            state.receiver_file()
        };
        if let Some(file) = peer {
            file.poll_wake(PollEvents::RDHUP);
        }
        self.may_read.notify_all();
    }

    /// Clears the reading role. Writers then fail with `BrokenPipe`.
    pub fn detach_receiver(&self) {
        let peer = {
            let mut state = self.state.lock();
            if state.receiver.take().is_none() {
                return;
            }
            log::debug!("channel receiver detached");
            state.sender_file()
        };
        if let Some(file) = peer {
            file.poll_wake(PollEvents::HUP);
        }
        self.may_write.notify_all();
    }

    /// Moves buffered bytes into `uio`, blocking while the channel is empty
    /// and a sender is attached.
    ///
    /// Returns the number of bytes moved; 0 means end-of-stream. A read may
    /// be short: it never waits for more bytes once some are available.
    pub fn read(&self, uio: &mut ReadUio<'_>) -> usize {
        if uio.resid() == 0 {
            return 0;
        }

        let mut copied = 0;
        let peer = {
            let mut state = self.state.lock();
            while state.read_events().is_empty() {
                self.may_read.wait(&mut state);
            }

            if state.read_events().contains(PollEvents::IN) {
                while uio.resid() > 0 && !state.queue.is_empty() {
                    let n = state.queue.pop_into(uio.chunk_mut());
                    uio.advance(n);
                    copied += n;
                }
                log::trace!("channel read {} bytes, {} left", copied, state.queue.len());

                if state.write_events().contains(PollEvents::OUT) {
                    state.sender_file()
                } else {
                    None
                }
            } else {
                debug_assert!(state.read_events().contains(PollEvents::RDHUP));
                log::trace!("channel read hit end-of-stream");
                None
            }
        };

        if let Some(file) = peer {
            file.poll_wake(PollEvents::OUT);
        }
        self.may_write.notify_all();
        copied
    }

    /// Moves bytes from `uio` into the queue, blocking while it is full and a
    /// receiver is attached.
    ///
    /// Returns the number of bytes queued, which may be short of
    /// `uio.resid()`. Fails with `BrokenPipe`, queueing nothing, once the
    /// receiver is gone.
    pub fn write(&self, uio: &mut WriteUio<'_>) -> Result<usize> {
        if uio.resid() == 0 {
            return Ok(0);
        }

        let outcome = {
            let mut state = self.state.lock();
            while state.write_events().is_empty() {
                self.may_write.wait(&mut state);
            }

            if state.write_events().contains(PollEvents::OUT) {
                let mut copied = 0;
                while uio.resid() > 0 && !state.queue.is_full() {
                    let n = state.queue.push(uio.chunk());
                    uio.advance(n);
                    copied += n;
                }
                log::trace!("channel wrote {} bytes, {} queued", copied, state.queue.len());

                let peer = if state.read_events().contains(PollEvents::IN) {
                    state.receiver_file()
                } else {
                    None
                };
                Ok((copied, peer))
            } else {
                debug_assert!(state.write_events().contains(PollEvents::HUP));
                log::trace!("channel write on closed receiver");
                Err(Error::new(ErrorKind::BrokenPipe))
            }
        };

        self.may_read.notify_all();
        let (copied, peer) = outcome?;
        if let Some(file) = peer {
            file.poll_wake(PollEvents::IN);
        }
        Ok(copied)
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}
