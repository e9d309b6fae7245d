//! Per-process descriptor table.
//!
//! Installing a file is two-phase: [`FdTable::reserve`] claims the lowest
//! free number without exposing anything, and [`Reservation::commit`] makes
//! the file reachable. A reservation dropped before commit frees its slot,
//! so callers that need several descriptors can reserve them all first and
//! commit only once every step has succeeded.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::TableConfig;
use crate::file::File;
use crate::io::{ReadUio, WriteUio};
use crate::poll::PollEvents;
use crate::{Error, ErrorKind, Result};

/// A descriptor number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(u32);

impl Fd {
    /// Wraps a raw descriptor number.
    pub const fn new(raw: u32) -> Self {
        Fd(raw)
    }

    /// Raw descriptor number.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
enum Slot {
    Free,
    Reserved,
    Open(Arc<File>),
}

/// Maps descriptor numbers to open files.
#[derive(Debug)]
pub struct FdTable {
    slots: Mutex<Vec<Slot>>,
    config: TableConfig,
}

impl FdTable {
    /// Creates an empty table.
    pub fn new(config: TableConfig) -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Settings the table was created with.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Claims the lowest free descriptor number.
    pub fn reserve(&self) -> Result<Reservation<'_>> {
        let mut slots = self.slots.lock();
        let index = match slots.iter().position(|s| matches!(s, Slot::Free)) {
            Some(index) => index,
            None if slots.len() < self.config.max_fds => {
                slots.push(Slot::Free);
                slots.len() - 1
            }
            None => return Err(Error::new(ErrorKind::TooManyOpenFiles)),
        };
        let fd = u32::try_from(index)
            .map_err(|_| Error::new(ErrorKind::TooManyOpenFiles))?;
        slots[index] = Slot::Reserved;
        Ok(Reservation {
            table: self,
            fd: Some(Fd(fd)),
        })
    }

    /// Reserves a number and installs `file` under it.
    pub fn install(&self, file: Arc<File>) -> Result<Fd> {
        Ok(self.reserve()?.commit(file))
    }

    /// Looks up the file installed under `fd`.
    pub fn get(&self, fd: Fd) -> Result<Arc<File>> {
        match self.slots.lock().get(fd.index()) {
            Some(Slot::Open(file)) => Ok(file.clone()),
            _ => Err(Error::new(ErrorKind::BadDescriptor)),
        }
    }

    /// Removes `fd`. The file closes once no call still holds it.
    pub fn close(&self, fd: Fd) -> Result<()> {
        let file = {
            let mut slots = self.slots.lock();
            match slots.get_mut(fd.index()) {
                Some(slot) if matches!(slot, Slot::Open(_)) => core::mem::replace(slot, Slot::Free),
                _ => return Err(Error::new(ErrorKind::BadDescriptor)),
            }
        };
        log::debug!("closed fd {}", fd);
        // dropped outside the table lock: this may run the file's close
        drop(file);
        Ok(())
    }

    /// Number of installed descriptors.
    pub fn open_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| matches!(s, Slot::Open(_)))
            .count()
    }

    /// Number of slots not free, reserved ones included.
    pub fn used_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|s| !matches!(s, Slot::Free))
            .count()
    }

    /// Reads into `buf` from the file under `fd`.
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.get(fd)?.readv(&mut ReadUio::from(buf))
    }

    /// Reads into several buffers, filling them in order.
    pub fn readv(&self, fd: Fd, iov: Vec<&mut [u8]>) -> Result<usize> {
        self.get(fd)?.readv(&mut ReadUio::new(iov))
    }

    /// Writes `buf` to the file under `fd`.
    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        self.get(fd)?.writev(&mut WriteUio::from(buf))
    }

    /// Writes several buffers in order.
    pub fn writev(&self, fd: Fd, iov: Vec<&[u8]>) -> Result<usize> {
        self.get(fd)?.writev(&mut WriteUio::new(iov))
    }

    /// Current readiness of `fd`; `NVAL` if it is not open.
    pub fn poll(&self, fd: Fd, events: PollEvents) -> PollEvents {
        match self.get(fd) {
            Ok(file) => file.poll(events),
            Err(_) => PollEvents::NVAL,
        }
    }

    /// Blocks until `fd` reports one of `events` (or a hang-up), or `timeout`
    /// passes.
    pub fn poll_wait(
        &self,
        fd: Fd,
        events: PollEvents,
        timeout: Option<Duration>,
    ) -> PollEvents {
        match self.get(fd) {
            Ok(file) => file.poll_wait(events, timeout),
            Err(_) => PollEvents::NVAL,
        }
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

/// A claimed but not yet visible descriptor number.
#[derive(Debug)]
pub struct Reservation<'a> {
    table: &'a FdTable,
    fd: Option<Fd>,
}

impl Reservation<'_> {
    /// The reserved number.
    pub fn fd(&self) -> Option<Fd> {
        self.fd
    }

    /// Installs `file` under the reserved number and returns it.
    pub fn commit(mut self, file: Arc<File>) -> Fd {
        let Some(fd) = self.fd.take() else {
            unreachable!("reservation committed twice");
        };
        self.table.slots.lock()[fd.index()] = Slot::Open(file);
        log::debug!("installed fd {}", fd);
        fd
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Some(fd) = self.fd.take() {
            let mut slots = self.table.slots.lock();
            if let Some(slot) = slots.get_mut(fd.index()) {
                if matches!(slot, Slot::Reserved) {
                    *slot = Slot::Free;
                }
            }
            log::trace!("released reserved fd {}", fd);
        }
    }
}
