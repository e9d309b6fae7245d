//! Open-file objects and their operation tables.
//!
//! A [`File`] is shared through `Arc`; descriptor slots and in-flight calls
//! each hold a reference. The backing [`FileOps`] object lives exactly as
//! long as the file and is dropped right after `close` runs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;

use crate::io::{Read, ReadUio, Write, WriteUio};
use crate::poll::{PollEvents, PollWaitQueue};
use crate::{Error, ErrorKind, Result};

bitflags! {
    /// Access mode of an open file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileFlags: u32 {
        /// Opened for reading.
        const READ = 0x1;
        /// Opened for writing.
        const WRITE = 0x2;
    }
}

/// What kind of object backs a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorType {
    /// No filesystem object; used by local sockets.
    Unspec,
}

/// Attributes reported by `stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Permission and type bits.
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
}

/// Per-file operation table.
///
/// Operations not meaningful for a file type keep their default, which
/// reports [`ErrorKind::NotSupported`].
pub trait FileOps: Send + Sync {
    /// Called once, after the file is allocated and before it is installed.
    fn init(&self, file: &Arc<File>) -> Result<()>;

    /// Fills `uio` from the file.
    fn read(&self, file: &File, uio: &mut ReadUio<'_>) -> Result<()>;

    /// Drains `uio` into the file.
    fn write(&self, file: &File, uio: &mut WriteUio<'_>) -> Result<()>;

    /// Returns the ready subset of `events`, plus any hang-up bits.
    fn poll(&self, file: &File, events: PollEvents) -> PollEvents;

    /// Called when the last reference to the file goes away.
    fn close(&self, _file: &File) -> Result<()> {
        Ok(())
    }

    /// Changes the file size.
    fn truncate(&self, _file: &File, _len: u64) -> Result<()> {
        Err(Error::new(ErrorKind::NotSupported))
    }

    /// Device-specific control request.
    fn ioctl(&self, _file: &File, _cmd: u64, _arg: usize) -> Result<i32> {
        Err(Error::new(ErrorKind::NotSupported))
    }

    /// Reports file attributes.
    fn stat(&self, _file: &File) -> Result<Stat> {
        Err(Error::new(ErrorKind::NotSupported))
    }

    /// Changes permission bits.
    fn chmod(&self, _file: &File, _mode: u32) -> Result<()> {
        Err(Error::new(ErrorKind::NotSupported))
    }
}

/// An open file.
pub struct File {
    flags: FileFlags,
    kind: DescriptorType,
    ops: Box<dyn FileOps>,
    pollq: PollWaitQueue,
}

impl File {
    /// Allocates a file backed by `ops` and runs its `init`.
    ///
    /// The file is not installed in any descriptor table. If `init` fails the
    /// file is dropped again, which runs `close`.
    pub fn open(
        flags: FileFlags,
        kind: DescriptorType,
        ops: Box<dyn FileOps>,
    ) -> Result<Arc<File>> {
        let file = Arc::new(File {
            flags,
            kind,
            ops,
            pollq: PollWaitQueue::new(),
        });
        file.ops.init(&file)?;
        Ok(file)
    }

    /// Access mode.
    pub fn flags(&self) -> FileFlags {
        self.flags
    }

    /// Backing object type.
    pub fn kind(&self) -> DescriptorType {
        self.kind
    }

    /// Reads into the request's segments, returning the bytes moved.
    pub fn readv(&self, uio: &mut ReadUio<'_>) -> Result<usize> {
        if !self.flags.contains(FileFlags::READ) {
            return Err(Error::new(ErrorKind::BadDescriptor));
        }
        let before = uio.transferred();
        self.ops.read(self, uio)?;
        Ok(uio.transferred() - before)
    }

    /// Writes from the request's segments, returning the bytes moved.
    pub fn writev(&self, uio: &mut WriteUio<'_>) -> Result<usize> {
        if !self.flags.contains(FileFlags::WRITE) {
            return Err(Error::new(ErrorKind::BadDescriptor));
        }
        let before = uio.transferred();
        self.ops.write(self, uio)?;
        Ok(uio.transferred() - before)
    }

    /// Current readiness for `events`.
    pub fn poll(&self, events: PollEvents) -> PollEvents {
        self.ops.poll(self, events)
    }

    /// Waits until `poll(events)` is non-empty, or `timeout` passes.
    pub fn poll_wait(&self, events: PollEvents, timeout: Option<Duration>) -> PollEvents {
        self.pollq.wait_for(|| self.poll(events), timeout)
    }

    /// Tells pollers of this file that `events` may have become ready.
    pub fn poll_wake(&self, events: PollEvents) {
        self.pollq.wake(events);
    }

    /// Events delivered through [`poll_wake`](Self::poll_wake) since the last call.
    pub fn take_wakeups(&self) -> PollEvents {
        self.pollq.take_pending()
    }

    /// See [`FileOps::truncate`].
    pub fn truncate(&self, len: u64) -> Result<()> {
        self.ops.truncate(self, len)
    }

    /// See [`FileOps::ioctl`].
    pub fn ioctl(&self, cmd: u64, arg: usize) -> Result<i32> {
        self.ops.ioctl(self, cmd, arg)
    }

    /// See [`FileOps::stat`].
    pub fn stat(&self) -> Result<Stat> {
        self.ops.stat(self)
    }

    /// See [`FileOps::chmod`].
    pub fn chmod(&self, mode: u32) -> Result<()> {
        self.ops.chmod(self, mode)
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if let Err(err) = self.ops.close(self) {
            log::warn!("close failed: {}", err);
        }
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("flags", &self.flags)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Read for &File {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        File::readv(self, &mut ReadUio::from(buf))
    }
}

impl Write for &File {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        File::writev(self, &mut WriteUio::from(buf))
    }
}
