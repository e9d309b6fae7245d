//! I/O requests and byte-stream traits.
//!
//! A [`Uio`] describes one read or write call: a list of caller segments and
//! the number of bytes still to be moved. Channel code takes one contiguous
//! chunk at a time and reports progress with [`Uio::advance`].

use crate::{Error, ErrorKind, Result};

/// Scatter/gather request over segments of type `S`.
#[derive(Debug)]
pub struct Uio<S> {
    iov: Vec<S>,
    seg: usize,
    offset: usize,
    resid: usize,
    transferred: usize,
}

/// Request whose segments receive bytes.
pub type ReadUio<'a> = Uio<&'a mut [u8]>;

/// Request whose segments supply bytes.
pub type WriteUio<'a> = Uio<&'a [u8]>;

impl<S: AsRef<[u8]>> Uio<S> {
    /// Creates a request covering every byte of `iov`.
    pub fn new(iov: Vec<S>) -> Self {
        let resid = iov.iter().map(|s| s.as_ref().len()).sum();
        Self {
            iov,
            seg: 0,
            offset: 0,
            resid,
            transferred: 0,
        }
    }

    /// Bytes still to be moved.
    #[inline]
    pub fn resid(&self) -> usize {
        self.resid
    }

    /// Bytes moved so far.
    #[inline]
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    /// Marks `count` bytes of the current chunk as moved.
    pub fn advance(&mut self, count: usize) {
        debug_assert!(count <= self.resid);
        self.offset += count;
        self.resid -= count;
        self.transferred += count;
    }

    // skip exhausted and zero-length segments
    fn settle(&mut self) {
        while self.seg < self.iov.len() && self.offset >= self.iov[self.seg].as_ref().len() {
            self.seg += 1;
            self.offset = 0;
        }
    }

    /// Unmoved remainder of the current segment.
    pub fn chunk(&mut self) -> &[u8] {
        self.settle();
        match self.iov.get(self.seg) {
            Some(s) => &s.as_ref()[self.offset..],
            None => &[],
        }
    }
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> Uio<S> {
    /// Unfilled remainder of the current segment.
    pub fn chunk_mut(&mut self) -> &mut [u8] {
        self.settle();
        let offset = self.offset;
        match self.iov.get_mut(self.seg) {
            Some(s) => &mut s.as_mut()[offset..],
            None => &mut [],
        }
    }
}

impl<'a> From<&'a mut [u8]> for ReadUio<'a> {
    fn from(buf: &'a mut [u8]) -> Self {
        Uio::new(vec![buf])
    }
}

impl<'a> From<&'a [u8]> for WriteUio<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Uio::new(vec![buf])
    }
}

/// Pull-based byte source.
pub trait Read {
    /// Reads up to `buf.len()` bytes; 0 means end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Fills `buf` completely or fails with `UnexpectedEof`.
    fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.read(buf) {
                Ok(0) => break,
                Ok(n) => {
                    let tmp = buf;
                    buf = &mut tmp[n..];
                }
                Err(e) => return Err(e),
            }
        }
        if !buf.is_empty() {
            Err(Error::new(ErrorKind::UnexpectedEof))
        } else {
            Ok(())
        }
    }

    /// Reads until end-of-stream, appending to `out`.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let start = out.len();
        let mut chunk = [0u8; 1024];
        loop {
            match self.read(&mut chunk)? {
                0 => return Ok(out.len() - start),
                n => out.extend_from_slice(&chunk[..n]),
            }
        }
    }
}

/// Push-based byte sink.
pub trait Write {
    /// Writes some prefix of `buf`, returning its length.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Pushes out buffered bytes.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Writes all of `buf` or fails.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(Error::new(ErrorKind::WriteZero));
                }
                Ok(n) => buf = &buf[n..],
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
