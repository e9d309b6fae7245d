//! Fixed-capacity byte ring used as a channel's FIFO queue.

/// A FIFO of at most `N` bytes stored in a circular array.
///
/// Pushes append at the tail and pops consume from the head. Both move as
/// many bytes as fit in a single call, handling wrap-around internally.
#[derive(Debug)]
pub struct ByteRing<const N: usize> {
    storage: [u8; N],

    /// Index of the oldest byte.
    head: usize,

    /// Number of queued bytes.
    len: usize,
}

impl<const N: usize> ByteRing<N> {
    /// Creates an empty ring.
    pub const fn new() -> Self {
        Self {
            storage: [0u8; N],
            head: 0,
            len: 0,
        }
    }

    /// Queued bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is queued.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when no byte fits.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Maximum queued bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Free space in bytes.
    #[inline]
    pub const fn spare(&self) -> usize {
        N - self.len
    }

    #[inline]
    fn tail(&self) -> usize {
        (self.head + self.len) % N
    }

    /// Appends up to `min(src.len(), spare())` bytes and returns how many.
    pub fn push(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.spare());
        if count == 0 {
            return 0;
        }

        let tail = self.tail();
        let first = count.min(N - tail);
        self.storage[tail..tail + first].copy_from_slice(&src[..first]);
        if count > first {
            self.storage[..count - first].copy_from_slice(&src[first..count]);
        }

        self.len += count;
        count
    }

    /// Moves up to `min(dst.len(), len())` bytes from the head into `dst`.
    pub fn pop_into(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.len);
        if count == 0 {
            return 0;
        }

        let first = count.min(N - self.head);
        dst[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        if count > first {
            dst[first..count].copy_from_slice(&self.storage[..count - first]);
        }

        self.head = (self.head + count) % N;
        self.len -= count;
        if self.len == 0 {
            self.head = 0;
        }
        count
    }
}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
