//! `socketpair(AF_LOCAL, ...)`.
//!
//! Two channels are cross-wired into two endpoints, each endpoint becomes
//! the backing object of a fresh file, and only then are both files given
//! descriptor numbers. Every intermediate object is owned by a local that
//! releases it on early return, so a failure at any step leaves no
//! descriptor behind and frees both channels.

use std::sync::Arc;

use crate::channel::{Channel, LocalEndpoint};
use crate::fdtable::{Fd, FdTable};
use crate::file::{DescriptorType, File, FileFlags, FileOps};
use crate::{Error, ErrorKind, Result};

/// Requested socket semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    /// Reliable byte stream (`SOCK_STREAM`).
    Stream,
    /// Datagrams (`SOCK_DGRAM`).
    Datagram,
    /// Ordered records (`SOCK_SEQPACKET`).
    SeqPacket,
}

/// Creates a connected stream pair and installs it in `table`.
///
/// Only `SocketType::Stream` with protocol 0 is available.
pub fn socketpair(table: &FdTable, ty: SocketType, protocol: i32) -> Result<[Fd; 2]> {
    if ty != SocketType::Stream {
        return Err(Error::new(ErrorKind::NotSupported));
    }
    if protocol != 0 {
        return Err(Error::new(ErrorKind::ProtocolNotSupported));
    }
    install_pair(table, open_pair()?)
}

/// Creates a connected stream pair without installing it anywhere.
pub fn open_pair() -> Result<[Arc<File>; 2]> {
    open_pair_with(
        Arc::new(Channel::new()),
        Arc::new(Channel::new()),
        |endpoint| -> Box<dyn FileOps> { Box::new(endpoint) },
    )
}

// `backing` turns each endpoint into the ops object of its file
fn open_pair_with<F>(a: Arc<Channel>, b: Arc<Channel>, mut backing: F) -> Result<[Arc<File>; 2]>
where
    F: FnMut(LocalEndpoint) -> Box<dyn FileOps>,
{
    let first = backing(LocalEndpoint::new(a.clone(), b.clone()));
    let second = backing(LocalEndpoint::new(b, a));

    let flags = FileFlags::READ | FileFlags::WRITE;
    let f1 = File::open(flags, DescriptorType::Unspec, first)?;
    let f2 = File::open(flags, DescriptorType::Unspec, second)?;
    Ok([f1, f2])
}

fn install_pair(table: &FdTable, files: [Arc<File>; 2]) -> Result<[Fd; 2]> {
    let [f1, f2] = files;
    let rollback = |err: &Error| log::warn!("socketpair rolled back: {}", err);

    let r1 = table.reserve().inspect_err(rollback)?;
    let r2 = table.reserve().inspect_err(rollback)?;

    // all went well, the caller owns both descriptors now
    let fds = [r1.commit(f1), r2.commit(f2)];
    log::debug!("socketpair created fds {} and {}", fds[0], fds[1]);
    Ok(fds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::io::{Read, ReadUio, Write, WriteUio};
    use crate::poll::PollEvents;
    use crate::BUFFER_CAPACITY;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Attaches like the wrapped endpoint, then reports failure.
    struct FailingInit(LocalEndpoint);

    impl FileOps for FailingInit {
        fn init(&self, file: &Arc<File>) -> Result<()> {
            self.0.init(file)?;
            Err(Error::new(ErrorKind::NotSupported))
        }

        fn read(&self, file: &File, uio: &mut ReadUio<'_>) -> Result<()> {
            self.0.read(file, uio)
        }

        fn write(&self, file: &File, uio: &mut WriteUio<'_>) -> Result<()> {
            self.0.write(file, uio)
        }

        fn poll(&self, file: &File, events: PollEvents) -> PollEvents {
            self.0.poll(file, events)
        }
    }

    fn local_backing(endpoint: LocalEndpoint) -> Box<dyn FileOps> {
        Box::new(endpoint)
    }

    fn pair() -> (FdTable, Fd, Fd) {
        let table = FdTable::default();
        let [h0, h1] = socketpair(&table, SocketType::Stream, 0).unwrap();
        (table, h0, h1)
    }

    #[test]
    fn test_hello() {
        let (table, h0, h1) = pair();
        assert_eq!(table.write(h0, b"hello").unwrap(), 5);

        let mut buf = [0u8; 10];
        assert_eq!(table.read(h1, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn test_both_directions() {
        let (table, h0, h1) = pair();
        table.write(h0, b"ping").unwrap();
        table.write(h1, b"pong").unwrap();

        let mut buf = [0u8; 4];
        table.read(h1, &mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        table.read(h0, &mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn test_full_write_blocks_until_read() {
        let (table, h0, h1) = pair();
        let fill = vec![1u8; BUFFER_CAPACITY];
        assert_eq!(table.write(h0, &fill).unwrap(), BUFFER_CAPACITY);
        assert!(!table.poll(h0, PollEvents::OUT).contains(PollEvents::OUT));

        let done = AtomicBool::new(false);
        thread::scope(|s| {
            let writer = s.spawn(|| {
                let n = table.write(h0, &[2u8]).unwrap();
                done.store(true, Ordering::SeqCst);
                n
            });

            thread::sleep(Duration::from_millis(100));
            assert!(!done.load(Ordering::SeqCst));

            let mut one = [0u8; 1];
            assert_eq!(table.read(h1, &mut one).unwrap(), 1);
            assert_eq!(writer.join().unwrap(), 1);
        });

        let mut rest = vec![0u8; BUFFER_CAPACITY];
        assert_eq!(table.read(h1, &mut rest).unwrap(), BUFFER_CAPACITY);
        assert_eq!(rest[BUFFER_CAPACITY - 1], 2);
    }

    #[test]
    fn test_read_blocks_until_write() {
        let (table, h0, h1) = pair();
        let done = AtomicBool::new(false);
        thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut buf = [0u8; 16];
                let n = table.read(h1, &mut buf).unwrap();
                done.store(true, Ordering::SeqCst);
                buf[..n].to_vec()
            });

            thread::sleep(Duration::from_millis(100));
            assert!(!done.load(Ordering::SeqCst));

            table.write(h0, b"wake").unwrap();
            assert_eq!(reader.join().unwrap(), b"wake");
        });
    }

    #[test]
    fn test_close_gives_eof_and_broken_pipe() {
        let (table, h0, h1) = pair();
        table.close(h0).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(table.read(h1, &mut buf).unwrap(), 0);
        assert_eq!(
            table.write(h1, b"x").unwrap_err().kind(),
            ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_buffered_bytes_survive_close() {
        let (table, h0, h1) = pair();
        table.write(h0, b"last words").unwrap();
        table.close(h0).unwrap();

        let file = table.get(h1).unwrap();
        let mut out = Vec::new();
        (&*file).read_to_end(&mut out).unwrap();
        assert_eq!(out, b"last words");
    }

    #[test]
    fn test_close_wakes_blocked_reader() {
        let (table, h0, h1) = pair();
        thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut buf = [0u8; 4];
                table.read(h1, &mut buf).unwrap()
            });
            thread::sleep(Duration::from_millis(50));
            table.close(h0).unwrap();
            assert_eq!(reader.join().unwrap(), 0);
        });
    }

    #[test]
    fn test_close_wakes_blocked_writer() {
        let (table, h0, h1) = pair();
        table.write(h0, &vec![0u8; BUFFER_CAPACITY]).unwrap();
        thread::scope(|s| {
            let writer = s.spawn(|| table.write(h0, b"more"));
            thread::sleep(Duration::from_millis(50));
            table.close(h1).unwrap();
            let err = writer.join().unwrap().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        });
    }

    #[test]
    fn test_poll_readiness() {
        let (table, h0, h1) = pair();
        let both = PollEvents::IN | PollEvents::OUT;
        assert_eq!(table.poll(h0, both), PollEvents::OUT);

        table.write(h0, b"data").unwrap();
        assert_eq!(table.poll(h1, both), both);
        assert_eq!(table.poll(h1, PollEvents::IN), PollEvents::IN);

        table.close(h0).unwrap();
        let revents = table.poll(h1, both);
        assert!(revents.contains(PollEvents::IN | PollEvents::RDHUP | PollEvents::HUP));
        assert!(!revents.contains(PollEvents::OUT));
    }

    #[test]
    fn test_poll_wait_sees_peer_close() {
        let (table, h0, h1) = pair();
        thread::scope(|s| {
            let poller = s.spawn(|| table.poll_wait(h1, PollEvents::IN, None));
            thread::sleep(Duration::from_millis(50));
            table.close(h0).unwrap();
            assert!(poller.join().unwrap().contains(PollEvents::RDHUP));
        });
    }

    #[test]
    fn test_poll_wait_sees_data() {
        let (table, h0, h1) = pair();
        thread::scope(|s| {
            let poller = s.spawn(|| {
                table.poll_wait(h1, PollEvents::IN, Some(Duration::from_secs(5)))
            });
            thread::sleep(Duration::from_millis(50));
            table.write(h0, b"!").unwrap();
            assert_eq!(poller.join().unwrap(), PollEvents::IN);
        });
    }

    #[test]
    fn test_notifications_target_peer() {
        let (table, h0, h1) = pair();
        let f0 = table.get(h0).unwrap();
        let f1 = table.get(h1).unwrap();

        table.write(h0, b"abc").unwrap();
        assert!(f0.take_wakeups().is_empty());
        assert_eq!(f1.take_wakeups(), PollEvents::IN);

        drop(f0);
        table.close(h0).unwrap();
        assert_eq!(f1.take_wakeups(), PollEvents::RDHUP | PollEvents::HUP);
    }

    #[test]
    fn test_scatter_gather() {
        let (table, h0, h1) = pair();
        assert_eq!(table.writev(h0, vec![&b"ab"[..], &b""[..], &b"cde"[..]]).unwrap(), 5);

        let mut a = [0u8; 1];
        let mut b = [0u8; 2];
        let mut c = [0u8; 8];
        let n = table
            .readv(h1, vec![&mut a[..], &mut b[..], &mut c[..]])
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(&a, b"a");
        assert_eq!(&b, b"bc");
        assert_eq!(&c[..2], b"de");
    }

    #[test]
    fn test_concurrent_writers_conserve_bytes() {
        const WRITERS: u8 = 4;
        const PER_WRITER: usize = 20_000;

        let (table, h0, h1) = pair();
        let counts = thread::scope(|s| {
            for id in 0..WRITERS {
                let table = &table;
                s.spawn(move || {
                    let file = table.get(h0).unwrap();
                    (&*file).write_all(&vec![id; PER_WRITER]).unwrap();
                });
            }

            let file = table.get(h1).unwrap();
            let mut counts = [0usize; WRITERS as usize];
            let mut buf = [0u8; 4096];
            let mut total = 0;
            while total < WRITERS as usize * PER_WRITER {
                let n = (&*file).read(&mut buf).unwrap();
                for &byte in &buf[..n] {
                    counts[byte as usize] += 1;
                }
                total += n;
            }
            counts
        });
        assert_eq!(counts, [PER_WRITER; WRITERS as usize]);
    }

    #[test]
    fn test_failed_install_rolls_back() {
        let table = FdTable::new(TableConfig::new().with_max_fds(1));
        let a = Arc::new(Channel::new());
        let b = Arc::new(Channel::new());
        let (weak_a, weak_b) = (Arc::downgrade(&a), Arc::downgrade(&b));

        let files = open_pair_with(a, b, local_backing).unwrap();
        let err = install_pair(&table, files).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TooManyOpenFiles);
        assert_eq!(table.used_count(), 0);
        assert_eq!(weak_a.strong_count(), 0);
        assert_eq!(weak_b.strong_count(), 0);
    }

    #[test]
    fn test_failed_second_init_rolls_back() {
        let a = Arc::new(Channel::new());
        let b = Arc::new(Channel::new());
        let (weak_a, weak_b) = (Arc::downgrade(&a), Arc::downgrade(&b));

        let mut opened = 0;
        let err = open_pair_with(a, b, |endpoint| -> Box<dyn FileOps> {
            opened += 1;
            if opened == 2 {
                Box::new(FailingInit(endpoint))
            } else {
                Box::new(endpoint)
            }
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(weak_a.strong_count(), 0);
        assert_eq!(weak_b.strong_count(), 0);
    }

    #[test]
    fn test_failed_first_init_rolls_back() {
        let a = Arc::new(Channel::new());
        let b = Arc::new(Channel::new());
        let (weak_a, weak_b) = (Arc::downgrade(&a), Arc::downgrade(&b));

        let err = open_pair_with(a, b, |endpoint| -> Box<dyn FileOps> {
            Box::new(FailingInit(endpoint))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(weak_a.strong_count(), 0);
        assert_eq!(weak_b.strong_count(), 0);
    }

    #[test]
    fn test_close_releases_channels() {
        let table = FdTable::default();
        let a = Arc::new(Channel::new());
        let b = Arc::new(Channel::new());
        let (weak_a, weak_b) = (Arc::downgrade(&a), Arc::downgrade(&b));
        let files = open_pair_with(a, b, local_backing).unwrap();
        let [h0, h1] = install_pair(&table, files).unwrap();

        table.write(h0, b"pending").unwrap();
        table.close(h0).unwrap();
        assert_eq!(weak_a.strong_count(), 1);
        assert_eq!(weak_a.upgrade().unwrap().len(), 7);

        table.close(h1).unwrap();
        assert_eq!(weak_a.strong_count(), 0);
        assert_eq!(weak_b.strong_count(), 0);
    }

    #[test]
    fn test_rejects_other_types() {
        let table = FdTable::default();
        let err = socketpair(&table, SocketType::Datagram, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        let err = socketpair(&table, SocketType::SeqPacket, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        let err = socketpair(&table, SocketType::Stream, 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolNotSupported);
        assert_eq!(table.used_count(), 0);
    }

    #[test]
    fn test_unsupported_file_ops() {
        let (table, h0, _h1) = pair();
        let file = table.get(h0).unwrap();
        assert_eq!(file.truncate(0).unwrap_err().kind(), ErrorKind::NotSupported);
        assert_eq!(file.stat().unwrap_err().kind(), ErrorKind::NotSupported);
        assert_eq!(file.kind(), DescriptorType::Unspec);
    }
}
