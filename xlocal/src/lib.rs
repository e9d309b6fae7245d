//! # XLocal - In-Memory Local Stream Sockets
//!
//! XLocal implements `socketpair(AF_LOCAL, SOCK_STREAM, 0)` for an in-process
//! file layer:
//!
//! - **Bounded channels**: one 8 KiB FIFO per direction, shared by exactly one
//!   sending and one receiving file
//! - **Blocking I/O**: reads wait for data, writes wait for space
//! - **Poll readiness**: `IN`/`OUT` plus `HUP`/`RDHUP` once the peer is gone
//! - **Half-close**: closing one side shows up as end-of-stream or `EPIPE`
//! - **Rollback-safe construction**: either both descriptors appear or none do
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     Descriptor Table                      │
//! │          fd 3 ──► Arc<File>         fd 4 ──► Arc<File>    │
//! ├───────────────────────────────────────────────────────────┤
//! │                       File Layer                          │
//! │   ┌─────────────────────┐         ┌─────────────────────┐ │
//! │   │ LocalEndpoint (A,B) │         │ LocalEndpoint (B,A) │ │
//! │   └──────┬───────▲──────┘         └──────┬───────▲──────┘ │
//! ├──────────┼───────┼───────────────────────┼───────┼────────┤
//! │          │ send  │ receive          send │       │receive │
//! │          ▼       │                       ▼       │        │
//! │   ┌─────────────────────┐         ┌─────────────────────┐ │
//! │   │   Channel A (8K)    │────────►│   Channel B (8K)    │ │
//! │   └─────────────────────┘  read   └─────────────────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use xlocal::{socketpair, FdTable, SocketType};
//!
//! let table = FdTable::default();
//! let [a, b] = socketpair(&table, SocketType::Stream, 0).unwrap();
//!
//! table.write(a, b"hello").unwrap();
//! let mut buf = [0u8; 10];
//! let n = table.read(b, &mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod fdtable;
pub mod file;
pub mod io;
pub mod poll;
pub mod socketpair;

// Re-export commonly used types
pub use channel::{Channel, LocalEndpoint};
pub use config::TableConfig;
pub use error::{Error, ErrorKind, Result};
pub use fdtable::{Fd, FdTable};
pub use file::{DescriptorType, File, FileFlags, FileOps};
pub use io::{Read, ReadUio, Write, WriteUio};
pub use poll::PollEvents;
pub use socketpair::{open_pair, socketpair, SocketType};

/// Bytes buffered per direction before writers block.
pub const BUFFER_CAPACITY: usize = 8192;

/// Default descriptor table size.
pub const DEFAULT_MAX_FDS: usize = 1024;
