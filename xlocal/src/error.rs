//! Error type shared by every layer of the crate.

use core::fmt;

/// Category of failure reported by the local socket layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Write on a channel whose receiving file has gone away.
    BrokenPipe,
    /// Descriptor number is not open.
    BadDescriptor,
    /// Descriptor table has no free slot.
    TooManyOpenFiles,
    /// Operation or socket type not supported by this file.
    NotSupported,
    /// Protocol other than 0 requested.
    ProtocolNotSupported,
    /// `read_exact` reached end-of-stream.
    UnexpectedEof,
    /// `write_all` made no progress.
    WriteZero,
}

/// Error returned by file, descriptor and socket pair operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Error { kind }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// POSIX errno value for this error.
    pub fn errno(&self) -> i32 {
        match self.kind {
            ErrorKind::BrokenPipe => 32,
            ErrorKind::BadDescriptor => 9,
            ErrorKind::TooManyOpenFiles => 24,
            ErrorKind::NotSupported => 95,
            ErrorKind::ProtocolNotSupported => 93,
            ErrorKind::UnexpectedEof | ErrorKind::WriteZero => 5,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::BrokenPipe => write!(f, "Broken pipe"),
            ErrorKind::BadDescriptor => write!(f, "Bad file descriptor"),
            ErrorKind::TooManyOpenFiles => write!(f, "Too many open files"),
            ErrorKind::NotSupported => write!(f, "Operation not supported"),
            ErrorKind::ProtocolNotSupported => write!(f, "Protocol not supported"),
            ErrorKind::UnexpectedEof => write!(f, "Unexpected end of file"),
            ErrorKind::WriteZero => write!(f, "Write zero bytes"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> std::io::Error {
        let kind = match err.kind {
            ErrorKind::BrokenPipe => std::io::ErrorKind::BrokenPipe,
            ErrorKind::UnexpectedEof => std::io::ErrorKind::UnexpectedEof,
            ErrorKind::WriteZero => std::io::ErrorKind::WriteZero,
            ErrorKind::NotSupported | ErrorKind::ProtocolNotSupported => {
                std::io::ErrorKind::Unsupported
            }
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
