//! Error surface for queue operations.
//!
//! The taxonomy is closed: every fallible call returns one of
//! these kinds to its immediate caller. Nothing is retried internally, and a
//! failed call never leaves the queue unusable for other handles.

use std::io;

use thiserror::Error;

/// Convenience result alias for fallible queue operations.
pub type MqResult<T, E = MqError> = Result<T, E>;

/// Errors surfaced by handles, backends and `poll`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MqError {
    /// A null (closed) handle was used, or the handle lacks the capability
    /// the operation needs.
    #[error("bad queue handle")]
    BadHandle,

    /// Malformed flags, a zero-length message or a nonsensical poll entry.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A non-blocking handle could not proceed right now.
    #[error("operation would block")]
    WouldBlock,

    /// The message does not fit: either the destination buffer is too small
    /// (the message stays queued) or the payload can never fit the queue.
    #[error("message of {len} bytes does not fit")]
    MessageTooLarge { len: usize },

    /// Every reader handle has been closed.
    #[error("all reader handles have been closed")]
    BrokenPipe,

    /// Backing storage could not be allocated.
    #[error("failed to allocate {size} bytes of queue storage")]
    OutOfMemory { size: usize },
}

impl MqError {
    /// Negated message length for a [`MqError::MessageTooLarge`] read.
    ///
    /// Callers porting code that expects `-len` from a short read can use
    /// this instead of matching on the variant.
    pub fn negated_len(&self) -> Option<isize> {
        match self {
            MqError::MessageTooLarge { len } => isize::try_from(*len).ok().map(|len| -len),
            _ => None,
        }
    }

    /// True for errors a non-blocking caller is expected to retry later.
    #[inline]
    pub fn is_would_block(&self) -> bool {
        matches!(self, MqError::WouldBlock)
    }
}

impl From<MqError> for io::Error {
    fn from(err: MqError) -> Self {
        let kind = match err {
            MqError::BadHandle | MqError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            MqError::WouldBlock => io::ErrorKind::WouldBlock,
            MqError::MessageTooLarge { .. } => io::ErrorKind::InvalidData,
            MqError::BrokenPipe => io::ErrorKind::BrokenPipe,
            MqError::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
        };
        io::Error::new(kind, err)
    }
}
