//! Handle mode bits and poll event bits.

use bitflags::bitflags;

use crate::error::{MqError, MqResult};

bitflags! {
    /// Capabilities and mode of a queue handle.
    ///
    /// A handle with neither `READER` nor `WRITER` cannot transfer messages
    /// but still keeps the queue alive and can be polled for the
    /// `NO_READERS`/`NO_WRITERS` latches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        /// Handle may read messages.
        const READER = 0x01;
        /// Handle may write messages.
        const WRITER = 0x02;
        /// Reads and writes fail with `WouldBlock` instead of blocking.
        const NONBLOCK = 0x04;
    }
}

impl OpenFlags {
    /// Parses raw flag bits, rejecting unknown ones.
    pub fn from_raw(bits: u32) -> MqResult<Self> {
        Self::from_bits(bits).ok_or(MqError::InvalidArgument("unknown open flag bits"))
    }

    #[inline(always)]
    pub fn is_reader(self) -> bool {
        self.contains(Self::READER)
    }

    #[inline(always)]
    pub fn is_writer(self) -> bool {
        self.contains(Self::WRITER)
    }

    #[inline(always)]
    pub fn is_nonblocking(self) -> bool {
        self.contains(Self::NONBLOCK)
    }
}

bitflags! {
    /// Requested and returned events of a poll entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PollEvents: u32 {
        /// The very next read will not block: a message is queued or every
        /// writer has closed.
        const READABLE = 0x01;
        /// The very next write will not block: there is free space or every
        /// reader has closed.
        const WRITABLE = 0x02;
        /// Every reader handle has been closed. Never set on a queue that
        /// has not had a reader yet.
        const NO_READERS = 0x04;
        /// Every writer handle has been closed. Never set on a queue that
        /// has not had a writer yet.
        const NO_WRITERS = 0x08;
    }
}

impl PollEvents {
    /// Parses raw event bits, rejecting unknown ones.
    pub fn from_raw(bits: u32) -> MqResult<Self> {
        Self::from_bits(bits).ok_or(MqError::InvalidArgument("unknown poll event bits"))
    }

    /// Events reported for a handle without being requested.
    #[inline]
    pub fn implicit_for(flags: OpenFlags) -> Self {
        let mut implicit = Self::empty();
        if flags.is_reader() {
            implicit |= Self::NO_WRITERS;
        }
        if flags.is_writer() {
            implicit |= Self::NO_READERS;
        }
        implicit
    }
}
