//! Capabilities onto a queue backend.
//!
//! A [`Handle`] is `{ backend, flags }`. Handles are not
//! `Clone`: every capability is counted by the backend, so a second one is
//! obtained through [`Handle::open`]. Closing nulls the handle in place, and
//! dropping an open handle closes it.

use std::fmt;
use std::sync::Arc;

use super::backend::{Backend, QueueStatus};
use super::flags::OpenFlags;
use crate::error::{MqError, MqResult};

/// Reader/writer capability onto one message queue.
pub struct Handle {
    backend: Option<Arc<Backend>>,
    flags: OpenFlags,
}

impl Handle {
    /// Creates a queue of `capacity` bytes and returns the first handle to
    /// it, opened with `flags`.
    ///
    /// Each message costs [`HEADER_SIZE`](crate::protocol::HEADER_SIZE)
    /// bytes of capacity on top of its payload.
    pub fn create(capacity: usize, flags: OpenFlags) -> MqResult<Self> {
        let backend = Backend::new(capacity)?;
        backend.attach(flags)?;
        Ok(Self {
            backend: Some(backend),
            flags,
        })
    }

    /// A handle that refers to no queue. Every operation on it fails with
    /// [`MqError::BadHandle`].
    pub const fn null() -> Self {
        Self {
            backend: None,
            flags: OpenFlags::empty(),
        }
    }

    /// Opens an additional handle onto the same queue.
    pub fn open(&self, flags: OpenFlags) -> MqResult<Self> {
        let backend = self.backend()?;
        backend.attach(flags)?;
        Ok(Self {
            backend: Some(Arc::clone(backend)),
            flags,
        })
    }

    /// Closes and nulls this handle. The queue is destroyed with its last
    /// handle.
    pub fn close(&mut self) -> MqResult<()> {
        let backend = self.backend.take().ok_or(MqError::BadHandle)?;
        backend.detach(self.flags);
        self.flags = OpenFlags::empty();
        Ok(())
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.backend.is_none()
    }

    #[inline(always)]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Identity of the underlying queue, shared by every handle onto it.
    pub fn queue_id(&self) -> Option<u64> {
        self.backend.as_ref().map(|b| b.id())
    }

    /// Reads one message into `buf`.
    ///
    /// Blocks until a message is queued unless the handle is non-blocking.
    /// Returns the message length, or `0` once the queue is empty and every
    /// writer has closed. If `buf` is too short the message stays queued and
    /// [`MqError::MessageTooLarge`] carries its length.
    pub fn read(&self, buf: &mut [u8]) -> MqResult<usize> {
        if !self.flags.is_reader() {
            return Err(MqError::BadHandle);
        }
        self.backend()?.read(buf, self.flags.is_nonblocking())
    }

    /// Writes `buf` as one message.
    ///
    /// Blocks until the message fits unless the handle is non-blocking.
    pub fn write(&self, buf: &[u8]) -> MqResult<()> {
        if !self.flags.is_writer() {
            return Err(MqError::BadHandle);
        }
        self.backend()?.write(buf, self.flags.is_nonblocking())
    }

    /// Snapshot of the queue's accounting.
    pub fn status(&self) -> MqResult<QueueStatus> {
        self.backend()?.status()
    }

    #[inline(always)]
    pub(crate) fn backend(&self) -> MqResult<&Arc<Backend>> {
        self.backend.as_ref().ok_or(MqError::BadHandle)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::null()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.is_null() {
            let _ = self.close();
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("queue", &self.queue_id())
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_open_close_counts() {
        let mut creator = Handle::create(64, OpenFlags::empty()).unwrap();
        let mut reader = creator.open(OpenFlags::READER).unwrap();
        let writer = creator.open(OpenFlags::WRITER | OpenFlags::NONBLOCK).unwrap();

        assert_eq!(creator.queue_id(), reader.queue_id());
        let status = creator.status().unwrap();
        assert_eq!((status.refs, status.readers, status.writers), (3, 1, 1));

        reader.close().unwrap();
        assert!(reader.is_null());
        assert!(creator.status().unwrap().no_readers);

        drop(writer);
        let status = creator.status().unwrap();
        assert_eq!((status.refs, status.readers, status.writers), (1, 0, 0));

        creator.close().unwrap();
        assert!(creator.is_null());
    }

    #[test]
    fn test_null_handle_is_bad() {
        let mut null = Handle::null();
        let mut buf = [0u8; 4];
        assert_eq!(null.read(&mut buf), Err(MqError::BadHandle));
        assert_eq!(null.open(OpenFlags::READER).err(), Some(MqError::BadHandle));
        assert_eq!(null.close(), Err(MqError::BadHandle));
    }

    #[test]
    fn test_double_close_is_bad() {
        let mut handle = Handle::create(64, OpenFlags::READER).unwrap();
        handle.close().unwrap();
        assert_eq!(handle.close(), Err(MqError::BadHandle));
    }

    #[test]
    fn test_capability_required_for_transfer() {
        let handle = Handle::create(64, OpenFlags::READER).unwrap();
        assert_eq!(handle.write(b"nope"), Err(MqError::BadHandle));

        let writer = handle.open(OpenFlags::WRITER).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(writer.read(&mut buf), Err(MqError::BadHandle));
    }

    #[test]
    fn test_create_zero_capacity() {
        assert!(matches!(
            Handle::create(0, OpenFlags::READER),
            Err(MqError::InvalidArgument(_))
        ));
    }
}
