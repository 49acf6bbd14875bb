//! Shared, reference-counted state behind every handle of one queue.
//!
//! One mutex guards the ring, the open-handle counters, the sticky
//! `no_readers`/`no_writers` latches and the registry of poll waiters. Blocked
//! readers and writers sleep on the two condition variables of their own
//! backend; poll callers sleep on their private [`Waiter`] instead, which the
//! backend notifies on every state change that can alter readiness:
//! a successful write, a successful read, and either latch going up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use super::flags::{OpenFlags, PollEvents};
use super::waiter::Waiter;
use crate::core::RingBuffer;
use crate::error::{MqError, MqResult};
use crate::protocol::{self, Decoded};

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Point-in-time view of a queue's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    pub capacity: usize,
    pub used: usize,
    pub free: usize,
    /// Open handles of any kind
    pub refs: usize,
    /// Open handles with read capability
    pub readers: usize,
    /// Open handles with write capability
    pub writers: usize,
    pub no_readers: bool,
    pub no_writers: bool,
}

pub(crate) struct Backend {
    id: u64,
    state: Mutex<BackendState>,
    // Signalled when a message lands or the last writer leaves
    readable: Condvar,
    // Signalled when space frees up or the last reader leaves
    writable: Condvar,
}

struct BackendState {
    // None once the last handle has closed
    ring: Option<RingBuffer>,
    refs: usize,
    readers: usize,
    writers: usize,
    // Sticky: set when `readers` drops to zero, cleared by the next reader
    no_readers: bool,
    // Sticky: set when `writers` drops to zero, cleared by the next writer
    no_writers: bool,
    waiters: Vec<Arc<Waiter>>,
}

impl BackendState {
    #[inline(always)]
    fn ring(&self) -> MqResult<&RingBuffer> {
        self.ring.as_ref().ok_or(MqError::BadHandle)
    }

    #[inline(always)]
    fn ring_mut(&mut self) -> MqResult<&mut RingBuffer> {
        self.ring.as_mut().ok_or(MqError::BadHandle)
    }

    fn notify_waiters(&self) {
        for waiter in &self.waiters {
            waiter.notify();
        }
    }
}

impl Backend {
    /// Allocates the ring. The backend starts with no open handles; the
    /// caller attaches the first one.
    pub(crate) fn new(capacity: usize) -> MqResult<Arc<Self>> {
        if capacity == 0 {
            return Err(MqError::InvalidArgument("queue capacity must be non-zero"));
        }

        let ring = RingBuffer::new(capacity)?;
        let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(queue = id, capacity, "queue created");

        Ok(Arc::new(Self {
            id,
            state: Mutex::new(BackendState {
                ring: Some(ring),
                refs: 0,
                readers: 0,
                writers: 0,
                no_readers: false,
                no_writers: false,
                waiters: Vec::new(),
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
        }))
    }

    #[inline(always)]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Accounts for a new handle with `flags`.
    pub(crate) fn attach(&self, flags: OpenFlags) -> MqResult<()> {
        let mut state = self.state.lock();
        if state.ring.is_none() {
            return Err(MqError::BadHandle);
        }

        state.refs += 1;
        if flags.is_reader() {
            state.readers += 1;
            state.no_readers = false;
        }
        if flags.is_writer() {
            state.writers += 1;
            state.no_writers = false;
        }

        trace!(
            queue = self.id,
            refs = state.refs,
            readers = state.readers,
            writers = state.writers,
            "handle opened"
        );
        Ok(())
    }

    /// Releases a handle with `flags`.
    ///
    /// Returns `true` if it was the last handle and the storage was freed.
    pub(crate) fn detach(&self, flags: OpenFlags) -> bool {
        let mut state = self.state.lock();
        debug_assert!(state.refs != 0);
        debug_assert!(state.refs >= state.readers);
        debug_assert!(state.refs >= state.writers);

        let mut latched = false;
        if flags.is_reader() {
            state.readers -= 1;
            if state.readers == 0 {
                state.no_readers = true;
                latched = true;
                debug!(queue = self.id, "last reader closed");
            }
        }
        if flags.is_writer() {
            state.writers -= 1;
            if state.writers == 0 {
                state.no_writers = true;
                latched = true;
                debug!(queue = self.id, "last writer closed");
            }
        }

        if latched {
            self.readable.notify_all();
            self.writable.notify_all();
            state.notify_waiters();
        }

        state.refs -= 1;
        if state.refs == 0 {
            debug_assert!(state.readers == 0 && state.writers == 0);
            state.ring = None;
            debug!(queue = self.id, "queue torn down");
            return true;
        }
        false
    }

    /// Removes one message into `dst`.
    ///
    /// Returns `Ok(0)` once the queue is empty and every writer has closed.
    pub(crate) fn read(&self, dst: &mut [u8], nonblocking: bool) -> MqResult<usize> {
        let mut state = self.state.lock();
        loop {
            match protocol::decode(state.ring_mut()?, dst) {
                Decoded::Frame(len) => {
                    self.writable.notify_all();
                    state.notify_waiters();
                    return Ok(len);
                }
                Decoded::TooSmall(len) => return Err(MqError::MessageTooLarge { len }),
                Decoded::Empty => {}
            }

            if state.no_writers {
                trace!(queue = self.id, "end of stream");
                return Ok(0);
            }
            if nonblocking {
                return Err(MqError::WouldBlock);
            }
            self.readable.wait(&mut state);
        }
    }

    /// Stores `src` as one message.
    pub(crate) fn write(&self, src: &[u8], nonblocking: bool) -> MqResult<()> {
        if src.is_empty() {
            return Err(MqError::InvalidArgument("zero-length message"));
        }

        let needed = protocol::frame_size(src.len());
        let mut state = self.state.lock();
        if needed > state.ring()?.capacity() {
            return Err(MqError::MessageTooLarge { len: src.len() });
        }

        // Readers may all close while we sleep, so the pipe check runs on
        // every pass
        loop {
            if state.no_readers {
                return Err(MqError::BrokenPipe);
            }
            if state.ring()?.free() >= needed {
                break;
            }
            if nonblocking {
                return Err(MqError::WouldBlock);
            }
            self.writable.wait(&mut state);
        }

        // Cannot fail: the loop above saw room for the whole frame
        let stored = protocol::encode(state.ring_mut()?, src);
        debug_assert!(stored, "frame did not fit after space check");
        self.readable.notify_all();
        state.notify_waiters();
        Ok(())
    }

    /// Events ready for a handle with `flags` that requested `requested`.
    pub(crate) fn readiness(&self, flags: OpenFlags, requested: PollEvents) -> PollEvents {
        let state = self.state.lock();
        let Some(ring) = state.ring.as_ref() else {
            return PollEvents::empty();
        };

        let mut ready = PollEvents::empty();
        if requested.contains(PollEvents::READABLE) && (ring.used() > 0 || state.no_writers) {
            ready |= PollEvents::READABLE;
        }
        if requested.contains(PollEvents::WRITABLE) && (ring.free() > 0 || state.no_readers) {
            ready |= PollEvents::WRITABLE;
        }

        let watched = requested | PollEvents::implicit_for(flags);
        if watched.contains(PollEvents::NO_READERS) && state.no_readers {
            ready |= PollEvents::NO_READERS;
        }
        if watched.contains(PollEvents::NO_WRITERS) && state.no_writers {
            ready |= PollEvents::NO_WRITERS;
        }
        ready
    }

    pub(crate) fn register(&self, waiter: &Arc<Waiter>) {
        let mut state = self.state.lock();
        state.waiters.push(Arc::clone(waiter));
    }

    pub(crate) fn deregister(&self, waiter: &Waiter) {
        let mut state = self.state.lock();
        state.waiters.retain(|w| w.id() != waiter.id());
    }

    pub(crate) fn status(&self) -> MqResult<QueueStatus> {
        let state = self.state.lock();
        let ring = state.ring()?;
        Ok(QueueStatus {
            capacity: ring.capacity(),
            used: ring.used(),
            free: ring.free(),
            refs: state.refs,
            readers: state.readers,
            writers: state.writers,
            no_readers: state.no_readers,
            no_writers: state.no_writers,
        })
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }
}
