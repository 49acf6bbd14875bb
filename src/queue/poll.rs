//! Multiplexed readiness wait over several queues.
//!
//! [`poll`] evaluates every entry under its own backend's lock, one backend
//! at a time. When nothing is ready it registers a single [`Waiter`] with
//! each distinct backend and sleeps on the waiter alone, so no backend lock
//! is ever held while blocked and no two backend locks are ever held at
//! once. Registration happens before the final re-evaluation, which closes
//! the window between the fast-path check and going to sleep.

use std::sync::Arc;

use tracing::trace;

use super::backend::Backend;
use super::flags::PollEvents;
use super::handle::Handle;
use super::waiter::Waiter;
use crate::error::{MqError, MqResult};

/// One queue watched by [`poll`].
#[derive(Debug)]
pub struct PollEntry<'a> {
    handle: &'a Handle,
    events: PollEvents,
    revents: PollEvents,
}

impl<'a> PollEntry<'a> {
    pub fn new(handle: &'a Handle, events: PollEvents) -> Self {
        Self {
            handle,
            events,
            revents: PollEvents::empty(),
        }
    }

    #[inline(always)]
    pub fn handle(&self) -> &'a Handle {
        self.handle
    }

    /// Requested events.
    #[inline(always)]
    pub fn events(&self) -> PollEvents {
        self.events
    }

    /// Events found ready by the last successful [`poll`]. May include
    /// `NO_READERS`/`NO_WRITERS` that were not requested.
    #[inline(always)]
    pub fn revents(&self) -> PollEvents {
        self.revents
    }
}

/// Blocks until at least one entry is ready and returns how many are.
///
/// Fails without touching any entry when the set is empty, a handle is null,
/// or an entry asks for an event its handle cannot have.
pub fn poll(entries: &mut [PollEntry<'_>]) -> MqResult<usize> {
    validate(entries)?;

    let ready = evaluate(entries);
    if ready > 0 {
        return Ok(ready);
    }

    let registration = Registration::new(entries)?;
    trace!(queues = registration.backends.len(), "poll blocking");
    loop {
        let ready = evaluate(entries);
        if ready > 0 {
            trace!(ready, "poll woke");
            return Ok(ready);
        }
        registration.waiter.wait();
    }
}

fn validate(entries: &[PollEntry<'_>]) -> MqResult<()> {
    if entries.is_empty() {
        return Err(MqError::InvalidArgument("empty poll set"));
    }

    // Null handles are reported ahead of any malformed entry
    for entry in entries {
        entry.handle().backend()?;
    }

    for entry in entries {
        let flags = entry.handle().flags();
        let events = entry.events();

        if events.contains(PollEvents::READABLE) && !flags.is_reader() {
            return Err(MqError::InvalidArgument(
                "READABLE requested on a handle without read capability",
            ));
        }
        if events.contains(PollEvents::WRITABLE) && !flags.is_writer() {
            return Err(MqError::InvalidArgument(
                "WRITABLE requested on a handle without write capability",
            ));
        }
        if (events | PollEvents::implicit_for(flags)).is_empty() {
            return Err(MqError::InvalidArgument("poll entry watches no events"));
        }
    }
    Ok(())
}

fn evaluate(entries: &mut [PollEntry<'_>]) -> usize {
    let mut ready = 0;
    for entry in entries.iter_mut() {
        let handle = entry.handle();
        entry.revents = match handle.backend() {
            Ok(backend) => backend.readiness(handle.flags(), entry.events()),
            Err(_) => PollEvents::empty(),
        };
        if !entry.revents.is_empty() {
            ready += 1;
        }
    }
    ready
}

/// A waiter linked into every distinct backend of a poll set. Unlinks itself
/// on drop, including during unwinding.
struct Registration {
    waiter: Arc<Waiter>,
    backends: Vec<Arc<Backend>>,
}

impl Registration {
    fn new(entries: &[PollEntry<'_>]) -> MqResult<Self> {
        let mut backends: Vec<Arc<Backend>> = Vec::new();
        backends
            .try_reserve(entries.len())
            .map_err(|_| MqError::OutOfMemory {
                size: entries.len() * std::mem::size_of::<Arc<Backend>>(),
            })?;

        for entry in entries {
            let backend = entry.handle().backend()?;
            if !backends.iter().any(|b| b.id() == backend.id()) {
                backends.push(Arc::clone(backend));
            }
        }

        let waiter = Arc::new(Waiter::new());
        for backend in &backends {
            backend.register(&waiter);
        }
        Ok(Self { waiter, backends })
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        for backend in &self.backends {
            backend.deregister(&self.waiter);
        }
    }
}
