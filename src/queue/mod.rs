//! Queue layer: handles, shared backends and multi-queue poll
//!
//! Features:
//! - Any number of reader and writer handles per queue
//! - Blocking and non-blocking reads and writes
//! - Sticky "no readers"/"no writers" latches for end-of-stream and broken
//!   pipe detection
//! - `poll` over any set of handles, each queue locked independently

mod backend;
mod flags;
mod handle;
mod poll;
mod waiter;

pub use backend::QueueStatus;
pub use flags::{OpenFlags, PollEvents};
pub use handle::Handle;
pub use poll::{poll, PollEntry};
