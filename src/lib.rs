//! mqueue - bounded in-process message queue
//!
//! Architecture:
//! - [`core`]: fixed-capacity byte ring over an anonymous mmap store
//! - [`protocol`]: length-prefixed framing, one frame per message
//! - [`queue`]: reference-counted handles, blocking transfer, multi-queue
//!   [`poll`]
//!
//! ```
//! use mqueue::{Handle, OpenFlags};
//!
//! let reader = Handle::create(256, OpenFlags::READER).unwrap();
//! let writer = reader.open(OpenFlags::WRITER).unwrap();
//!
//! writer.write(b"hello").unwrap();
//! let mut buf = [0u8; 16];
//! assert_eq!(reader.read(&mut buf).unwrap(), 5);
//! assert_eq!(&buf[..5], b"hello");
//! ```

pub mod core;
pub mod error;
pub mod protocol;
pub mod queue;

pub use error::{MqError, MqResult};
pub use queue::{poll, Handle, OpenFlags, PollEntry, PollEvents, QueueStatus};
