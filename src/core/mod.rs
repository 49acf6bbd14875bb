//! Core module: byte ring buffer over an mmap-backed store
//!
//! Design principles:
//! - Single allocation: the store is mapped once when the queue is created
//! - No internal locking: the owning queue backend serializes all access
//! - Split copies: transfers that cross the end of the store wrap around

mod ring_buffer;
mod store;

pub use ring_buffer::RingBuffer;
pub use store::{ByteStore, POISON};
