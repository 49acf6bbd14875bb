//! Protocol layer: length-prefixed message framing
//!
//! Design principles:
//! - Fixed-size header: one little-endian length word per message
//! - Atomic frames: a message is stored and removed as a single unit
//! - No allocation: frames are copied straight between caller buffers and
//!   the ring

mod codec;
mod frame;

pub use codec::{decode, encode, peek_header, Decoded};
pub use frame::{frame_size, FrameHeader, HEADER_SIZE};
