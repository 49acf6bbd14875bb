//! Length-prefixed frame format
//!
//! Layout:
//! ┌─────────────────────────────────────────────────────┐
//! │ FrameHeader (8 bytes, little-endian payload length) │
//! ├─────────────────────────────────────────────────────┤
//! │ Payload (variable, at least 1 byte)                 │
//! └─────────────────────────────────────────────────────┘
//!
//! Header and payload are always stored and removed together.

/// Size of the length prefix in bytes.
pub const HEADER_SIZE: usize = std::mem::size_of::<u64>();

/// Fixed-width length prefix stored in front of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes
    pub payload_len: u64,
}

impl FrameHeader {
    #[inline(always)]
    pub fn new(payload_len: usize) -> Self {
        Self {
            payload_len: payload_len as u64,
        }
    }

    #[inline(always)]
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        self.payload_len.to_le_bytes()
    }

    #[inline(always)]
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            payload_len: u64::from_le_bytes(bytes),
        }
    }

    /// Payload length as a host size. Saturates on 32-bit hosts so that an
    /// oversized length always compares as too large.
    #[inline(always)]
    pub fn payload_len(&self) -> usize {
        usize::try_from(self.payload_len).unwrap_or(usize::MAX)
    }

    /// Total frame size (header + payload)
    #[inline(always)]
    pub fn total_size(&self) -> usize {
        frame_size(self.payload_len())
    }
}

/// Bytes a payload of `payload_len` occupies once framed.
#[inline(always)]
pub fn frame_size(payload_len: usize) -> usize {
    HEADER_SIZE.saturating_add(payload_len)
}
