//! Frame encoder/decoder over a [`RingBuffer`]
//!
//! Encoding checks for room up front so that a frame is either stored whole
//! or not at all. Decoding peeks the header first, which lets a caller with a
//! short buffer learn the message size without consuming anything.

use super::frame::{frame_size, FrameHeader, HEADER_SIZE};
use crate::core::RingBuffer;

/// Outcome of [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// No complete frame is queued.
    Empty,
    /// A frame of this payload length is queued but the destination is too
    /// small. Nothing was consumed.
    TooSmall(usize),
    /// A frame was consumed; this many payload bytes were copied.
    Frame(usize),
}

/// Stores `payload` as one frame.
///
/// Returns `false` (and stores nothing) if the frame does not fit right now.
#[inline]
pub fn encode(ring: &mut RingBuffer, payload: &[u8]) -> bool {
    if frame_size(payload.len()) > ring.free() {
        return false;
    }

    let header = FrameHeader::new(payload.len());
    ring.write(&header.to_bytes()) && ring.write(payload)
}

/// Header of the frame at the front of the ring, if a complete frame is
/// queued.
#[inline]
pub fn peek_header(ring: &RingBuffer) -> Option<FrameHeader> {
    let mut bytes = [0u8; HEADER_SIZE];
    if !ring.peek(&mut bytes) {
        return None;
    }

    let header = FrameHeader::from_bytes(bytes);
    (ring.used() >= header.total_size()).then_some(header)
}

/// Removes the front frame into `dst`.
///
/// The frame stays queued when `dst` is shorter than its payload.
pub fn decode(ring: &mut RingBuffer, dst: &mut [u8]) -> Decoded {
    let Some(header) = peek_header(ring) else {
        return Decoded::Empty;
    };

    let len = header.payload_len();
    if len > dst.len() {
        return Decoded::TooSmall(len);
    }

    let mut bytes = [0u8; HEADER_SIZE];
    // Both reads succeed: peek_header saw the whole frame
    let consumed = ring.read(&mut bytes) && ring.read(&mut dst[..len]);
    debug_assert!(consumed, "frame vanished between peek and read");
    Decoded::Frame(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_single() {
        let mut ring = RingBuffer::new(64).unwrap();
        assert!(encode(&mut ring, b"Hello, queue!"));
        assert_eq!(ring.used(), HEADER_SIZE + 13);

        let mut out = [0u8; 32];
        assert_eq!(decode(&mut ring, &mut out), Decoded::Frame(13));
        assert_eq!(&out[..13], b"Hello, queue!");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_decode_short_buffer_keeps_frame() {
        let mut ring = RingBuffer::new(64).unwrap();
        assert!(encode(&mut ring, b"0123456789"));

        let mut small = [0u8; 4];
        assert_eq!(decode(&mut ring, &mut small), Decoded::TooSmall(10));
        assert_eq!(ring.used(), HEADER_SIZE + 10);

        let mut big = [0u8; 10];
        assert_eq!(decode(&mut ring, &mut big), Decoded::Frame(10));
        assert_eq!(&big, b"0123456789");
    }

    #[test]
    fn test_encode_is_all_or_nothing() {
        let mut ring = RingBuffer::new(16).unwrap();
        assert!(encode(&mut ring, b"abcd")); // 12 bytes used
        assert!(!encode(&mut ring, b"x")); // needs 9, only 4 free
        assert_eq!(ring.used(), 12);
    }

    #[test]
    fn test_decode_empty() {
        let mut ring = RingBuffer::new(16).unwrap();
        let mut out = [0u8; 4];
        assert_eq!(decode(&mut ring, &mut out), Decoded::Empty);
        assert!(peek_header(&ring).is_none());
    }

    #[test]
    fn test_frames_wrap_around_store_end() {
        let mut ring = RingBuffer::new(20).unwrap();
        let mut out = [0u8; 8];
        for i in 0u8..10 {
            let payload = [i; 5];
            assert!(encode(&mut ring, &payload));
            assert_eq!(decode(&mut ring, &mut out), Decoded::Frame(5));
            assert_eq!(&out[..5], &payload);
        }
    }
}
