//! Fixed-size framing of audio buffers for the duplex transport.
//!
//! The telephony WebSocket expects outbound audio in small packets of a
//! constant size (640 bytes = 20ms of 16-bit mono PCM at 16kHz). Frames are
//! zero-copy slices of the source buffer.

use bytes::Bytes;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;

/// Recommended packet size for 16kHz linear PCM on the duplex channel (20ms).
pub const DEFAULT_FRAME_SIZE: usize = 640;

/// Linear PCM sample rates accepted on the call socket, in Hz.
pub const SUPPORTED_SAMPLE_RATES: RangeInclusive<u32> = 8000..=48000;

/// Split `buffer` into consecutive frames of `frame_size` bytes.
///
/// Every frame is exactly `frame_size` long except the last one, which holds
/// the remainder when the buffer length is not a multiple of the frame size.
/// Nothing is padded, dropped or reordered; an empty buffer yields no frames.
///
/// # Example
/// ```rust
/// use bytes::Bytes;
/// use std::num::NonZeroUsize;
/// use callbridge::core::audio::frame_audio;
///
/// let frames = frame_audio(&Bytes::from(vec![0u8; 1500]), NonZeroUsize::new(640).unwrap());
/// assert_eq!(frames.len(), 3);
/// assert_eq!(frames[2].len(), 220);
/// ```
pub fn frame_audio(buffer: &Bytes, frame_size: NonZeroUsize) -> Vec<Bytes> {
    let frame_size = frame_size.get();
    let mut frames = Vec::with_capacity(buffer.len().div_ceil(frame_size));

    let mut offset = 0;
    while offset < buffer.len() {
        let end = (offset + frame_size).min(buffer.len());
        frames.push(buffer.slice(offset..end));
        offset = end;
    }

    frames
}
