//! Multipart messages and their single-buffer framing
//!
//! Frame = part count (u32 LE) + for each part: length (u32 LE) + bytes

use bytes::{Buf, BufMut, Bytes, BytesMut};

use emyz_core::{EmyzError, EmyzResult};

/// Ordered message parts, delivered atomically
pub type Multipart = Vec<Bytes>;

/// Upper bound on parts in one message
pub const MAX_PARTS: usize = 1 << 16;

/// Serialize parts into one buffer
///
/// Refuses anything [`decode_frames`] would refuse on the other side.
pub fn encode_frames(parts: &[Bytes]) -> EmyzResult<Vec<u8>> {
    check_part_count(parts.len())?;
    let total: usize = 4 + parts.iter().map(|p| 4 + p.len()).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32_le(parts.len() as u32);
    for part in parts {
        let len = u32::try_from(part.len()).map_err(|_| {
            EmyzError::MalformedMessage(format!("part of {} bytes is too long", part.len()))
        })?;
        buf.put_u32_le(len);
        buf.put_slice(part);
    }
    Ok(buf.to_vec())
}

/// Fail if a message of `count` parts could not be framed
pub fn check_part_count(count: usize) -> EmyzResult<()> {
    if count > MAX_PARTS {
        return Err(EmyzError::MalformedMessage(format!(
            "too many parts: {}",
            count
        )));
    }
    Ok(())
}

/// Parse a buffer produced by [`encode_frames`]
pub fn decode_frames(data: &[u8]) -> EmyzResult<Multipart> {
    let mut buf = Bytes::copy_from_slice(data);
    if buf.remaining() < 4 {
        return Err(EmyzError::BufferTooShort {
            expected: 4,
            actual: buf.remaining(),
        });
    }
    let count = buf.get_u32_le() as usize;
    check_part_count(count)?;

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 4 {
            return Err(EmyzError::BufferTooShort {
                expected: 4,
                actual: buf.remaining(),
            });
        }
        let len = buf.get_u32_le() as usize;
        if buf.remaining() < len {
            return Err(EmyzError::BufferTooShort {
                expected: len,
                actual: buf.remaining(),
            });
        }
        parts.push(buf.split_to(len));
    }

    if buf.has_remaining() {
        return Err(EmyzError::MalformedMessage(format!(
            "{} trailing bytes",
            buf.remaining()
        )));
    }
    Ok(parts)
}
