//! Length-prefixed framing for the stream transport.
//!
//! ```text
//! [length: u32 big-endian] [payload: length bytes]
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Size of the frame length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Frame-level failures. Any of these leaves the stream unsynchronized.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the connection, possibly in the middle of a frame.
    #[error("connection closed")]
    Closed,

    #[error("frame length {length} exceeds maximum {max}")]
    Oversized { length: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Prefix `payload` with its length.
pub fn frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Write one frame with a single `write_all`.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    writer.write_all(&frame(payload))?;
    writer.flush()
}

/// Read one frame, rejecting declared lengths above `max`.
///
/// The body is only read after the length has been validated, so an
/// oversized frame never causes an allocation of the declared size.
pub fn read_frame<R: Read>(reader: &mut R, max: usize) -> Result<Vec<u8>, FrameError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    read_exact_or_closed(reader, &mut header)?;

    let length = u32::from_be_bytes(header) as usize;
    if length > max {
        return Err(FrameError::Oversized { length, max });
    }

    let mut payload = vec![0u8; length];
    read_exact_or_closed(reader, &mut payload)?;
    Ok(payload)
}

fn read_exact_or_closed<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::Closed),
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Err(FrameError::Closed),
        Err(e) => Err(FrameError::Io(e)),
    }
}
