//! Intermediate framing for byte-stream transports.
//!
//! The first four bytes a client writes are the init marker `0xeeeeeeee`.
//! After that every payload travels as `[len:u32 LE][payload]`.
//!
//! The decoder is push-based so a reader task can feed it whatever chunk
//! sizes the socket hands back.

use std::fmt;

/// Sent once, first thing after connecting.
pub const INIT: [u8; 4] = [0xee, 0xee, 0xee, 0xee];

/// Anything larger is treated as stream corruption.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// The byte stream cannot be resynchronised.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameError {
    /// A length prefix exceeded [`MAX_FRAME_LEN`].
    TooLarge {
        /// The announced length.
        len: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { len } => write!(f, "frame of {len} bytes exceeds {MAX_FRAME_LEN}"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Prefix `payload` with its length.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Reassembles frames from arbitrarily split reads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Still waiting to skip the peer's init marker (accepting side only).
    expect_init: bool,
}

impl FrameDecoder {
    /// Decoder for the client side: frames start immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder for the accepting side: a leading [`INIT`] marker is skipped.
    pub fn accepting() -> Self {
        Self { buf: Vec::new(), expect_init: true }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.expect_init {
            if self.buf.len() < INIT.len() {
                return Ok(None);
            }
            if self.buf[..4] == INIT {
                self.buf.drain(..4);
            }
            self.expect_init = false;
        }

        let Some(head) = self.buf.first_chunk::<4>() else {
            return Ok(None);
        };
        let len = u32::from_le_bytes(*head) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge { len });
        }
        if self.buf.len() < 4 + len {
            return Ok(None);
        }
        let frame = self.buf[4..4 + len].to_vec();
        self.buf.drain(..4 + len);
        Ok(Some(frame))
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
