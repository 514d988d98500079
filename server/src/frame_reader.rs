// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Splits the LX200 byte stream into command frames.
//!
//! LX200 commands have no length prefix. A command starts with `:` and ends
//! with `#`:
//!
//! ```text
//! :Sr10:30:00#
//! ^ marker    ^ terminator
//! ```
//!
//! Two control commands are a single byte with neither marker nor
//! terminator: ACK (0x06, the alignment query) and EOT (0x04, the firmware
//! download request).
//!
//! The marker also appears inside parameters (`:Sr10:30:00#`), so only the
//! terminator ends a frame. Anything before a marker is dropped; for example
//! Stellarium prefixes every command with a stray `#`.

use bytes::{Buf, BytesMut};
use log::debug;
use memchr::memchr;
use thiserror::Error;

/// Command marker.
pub const COMMAND_START: u8 = b':';
/// Command terminator.
pub const COMMAND_END: u8 = b'#';
/// Alignment query, sent bare.
pub const ACK: u8 = 0x06;
/// Firmware download request, sent bare.
pub const EOT: u8 = 0x04;

/// Longest command body (bytes between marker and terminator) we accept. The
/// longest real LX200 command is well under this.
pub const MAX_FRAME_LEN: usize = 32;

/// One complete command as it appeared on the wire, marker and terminator
/// included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Frame(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The bytes between the marker and the terminator. None for the bare
    /// control frames, or if the frame is not delimited.
    pub fn body(&self) -> Option<&[u8]> {
        match self.0.as_slice() {
            [COMMAND_START, body @ .., COMMAND_END] => Some(body),
            _ => None,
        }
    }
}

/// Framing problems. These never reach the client: the reader drops the
/// offending bytes and carries on with the next marker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("discarded {0} bytes outside of a command")]
    Garbage(usize),

    #[error("discarded {discarded} bytes: command longer than {max} bytes")]
    Overflow { discarded: usize, max: usize },
}

/// Accumulates received bytes and extracts complete frames.
#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: BytesMut,

    // Total bytes dropped while resynchronizing.
    discarded: usize,
}

impl FrameReader {
    pub fn new() -> Self {
        FrameReader {
            buffer: BytesMut::with_capacity(2 * MAX_FRAME_LEN),
            discarded: 0,
        }
    }

    /// Appends `data` and returns an iterator over all frames that are now
    /// complete. Frames are extracted lazily; any not consumed before the
    /// iterator is dropped are returned by the next call (`feed(&[])` works).
    pub fn feed(&mut self, data: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(data);
        Frames { reader: self }
    }

    /// Number of bytes held waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes dropped so far while resynchronizing.
    pub fn discarded_bytes(&self) -> usize {
        self.discarded
    }

    fn next_frame(&mut self) -> Option<Frame> {
        loop {
            match self.try_next_frame() {
                Ok(frame) => return frame,
                Err(e) => debug!("Resynchronizing LX200 input: {}", e),
            }
        }
    }

    // Every Err return has removed at least one byte from the buffer, so
    // next_frame() terminates.
    fn try_next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let start = self
            .buffer
            .iter()
            .position(|&b| b == COMMAND_START || b == ACK || b == EOT);
        match start {
            None if self.buffer.is_empty() => return Ok(None),
            None => {
                let n = self.buffer.len();
                self.discard(n);
                return Err(FrameError::Garbage(n));
            }
            Some(0) => {}
            Some(n) => {
                self.discard(n);
                return Err(FrameError::Garbage(n));
            }
        }

        if self.buffer[0] != COMMAND_START {
            let control = self.buffer.split_to(1);
            return Ok(Some(Frame(control.to_vec())));
        }

        match memchr(COMMAND_END, &self.buffer[1..]) {
            Some(body_len) => {
                let frame_len = body_len + 2;
                if body_len > MAX_FRAME_LEN {
                    self.discard(frame_len);
                    return Err(FrameError::Overflow {
                        discarded: frame_len,
                        max: MAX_FRAME_LEN,
                    });
                }
                let frame = self.buffer.split_to(frame_len);
                Ok(Some(Frame(frame.to_vec())))
            }
            None if self.buffer.len() - 1 > MAX_FRAME_LEN => {
                let n = self.buffer.len();
                self.discard(n);
                Err(FrameError::Overflow { discarded: n, max: MAX_FRAME_LEN })
            }
            None => Ok(None), // Wait for more input.
        }
    }

    fn discard(&mut self, n: usize) {
        self.buffer.advance(n);
        self.discarded += n;
    }
}

/// Lazy sequence of the frames currently available from a FrameReader.
pub struct Frames<'a> {
    reader: &'a mut FrameReader,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.reader.next_frame()
    }
}
