//! Incremental frame receiver.
//!
//! Turns the byte stream read off the bus into complete payloads, one
//! transition per byte:
//!
//! ```text
//!            '<' (clear)               '<' (abandon + clear)
//!   ┌──────┐ ───────────▶ ┌──────────────┐ ──┐
//!   │ Idle │              │ Accumulating │ ◀─┘
//!   └──────┘ ◀─────────── └──────────────┘
//!     ▲  │      '>' (emit)        │ other byte: append if room,
//!     └──┘                         │ else drop (payload truncated)
//!   anything else ignored          ▼
//! ```
//!
//! The buffer holds at most `N - 1` payload bytes whatever the input, so
//! malformed or hostile traffic can never grow it.

use log::debug;

use super::codec::{FRAME_END, FRAME_START, RX_BUFFER_CAPACITY};

/// Receiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// No frame in progress.
    Idle,
    /// Between a start marker and an end marker.
    Accumulating,
}

/// A payload delimited by a start and an end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedFrame<'a> {
    /// Bytes between the markers (possibly truncated).
    pub payload: &'a [u8],
    /// Bytes discarded because the buffer was full.
    pub dropped_bytes: usize,
}

impl CompletedFrame<'_> {
    pub fn is_truncated(&self) -> bool {
        self.dropped_bytes > 0
    }
}

/// Byte-at-a-time frame recogniser with a fixed `N`-byte buffer.
pub struct FrameReceiver<const N: usize = RX_BUFFER_CAPACITY> {
    state: ReceiverState,
    buf: heapless::Vec<u8, N>,
    dropped: usize,
    /// Frames superseded by a new start marker before their end marker.
    abandoned: u32,
}

impl<const N: usize> Default for FrameReceiver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameReceiver<N> {
    /// Largest payload this receiver retains.
    pub const MAX_PAYLOAD: usize = N - 1;

    pub fn new() -> Self {
        Self {
            state: ReceiverState::Idle,
            buf: heapless::Vec::new(),
            dropped: 0,
            abandoned: 0,
        }
    }

    /// Advance by one byte.
    ///
    /// Returns the completed payload when `byte` is an end marker closing
    /// a frame.  The slice is valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<CompletedFrame<'_>> {
        if self.state == ReceiverState::Idle {
            // The previous payload has been handed out already.
            self.buf.clear();
            self.dropped = 0;
        }

        match (self.state, byte) {
            (ReceiverState::Accumulating, FRAME_START) => {
                self.abandoned = self.abandoned.wrapping_add(1);
                debug!(
                    "RS485: unterminated frame abandoned ({} bytes)",
                    self.buf.len()
                );
                self.buf.clear();
                self.dropped = 0;
                None
            }
            (ReceiverState::Idle, FRAME_START) => {
                self.state = ReceiverState::Accumulating;
                None
            }
            (ReceiverState::Accumulating, FRAME_END) => {
                self.state = ReceiverState::Idle;
                Some(CompletedFrame {
                    payload: self.buf.as_slice(),
                    dropped_bytes: self.dropped,
                })
            }
            (ReceiverState::Accumulating, _) => {
                if self.buf.len() < Self::MAX_PAYLOAD {
                    // Cannot fail: len < N - 1.
                    let _ = self.buf.push(byte);
                } else {
                    self.dropped += 1;
                }
                None
            }
            (ReceiverState::Idle, _) => None,
        }
    }

    /// Feed a chunk, invoking `on_frame` for every completed payload.
    /// Returns the number of frames completed.
    pub fn feed(&mut self, bytes: &[u8], mut on_frame: impl FnMut(CompletedFrame<'_>)) -> usize {
        let mut completed = 0;
        for &b in bytes {
            if let Some(frame) = self.push(b) {
                completed += 1;
                on_frame(frame);
            }
        }
        completed
    }

    /// Drop any partial frame and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = ReceiverState::Idle;
        self.buf.clear();
        self.dropped = 0;
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Bytes held for the frame in progress (0 when idle).
    pub fn len(&self) -> usize {
        match self.state {
            ReceiverState::Idle => 0,
            ReceiverState::Accumulating => self.buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Frames superseded by a new start marker since construction.
    pub fn abandoned_frames(&self) -> u32 {
        self.abandoned
    }
}
