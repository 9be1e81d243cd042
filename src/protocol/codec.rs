//! Text frame codec for the RS-485 link.
//!
//! Wire format:
//! ```text
//! ┌───┬─────┬───┬─────────┬───┬─────────┬─────┬───┐
//! │ < │ TAG │ | │ field 1 │ | │ field 2 │ ... │ > │
//! └───┴─────┴───┴─────────┴───┴─────────┴─────┴───┘
//! ```
//!
//! | Tag      | Direction     | Fields                                         |
//! |----------|---------------|------------------------------------------------|
//! | `WEIGHT` | bridge → peer | weight (2 dp)                                  |
//! | `STATUS` | bridge → peer | free text                                      |
//! | `BRAIN`  | peer → bridge | time (2 dp), battery % (1 dp), V (2 dp), A (2 dp) |
//!
//! Encoding is bounded by [`TX_BUFFER_CAPACITY`]; decoding is lenient by
//! default (unparseable or missing numeric fields read as `0.0`).  Pure
//! functions, no I/O.
//!
//! Status text is restricted to printable ASCII so that it decodes back
//! unchanged.  `BRAIN` values are not clamped: fields large enough to
//! push the frame past [`TX_BUFFER_CAPACITY`] (four values near `1e30`)
//! fail with [`CodecError::Oversize`], so `BRAIN` round-trips hold only
//! for frames within that bound.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Marks the beginning of a frame.
pub const FRAME_START: u8 = b'<';
/// Marks the end of a frame.
pub const FRAME_END: u8 = b'>';
/// Separates payload fields.
pub const FIELD_SEPARATOR: u8 = b'|';

/// Receive buffer size.  A payload holds at most `RX_BUFFER_CAPACITY - 1` bytes.
pub const RX_BUFFER_CAPACITY: usize = 256;
/// Largest encoded frame, markers included.
pub const TX_BUFFER_CAPACITY: usize = 128;
/// Longest status text that can be carried in a `STATUS` frame.
pub const STATUS_TEXT_CAPACITY: usize = 96;

pub const TAG_WEIGHT: &str = "WEIGHT";
pub const TAG_STATUS: &str = "STATUS";
pub const TAG_BRAIN: &str = "BRAIN";

/// Number of numeric fields in a `BRAIN` payload.
const BRAIN_FIELDS: usize = 4;
/// Longest tag retained when reporting an unknown message.
const TAG_CAPACITY: usize = 16;

/// Bounded status text.
pub type StatusText = heapless::String<STATUS_TEXT_CAPACITY>;
/// An encoded frame ready for the wire.
pub type Frame = heapless::Vec<u8, TX_BUFFER_CAPACITY>;
/// Tag of a payload that matched no known message.
pub type Tag = heapless::String<TAG_CAPACITY>;

// ───────────────────────────────────────────────────────────────
// Messages
// ───────────────────────────────────────────────────────────────

/// Telemetry pushed by the VEX V5 Brain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BrainSnapshot {
    /// Brain uptime in seconds.
    pub system_time: f32,
    pub battery_percent: f32,
    pub battery_voltage: f32,
    pub battery_current: f32,
}

/// Typed form of a frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Load cell reading in kilograms.
    Weight(f32),
    /// Human-readable bridge status.
    Status(StatusText),
    /// Peer telemetry snapshot.
    Brain(BrainSnapshot),
}

impl Message {
    /// Build a status message, rejecting text that cannot travel on the wire.
    pub fn status(text: &str) -> Result<Self, CodecError> {
        validate_status_text(text)?;
        let mut bounded = StatusText::new();
        bounded
            .push_str(text)
            .map_err(|()| CodecError::Oversize)?;
        Ok(Self::Status(bounded))
    }

    /// Wire tag of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Weight(_) => TAG_WEIGHT,
            Self::Status(_) => TAG_STATUS,
            Self::Brain(_) => TAG_BRAIN,
        }
    }
}

fn validate_status_text(text: &str) -> Result<(), CodecError> {
    let reserved = |b: u8| b == FRAME_START || b == FRAME_END || b == FIELD_SEPARATOR;
    if text.bytes().any(reserved) {
        return Err(CodecError::ReservedCharacter);
    }
    if !text.bytes().all(is_printable) {
        return Err(CodecError::NonPrintable);
    }
    Ok(())
}

fn is_printable(b: u8) -> bool {
    (0x20..=0x7E).contains(&b)
}

// ───────────────────────────────────────────────────────────────
// Encoding
// ───────────────────────────────────────────────────────────────

/// Serialise `message` into a complete frame, markers included.
///
/// Fails with [`CodecError::Oversize`] if the frame would exceed
/// [`TX_BUFFER_CAPACITY`].
pub fn encode(message: &Message) -> Result<Frame, CodecError> {
    let mut out = heapless::String::<TX_BUFFER_CAPACITY>::new();
    let written = match message {
        Message::Weight(kg) => write!(out, "<{TAG_WEIGHT}|{kg:.2}>"),
        Message::Status(text) => {
            validate_status_text(text)?;
            write!(out, "<{TAG_STATUS}|{text}>")
        }
        Message::Brain(b) => write!(
            out,
            "<{TAG_BRAIN}|{:.2}|{:.1}|{:.2}|{:.2}>",
            b.system_time, b.battery_percent, b.battery_voltage, b.battery_current
        ),
    };
    written.map_err(|_| CodecError::Oversize)?;
    Ok(out.into_bytes())
}

// ───────────────────────────────────────────────────────────────
// Decoding
// ───────────────────────────────────────────────────────────────

/// How to treat a recognised tag with too few fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Missing fields read as zero (matches the deployed Brain firmware).
    #[default]
    Lenient,
    /// Missing fields reject the whole message.
    Strict,
}

/// Why a payload did not produce a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The leading field matched no known tag.
    UnknownMessage { tag: Tag },
    /// Strict mode only: a recognised tag carried too few fields.
    Malformed {
        tag: &'static str,
        expected: usize,
        found: usize,
    },
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownMessage { tag } => write!(f, "unknown tag '{tag}'"),
            Self::Malformed {
                tag,
                expected,
                found,
            } => write!(f, "{tag}: expected {expected} fields, found {found}"),
        }
    }
}

/// Parse a completed frame payload (the bytes between the markers).
pub fn decode(payload: &[u8], mode: DecodeMode) -> Result<Message, DecodeError> {
    let mut fields = payload.split(|&b| b == FIELD_SEPARATOR);
    let tag = fields.next().unwrap_or_default();

    match tag {
        t if t == TAG_BRAIN.as_bytes() => {
            let mut values = [0.0_f32; BRAIN_FIELDS];
            let mut found = 0;
            for (slot, field) in values.iter_mut().zip(fields) {
                *slot = parse_lenient(field);
                found += 1;
            }
            require_fields(mode, TAG_BRAIN, BRAIN_FIELDS, found)?;
            let [system_time, battery_percent, battery_voltage, battery_current] = values;
            Ok(Message::Brain(BrainSnapshot {
                system_time,
                battery_percent,
                battery_voltage,
                battery_current,
            }))
        }
        t if t == TAG_WEIGHT.as_bytes() => {
            let field = fields.next();
            require_fields(mode, TAG_WEIGHT, 1, usize::from(field.is_some()))?;
            Ok(Message::Weight(field.map_or(0.0, parse_lenient)))
        }
        t if t == TAG_STATUS.as_bytes() => {
            let field = fields.next();
            require_fields(mode, TAG_STATUS, 1, usize::from(field.is_some()))?;
            Ok(Message::Status(field.map(printable_text).unwrap_or_default()))
        }
        other => Err(DecodeError::UnknownMessage {
            tag: printable_text(other),
        }),
    }
}

fn require_fields(
    mode: DecodeMode,
    tag: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), DecodeError> {
    if mode == DecodeMode::Strict && found < expected {
        return Err(DecodeError::Malformed {
            tag,
            expected,
            found,
        });
    }
    Ok(())
}

/// Copy printable ASCII into a bounded string, replacing anything else
/// with `?` and truncating at capacity.
fn printable_text<const N: usize>(bytes: &[u8]) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for &b in bytes {
        let c = if is_printable(b) { b as char } else { '?' };
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Parse the longest numeric prefix of `field` the way C `atof` does:
/// leading whitespace skipped, trailing garbage ignored, no digits ⇒ `0.0`.
pub fn parse_lenient(field: &[u8]) -> f32 {
    let start = field
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(field.len());
    let field = &field[start..];
    let end = numeric_prefix_len(field);
    core::str::from_utf8(&field[..end])
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(0.0)
}

fn numeric_prefix_len(s: &[u8]) -> usize {
    let digits_from = |mut i: usize| {
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if matches!(s.first(), Some(b'+' | b'-')) {
        i = 1;
    }
    let int_end = digits_from(i);
    let mut mantissa_digits = int_end - i;
    i = int_end;

    if s.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        mantissa_digits += frac_end - (i + 1);
        i = frac_end;
    }
    if mantissa_digits == 0 {
        return 0;
    }

    if matches!(s.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(s.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }
    i
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
