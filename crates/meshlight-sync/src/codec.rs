//! Wire codec for mesh frames
//!
//! Frames are compact JSON objects:
//!
//! ```text
//! {"type":1,"r":200,"g":23,"b":0}
//! ```
//!
//! The `type` tag comes first so newer kinds (heartbeat, discovery) can be
//! recognized and skipped by older decoders. Every field is extracted
//! explicitly; a frame that is missing a channel or carries one out of range
//! is rejected as a whole and never partially applied.

use core::fmt;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Largest frame the mesh will carry
pub const MAX_FRAME_SIZE: usize = 255;

/// Encoded frame buffer
pub type Frame = Vec<u8, MAX_FRAME_SIZE>;

/// Message kind tag carried in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    ColorUpdate = 1,
    /// Reserved, not produced yet
    Heartbeat = 2,
    /// Reserved, not produced yet
    NodeDiscovery = 3,
}

impl MessageKind {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::ColorUpdate),
            2 => Some(Self::Heartbeat),
            3 => Some(Self::NodeDiscovery),
            _ => None,
        }
    }
}

/// A decoded unit of dissemination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// New color for every ring on the mesh
    ColorUpdate(Rgb),
}

impl Message {
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::ColorUpdate(_) => MessageKind::ColorUpdate,
        }
    }
}

/// Why a frame was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// Frame is longer than [`MAX_FRAME_SIZE`]
    Oversized,
    /// Not a single well-formed object (truncated, garbled, wrong field types)
    Syntax,
    /// No `type` field
    MissingKind,
    /// A color channel field is absent
    MissingChannel,
    /// A color channel is above 255
    ChannelOutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame failed structural or range validation and must be dropped
    Malformed(Malformed),
    /// Frame is well-formed but its kind is not handled here
    UnsupportedKind(u32),
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformed::Oversized => write!(f, "frame exceeds {} bytes", MAX_FRAME_SIZE),
            Malformed::Syntax => write!(f, "invalid frame syntax"),
            Malformed::MissingKind => write!(f, "missing message type"),
            Malformed::MissingChannel => write!(f, "missing color channel"),
            Malformed::ChannelOutOfRange => write!(f, "color channel out of range"),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(reason) => write!(f, "malformed message: {}", reason),
            DecodeError::UnsupportedKind(kind) => write!(f, "unsupported message type {}", kind),
        }
    }
}

impl From<Malformed> for DecodeError {
    fn from(reason: Malformed) -> Self {
        DecodeError::Malformed(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Serialized frame does not fit in [`MAX_FRAME_SIZE`]
    BufferTooSmall,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::BufferTooSmall => write!(f, "frame buffer too small"),
        }
    }
}

#[derive(Serialize)]
struct ColorFrameOut {
    #[serde(rename = "type")]
    kind: u8,
    r: u8,
    g: u8,
    b: u8,
}

/// Inbound frame with every field optional, so absence is detected
/// explicitly instead of defaulting. Channels are read wider than `u8` to
/// tell "out of range" apart from "garbled".
#[derive(Deserialize)]
struct FrameIn {
    #[serde(rename = "type")]
    kind: Option<u32>,
    r: Option<u32>,
    g: Option<u32>,
    b: Option<u32>,
}

/// Encode a message into a frame
pub fn encode(message: &Message) -> Result<Frame, EncodeError> {
    let out = match message {
        Message::ColorUpdate(color) => ColorFrameOut {
            kind: MessageKind::ColorUpdate.as_u8(),
            r: color.r,
            g: color.g,
            b: color.b,
        },
    };
    serde_json_core::to_vec(&out).map_err(|_| EncodeError::BufferTooSmall)
}

/// Encode a color update frame
pub fn encode_color(color: Rgb) -> Result<Frame, EncodeError> {
    encode(&Message::ColorUpdate(color))
}

/// Decode and validate a frame
pub fn decode(frame: &[u8]) -> Result<Message, DecodeError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(Malformed::Oversized.into());
    }

    let (raw, consumed) =
        serde_json_core::from_slice::<FrameIn>(frame).map_err(|_| Malformed::Syntax)?;
    if frame[consumed..].iter().any(|b| !b.is_ascii_whitespace()) {
        return Err(Malformed::Syntax.into());
    }

    let kind = raw.kind.ok_or(Malformed::MissingKind)?;
    match MessageKind::from_u32(kind) {
        Some(MessageKind::ColorUpdate) => {}
        _ => return Err(DecodeError::UnsupportedKind(kind)),
    }

    let r = channel(raw.r)?;
    let g = channel(raw.g)?;
    let b = channel(raw.b)?;
    Ok(Message::ColorUpdate(Rgb { r, g, b }))
}

fn channel(value: Option<u32>) -> Result<u8, Malformed> {
    let value = value.ok_or(Malformed::MissingChannel)?;
    u8::try_from(value).map_err(|_| Malformed::ChannelOutOfRange)
}
