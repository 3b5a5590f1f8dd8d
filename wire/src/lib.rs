//! # Wire messages exchanged between a game client and its server.
//!
//! Every message starts with a small header whose first byte says what the rest of
//! the buffer holds. Text-bearing messages carry a NUL-terminated string; game-packet
//! messages carry a fixed [`GameUpdatePacket`] record with an optional extension.
//!
//! ```text
//! message   := category:u8 reserved:[u8; 3] payload
//! payload   := text NUL
//!            | record:[u8; 60] extension:[u8; data_size]?
//! ```
//!
//! Everything here is meant for buffers received from untrusted peers: nothing
//! panics or reads past the buffer on short or inconsistent input.
mod packet;
pub mod text;

use ::core::fmt;
use ::std::borrow::Cow;

pub use packet::{
    decode, encode, encode_into, CharacterState, DecodeError, EncodeError, GameUpdatePacket, Movement, Npc,
    PacketFlags, PacketType, Particle, Ping, TileChange, ViewError, RECORD_LEN,
};

/// Length of the header in front of every payload.
pub const HEADER_LEN: usize = 4;

/// What a message's payload holds, taken from header byte 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    Hello,
    GenericText,
    GameMessage,
    GamePacket,
    Error,
    Track,
    ClientLogRequest,
    ClientLogResponse,
    /// Too short to classify, or a header byte past the known range.
    Unknown,
}

impl MessageCategory {
    const KNOWN: [MessageCategory; 8] = [
        MessageCategory::Hello,
        MessageCategory::GenericText,
        MessageCategory::GameMessage,
        MessageCategory::GamePacket,
        MessageCategory::Error,
        MessageCategory::Track,
        MessageCategory::ClientLogRequest,
        MessageCategory::ClientLogResponse,
    ];

    /// Anything outside the known range is [`Unknown`](Self::Unknown).
    pub fn from_raw(raw: u8) -> Self {
        Self::KNOWN.get(raw as usize).copied().unwrap_or(MessageCategory::Unknown)
    }

    /// Out-of-range values saturate to the last known category.
    /// Only meant for log output; dispatch goes through [`from_raw`](Self::from_raw).
    pub fn saturating_from_raw(raw: u8) -> Self {
        Self::KNOWN[(raw as usize).min(Self::KNOWN.len() - 1)]
    }

    /// The header byte written for this category.
    /// `Unknown` writes a value that reads back as `Unknown`.
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Whether the payload is a NUL-terminated string.
    pub fn is_text(self) -> bool {
        use MessageCategory::*;
        matches!(self, GenericText | GameMessage | Error | Track | ClientLogRequest | ClientLogResponse)
    }

    pub fn name(self) -> &'static str {
        use MessageCategory::*;
        match self {
            Hello => "hello",
            GenericText => "generic text",
            GameMessage => "game message",
            GamePacket => "game packet",
            Error => "error",
            Track => "track",
            ClientLogRequest => "client log request",
            ClientLogResponse => "client log response",
            Unknown => "unknown",
        }
    }
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A buffer too short to carry a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingError {
    pub len: usize,
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message of {} bytes is shorter than the {}-byte header", self.len, HEADER_LEN)
    }
}

impl ::std::error::Error for FramingError {}

/// A classified message, borrowing its payload from the receive buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WireMessage<'a> {
    pub category: MessageCategory,
    /// Header byte 0 as received, kept for logging.
    pub raw_category: u8,
    pub payload: &'a [u8],
}

impl<'a> WireMessage<'a> {
    fn unknown() -> Self {
        Self { category: MessageCategory::Unknown, raw_category: MessageCategory::Unknown.raw(), payload: &[] }
    }

    /// Category label for logs, saturating out-of-range header bytes.
    pub fn label(&self) -> MessageCategory {
        MessageCategory::saturating_from_raw(self.raw_category)
    }

    /// The payload as text, with the final byte treated as the terminator.
    ///
    /// Stops early at an embedded NUL, the way a C string reader would.
    pub fn text(&self) -> Cow<'a, str> {
        let body = match self.payload.split_last() {
            Some((_terminator, body)) => body,
            None => return Cow::Borrowed(""),
        };
        let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
        String::from_utf8_lossy(&body[..end])
    }

    /// Decode the payload as a game-update record.
    pub fn game_packet(&self) -> Result<(GameUpdatePacket, Option<&'a [u8]>), DecodeError> {
        decode(self.payload)
    }
}

/// Split a received buffer into category and payload.
pub fn try_classify(buf: &[u8]) -> Result<WireMessage<'_>, FramingError> {
    match *buf {
        [raw, _, _, _, ref payload @ ..] => Ok(WireMessage {
            category: MessageCategory::from_raw(raw),
            raw_category: raw,
            payload,
        }),
        _ => Err(FramingError { len: buf.len() }),
    }
}

/// Like [`try_classify`], but short buffers become an empty `Unknown` message
/// after the framing error is logged.
pub fn classify(buf: &[u8]) -> WireMessage<'_> {
    match try_classify(buf) {
        Ok(msg) => msg,
        Err(e) => {
            ::tracing::warn!("framing error: {}", e);
            WireMessage::unknown()
        },
    }
}

fn header(category: MessageCategory) -> [u8; HEADER_LEN] {
    [category.raw(), 0, 0, 0]
}

/// Build a text-bearing message, appending the NUL terminator.
pub fn encode_text(category: MessageCategory, text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + text.len() + 1);
    out.extend_from_slice(&header(category));
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

/// Build a game-packet message from a record and its extension.
pub fn encode_game_packet(packet: &GameUpdatePacket, extension: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(HEADER_LEN + RECORD_LEN + extension.len());
    out.extend_from_slice(&header(MessageCategory::GamePacket));
    encode_into(packet, extension, &mut out)?;
    Ok(out)
}
