//! Parser and builders for the minimal broker frame subset.
//!
//! Wire format of the frames the controller understands:
//! ```text
//! CONNECT      [0x10][...ignored...]
//! PUBLISH      [0x3?][remaining_len:1][topic_len:2 BE][topic:topic_len][payload:rest]
//! PINGREQ      [0xC0][0x00]
//! ```
//!
//! Every other first byte, DISCONNECT (`0xE0`) included, decodes to
//! [`Frame::Unknown`].  A client ends its session by closing the socket;
//! [`encode_disconnect`] exists only so clients can send a well-formed
//! goodbye before doing so.
//!
//! Each call to [`parse_frame`] looks at exactly one buffer as returned by a
//! single socket read.  Nothing is buffered between reads, so a frame split
//! across two reads is not reassembled; clients of this controller send tiny
//! frames that always arrive whole.  The remaining-length byte of PUBLISH is
//! skipped rather than decoded, which only works while it fits in one byte.

use thiserror::Error;

/// Fixed CONNACK reply: session not present, connection accepted.
pub const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// Fixed PINGRESP reply.
pub const PINGRESP: [u8; 2] = [0xD0, 0x00];

const CONNECT_BYTE: u8 = 0x10;
const PUBLISH_TYPE: u8 = 0x30;
const PINGREQ_BYTE: u8 = 0xC0;
const DISCONNECT_BYTE: u8 = 0xE0;
const PACKET_TYPE_MASK: u8 = 0xF0;

/// Fixed header (2) + topic length prefix (2).
const PUBLISH_PREFIX_LEN: usize = 4;

/// Largest remaining length that still fits in the single byte the parser skips.
const MAX_SINGLE_BYTE_REMAINING: usize = 127;

/// Errors that can occur while parsing a frame.
///
/// Every variant except [`ProtocolError::Empty`] is a malformed frame: the
/// connection that sent it stays open and the frame is dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer contained no bytes at all.
    #[error("empty frame")]
    Empty,

    /// A PUBLISH frame ended before its topic length prefix.
    #[error("truncated publish header: need at least {needed} bytes, got {available}")]
    TruncatedHeader { needed: usize, available: usize },

    /// The declared topic length runs past the end of the buffer.
    #[error("topic length {declared} exceeds the {available} bytes available")]
    TopicOverrun { declared: usize, available: usize },

    /// The topic bytes are not valid UTF-8.
    #[error("topic is not valid UTF-8")]
    InvalidTopic,

    /// A frame being built would not fit the single-byte remaining length.
    #[error("frame too large: remaining length {0} exceeds 127 bytes")]
    FrameTooLarge(usize),
}

impl ProtocolError {
    /// Returns `true` for errors caused by malformed bytes on the wire.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Empty | Self::FrameTooLarge(_))
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Client connection request; answered with [`CONNACK`].
    Connect,
    /// Message published to `topic`.
    Publish { topic: String, payload: Vec<u8> },
    /// Keepalive request; answered with [`PINGRESP`].
    PingRequest,
    /// Any other packet type.  Carries the first byte for logging.
    Unknown { packet_type: u8 },
}

impl Frame {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Publish { .. } => "PUBLISH",
            Self::PingRequest => "PINGREQ",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses the frame at the start of `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the buffer is empty or a PUBLISH frame is
/// malformed.  Unrecognised packet types are not an error; they decode to
/// [`Frame::Unknown`].
///
/// # Examples
///
/// ```rust
/// use semaforo_core::protocol::{encode_publish, parse_frame, Frame};
///
/// let bytes = encode_publish("semaforo/acao", b"go").unwrap();
/// let frame = parse_frame(&bytes).unwrap();
/// assert_eq!(
///     frame,
///     Frame::Publish { topic: "semaforo/acao".to_string(), payload: b"go".to_vec() }
/// );
/// ```
pub fn parse_frame(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    let first = *bytes.first().ok_or(ProtocolError::Empty)?;

    match first {
        CONNECT_BYTE => Ok(Frame::Connect),
        PINGREQ_BYTE => Ok(Frame::PingRequest),
        b if b & PACKET_TYPE_MASK == PUBLISH_TYPE => parse_publish(bytes),
        other => Ok(Frame::Unknown { packet_type: other }),
    }
}

/// Builds a minimal CONNECT frame (protocol level 4, clean session).
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] if `client_id` is too long for a
/// single-byte remaining length.
pub fn encode_connect(client_id: &str, keep_alive_secs: u16) -> Result<Vec<u8>, ProtocolError> {
    // Variable header: protocol name (6) + level (1) + flags (1) + keepalive (2)
    let remaining = 10 + 2 + client_id.len();
    check_remaining(remaining)?;

    let mut buf = Vec::with_capacity(2 + remaining);
    buf.push(CONNECT_BYTE);
    buf.push(remaining as u8);
    write_length_prefixed(&mut buf, b"MQTT");
    buf.push(0x04); // protocol level 3.1.1
    buf.push(0x02); // clean session
    buf.extend_from_slice(&keep_alive_secs.to_be_bytes());
    write_length_prefixed(&mut buf, client_id.as_bytes());
    Ok(buf)
}

/// Builds a QoS 0 PUBLISH frame.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] if topic and payload together do
/// not fit a single-byte remaining length.
pub fn encode_publish(topic: &str, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let remaining = 2 + topic.len() + payload.len();
    check_remaining(remaining)?;

    let mut buf = Vec::with_capacity(2 + remaining);
    buf.push(PUBLISH_TYPE);
    buf.push(remaining as u8);
    write_length_prefixed(&mut buf, topic.as_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Builds a PINGREQ frame.
pub fn encode_ping_request() -> [u8; 2] {
    [PINGREQ_BYTE, 0x00]
}

/// Builds a DISCONNECT frame.  The controller itself treats it as unknown.
pub fn encode_disconnect() -> [u8; 2] {
    [DISCONNECT_BYTE, 0x00]
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_publish(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    if bytes.len() < PUBLISH_PREFIX_LEN {
        return Err(ProtocolError::TruncatedHeader {
            needed: PUBLISH_PREFIX_LEN,
            available: bytes.len(),
        });
    }

    let topic_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    let body = &bytes[PUBLISH_PREFIX_LEN..];
    if topic_len > body.len() {
        return Err(ProtocolError::TopicOverrun {
            declared: topic_len,
            available: body.len(),
        });
    }

    let (topic_bytes, payload) = body.split_at(topic_len);
    let topic = std::str::from_utf8(topic_bytes)
        .map_err(|_| ProtocolError::InvalidTopic)?
        .to_string();

    Ok(Frame::Publish {
        topic,
        payload: payload.to_vec(),
    })
}

fn check_remaining(remaining: usize) -> Result<(), ProtocolError> {
    if remaining > MAX_SINGLE_BYTE_REMAINING {
        return Err(ProtocolError::FrameTooLarge(remaining));
    }
    Ok(())
}

fn write_length_prefixed(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as u16).to_be_bytes());
    buf.extend_from_slice(data);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
