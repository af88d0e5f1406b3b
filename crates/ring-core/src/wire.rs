//! Ring wire format — the four 8-byte message shapes.
//!
//! These types ARE the protocol. Every datagram on the ring is exactly
//! eight bytes and byte 0 is the type tag. Changing a field offset here is
//! a breaking change for every node on the ring.
//!
//! Frames are plain byte structs with zerocopy derives, so there is no
//! alignment or endianness ambiguity and no unsafe code in this module.
//! Callers work with the decoded [`Token`], [`DataHeader`], [`DataChunk`]
//! and [`DataEnd`] values; the frame structs stay private.

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes, Unaligned};

use crate::ring::NodeId;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Size of every message on the ring.
pub const MESSAGE_LEN: usize = 8;

/// Token tag. Occupies the top byte of the big-endian 64-bit token word.
pub const TAG_TOKEN: u8 = 0x00;

pub const TAG_DATA_HEADER: u8 = 0x10;
pub const TAG_DATA_CHUNK: u8 = 0x11;
pub const TAG_DATA_END: u8 = 0x12;

/// Payload bytes carried by one DataChunk.
pub const DATA_CHUNK_SIZE: usize = 7;

/// Largest transfer a DataHeader can describe (single length byte).
pub const MAX_DATA_LEN: usize = u8::MAX as usize;

// ── Frames ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct TokenFrame {
    tag: u8,
    origin: u8,
    sequence: U32<BigEndian>,
    destination: u8,
    reserved: u8,
}

assert_eq_size!(TokenFrame, [u8; MESSAGE_LEN]);

#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct DataHeaderFrame {
    tag: u8,
    origin: u8,
    sequence: U16<BigEndian>,
    destination: u8,
    total_len: u8,
    reserved: [u8; 2],
}

assert_eq_size!(DataHeaderFrame, [u8; MESSAGE_LEN]);

#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct DataChunkFrame {
    tag: u8,
    payload: [u8; DATA_CHUNK_SIZE],
}

assert_eq_size!(DataChunkFrame, [u8; MESSAGE_LEN]);

#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct DataEndFrame {
    tag: u8,
    origin: u8,
    sequence: U16<BigEndian>,
    destination: u8,
    reserved: [u8; 3],
}

assert_eq_size!(DataEndFrame, [u8; MESSAGE_LEN]);

/// Reads `buf` as frame `F`, checking the length and the tag byte.
fn read_frame<F: FromBytes>(buf: &[u8], expected: u8) -> Result<F, WireError> {
    if buf.len() != MESSAGE_LEN {
        return Err(WireError::BadLength(buf.len()));
    }
    if buf[0] != expected {
        return Err(WireError::TagMismatch {
            expected,
            found: buf[0],
        });
    }
    F::read_from(buf).ok_or(WireError::BadLength(buf.len()))
}

fn to_array(bytes: &[u8]) -> [u8; MESSAGE_LEN] {
    let mut out = [0u8; MESSAGE_LEN];
    out.copy_from_slice(bytes);
    out
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// The right-to-send. Exists only on the wire.
///
/// The sequence field is a full 32-bit big-endian counter in bytes 2..6,
/// scoped to `origin`. Byte 7 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub origin: NodeId,
    pub sequence: u32,
    pub destination: NodeId,
}

impl Token {
    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        let frame = TokenFrame {
            tag: TAG_TOKEN,
            origin: self.origin,
            sequence: U32::new(self.sequence),
            destination: self.destination,
            reserved: 0,
        };
        to_array(frame.as_bytes())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let frame: TokenFrame = read_frame(buf, TAG_TOKEN)?;
        Ok(Self {
            origin: frame.origin,
            sequence: frame.sequence.get(),
            destination: frame.destination,
        })
    }
}

/// Opens a data transfer. `total_len` is the untrimmed payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub origin: NodeId,
    pub sequence: u16,
    pub destination: NodeId,
    pub total_len: u8,
}

impl DataHeader {
    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        let frame = DataHeaderFrame {
            tag: TAG_DATA_HEADER,
            origin: self.origin,
            sequence: U16::new(self.sequence),
            destination: self.destination,
            total_len: self.total_len,
            reserved: [0; 2],
        };
        to_array(frame.as_bytes())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let frame: DataHeaderFrame = read_frame(buf, TAG_DATA_HEADER)?;
        Ok(Self {
            origin: frame.origin,
            sequence: frame.sequence.get(),
            destination: frame.destination,
            total_len: frame.total_len,
        })
    }
}

/// Seven payload bytes. Short slices are zero padded on the wire; the
/// receiver trims to the header's declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChunk {
    pub payload: [u8; DATA_CHUNK_SIZE],
}

impl DataChunk {
    /// Builds a chunk from at most [`DATA_CHUNK_SIZE`] bytes. Extra bytes are
    /// cut off, missing ones are zero.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut payload = [0u8; DATA_CHUNK_SIZE];
        let n = data.len().min(DATA_CHUNK_SIZE);
        payload[..n].copy_from_slice(&data[..n]);
        Self { payload }
    }

    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        let frame = DataChunkFrame {
            tag: TAG_DATA_CHUNK,
            payload: self.payload,
        };
        to_array(frame.as_bytes())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let frame: DataChunkFrame = read_frame(buf, TAG_DATA_CHUNK)?;
        Ok(Self {
            payload: frame.payload,
        })
    }
}

/// Closes a data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEnd {
    pub origin: NodeId,
    pub sequence: u16,
    pub destination: NodeId,
}

impl DataEnd {
    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        let frame = DataEndFrame {
            tag: TAG_DATA_END,
            origin: self.origin,
            sequence: U16::new(self.sequence),
            destination: self.destination,
            reserved: [0; 3],
        };
        to_array(frame.as_bytes())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let frame: DataEndFrame = read_frame(buf, TAG_DATA_END)?;
        Ok(Self {
            origin: frame.origin,
            sequence: frame.sequence.get(),
            destination: frame.destination,
        })
    }
}

/// Any datagram seen on the ring, after generic decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Token(Token),
    DataHeader(DataHeader),
    DataChunk(DataChunk),
    DataEnd(DataEnd),
    /// Eight bytes with a tag nobody knows. Dropped by the caller.
    Unknown(u8),
}

impl Message {
    /// Decode a datagram by its tag byte.
    ///
    /// Only the length is an error here. Data tags go to their targeted
    /// decoder, tag 0x00 is a token, anything else is `Unknown`.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() != MESSAGE_LEN {
            return Err(WireError::BadLength(buf.len()));
        }
        match buf[0] {
            TAG_DATA_HEADER => DataHeader::decode(buf).map(Message::DataHeader),
            TAG_DATA_CHUNK => DataChunk::decode(buf).map(Message::DataChunk),
            TAG_DATA_END => DataEnd::decode(buf).map(Message::DataEnd),
            TAG_TOKEN => Token::decode(buf).map(Message::Token),
            other => Ok(Message::Unknown(other)),
        }
    }

    pub fn encode(&self) -> Option<[u8; MESSAGE_LEN]> {
        match self {
            Message::Token(t) => Some(t.encode()),
            Message::DataHeader(h) => Some(h.encode()),
            Message::DataChunk(c) => Some(c.encode()),
            Message::DataEnd(e) => Some(e.encode()),
            Message::Unknown(_) => None,
        }
    }
}

/// Split `data` into the chunk messages that carry it, in send order.
///
/// Produces `ceil(len / 7)` chunks; an empty payload produces none.
pub fn chunk_payload(data: &[u8]) -> impl Iterator<Item = DataChunk> + '_ {
    data.chunks(DATA_CHUNK_SIZE).map(DataChunk::from_slice)
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting or producing wire messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed message: length {0}, expected {MESSAGE_LEN}")]
    BadLength(usize),

    #[error("malformed message: tag 0x{found:02x}, expected 0x{expected:02x}")]
    TagMismatch { expected: u8, found: u8 },

    #[error("payload length {0} exceeds maximum {MAX_DATA_LEN}")]
    PayloadTooLarge(usize),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
