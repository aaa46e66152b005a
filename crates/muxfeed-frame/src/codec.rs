use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::headers::HeaderBlock;
use crate::stream::{StreamId, CONNECTION_STREAM};

/// Frame header: magic (2) + kind (1) + flags (1) + stream (4) + length (4) = 12 bytes.
pub const HEADER_SIZE: usize = 12;

/// Magic bytes: "MX" (0x4d 0x58).
pub const MAGIC: [u8; 2] = [0x4d, 0x58];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Last frame of a stream. Valid on OPEN and DATA.
pub const FLAG_FIN: u8 = 0x01;

/// Frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Opens a stream; payload is a [`HeaderBlock`].
    Open = 1,
    /// Stream body bytes.
    Data = 2,
    /// Abnormal stream termination; payload is a 4-byte LE code.
    Reset = 3,
    /// Connection liveness probe; opaque payload.
    Ping = 4,
    /// No new streams will follow; payload is the 4-byte LE last stream id.
    GoAway = 5,
}

impl FrameKind {
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Open => "OPEN",
            FrameKind::Data => "DATA",
            FrameKind::Reset => "RESET",
            FrameKind::Ping => "PING",
            FrameKind::GoAway => "GOAWAY",
        }
    }

    /// True for kinds that travel on stream 0.
    pub fn is_connection_level(self) -> bool {
        matches!(self, FrameKind::Ping | FrameKind::GoAway)
    }

    fn allowed_flags(self) -> u8 {
        match self {
            FrameKind::Open | FrameKind::Data => FLAG_FIN,
            _ => 0,
        }
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FrameKind::Open),
            2 => Ok(FrameKind::Data),
            3 => Ok(FrameKind::Reset),
            4 => Ok(FrameKind::Ping),
            5 => Ok(FrameKind::GoAway),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub flags: u8,
    /// The stream this frame belongs to (0 for connection frames).
    pub stream_id: StreamId,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(kind: FrameKind, flags: u8, stream_id: StreamId, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            flags,
            stream_id,
            payload: payload.into(),
        }
    }

    /// An OPEN frame carrying `headers`.
    pub fn open(stream_id: StreamId, headers: &HeaderBlock, fin: bool) -> Self {
        let mut payload = BytesMut::new();
        headers.encode(&mut payload);
        Self::new(FrameKind::Open, fin_flag(fin), stream_id, payload.freeze())
    }

    /// A DATA frame.
    pub fn data(stream_id: StreamId, payload: impl Into<Bytes>, fin: bool) -> Self {
        Self::new(FrameKind::Data, fin_flag(fin), stream_id, payload)
    }

    /// A RESET frame.
    pub fn reset(stream_id: StreamId, code: u32) -> Self {
        Self::new(
            FrameKind::Reset,
            0,
            stream_id,
            Bytes::copy_from_slice(&code.to_le_bytes()),
        )
    }

    /// A PING frame.
    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(FrameKind::Ping, 0, CONNECTION_STREAM, payload)
    }

    /// A GOAWAY frame.
    pub fn goaway(last_stream_id: StreamId) -> Self {
        Self::new(
            FrameKind::GoAway,
            0,
            CONNECTION_STREAM,
            Bytes::copy_from_slice(&last_stream_id.to_le_bytes()),
        )
    }

    /// True when this is the last frame of its stream.
    pub fn is_fin(&self) -> bool {
        self.flags & FLAG_FIN != 0
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Parse the header block of an OPEN frame.
    pub fn header_block(&self) -> Result<HeaderBlock> {
        HeaderBlock::decode(self.payload.clone())
    }

    /// The 4-byte little-endian value carried by RESET and GOAWAY frames.
    pub fn code(&self) -> Result<u32> {
        let mut payload = self.payload.clone();
        if payload.len() != 4 {
            return Err(FrameError::MalformedPayload {
                kind: self.kind.name(),
                len: payload.len(),
            });
        }
        Ok(payload.get_u32_le())
    }
}

fn fin_flag(fin: bool) -> u8 {
    if fin {
        FLAG_FIN
    } else {
        0
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────┬───────┬──────────┬──────────┬──────────────────┐
/// │ Magic (2B) │ Kind │ Flags │ Stream   │ Length   │ Payload          │
/// │ 0x4d 0x58  │ (1B) │ (1B)  │ (4B LE)  │ (4B LE)  │ (Length bytes)   │
/// │ "MX"       │      │       │          │          │                  │
/// └────────────┴──────┴───────┴──────────┴──────────┴──────────────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: frame.payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(frame.wire_size());
    dst.put_slice(&MAGIC);
    dst.put_u8(frame.kind as u8);
    dst.put_u8(frame.flags);
    dst.put_u32_le(frame.stream_id);
    dst.put_u32_le(frame.payload.len() as u32);
    dst.put_slice(&frame.payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Header fields are
/// validated as soon as the fixed header is available, before the payload
/// has arrived.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let kind = FrameKind::try_from(src[2])?;
    let flags = src[3];
    let stream_id = u32::from_le_bytes([src[4], src[5], src[6], src[7]]);
    let payload_len = u32::from_le_bytes([src[8], src[9], src[10], src[11]]) as usize;

    if flags & !kind.allowed_flags() != 0 {
        return Err(FrameError::InvalidFlags {
            kind: kind.name(),
            flags,
        });
    }

    if kind.is_connection_level() != (stream_id == CONNECTION_STREAM) {
        return Err(FrameError::ReservedStream {
            kind: kind.name(),
            stream_id,
        });
    }

    if matches!(kind, FrameKind::Reset | FrameKind::GoAway) && payload_len != 4 {
        return Err(FrameError::MalformedPayload {
            kind: kind.name(),
            len: payload_len,
        });
    }

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame {
        kind,
        flags,
        stream_id,
        payload,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}
