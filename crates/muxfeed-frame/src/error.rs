use crate::stream::StreamId;

/// Errors that can occur during frame encoding, decoding or dispatch.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x4d58 \"MX\")")]
    InvalidMagic,

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame kind byte is not one this codec understands.
    #[error("unknown frame kind 0x{0:02x}")]
    UnknownKind(u8),

    /// Flags set that are not valid for the frame kind.
    #[error("invalid flags 0x{flags:02x} for {kind} frame")]
    InvalidFlags { kind: &'static str, flags: u8 },

    /// A stream frame on stream 0, or a connection frame on a stream.
    #[error("{kind} frame not allowed on stream {stream_id}")]
    ReservedStream {
        kind: &'static str,
        stream_id: StreamId,
    },

    /// A frame arrived for a stream that has already finished.
    #[error("frame for closed stream {0}")]
    StreamClosed(StreamId),

    /// The peer opened a stream after announcing it would not.
    #[error("stream {0} opened after goaway")]
    StreamAfterGoaway(StreamId),

    /// A header block could not be encoded or decoded.
    #[error("invalid header block: {0}")]
    InvalidHeaderBlock(String),

    /// A fixed-layout payload has the wrong size.
    #[error("malformed {kind} payload ({len} bytes)")]
    MalformedPayload { kind: &'static str, len: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An earlier decode error left the byte stream unsynchronized.
    #[error("decoder failed earlier; byte stream cannot be resynchronized")]
    Desynchronized,

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
