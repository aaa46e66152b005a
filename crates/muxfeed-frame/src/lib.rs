//! Length-prefixed, stream-multiplexed framing.
//!
//! Every frame on the wire carries:
//! - A 2-byte magic number ("MX") for stream synchronization
//! - A 1-byte frame kind and a 1-byte flag set
//! - A 4-byte little-endian stream id (0 = connection-level)
//! - A 4-byte little-endian payload length
//!
//! [`FrameDecoder`] turns bytes into frames incrementally and
//! [`StreamDistributor`] routes each frame to a per-stream visitor created on
//! demand by a [`VisitorFactory`].

pub mod codec;
pub mod decoder;
pub mod distributor;
pub mod error;
pub mod headers;
pub mod reader;
pub mod stream;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, FrameKind, DEFAULT_MAX_PAYLOAD, FLAG_FIN,
    HEADER_SIZE,
};
pub use decoder::FrameDecoder;
pub use distributor::{StreamDistributor, StreamEvent, StreamVisitor, VisitorFactory};
pub use error::{FrameError, Result};
pub use headers::HeaderBlock;
pub use reader::FrameReader;
pub use stream::{StreamId, CONNECTION_STREAM};
pub use writer::FrameWriter;
