use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Incremental frame decoder.
///
/// Bytes are pushed in with [`feed`](Self::feed) in whatever pieces they
/// arrive; [`next_frame`](Self::next_frame) hands back complete frames. A
/// decode error is sticky: the byte stream cannot be resynchronized, so
/// every later call fails too.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    config: FrameConfig,
    failed: bool,
}

impl FrameDecoder {
    /// Create a new decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            failed: false,
        }
    }

    /// Append raw wire bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        if !self.failed {
            self.buf.extend_from_slice(bytes);
        }
    }

    /// Decode the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.failed {
            return Err(FrameError::Desynchronized);
        }
        match decode_frame(&mut self.buf, self.config.max_payload_size) {
            Ok(Some(frame)) => {
                trace!(
                    kind = frame.kind.name(),
                    stream_id = frame.stream_id,
                    len = frame.payload.len(),
                    "decoded frame"
                );
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.failed = true;
                self.buf.clear();
                Err(err)
            }
        }
    }

    /// Number of bytes buffered that do not yet form a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True once a decode error has been returned.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
