use std::io::{ErrorKind, Write};

use bytes::{Bytes, BytesMut};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::headers::HeaderBlock;
use crate::stream::StreamId;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// Used to produce captures and test fixtures; the adapter itself only ever
/// reads frames.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Open a stream.
    pub fn open(&mut self, stream_id: StreamId, headers: &HeaderBlock, fin: bool) -> Result<()> {
        self.write_frame(&Frame::open(stream_id, headers, fin))
    }

    /// Send body bytes on a stream.
    pub fn data(&mut self, stream_id: StreamId, payload: &[u8], fin: bool) -> Result<()> {
        self.write_frame(&Frame::data(
            stream_id,
            Bytes::copy_from_slice(payload),
            fin,
        ))
    }

    /// Reset a stream.
    pub fn reset(&mut self, stream_id: StreamId, code: u32) -> Result<()> {
        self.write_frame(&Frame::reset(stream_id, code))
    }

    /// Send a connection-level ping.
    pub fn ping(&mut self, payload: &[u8]) -> Result<()> {
        self.write_frame(&Frame::ping(Bytes::copy_from_slice(payload)))
    }

    /// Announce that no stream above `last_stream_id` will be opened.
    pub fn goaway(&mut self, last_stream_id: StreamId) -> Result<()> {
        self.write_frame(&Frame::goaway(last_stream_id))
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
