use bytes::{Buf, BytesMut};
use muxfeed_transport::{BlockMode, Brigade, Bucket, ReadMode, ReadStatus, Upstream};
use tracing::trace;

/// Byte source adapter between the upstream and the frame pump.
///
/// Holds bytes the upstream returned that the pump has not taken yet, and the
/// status of the most recent upstream read so it can be replayed once the
/// buffered data runs out.
#[derive(Debug)]
pub struct InputStream {
    buf: BytesMut,
    last_status: ReadStatus,
}

impl Default for InputStream {
    fn default() -> Self {
        Self {
            buf: BytesMut::new(),
            last_status: Ok(()),
        }
    }
}

impl InputStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant access to `upstream` for the duration of one consumer call,
    /// under that call's blocking mode.
    pub fn bind<'a, U: Upstream + ?Sized>(
        &'a mut self,
        upstream: &'a mut U,
        block: BlockMode,
    ) -> BoundInput<'a, U> {
        trace!(?block, "input bound");
        BoundInput {
            stream: self,
            upstream,
            block,
        }
    }

    /// No bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Status of the most recent upstream read; `Ok(())` before the first.
    pub fn last_status(&self) -> ReadStatus {
        self.last_status
    }
}

/// An [`InputStream`] bound to an upstream. Dropping it unbinds.
pub struct BoundInput<'a, U: Upstream + ?Sized> {
    stream: &'a mut InputStream,
    upstream: &'a mut U,
    block: BlockMode,
}

impl<U: Upstream + ?Sized> BoundInput<'_, U> {
    /// Copy up to `buf.len()` bytes into `buf`.
    ///
    /// Buffered bytes are served first. Otherwise one upstream read of at
    /// most `buf.len()` bytes is issued and its status recorded. Returns 0
    /// when nothing is available.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        if self.stream.buf.is_empty() {
            let mut fetched = Brigade::new();
            let status = self
                .upstream
                .read(&mut fetched, ReadMode::Bytes, self.block, buf.len());
            trace!(?status, len = fetched.data_len(), "upstream read");
            self.stream.last_status = status;
            while let Some(bucket) = fetched.pop_front() {
                if let Bucket::Data(data) = bucket {
                    self.stream.buf.extend_from_slice(&data);
                }
            }
        }

        let n = buf.len().min(self.stream.buf.len());
        buf[..n].copy_from_slice(&self.stream.buf[..n]);
        self.stream.buf.advance(n);
        n
    }

    pub fn block_mode(&self) -> BlockMode {
        self.block
    }

    /// Release the upstream.
    pub fn unbind(self) {}
}

impl<U: Upstream + ?Sized> Drop for BoundInput<'_, U> {
    fn drop(&mut self) {
        trace!(buffered = self.stream.buf.len(), "input unbound");
    }
}
