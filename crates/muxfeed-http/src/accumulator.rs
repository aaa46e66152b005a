use bytes::BytesMut;
use muxfeed_transport::{BlockMode, Brigade, ReadError, ReadMode, ReadStatus};
use tracing::warn;

/// The bytes one stream has produced but the consumer has not read yet.
///
/// Writers append and eventually mark the accumulator complete (no more
/// writes) or errored (which also completes it). Readers drain it with
/// [`read`](Self::read).
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buf: BytesMut,
    complete: bool,
    error: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes. Writes after completion are dropped.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.complete {
            warn!(len = bytes.len(), "write to completed accumulator dropped");
            debug_assert!(!self.complete, "write to completed accumulator");
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// No further writes will occur.
    pub fn set_complete(&mut self) {
        self.complete = true;
    }

    /// The stream failed; implies complete.
    pub fn set_error(&mut self) {
        self.error = true;
        self.complete = true;
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Readable bytes currently held.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Move buffered bytes into `out`.
    ///
    /// The buffer lives in memory, so `block` never causes a wait: an empty,
    /// still-open accumulator reports `WouldBlock` and an empty, complete one
    /// reports `Eof`. A `max_bytes` of zero means "no limit".
    pub fn read(
        &mut self,
        out: &mut Brigade,
        mode: ReadMode,
        _block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        if mode == ReadMode::Init {
            return Ok(());
        }
        if self.buf.is_empty() {
            return Err(if self.complete {
                ReadError::Eof
            } else {
                ReadError::WouldBlock
            });
        }

        let budget = if max_bytes == 0 {
            self.buf.len()
        } else {
            max_bytes.min(self.buf.len())
        };

        match mode {
            ReadMode::Init => {}
            ReadMode::Speculative => out.push_data(self.buf[..budget].to_vec()),
            ReadMode::Bytes => out.push_data(self.buf.split_to(budget).freeze()),
            ReadMode::GetLine => {
                let end = self.buf[..budget]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(budget, |pos| pos + 1);
                out.push_data(self.buf.split_to(end).freeze());
            }
            ReadMode::Exhaustive => out.push_data(self.buf.split().freeze()),
        }
        Ok(())
    }
}
