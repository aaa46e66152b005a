use std::io::Read;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::brigade::Brigade;
use crate::error::{ReadError, ReadStatus};
use crate::traits::{BlockMode, ReadMode, Upstream};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// [`Upstream`] over any `std::io::Read`.
///
/// Bytes read for a speculative call are kept in a lookahead buffer and
/// served again by the next consuming call. `std::io::Read` has no per-call
/// blocking switch, so [`BlockMode`] is not enforced here: a non-blocking
/// source (a socket set to non-blocking, for instance) surfaces
/// `WouldBlock` on its own.
pub struct IoUpstream<T> {
    inner: T,
    lookahead: BytesMut,
    eof: bool,
    aborted: bool,
}

impl<T: Read> IoUpstream<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            lookahead: BytesMut::with_capacity(READ_CHUNK_SIZE),
            eof: false,
            aborted: false,
        }
    }

    /// Borrow the underlying reader.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying reader.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the adapter and return the inner reader.
    ///
    /// Lookahead bytes not yet consumed are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Pull one chunk from the reader into the lookahead buffer.
    ///
    /// Returns the number of bytes added; zero means end of input.
    fn fill(&mut self, want: usize) -> Result<usize, ReadError> {
        if self.eof {
            return Ok(0);
        }
        let want = if want == 0 { READ_CHUNK_SIZE } else { want };
        let mut chunk = vec![0u8; want];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    debug!("upstream reached end of input");
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    trace!(bytes = n, "upstream read");
                    self.lookahead.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) => match ReadError::from_io(&err) {
                    None => continue,
                    Some(code) => {
                        if code == ReadError::ConnAborted {
                            self.aborted = true;
                        }
                        debug!(%err, ?code, "upstream read failed");
                        return Err(code);
                    }
                },
            }
        }
    }

    fn ensure_some(&mut self, want: usize) -> ReadStatus {
        if self.lookahead.is_empty() && self.fill(want)? == 0 {
            return Err(ReadError::Eof);
        }
        Ok(())
    }
}

impl<T: Read> Upstream for IoUpstream<T> {
    fn read(
        &mut self,
        out: &mut Brigade,
        mode: ReadMode,
        _block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        match mode {
            ReadMode::Init => Ok(()),
            ReadMode::Speculative => {
                self.ensure_some(max_bytes)?;
                let n = limit(self.lookahead.len(), max_bytes);
                out.push_data(self.lookahead[..n].to_vec());
                Ok(())
            }
            ReadMode::Bytes => {
                self.ensure_some(max_bytes)?;
                let n = limit(self.lookahead.len(), max_bytes);
                out.push_data(self.lookahead.split_to(n).freeze());
                Ok(())
            }
            ReadMode::GetLine => {
                self.ensure_some(0)?;
                loop {
                    if let Some(pos) = self.lookahead.iter().position(|&b| b == b'\n') {
                        out.push_data(self.lookahead.split_to(pos + 1).freeze());
                        return Ok(());
                    }
                    match self.fill(0) {
                        Ok(0) => break,
                        Ok(_) => continue,
                        Err(ReadError::WouldBlock) => break,
                        Err(code) => return Err(code),
                    }
                }
                let rest = self.lookahead.split().freeze();
                out.push_data(rest);
                Ok(())
            }
            ReadMode::Exhaustive => {
                loop {
                    match self.fill(0) {
                        Ok(0) => break,
                        Ok(_) => continue,
                        Err(ReadError::WouldBlock) if !self.lookahead.is_empty() => break,
                        Err(code) => return Err(code),
                    }
                }
                if self.lookahead.is_empty() {
                    return Err(ReadError::Eof);
                }
                let all = self.lookahead.split().freeze();
                out.push_data(all);
                Ok(())
            }
        }
    }

    fn is_aborted(&self) -> bool {
        self.aborted
    }
}

fn limit(available: usize, max_bytes: usize) -> usize {
    if max_bytes == 0 {
        available
    } else {
        available.min(max_bytes)
    }
}

impl<T> std::fmt::Debug for IoUpstream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoUpstream")
            .field("lookahead", &self.lookahead.remaining())
            .field("eof", &self.eof)
            .field("aborted", &self.aborted)
            .finish()
    }
}
