use std::io::ErrorKind;

/// Non-success outcome of a pull-based read.
///
/// These are status codes, not rich errors: they are `Copy` so the last one
/// observed from an upstream can be stored and replayed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ReadError {
    /// The source has nothing right now; retry later.
    #[error("resource temporarily unavailable")]
    WouldBlock,

    /// Unrecoverable failure of this input direction.
    #[error("general failure")]
    General,

    /// The underlying connection was aborted.
    #[error("connection aborted")]
    ConnAborted,

    /// No more input will ever arrive.
    #[error("end of input")]
    Eof,
}

impl ReadError {
    /// Map an I/O error onto the status code set.
    ///
    /// Returns `None` for `Interrupted`, which callers retry.
    pub fn from_io(err: &std::io::Error) -> Option<Self> {
        match err.kind() {
            ErrorKind::Interrupted => None,
            ErrorKind::WouldBlock | ErrorKind::TimedOut => Some(Self::WouldBlock),
            ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset => Some(Self::ConnAborted),
            ErrorKind::UnexpectedEof => Some(Self::Eof),
            _ => Some(Self::General),
        }
    }

    /// True for conditions the caller may retry.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::WouldBlock)
    }
}

/// Status returned by every read: `Ok(())` means success.
pub type ReadStatus = Result<(), ReadError>;
