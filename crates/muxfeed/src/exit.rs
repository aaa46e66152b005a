use std::fmt;
use std::io;

use muxfeed_filter::FilterError;
use muxfeed_frame::FrameError;
use muxfeed_transport::ReadError;

// Exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NOT_FOUND: i32 = 66;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => NOT_FOUND,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn filter_error(context: &str, err: FilterError) -> CliError {
    match err {
        FilterError::Io(source) => io_error(context, source),
        FilterError::Frame(err) => frame_error(context, err),
        other => CliError::new(USAGE, format!("{context}: {other}")),
    }
}

/// Map the terminal status of a feed to an error; end of input is success.
pub fn read_error(context: &str, err: ReadError) -> Option<CliError> {
    match err {
        ReadError::Eof => None,
        ReadError::General => Some(CliError::new(
            DATA_INVALID,
            format!("{context}: input aborted on a framing or stream error"),
        )),
        ReadError::ConnAborted => Some(CliError::new(FAILURE, format!("{context}: {err}"))),
        ReadError::WouldBlock => Some(CliError::new(INTERNAL, format!("{context}: {err}"))),
    }
}
