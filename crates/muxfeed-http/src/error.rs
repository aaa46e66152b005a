/// Reasons a stream cannot be projected into HTTP/1.1.
///
/// Any of these marks the stream's accumulator as errored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// A required request header (`method`, `url`, `version`) is absent.
    #[error("missing '{0}' header")]
    MissingPseudoHeader(&'static str),

    /// A request-line component contains whitespace or control bytes.
    #[error("invalid '{name}' header: {value:?}")]
    InvalidPseudoHeader { name: &'static str, value: String },

    /// A header value would break the header section.
    #[error("invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    /// Body bytes arrived before the stream was opened.
    #[error("data received before stream was opened")]
    DataBeforeOpen,

    /// The stream was opened twice.
    #[error("stream opened twice")]
    DuplicateOpen,

    /// The peer reset the stream.
    #[error("stream reset by peer (code {0})")]
    Reset(u32),

    /// The connection failed while the stream was live.
    #[error("connection failed")]
    ConnectionFailed,
}

pub type Result<T> = std::result::Result<T, ConvertError>;
