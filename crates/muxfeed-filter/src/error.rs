/// Errors raised while setting up a filter.
///
/// Runtime read failures are not errors in this sense: they are reported as
/// [`ReadError`](muxfeed_transport::ReadError) status codes.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The filter configuration is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A protocol name offered or configured for selection is malformed.
    #[error("invalid protocol name: {0}")]
    InvalidProtocol(String),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] muxfeed_frame::FrameError),

    /// Reading a config file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FilterError>;
