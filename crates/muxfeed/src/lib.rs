//! Serialize multiplexed framed streams into a single ordered HTTP/1.1 feed.
//!
//! A connection carrying many interleaved logical streams is presented to a
//! consumer that reads exactly one byte stream. Each stream is projected into
//! an HTTP/1.1 request and streams are delivered whole, in the order they
//! were first seen.
//!
//! # Crate Structure
//!
//! - [`transport`]: read status codes, modes, brigades and the `Upstream` trait
//! - [`frame`]: wire format codec, incremental decoder and stream distributor
//! - [`http`]: per-stream HTTP/1.1 projection (behind `filter` feature)
//! - [`filter`]: the read-driving input filter (behind `filter` feature)

/// Re-export transport types.
pub mod transport {
    pub use muxfeed_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use muxfeed_frame::*;
}

/// Re-export projection types (requires `filter` feature).
#[cfg(feature = "filter")]
pub mod http {
    pub use muxfeed_http::*;
}

/// Re-export filter types (requires `filter` feature).
#[cfg(feature = "filter")]
pub mod filter {
    pub use muxfeed_filter::*;
}
