//! Read-driving input filter for multiplexed connections.
//!
//! An [`InputFilter`] sits between a consumer that reads one ordered byte
//! stream and an upstream that carries many multiplexed streams. It waits
//! for protocol selection, then pumps frames through a
//! [`StreamDistributor`](muxfeed_frame::StreamDistributor) into per-stream
//! accumulators and serves them oldest stream first.

pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod filter;
pub mod input;
pub mod pump;

pub use config::{FilterConfig, DEFAULT_PROTOCOL, DEFAULT_READ_CHUNK_SIZE};
pub use context::{ConnectionContext, ProtocolSelector, ProtocolState, HTTP_1_1};
pub use error::{FilterError, Result};
pub use factory::{ConverterFactory, Projector};
pub use filter::{FilterState, InputFilter};
pub use input::{BoundInput, InputStream};
pub use pump::FramePump;
