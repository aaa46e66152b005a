//! Per-stream HTTP/1.1 projection.
//!
//! An [`HttpConverter`] turns the events of one logical stream into the
//! bytes of an HTTP/1.1 request and appends them to that stream's
//! [`StreamAccumulator`]. Accumulators are drained by the filter layer.

pub mod accumulator;
pub mod converter;
pub mod error;

pub use accumulator::StreamAccumulator;
pub use converter::HttpConverter;
pub use error::{ConvertError, Result};
