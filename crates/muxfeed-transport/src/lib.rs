//! Pull-based read primitives shared by every muxfeed layer.
//!
//! A consumer pulls bytes by calling [`Upstream::read`] with an output
//! [`Brigade`], a [`ReadMode`], a [`BlockMode`] and a byte budget. The result
//! is a [`ReadStatus`]: `Ok(())` on success, or one of the [`ReadError`]
//! codes (would-block, general failure, connection aborted, end of input).
//!
//! This is the lowest layer of muxfeed. Everything else builds on top of
//! the [`Upstream`] trait provided here.

pub mod brigade;
pub mod error;
pub mod io;
pub mod traits;

pub use brigade::{Brigade, Bucket};
pub use error::{ReadError, ReadStatus};
pub use io::IoUpstream;
pub use traits::{BlockMode, ReadMode, Upstream};
