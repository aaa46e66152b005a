//! Stream identifiers.
//!
//! Stream 0 carries connection-level frames (ping, goaway). Every other id
//! names one logical stream; the peer assigns them in increasing order.

/// Logical stream identifier.
pub type StreamId = u32;

/// Stream id reserved for connection-level frames.
pub const CONNECTION_STREAM: StreamId = 0;

/// Returns true if the id names the connection rather than a stream.
pub fn is_connection(id: StreamId) -> bool {
    id == CONNECTION_STREAM
}

/// Returns true if the id was chosen by a client (odd ids).
pub fn is_client_initiated(id: StreamId) -> bool {
    id % 2 == 1
}
