use std::fmt::Write as _;

use muxfeed_frame::{HeaderBlock, StreamEvent, StreamId};
use tracing::{debug, warn};

use crate::accumulator::StreamAccumulator;
use crate::error::{ConvertError, Result};

const METHOD: &str = "method";
const URL: &str = "url";
const VERSION: &str = "version";

/// Headers that only make sense on a single hop and are not forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingOpen,
    Body { chunked: bool },
    Finished,
}

/// Projects one stream's events into HTTP/1.1 request bytes.
///
/// The request line comes from the `method`, `url` and `version` headers.
/// A body of unknown length is sent with chunked transfer coding.
#[derive(Debug)]
pub struct HttpConverter {
    stream_id: StreamId,
    state: State,
}

impl HttpConverter {
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            state: State::AwaitingOpen,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// True once the stream has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Apply one event, writing into `acc`.
    ///
    /// Failures are not returned: they mark `acc` as errored.
    pub fn on_event(&mut self, acc: &mut StreamAccumulator, event: StreamEvent) {
        if self.state == State::Finished {
            debug!(stream_id = self.stream_id, ?event, "event after finish ignored");
            return;
        }
        if let Err(err) = self.apply(acc, event) {
            warn!(stream_id = self.stream_id, %err, "stream projection failed");
            acc.set_error();
            self.state = State::Finished;
        }
    }

    fn apply(&mut self, acc: &mut StreamAccumulator, event: StreamEvent) -> Result<()> {
        match (self.state, event) {
            (State::AwaitingOpen, StreamEvent::Open { headers, fin }) => {
                let chunked = !fin && headers.get("content-length").is_none();
                acc.append(&render_head(&headers, chunked)?);
                if fin {
                    self.finish(acc, false);
                } else {
                    self.state = State::Body { chunked };
                }
                Ok(())
            }
            (State::Body { .. }, StreamEvent::Open { .. }) => Err(ConvertError::DuplicateOpen),
            (State::AwaitingOpen, StreamEvent::Data { .. }) => Err(ConvertError::DataBeforeOpen),
            (State::Body { chunked }, StreamEvent::Data { data, fin }) => {
                if chunked {
                    if !data.is_empty() {
                        let mut chunk = format!("{:x}\r\n", data.len()).into_bytes();
                        chunk.extend_from_slice(&data);
                        chunk.extend_from_slice(b"\r\n");
                        acc.append(&chunk);
                    }
                } else {
                    acc.append(&data);
                }
                if fin {
                    self.finish(acc, chunked);
                }
                Ok(())
            }
            (_, StreamEvent::Reset { code }) => Err(ConvertError::Reset(code)),
            (_, StreamEvent::ConnectionError) => Err(ConvertError::ConnectionFailed),
            (State::Finished, _) => Ok(()),
        }
    }

    fn finish(&mut self, acc: &mut StreamAccumulator, chunked: bool) {
        if chunked {
            acc.append(b"0\r\n\r\n");
        }
        acc.set_complete();
        self.state = State::Finished;
        debug!(stream_id = self.stream_id, "stream projected");
    }
}

/// Render the request line and header section.
fn render_head(headers: &HeaderBlock, chunked: bool) -> Result<Vec<u8>> {
    let method = request_part(headers, METHOD)?;
    let url = request_part(headers, URL)?;
    let version = request_part(headers, VERSION)?;

    let mut head = String::with_capacity(256);
    let _ = write!(head, "{method} {url} {version}\r\n");

    for (name, value) in headers.iter() {
        if name == METHOD || name == URL || name == VERSION {
            continue;
        }
        if HOP_BY_HOP.contains(&name) {
            debug!(header = name, "hop-by-hop header dropped");
            continue;
        }
        for part in value.split('\0') {
            if part.bytes().any(|b| b == b'\r' || b == b'\n') {
                return Err(ConvertError::InvalidHeaderValue(name.to_string()));
            }
            let _ = write!(head, "{name}: {part}\r\n");
        }
    }
    if chunked {
        head.push_str("transfer-encoding: chunked\r\n");
    }
    head.push_str("\r\n");
    Ok(head.into_bytes())
}

fn request_part<'a>(headers: &'a HeaderBlock, name: &'static str) -> Result<&'a str> {
    let value = headers
        .get(name)
        .ok_or(ConvertError::MissingPseudoHeader(name))?;
    if value.is_empty() || value.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(ConvertError::InvalidPseudoHeader {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}
