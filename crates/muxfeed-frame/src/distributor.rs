use std::collections::HashMap;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::codec::{Frame, FrameKind};
use crate::error::{FrameError, Result};
use crate::headers::HeaderBlock;
use crate::stream::StreamId;

/// One stream-level event, as seen by a [`StreamVisitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The stream was opened with `headers`.
    Open { headers: HeaderBlock, fin: bool },
    /// Body bytes.
    Data { data: Bytes, fin: bool },
    /// The peer reset the stream.
    Reset { code: u32 },
    /// The connection failed; no further events will follow.
    ConnectionError,
}

impl StreamEvent {
    /// True when no further events will be delivered for the stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            StreamEvent::Open { fin, .. } | StreamEvent::Data { fin, .. } => *fin,
            StreamEvent::Reset { .. } | StreamEvent::ConnectionError => true,
        }
    }
}

/// Receives the events of exactly one stream.
///
/// The visitor is handed its factory on every call, so per-stream state the
/// factory owns (buffers, queues) is reached through the factory rather than
/// through references the visitor would have to hold.
pub trait StreamVisitor<F: ?Sized> {
    fn on_event(&mut self, factory: &mut F, event: StreamEvent);
}

/// Creates a visitor the first time a stream id is seen.
pub trait VisitorFactory {
    type Visitor: StreamVisitor<Self>;

    /// Called at most once per stream id for the lifetime of a connection.
    fn create(&mut self, stream_id: StreamId) -> Self::Visitor;
}

/// Routes decoded frames to per-stream visitors.
///
/// New stream ids must be strictly increasing. Finished streams are
/// forgotten; a later frame for one of them is a [`FrameError::StreamClosed`]
/// (except RESET, which is ignored).
pub struct StreamDistributor<F: VisitorFactory> {
    factory: F,
    streams: HashMap<StreamId, F::Visitor>,
    highest_stream_id: StreamId,
    goaway: Option<StreamId>,
}

impl<F: VisitorFactory> StreamDistributor<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            streams: HashMap::new(),
            highest_stream_id: 0,
            goaway: None,
        }
    }

    /// Route one frame.
    ///
    /// An error means the connection is no longer usable; callers follow it
    /// with [`fail`](Self::fail).
    pub fn dispatch(&mut self, frame: Frame) -> Result<()> {
        let stream_id = frame.stream_id;
        let event = match frame.kind {
            FrameKind::Ping => {
                trace!(len = frame.payload.len(), "ping");
                return Ok(());
            }
            FrameKind::GoAway => {
                let last = frame.code()?;
                debug!(last_stream_id = last, "goaway received");
                self.goaway = Some(last);
                return Ok(());
            }
            FrameKind::Open => StreamEvent::Open {
                headers: frame.header_block()?,
                fin: frame.is_fin(),
            },
            FrameKind::Data => StreamEvent::Data {
                fin: frame.is_fin(),
                data: frame.payload,
            },
            FrameKind::Reset => StreamEvent::Reset {
                code: frame.code()?,
            },
        };

        if !self.streams.contains_key(&stream_id) {
            if stream_id <= self.highest_stream_id {
                if matches!(event, StreamEvent::Reset { .. }) {
                    debug!(stream_id, "reset for finished stream ignored");
                    return Ok(());
                }
                return Err(FrameError::StreamClosed(stream_id));
            }
            if self.goaway.is_some() {
                return Err(FrameError::StreamAfterGoaway(stream_id));
            }
            debug!(stream_id, "new stream");
            self.highest_stream_id = stream_id;
            let visitor = self.factory.create(stream_id);
            self.streams.insert(stream_id, visitor);
        }

        let terminal = event.is_terminal();
        if let Some(visitor) = self.streams.get_mut(&stream_id) {
            visitor.on_event(&mut self.factory, event);
        }
        if terminal {
            trace!(stream_id, "stream finished");
            self.streams.remove(&stream_id);
        }
        Ok(())
    }

    /// Tell every live stream the connection failed, then forget them.
    pub fn fail(&mut self) {
        let mut ids: Vec<StreamId> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        debug!(streams = ids.len(), "failing live streams");
        for id in ids {
            if let Some(mut visitor) = self.streams.remove(&id) {
                visitor.on_event(&mut self.factory, StreamEvent::ConnectionError);
            }
        }
    }

    /// Number of streams that have not finished.
    pub fn live_streams(&self) -> usize {
        self.streams.len()
    }

    /// Last stream id announced by a GOAWAY, if one arrived.
    pub fn goaway(&self) -> Option<StreamId> {
        self.goaway
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }
}
