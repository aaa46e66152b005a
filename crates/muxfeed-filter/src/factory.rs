use std::collections::VecDeque;

use muxfeed_frame::{StreamEvent, StreamId, StreamVisitor, VisitorFactory};
use muxfeed_http::{HttpConverter, StreamAccumulator};
use muxfeed_transport::{BlockMode, Brigade, ReadMode, ReadStatus};
use tracing::{debug, trace, warn};

type SlotId = u64;

#[derive(Debug)]
struct Slot {
    id: SlotId,
    stream_id: StreamId,
    acc: StreamAccumulator,
}

/// Owns one accumulator per stream in a FIFO queue ordered by when each
/// stream was first seen, and hands out the projectors that fill them.
///
/// Only the head of the queue is ever read. Every operation first prunes the
/// head: accumulators that are complete and either errored or empty are
/// released. An errored accumulator released this way latches the factory
/// into the error state, so the failure is reported before any later stream
/// is served.
#[derive(Debug, Default)]
pub struct ConverterFactory {
    queue: VecDeque<Slot>,
    next_slot: SlotId,
    failed: bool,
}

impl ConverterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new accumulator for `stream_id` and return the projector bound
    /// to it. Called at most once per stream id.
    pub fn create_projector(&mut self, stream_id: StreamId) -> Projector {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.queue.push_back(Slot {
            id: slot,
            stream_id,
            acc: StreamAccumulator::new(),
        });
        debug!(stream_id, slot, queued = self.queue.len(), "accumulator queued");
        Projector {
            slot,
            converter: HttpConverter::new(stream_id),
        }
    }

    /// The head accumulator holds readable bytes and no error.
    pub fn has_data_available(&mut self) -> bool {
        self.prune();
        !self.failed
            && self
                .queue
                .front()
                .is_some_and(|head| !head.acc.has_error() && !head.acc.is_empty())
    }

    /// The head accumulator failed.
    pub fn has_error(&mut self) -> bool {
        self.prune();
        self.failed || self.queue.front().is_some_and(|head| head.acc.has_error())
    }

    /// Read from the head accumulator into `out`.
    ///
    /// Returns `Ok(())` with nothing moved when no data is available.
    ///
    /// # Panics
    ///
    /// When [`has_error`](Self::has_error) is true; callers check first.
    pub fn drain(
        &mut self,
        out: &mut Brigade,
        mode: ReadMode,
        block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        assert!(!self.has_error(), "drain called on a failed stream queue");
        if !self.has_data_available() {
            return Ok(());
        }
        let status = match self.queue.front_mut() {
            Some(head) => {
                let status = head.acc.read(out, mode, block, max_bytes);
                trace!(stream_id = head.stream_id, ?status, left = head.acc.len(), "drained");
                status
            }
            None => Ok(()),
        };
        self.prune();
        status
    }

    /// Accumulators still queued.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn prune(&mut self) {
        while let Some(head) = self.queue.front() {
            let acc = &head.acc;
            if !(acc.is_complete() && (acc.has_error() || acc.is_empty())) {
                break;
            }
            if acc.has_error() {
                warn!(stream_id = head.stream_id, "stream failed; input is unusable");
                self.failed = true;
            } else {
                debug!(stream_id = head.stream_id, "stream delivered");
            }
            self.queue.pop_front();
        }
    }

    fn slot_mut(&mut self, slot: SlotId) -> Option<&mut StreamAccumulator> {
        let index = self.queue.binary_search_by_key(&slot, |s| s.id).ok()?;
        self.queue.get_mut(index).map(|s| &mut s.acc)
    }
}

impl VisitorFactory for ConverterFactory {
    type Visitor = Projector;

    fn create(&mut self, stream_id: StreamId) -> Projector {
        self.create_projector(stream_id)
    }
}

// Queued accumulators are released with the queue; this only reports
// streams that were never delivered.
impl Drop for ConverterFactory {
    fn drop(&mut self) {
        if !self.queue.is_empty() {
            debug!(queued = self.queue.len(), "releasing undelivered streams");
        }
    }
}

/// Writes one stream's events into the accumulator the factory queued for
/// it.
#[derive(Debug)]
pub struct Projector {
    slot: SlotId,
    converter: HttpConverter,
}

impl Projector {
    pub fn stream_id(&self) -> StreamId {
        self.converter.stream_id()
    }
}

impl StreamVisitor<ConverterFactory> for Projector {
    fn on_event(&mut self, factory: &mut ConverterFactory, event: StreamEvent) {
        match factory.slot_mut(self.slot) {
            Some(acc) => self.converter.on_event(acc, event),
            None => trace!(stream_id = self.stream_id(), "event for released stream dropped"),
        }
    }
}
