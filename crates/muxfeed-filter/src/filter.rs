use std::sync::Arc;

use muxfeed_frame::StreamDistributor;
use muxfeed_transport::{BlockMode, Brigade, ReadError, ReadMode, ReadStatus, Upstream};
use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::context::{ConnectionContext, ProtocolState};
use crate::error::Result;
use crate::factory::ConverterFactory;
use crate::input::InputStream;
use crate::pump::FramePump;

/// Where an [`InputFilter`] is in the life of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Protocol selection has not been observed yet.
    AwaitingSelection,
    /// Plain connection; reads go straight to the upstream.
    PassThrough,
    /// Multiplexed connection; reads pump frames and drain streams.
    Active,
    /// Terminal; every read reports end-of-stream and this error.
    Aborted(ReadError),
    /// Terminal; the upstream reached end of input.
    Exhausted,
}

/// Presents a multiplexed connection to its consumer as one ordered byte
/// stream of HTTP/1.1 requests.
///
/// Each [`read`](Self::read) call drives the pipeline as far as needed to
/// produce output: bytes are pulled from the upstream, decoded into frames,
/// projected per stream, and drained from the oldest stream first.
pub struct InputFilter {
    context: Arc<ConnectionContext>,
    state: FilterState,
    input: InputStream,
    pump: FramePump,
    distributor: StreamDistributor<ConverterFactory>,
}

impl InputFilter {
    pub fn new(context: Arc<ConnectionContext>) -> Self {
        let config = FilterConfig::default();
        Self::build(context, &config)
    }

    pub fn with_config(context: Arc<ConnectionContext>, config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(context, config))
    }

    fn build(context: Arc<ConnectionContext>, config: &FilterConfig) -> Self {
        Self {
            context,
            state: FilterState::AwaitingSelection,
            input: InputStream::new(),
            pump: FramePump::new(config.read_chunk_size, config.frame_config()),
            distributor: StreamDistributor::new(ConverterFactory::new()),
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn context(&self) -> &Arc<ConnectionContext> {
        &self.context
    }

    /// Upstream reads attempted by the frame pump so far.
    pub fn pumps(&self) -> u64 {
        self.pump.pumps()
    }

    /// Streams opened but not yet finished.
    pub fn live_streams(&self) -> usize {
        self.distributor.live_streams()
    }

    /// Read from `upstream` through the filter, appending to `out`.
    pub fn read<U: Upstream + ?Sized>(
        &mut self,
        upstream: &mut U,
        out: &mut Brigade,
        mode: ReadMode,
        block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        match self.state {
            FilterState::AwaitingSelection => {
                self.select(upstream)?;
                self.read(upstream, out, mode, block, max_bytes)
            }
            FilterState::PassThrough => upstream.read(out, mode, block, max_bytes),
            FilterState::Aborted(err) => {
                out.push_eos();
                Err(err)
            }
            FilterState::Active | FilterState::Exhausted => {
                if self.context.is_aborted() || upstream.is_aborted() {
                    return self.abort(out, ReadError::ConnAborted);
                }
                if mode == ReadMode::Init {
                    return Ok(());
                }
                if self.state == FilterState::Exhausted {
                    return Err(ReadError::Eof);
                }
                self.read_active(upstream, out, mode, block, max_bytes)
            }
        }
    }

    /// Probe the upstream so negotiation runs, then pick a state from its
    /// outcome.
    fn select<U: Upstream + ?Sized>(&mut self, upstream: &mut U) -> ReadStatus {
        let mut scratch = Brigade::new();
        upstream.read(&mut scratch, ReadMode::Speculative, BlockMode::Block, 1)?;

        self.state = match self.context.protocol() {
            ProtocolState::Pending => {
                warn!("protocol selection did not complete; passing input through");
                self.context.set_protocol(ProtocolState::Plain);
                FilterState::PassThrough
            }
            ProtocolState::Plain => FilterState::PassThrough,
            ProtocolState::Multiplexed => FilterState::Active,
        };
        debug!(state = ?self.state, "protocol resolved");
        Ok(())
    }

    fn read_active<U: Upstream + ?Sized>(
        &mut self,
        upstream: &mut U,
        out: &mut Brigade,
        mode: ReadMode,
        block: BlockMode,
        max_bytes: usize,
    ) -> ReadStatus {
        let mut input = self.input.bind(upstream, block);
        while !ready(self.distributor.factory_mut()) {
            if !self.pump.pump_one(&mut input, &mut self.distributor) {
                break;
            }
        }
        input.unbind();

        let factory = self.distributor.factory_mut();
        if factory.has_error() {
            return self.abort(out, ReadError::General);
        }
        // Streams finished before a framing error are still delivered.
        if self.pump.has_failed() && !factory.has_data_available() {
            return self.abort(out, ReadError::General);
        }

        let before = out.data_len();
        let status = factory.drain(out, mode, block, max_bytes);
        if status.is_err() || factory.has_data_available() {
            return status;
        }
        if !self.input.is_empty() {
            // Wire bytes from an earlier upstream read are still waiting;
            // the upstream status applies only once they are consumed.
            return Ok(());
        }

        let last = self.input.last_status();
        if last.is_ok() && out.data_len() == before {
            // Nothing moved and nothing went wrong: try again later.
            return Err(ReadError::WouldBlock);
        }
        if last == Err(ReadError::Eof) && !factory.has_error() {
            debug!(queued = factory.queued(), "upstream exhausted");
            self.state = FilterState::Exhausted;
        }
        last
    }

    fn abort(&mut self, out: &mut Brigade, err: ReadError) -> ReadStatus {
        debug!(%err, "input aborted");
        self.state = FilterState::Aborted(err);
        out.push_eos();
        Err(err)
    }
}

fn ready(factory: &mut ConverterFactory) -> bool {
    factory.has_error() || factory.has_data_available()
}

impl std::fmt::Debug for InputFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFilter")
            .field("state", &self.state)
            .field("protocol", &self.context.protocol())
            .field("live_streams", &self.distributor.live_streams())
            .field("pumps", &self.pump.pumps())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bytes::{Bytes, BytesMut};
    use muxfeed_frame::{encode_frame, Frame, HeaderBlock, StreamId};

    use super::*;

    enum Step {
        Wire(Vec<u8>),
        Fail(ReadError),
        /// All bytes at once, ignoring the limit, with a status.
        Burst(Vec<u8>, ReadError),
    }

    /// Upstream that replays scripted reads. Speculative reads peek at the
    /// next wire step and can complete negotiation on the shared context.
    #[derive(Default)]
    struct Scripted {
        steps: VecDeque<Step>,
        probe_failures: VecDeque<ReadError>,
        negotiate: Option<(Arc<ConnectionContext>, ProtocolState)>,
        consuming_reads: usize,
        aborted: bool,
    }

    impl Scripted {
        fn wire(mut self, frames: &[Frame]) -> Self {
            self.steps.push_back(Step::Wire(wire(frames)));
            self
        }

        fn raw(mut self, bytes: &[u8]) -> Self {
            self.steps.push_back(Step::Wire(bytes.to_vec()));
            self
        }

        fn fail(mut self, err: ReadError) -> Self {
            self.steps.push_back(Step::Fail(err));
            self
        }

        fn burst(mut self, bytes: Vec<u8>, err: ReadError) -> Self {
            self.steps.push_back(Step::Burst(bytes, err));
            self
        }
    }

    impl Upstream for Scripted {
        fn read(
            &mut self,
            out: &mut Brigade,
            mode: ReadMode,
            _block: BlockMode,
            max_bytes: usize,
        ) -> ReadStatus {
            if mode == ReadMode::Init {
                return Ok(());
            }
            if mode == ReadMode::Speculative {
                if let Some(err) = self.probe_failures.pop_front() {
                    return Err(err);
                }
                if let Some((ctx, state)) = self.negotiate.take() {
                    ctx.set_protocol(state);
                }
                if let Some(Step::Wire(bytes)) = self.steps.front() {
                    let n = if max_bytes == 0 { bytes.len() } else { max_bytes.min(bytes.len()) };
                    out.push_data(bytes[..n].to_vec());
                }
                return Ok(());
            }

            self.consuming_reads += 1;
            match self.steps.pop_front() {
                None => Err(ReadError::Eof),
                Some(Step::Fail(err)) => Err(err),
                Some(Step::Burst(bytes, err)) => {
                    out.push_data(bytes);
                    Err(err)
                }
                Some(Step::Wire(mut bytes)) => {
                    if max_bytes != 0 && bytes.len() > max_bytes {
                        self.steps.push_front(Step::Wire(bytes.split_off(max_bytes)));
                    }
                    out.push_data(bytes);
                    Ok(())
                }
            }
        }

        fn is_aborted(&self) -> bool {
            self.aborted
        }
    }

    fn open(stream_id: StreamId, url: &str, length: usize) -> Frame {
        let headers = HeaderBlock::new()
            .with("method", "POST")
            .unwrap()
            .with("url", url)
            .unwrap()
            .with("version", "HTTP/1.1")
            .unwrap()
            .with("content-length", length.to_string())
            .unwrap();
        Frame::open(stream_id, &headers, length == 0)
    }

    fn data(stream_id: StreamId, bytes: &'static [u8], fin: bool) -> Frame {
        Frame::data(stream_id, Bytes::from_static(bytes), fin)
    }

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            encode_frame(frame, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn expected(url: &str, body: &str) -> String {
        format!(
            "POST {url} HTTP/1.1\r\ncontent-length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    fn multiplexed() -> InputFilter {
        InputFilter::new(Arc::new(ConnectionContext::with_protocol(
            ProtocolState::Multiplexed,
        )))
    }

    fn read(
        filter: &mut InputFilter,
        upstream: &mut Scripted,
        max_bytes: usize,
    ) -> (ReadStatus, String, bool) {
        let mut out = Brigade::new();
        let status = filter.read(upstream, &mut out, ReadMode::Bytes, BlockMode::NonBlock, max_bytes);
        let text = String::from_utf8(out.to_bytes().to_vec()).unwrap();
        (status, text, out.has_eos())
    }

    #[test]
    fn two_streams_are_delivered_in_first_seen_order() {
        let mut upstream = Scripted::default().wire(&[
            open(1, "/one", 10),
            open(3, "/two", 5),
            data(3, b"abcde", true),
            data(1, b"0123456789", true),
        ]);
        let mut filter = multiplexed();

        let (status, first, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!(status, Ok(()));
        assert_eq!(first, expected("/one", "0123456789"));

        let (status, second, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!(status, Ok(()));
        assert_eq!(second, expected("/two", "abcde"));

        let (status, rest, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, rest.as_str(), eos), (Err(ReadError::Eof), "", false));
        assert_eq!(filter.state(), FilterState::Exhausted);

        let pumps = filter.pumps();
        assert_eq!(read(&mut filter, &mut upstream, 0).0, Err(ReadError::Eof));
        assert_eq!(filter.pumps(), pumps);
    }

    #[test]
    fn later_stream_waits_for_earlier_one() {
        let mut upstream = Scripted::default()
            .wire(&[open(1, "/slow", 4), open(3, "/fast", 2), data(3, b"ok", true)])
            .fail(ReadError::WouldBlock)
            .wire(&[data(1, b"done", true)]);
        let mut filter = multiplexed();

        let mut feed = String::new();
        loop {
            let (status, text, _) = read(&mut filter, &mut upstream, 7);
            feed.push_str(&text);
            match status {
                Ok(()) | Err(ReadError::WouldBlock) => {}
                Err(ReadError::Eof) => break,
                Err(other) => panic!("unexpected status {other:?}"),
            }
        }

        assert_eq!(feed, expected("/slow", "done") + &expected("/fast", "ok"));
    }

    #[test]
    fn would_block_surfaces_once_queue_is_drained() {
        let mut upstream = Scripted::default()
            .wire(&[open(1, "/", 3), data(1, b"abc", false)])
            .fail(ReadError::WouldBlock);
        let mut filter = multiplexed();

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!(status, Ok(()));
        assert!(text.ends_with("abc"));

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str()), (Err(ReadError::WouldBlock), ""));
        assert_eq!(filter.state(), FilterState::Active);
        assert_eq!(filter.live_streams(), 1);
    }

    #[test]
    fn upstream_failure_is_replayed_without_state_change() {
        let mut upstream = Scripted::default().fail(ReadError::General);
        let mut filter = multiplexed();

        assert_eq!(read(&mut filter, &mut upstream, 0).0, Err(ReadError::General));
        assert_eq!(filter.state(), FilterState::Active);
        assert_eq!(read(&mut filter, &mut upstream, 0).0, Err(ReadError::Eof));
    }

    #[test]
    fn init_probe_has_no_side_effects() {
        let mut upstream = Scripted::default().wire(&[open(1, "/", 0)]);
        let mut filter = multiplexed();
        let mut out = Brigade::new();

        let status = filter.read(&mut upstream, &mut out, ReadMode::Init, BlockMode::Block, 0);
        assert_eq!(status, Ok(()));
        assert!(out.is_empty());
        assert_eq!(upstream.consuming_reads, 0);
        assert_eq!(filter.pumps(), 0);
    }

    #[test]
    fn would_block_probe_keeps_awaiting_selection() {
        let ctx = Arc::new(ConnectionContext::new());
        let mut upstream = Scripted::default().wire(&[open(1, "/", 0)]);
        upstream.probe_failures.push_back(ReadError::WouldBlock);
        upstream.negotiate = Some((Arc::clone(&ctx), ProtocolState::Multiplexed));
        let mut filter = InputFilter::new(ctx);

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str()), (Err(ReadError::WouldBlock), ""));
        assert_eq!(filter.state(), FilterState::AwaitingSelection);
        assert_eq!(upstream.consuming_reads, 0);

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!(status, Ok(()));
        assert_eq!(text, expected("/", ""));
        assert_eq!(filter.state(), FilterState::Active);
    }

    #[test]
    fn unresolved_selection_passes_input_through() {
        let payload: &[u8] = b"GET / HTTP/1.1\r\nhost: plain\r\n\r\n";
        let script = || {
            Scripted::default()
                .raw(payload)
                .fail(ReadError::WouldBlock)
                .raw(b"tail")
        };
        let mut upstream = script();
        let mut direct = script();
        let ctx = Arc::new(ConnectionContext::new());
        let mut filter = InputFilter::new(Arc::clone(&ctx));

        for (mode, max) in [
            (ReadMode::Init, 0),
            (ReadMode::Speculative, 4),
            (ReadMode::Bytes, 10),
            (ReadMode::Bytes, 0),
            (ReadMode::Bytes, 0),
            (ReadMode::Bytes, 0),
            (ReadMode::Bytes, 0),
        ] {
            let mut via = Brigade::new();
            let mut raw = Brigade::new();
            let got = filter.read(&mut upstream, &mut via, mode, BlockMode::Block, max);
            let want = direct.read(&mut raw, mode, BlockMode::Block, max);
            assert_eq!(got, want);
            assert_eq!(via.to_bytes(), raw.to_bytes());
        }

        assert_eq!(filter.state(), FilterState::PassThrough);
        assert_eq!(ctx.protocol(), ProtocolState::Plain);
        assert_eq!(filter.pumps(), 0);
    }

    #[test]
    fn plain_selection_passes_input_through() {
        let ctx = Arc::new(ConnectionContext::with_protocol(ProtocolState::Plain));
        let mut upstream = Scripted::default().raw(b"plain");
        let mut filter = InputFilter::new(ctx);

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str()), (Ok(()), "plain"));
        assert_eq!(filter.state(), FilterState::PassThrough);
        assert_eq!(filter.pumps(), 0);
    }

    #[test]
    fn abort_takes_precedence_over_queued_data() {
        let mut upstream = Scripted::default().wire(&[
            open(1, "/a", 0),
            open(3, "/b", 0),
        ]);
        let mut filter = multiplexed();

        let (status, _, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!(status, Ok(()));
        filter.context().abort();

        for _ in 0..2 {
            let (status, text, eos) = read(&mut filter, &mut upstream, 0);
            assert_eq!((status, text.as_str(), eos), (Err(ReadError::ConnAborted), "", true));
        }
        assert_eq!(filter.state(), FilterState::Aborted(ReadError::ConnAborted));
    }

    #[test]
    fn upstream_abort_flag_is_honored_even_for_init() {
        let mut upstream = Scripted::default();
        upstream.aborted = true;
        let mut filter = multiplexed();
        let mut out = Brigade::new();

        let status = filter.read(&mut upstream, &mut out, ReadMode::Init, BlockMode::Block, 0);
        assert_eq!(status, Err(ReadError::ConnAborted));
        assert!(out.has_eos());
    }

    #[test]
    fn framing_error_aborts_input() {
        let mut upstream = Scripted::default()
            .wire(&[open(1, "/", 0)])
            .raw(b"not a frame at all");
        let mut filter = multiplexed();

        let (status, _, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!(status, Ok(()));

        let (status, text, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str(), eos), (Err(ReadError::General), "", true));
        assert_eq!(filter.state(), FilterState::Aborted(ReadError::General));

        let (status, _, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, eos), (Err(ReadError::General), true));
    }

    #[test]
    fn leftover_wire_bytes_are_pumped_before_end_of_input() {
        let first = wire(&[open(1, "/a", 0)]);
        let mut burst = first.clone();
        burst.extend(wire(&[open(3, "/b", 0)]));
        let mut upstream = Scripted::default().burst(burst, ReadError::Eof);
        let config = FilterConfig {
            read_chunk_size: first.len(),
            ..FilterConfig::default()
        };
        let ctx = Arc::new(ConnectionContext::with_protocol(ProtocolState::Multiplexed));
        let mut filter = InputFilter::with_config(ctx, &config).unwrap();

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text), (Ok(()), expected("/a", "")));
        assert_eq!(filter.state(), FilterState::Active);

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text), (Err(ReadError::Eof), expected("/b", "")));
        assert_eq!(filter.state(), FilterState::Exhausted);
        assert_eq!(upstream.consuming_reads, 1);
    }

    #[test]
    fn data_read_with_failure_is_delivered_then_failure_replayed() {
        let mut upstream =
            Scripted::default().burst(wire(&[open(1, "/a", 0)]), ReadError::General);
        let mut filter = multiplexed();

        let (status, text, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text, eos), (Err(ReadError::General), expected("/a", ""), false));
        assert_eq!(filter.state(), FilterState::Active);

        let (status, text, _) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str()), (Err(ReadError::Eof), ""));
        assert_eq!(filter.state(), FilterState::Exhausted);
    }

    #[test]
    fn complete_stream_before_framing_error_is_delivered() {
        let mut bytes = wire(&[open(1, "/a", 0)]);
        bytes.extend_from_slice(b"not a frame at all");
        let mut upstream = Scripted::default().raw(&bytes);
        let mut filter = multiplexed();

        let (status, text, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text, eos), (Ok(()), expected("/a", ""), false));

        let (status, text, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str(), eos), (Err(ReadError::General), "", true));
        assert_eq!(filter.state(), FilterState::Aborted(ReadError::General));
    }

    #[test]
    fn reset_stream_aborts_input() {
        let mut upstream = Scripted::default().wire(&[
            open(1, "/", 8),
            data(1, b"part", false),
            Frame::reset(1, 2),
            open(3, "/next", 0),
        ]);
        let mut filter = multiplexed();

        let (status, text, eos) = read(&mut filter, &mut upstream, 0);
        assert_eq!((status, text.as_str(), eos), (Err(ReadError::General), "", true));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let ctx = Arc::new(ConnectionContext::new());
        let config = FilterConfig {
            read_chunk_size: 0,
            ..FilterConfig::default()
        };
        assert!(InputFilter::with_config(Arc::clone(&ctx), &config).is_err());

        let filter = InputFilter::with_config(ctx, &FilterConfig::default()).unwrap();
        assert_eq!(filter.state(), FilterState::AwaitingSelection);
        assert!(format!("{filter:?}").contains("AwaitingSelection"));
    }
}
