use muxfeed_frame::{FrameConfig, FrameDecoder, FrameError, StreamDistributor, VisitorFactory};
use muxfeed_transport::Upstream;
use tracing::{trace, warn};

use crate::config::DEFAULT_READ_CHUNK_SIZE;
use crate::input::BoundInput;

/// Pulls wire bytes from the bound input and dispatches the frames they
/// complete.
///
/// Each [`pump_one`](Self::pump_one) issues at most one upstream read. A
/// framing error is fatal: live streams are failed and the pump never reads
/// again.
#[derive(Debug)]
pub struct FramePump {
    decoder: FrameDecoder,
    chunk: Vec<u8>,
    failed: bool,
    pumps: u64,
}

impl Default for FramePump {
    fn default() -> Self {
        Self::new(DEFAULT_READ_CHUNK_SIZE, FrameConfig::default())
    }
}

impl FramePump {
    pub fn new(read_chunk_size: usize, config: FrameConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_config(config),
            chunk: vec![0; read_chunk_size.max(1)],
            failed: false,
            pumps: 0,
        }
    }

    /// Read once and dispatch every complete frame.
    ///
    /// Returns false when no bytes were obtained, or once the pump has
    /// failed.
    pub fn pump_one<U, F>(
        &mut self,
        input: &mut BoundInput<'_, U>,
        distributor: &mut StreamDistributor<F>,
    ) -> bool
    where
        U: Upstream + ?Sized,
        F: VisitorFactory,
    {
        if self.failed {
            return false;
        }
        self.pumps += 1;

        let n = input.read(&mut self.chunk);
        if n == 0 {
            trace!("no input available");
            return false;
        }
        self.decoder.feed(&self.chunk[..n]);

        loop {
            let result = match self.decoder.next_frame() {
                Ok(Some(frame)) => distributor.dispatch(frame),
                Ok(None) => break,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.fail(distributor, err);
                break;
            }
        }
        true
    }

    /// A framing error was seen.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Number of [`pump_one`](Self::pump_one) calls that attempted a read.
    pub fn pumps(&self) -> u64 {
        self.pumps
    }

    pub fn read_chunk_size(&self) -> usize {
        self.chunk.len()
    }

    fn fail<F: VisitorFactory>(&mut self, distributor: &mut StreamDistributor<F>, err: FrameError) {
        warn!(%err, live_streams = distributor.live_streams(), "framing error; failing connection input");
        self.failed = true;
        distributor.fail();
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};
    use muxfeed_frame::{encode_frame, Frame, HeaderBlock};
    use muxfeed_transport::{BlockMode, Brigade, ReadError, ReadMode, ReadStatus};

    use super::*;
    use crate::factory::ConverterFactory;
    use crate::input::InputStream;

    struct Chunks(Vec<Vec<u8>>);

    impl Upstream for Chunks {
        fn read(
            &mut self,
            out: &mut Brigade,
            _mode: ReadMode,
            _block: BlockMode,
            max_bytes: usize,
        ) -> ReadStatus {
            if self.0.is_empty() {
                return Err(ReadError::WouldBlock);
            }
            let mut chunk = self.0.remove(0);
            if chunk.len() > max_bytes {
                self.0.insert(0, chunk.split_off(max_bytes));
            }
            out.push_data(chunk);
            Ok(())
        }
    }

    fn request(fin: bool) -> Frame {
        let headers = HeaderBlock::new()
            .with("method", "GET")
            .unwrap()
            .with("url", "/")
            .unwrap()
            .with("version", "HTTP/1.1")
            .unwrap();
        Frame::open(1, &headers, fin)
    }

    fn wire(frame: &Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(frame, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn dispatches_frames_split_across_reads() {
        let bytes = wire(&request(true));
        let (head, tail) = bytes.split_at(5);
        let mut upstream = Chunks(vec![head.to_vec(), tail.to_vec()]);
        let mut input = InputStream::new();
        let mut dist = StreamDistributor::new(ConverterFactory::new());
        let mut pump = FramePump::default();

        let mut bound = input.bind(&mut upstream, BlockMode::NonBlock);
        assert!(pump.pump_one(&mut bound, &mut dist));
        assert!(!dist.factory_mut().has_data_available());
        assert!(pump.pump_one(&mut bound, &mut dist));
        assert!(dist.factory_mut().has_data_available());
        assert!(!pump.pump_one(&mut bound, &mut dist));
        drop(bound);

        assert_eq!(pump.pumps(), 3);
        assert!(!pump.has_failed());
        assert_eq!(input.last_status(), Err(ReadError::WouldBlock));
    }

    #[test]
    fn reads_at_most_one_chunk() {
        let mut upstream = Chunks(vec![wire(&request(false))]);
        let mut input = InputStream::new();
        let mut dist = StreamDistributor::new(ConverterFactory::new());
        let mut pump = FramePump::new(4, FrameConfig::default());
        assert_eq!(pump.read_chunk_size(), 4);

        let mut bound = input.bind(&mut upstream, BlockMode::Block);
        assert!(pump.pump_one(&mut bound, &mut dist));
        drop(bound);

        assert_eq!(upstream.0[0].len(), wire(&request(false)).len() - 4);
        assert_eq!(dist.live_streams(), 0);
    }

    #[test]
    fn framing_error_fails_live_streams() {
        let mut garbage = wire(&request(false));
        garbage.extend_from_slice(b"XX\x02\x00\x01\x00\x00\x00\x00\x00\x00\x00");
        let mut upstream = Chunks(vec![garbage, wire(&Frame::data(1, Bytes::new(), true))]);
        let mut input = InputStream::new();
        let mut dist = StreamDistributor::new(ConverterFactory::new());
        let mut pump = FramePump::default();

        let mut bound = input.bind(&mut upstream, BlockMode::Block);
        assert!(pump.pump_one(&mut bound, &mut dist));
        assert!(pump.has_failed());
        assert!(!pump.pump_one(&mut bound, &mut dist));
        drop(bound);

        assert_eq!(pump.pumps(), 1);
        assert_eq!(dist.live_streams(), 0);
        assert!(dist.factory_mut().has_error());
        assert_eq!(upstream.0.len(), 1);
    }
}
