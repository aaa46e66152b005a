use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use muxfeed_filter::{ConnectionContext, FilterConfig, InputFilter, ProtocolState};
use muxfeed_transport::{BlockMode, Brigade, Bucket, IoUpstream, ReadError, ReadMode};
use tracing::info;

use crate::cmd::DemuxArgs;
use crate::exit::{filter_error, io_error, read_error, CliResult, SUCCESS};
use crate::output::write_raw;

pub fn run(args: DemuxArgs) -> CliResult<i32> {
    let mut config = match &args.config {
        Some(path) => FilterConfig::from_json_file(path)
            .map_err(|err| filter_error(&format!("failed loading {}", path.display()), err))?,
        None => FilterConfig::default(),
    };
    if let Some(chunk) = args.chunk {
        config.read_chunk_size = chunk;
    }

    let file = File::open(&args.capture).map_err(|err| {
        io_error(&format!("failed opening {}", args.capture.display()), err)
    })?;
    let context = Arc::new(ConnectionContext::with_protocol(ProtocolState::Multiplexed));
    let mut filter = InputFilter::with_config(context, &config)
        .map_err(|err| filter_error("invalid filter config", err))?;
    let mut upstream = IoUpstream::new(BufReader::new(file));

    let mut stdout = std::io::stdout().lock();
    let mut delivered = 0usize;
    let terminal = loop {
        let mut feed = Brigade::new();
        let status = filter.read(
            &mut upstream,
            &mut feed,
            ReadMode::Bytes,
            BlockMode::Block,
            args.read_size,
        );
        while let Some(bucket) = feed.pop_front() {
            if let Bucket::Data(data) = bucket {
                write_raw(&mut stdout, &data)
                    .map_err(|err| io_error("failed writing feed", err))?;
                delivered += data.len();
            }
        }
        match status {
            Ok(()) | Err(ReadError::WouldBlock) => continue,
            Err(err) => break err,
        }
    };

    info!(
        bytes = delivered,
        pumps = filter.pumps(),
        state = ?filter.state(),
        "demux finished"
    );
    match read_error("demux", terminal) {
        None => Ok(SUCCESS),
        Some(err) => Err(err),
    }
}
