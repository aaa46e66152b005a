use std::fs::File;
use std::io::BufReader;

use muxfeed_frame::stream::is_client_initiated;
use muxfeed_frame::{Frame, FrameConfig, FrameKind, FrameReader};

use crate::cmd::InspectArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{payload_preview, print_frames, FrameRow, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.capture).map_err(|err| {
        io_error(&format!("failed opening {}", args.capture.display()), err)
    })?;
    let mut config = FrameConfig::default();
    if let Some(max) = args.max_payload {
        config.max_payload_size = max;
    }
    let reader = FrameReader::with_config(BufReader::new(file), config);

    let mut rows = Vec::new();
    let mut failure = None;
    for (index, frame) in reader.enumerate() {
        match frame {
            Ok(frame) => rows.push(describe(index, &frame)),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    print_frames(&rows, format);
    match failure {
        Some(err) => Err(frame_error(&format!("frame #{}", rows.len()), err)),
        None => Ok(SUCCESS),
    }
}

fn describe(index: usize, frame: &Frame) -> FrameRow {
    let detail = match frame.kind {
        FrameKind::Open => match frame.header_block() {
            Ok(headers) => format!(
                "{} {} ({} headers)",
                headers.get("method").unwrap_or("?"),
                headers.get("url").unwrap_or("?"),
                headers.len()
            ),
            Err(err) => format!("invalid headers: {err}"),
        },
        FrameKind::Data | FrameKind::Ping => payload_preview(frame.payload.as_ref()),
        FrameKind::Reset => frame
            .code()
            .map_or_else(|err| err.to_string(), |code| format!("code={code}")),
        FrameKind::GoAway => frame
            .code()
            .map_or_else(|err| err.to_string(), |last| format!("last_stream={last}")),
    };

    let initiator = if frame.kind.is_connection_level() {
        "connection"
    } else if is_client_initiated(frame.stream_id) {
        "client"
    } else {
        "server"
    };

    FrameRow {
        index,
        kind: frame.kind.name(),
        stream_id: frame.stream_id,
        initiator,
        fin: frame.is_fin(),
        payload_size: frame.payload.len(),
        detail,
    }
}
