use std::fs::File;
use std::io::BufWriter;

use muxfeed_frame::{Frame, FrameWriter, HeaderBlock, StreamId};
use serde::{Deserialize, Serialize};

use crate::cmd::ComposeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_summary, OutputFormat};

/// One entry of a compose script.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ScriptFrame {
    Open {
        stream: StreamId,
        headers: Vec<(String, String)>,
        #[serde(default)]
        fin: bool,
    },
    Data {
        stream: StreamId,
        #[serde(default)]
        data: String,
        #[serde(default)]
        fin: bool,
    },
    Reset {
        stream: StreamId,
        #[serde(default)]
        code: u32,
    },
    Ping {
        #[serde(default)]
        data: String,
    },
    Goaway {
        last_stream: StreamId,
    },
}

#[derive(Serialize)]
struct ComposeSummary {
    output: String,
    frames: usize,
    bytes: usize,
}

pub fn run(args: ComposeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = std::fs::read(&args.script)
        .map_err(|err| io_error(&format!("failed reading {}", args.script.display()), err))?;
    let script: Vec<ScriptFrame> = serde_json::from_slice(&raw).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("invalid script {}: {err}", args.script.display()),
        )
    })?;
    let frames = script
        .into_iter()
        .map(build_frame)
        .collect::<CliResult<Vec<Frame>>>()?;

    let file = File::create(&args.output)
        .map_err(|err| io_error(&format!("failed creating {}", args.output.display()), err))?;
    let mut writer = FrameWriter::new(BufWriter::new(file));
    let mut bytes = 0usize;
    for frame in &frames {
        writer
            .write_frame(frame)
            .map_err(|err| frame_error("failed writing frame", err))?;
        bytes += frame.wire_size();
    }

    let summary = ComposeSummary {
        output: args.output.display().to_string(),
        frames: frames.len(),
        bytes,
    };
    print_summary(
        &summary,
        &[
            ("output", summary.output.clone()),
            ("frames", summary.frames.to_string()),
            ("bytes", summary.bytes.to_string()),
        ],
        format,
    );
    Ok(SUCCESS)
}

fn build_frame(entry: ScriptFrame) -> CliResult<Frame> {
    let frame = match entry {
        ScriptFrame::Open {
            stream,
            headers,
            fin,
        } => {
            let mut block = HeaderBlock::new();
            for (name, value) in headers {
                block
                    .insert(name, value)
                    .map_err(|err| frame_error(&format!("stream {stream}"), err))?;
            }
            Frame::open(stream, &block, fin)
        }
        ScriptFrame::Data { stream, data, fin } => Frame::data(stream, data.into_bytes(), fin),
        ScriptFrame::Reset { stream, code } => Frame::reset(stream, code),
        ScriptFrame::Ping { data } => Frame::ping(data.into_bytes()),
        ScriptFrame::Goaway { last_stream } => Frame::goaway(last_stream),
    };
    Ok(frame)
}
