use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Crates along the demux pipeline. Events are tagged with the crate that
/// emitted them so a stalled stream can be traced from frame to output.
const PIPELINE_TARGETS: [&str; 5] = [
    "muxfeed",
    "muxfeed_transport",
    "muxfeed_frame",
    "muxfeed_http",
    "muxfeed_filter",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn pipeline_filter(level: LogLevel) -> Targets {
    Targets::new().with_targets(PIPELINE_TARGETS.map(|target| (target, level.as_filter())))
}

/// Install the stderr subscriber for pipeline events at `level`.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer.with_filter(pipeline_filter(level)))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json().with_filter(pipeline_filter(level)))
            .try_init(),
    };
}
