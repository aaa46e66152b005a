use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod compose;
pub mod demux;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a capture through the input filter and print the HTTP feed.
    Demux(DemuxArgs),
    /// List the frames in a capture.
    Inspect(InspectArgs),
    /// Build a capture from a JSON frame script.
    Compose(ComposeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Demux(args) => demux::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Compose(args) => compose::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct DemuxArgs {
    /// Capture file holding the raw wire bytes of one connection.
    pub capture: PathBuf,
    /// Filter configuration (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Upstream bytes read per pump step (overrides the config).
    #[arg(long, value_name = "BYTES")]
    pub chunk: Option<usize>,
    /// Maximum bytes requested per consumer read (0 = unlimited).
    #[arg(long, value_name = "BYTES", default_value = "0")]
    pub read_size: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Capture file to list.
    pub capture: PathBuf,
    /// Largest payload accepted, in bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_payload: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// JSON script: an array of frame descriptions.
    pub script: PathBuf,
    /// Capture file to write.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
