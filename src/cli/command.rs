use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser as ClapParser, Subcommand, ValueEnum};
use flacpcm::structs::format::Container;
use serde::Deserialize;

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Streaming FLAC to PCM transcoder",
    long_about = None,
    subcommand_negates_reqs = true,
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (truncated streams, decoder anomalies).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform. Without one, `<INPUT> <OUTPUT>` transcodes.
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub transcode: Option<TranscodeArgs>,
}

/// The operation selected on the command line.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    Transcode(&'a TranscodeArgs),
    Info(&'a InfoArgs),
}

impl Cli {
    /// Resolves the subcommand, treating bare `<INPUT> <OUTPUT>` as `transcode`.
    pub fn action(&self) -> Result<Action<'_>, clap::Error> {
        match (&self.command, &self.transcode) {
            (Some(_), Some(_)) => Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                "paths given before a subcommand; use either the bare form or a subcommand",
            )),
            (Some(Commands::Transcode(args)), None) | (None, Some(args)) => {
                Ok(Action::Transcode(args))
            }
            (Some(Commands::Info(args)), None) => Ok(Action::Info(args)),
            (None, None) => Err(Cli::command().error(
                ErrorKind::MissingRequiredArgument,
                "an input and an output path are required",
            )),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transcode a FLAC stream into PCM audio.
    Transcode(TranscodeArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TranscodeArgs {
    /// Input FLAC stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file. The container's extension is added when missing.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Output bit depth (16, 24 or 32).
    #[arg(long, value_name = "BITS")]
    pub bits: Option<u16>,

    /// Output channel count; must match the stream.
    #[arg(long, value_name = "COUNT")]
    pub channels: Option<u16>,

    /// Output sample rate in Hz. Samples are not resampled.
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Output container.
    #[arg(long, value_enum)]
    pub container: Option<ContainerArg>,

    /// YAML file with output format defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input FLAC stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContainerArg {
    /// RIFF WAVE (limited to 4 GiB of audio data).
    Wav,
    /// Sony Wave64.
    W64,
    /// Raw little-endian PCM without a header.
    Pcm,
}

impl From<ContainerArg> for Container {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Wav => Container::Wav,
            ContainerArg::W64 => Container::W64,
            ContainerArg::Pcm => Container::Pcm,
        }
    }
}
