use std::io;
use std::path::PathBuf;

/// Logs `$err` at `$level`, or returns it when `$level` reaches `$state.fail_level`.
#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Channel count must be between 1 and {max}, got {actual}")]
    UnsupportedChannels { actual: u16, max: u16 },

    #[error("Sample rate must be between 1 and {max} Hz, got {actual}")]
    InvalidSampleRate { actual: u32, max: u32 },

    #[error("Bit depth must be 16, 24 or 32, got {0}")]
    UnsupportedBitDepth(u16),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Block has no channels")]
    NoChannels,

    #[error("Channel {channel} holds {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Cannot allocate interleaved buffer for {frames} frames x {channels} channels")]
    Allocation { frames: usize, channels: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("Could not open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Sink expects {expected} channels, buffer carries {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Sink expects {expected}-bit samples, buffer carries {actual}-bit samples")]
    DepthMismatch { expected: u32, actual: u32 },

    #[error("{container} data would exceed {limit} bytes; use the w64 container for long streams")]
    ContainerFull { container: &'static str, limit: u64 },

    #[error("Sink is already closed")]
    Closed,
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("FLAC stream error: {0}")]
    Flac(#[from] claxon::Error),

    #[error("Stream reports unsupported bit depth {0}")]
    UnsupportedSourceDepth(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum TranscodeError {
    #[error("Output format is not valid: {0}")]
    Format(#[from] FormatError),

    #[error("Could not open output sink: {0}")]
    SinkOpen(#[source] SinkError),

    #[error("Could not initialise decoder: {0}")]
    EngineOpen(#[source] EngineError),

    #[error(
        "Stream has {stream} channels but the output format expects {format}; remixing is not supported"
    )]
    ChannelCountMismatch { stream: usize, format: usize },

    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("Write to output sink failed: {0}")]
    Write(#[source] SinkError),

    #[error("Closing output sink failed: {0}")]
    Close(#[source] SinkError),

    #[error("Finishing decoder failed: {0}")]
    Finish(#[source] EngineError),

    #[error("Decoding of {input} did not reach end of stream: {reason}")]
    Incomplete { input: String, reason: String },

    #[error("Decoder reported {count} stream anomalies while decoding {input}")]
    Anomalies { input: String, count: usize },

    #[error("Decoding of {input} was aborted")]
    Aborted { input: String },
}
