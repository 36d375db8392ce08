use std::fmt::Display;

use crate::structs::block::Block;
use crate::utils::errors::EngineError;

/// FLAC decoding engine backed by `claxon`.
///
/// Provides [`FlacEngine`](flac::FlacEngine) and [`read_info`](flac::read_info).
pub mod flac;
/// Frame boundary detection and resynchronisation.
pub mod frame;

/// What a block handler asks of the engine after each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Continue,
    Abort,
}

/// Receives engine events, in stream order, on the decoding thread.
pub trait BlockHandler {
    /// Called once per decoded block. The block is only valid for this call.
    fn on_block(&mut self, block: &Block<'_>) -> WriteStatus;

    /// Called when the engine detects a stream-level anomaly.
    fn on_error(&mut self, anomaly: &Anomaly);
}

/// A push-model decoder: it drives the loop and calls back into a [`BlockHandler`].
pub trait DecodeEngine {
    fn stream_info(&self) -> StreamInfo;

    /// Decodes blocks until end of stream, an abort request, or a fault the
    /// engine cannot recover from.
    fn process_until_end_of_stream(&mut self, handler: &mut dyn BlockHandler) -> Completion;

    /// Releases decoder state. Called once after the loop, whatever its outcome.
    fn finish(&mut self) -> Result<(), EngineError>;
}

/// How the decode loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    EndOfStream,
    /// A handler returned [`WriteStatus::Abort`].
    Aborted,
    /// The engine stopped before end of stream.
    Incomplete(Anomaly),
}

impl Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::EndOfStream => write!(f, "end of stream"),
            Completion::Aborted => write!(f, "aborted"),
            Completion::Incomplete(anomaly) => write!(f, "incomplete ({anomaly})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    LostSync,
    BadHeader,
    CrcMismatch,
    UnparseableStream,
    Truncated,
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::LostSync => write!(f, "lost sync"),
            AnomalyKind::BadHeader => write!(f, "bad frame header"),
            AnomalyKind::CrcMismatch => write!(f, "frame CRC mismatch"),
            AnomalyKind::UnparseableStream => write!(f, "unparseable stream"),
            AnomalyKind::Truncated => write!(f, "truncated stream"),
        }
    }
}

/// A stream-level problem signalled by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    /// Index of the block being decoded when the problem was found.
    pub block_index: u64,
    pub detail: String,
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at block {}: {}", self.kind, self.block_index, self.detail)
    }
}

/// Stream parameters reported by the engine before decoding starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u32,
    pub bits_per_sample: u32,
    /// Samples per channel, when the encoder recorded it.
    pub total_samples: Option<u64>,
    pub min_block_size: u16,
    pub max_block_size: u16,
    /// Reported only; the engine never verifies it.
    pub md5: [u8; 16],
}

impl StreamInfo {
    pub fn duration_secs(&self) -> Option<f64> {
        self.total_samples
            .map(|samples| samples as f64 / f64::from(self.sample_rate.max(1)))
    }

    pub fn md5_hex(&self) -> String {
        self.md5.iter().map(|b| format!("{b:02x}")).collect()
    }
}
