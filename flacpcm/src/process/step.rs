use log::error;

use super::convert::{Conversion, interleave};
use super::report::ErrorReporter;
use crate::container::PcmSink;
use crate::engine::{Anomaly, BlockHandler, WriteStatus};
use crate::structs::block::Block;
use crate::utils::errors::TranscodeError;

/// Running totals for a session's decode loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeStats {
    pub blocks: u64,
    /// Frames per channel.
    pub frames: u64,
    /// Interleaved samples across all channels.
    pub samples: u64,
}

/// Converts each block the engine delivers and writes it to the sink.
///
/// Exactly one sink write happens per block, in arrival order. The
/// interleaved buffer lives only for the duration of [`on_block`]. A failed
/// conversion or write is kept for the driver and the engine is asked to
/// abort; anomalies go to the [`ErrorReporter`] and decoding continues.
///
/// [`on_block`]: BlockHandler::on_block
pub struct BlockTranscoder<'a, S: PcmSink> {
    sink: &'a mut S,
    reporter: &'a mut ErrorReporter,
    conversion: Conversion,
    channels: usize,
    stats: TranscodeStats,
    error: Option<TranscodeError>,
}

impl<'a, S: PcmSink> BlockTranscoder<'a, S> {
    pub fn new(
        sink: &'a mut S,
        reporter: &'a mut ErrorReporter,
        conversion: Conversion,
        channels: usize,
    ) -> Self {
        Self {
            sink,
            reporter,
            conversion,
            channels,
            stats: TranscodeStats::default(),
            error: None,
        }
    }

    pub fn stats(&self) -> TranscodeStats {
        self.stats
    }

    /// The error that made this step abort, if any.
    pub fn take_error(&mut self) -> Option<TranscodeError> {
        self.error.take()
    }

    fn transcode(&mut self, block: &Block<'_>) -> Result<(), TranscodeError> {
        if block.channel_count() != self.channels {
            return Err(TranscodeError::ChannelCountMismatch {
                stream: block.channel_count(),
                format: self.channels,
            });
        }

        let written = {
            let buffer = interleave(block, self.conversion)?;
            self.sink.write_block(&buffer)
        };
        written.map_err(TranscodeError::Write)?;

        self.stats.blocks += 1;
        self.stats.frames += block.frame_count() as u64;
        self.stats.samples += (block.frame_count() * block.channel_count()) as u64;
        Ok(())
    }
}

impl<S: PcmSink> BlockHandler for BlockTranscoder<'_, S> {
    fn on_block(&mut self, block: &Block<'_>) -> WriteStatus {
        if self.error.is_some() {
            return WriteStatus::Abort;
        }

        match self.transcode(block) {
            Ok(()) => WriteStatus::Continue,
            Err(e) => {
                error!("Block {} could not be transcoded: {e}", self.stats.blocks);
                self.error = Some(e);
                WriteStatus::Abort
            }
        }
    }

    fn on_error(&mut self, anomaly: &Anomaly) {
        self.reporter.report(anomaly);
    }
}
