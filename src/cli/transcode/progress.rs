use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use flacpcm::container::PcmSink;
use flacpcm::engine::flac::read_info;
use flacpcm::process::convert::InterleavedBuffer;
use flacpcm::utils::errors::SinkError;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::input::InputReader;
use crate::timestamp::time_str;

const BAR_TEMPLATE: &str = "{bar:40.cyan/blue} {pos}/{len} samples ({percent}%)\n{msg} | elapsed: {elapsed_precise}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {pos} samples\n{msg} | elapsed: {elapsed_precise}";

/// Reads STREAMINFO for the per-channel sample count, when the encoder stored one.
pub fn estimate_total_samples(input_path: &Path) -> Result<Option<u64>> {
    let info = read_info(InputReader::new(input_path)?)?;
    match info.total_samples {
        Some(total) => log::info!("Stream holds {total} samples per channel"),
        None => log::info!("Stream length unknown, showing a spinner"),
    }
    Ok(info.total_samples)
}

pub fn create_progress_bar(
    multi: &MultiProgress,
    total_samples: Option<u64>,
) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_samples {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(&format!(
            "{BAR_TEMPLATE} | ETA: {{eta_precise}}"
        ))?);

        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(SPINNER_TEMPLATE)?);

        pb
    };
    pb.set_message("initializing decoder");
    Ok(pb)
}

pub fn finalize_progress_bar(
    pb: &Option<ProgressBar>,
    total_samples: Option<u64>,
    decoded_samples: u64,
    sample_rate: u32,
    start_time: Instant,
) {
    if let Some(pb) = pb {
        let audio_duration_secs = decoded_samples as f64 / f64::from(sample_rate.max(1));
        let realtime_multiplier = audio_duration_secs / start_time.elapsed().as_secs_f64();
        let final_time_str = time_str(audio_duration_secs);

        let style = if total_samples.is_some() {
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
        } else {
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        };
        pb.set_style(style);

        pb.finish_with_message(format!(
            "speed: {realtime_multiplier:.1}x | timestamp: {final_time_str}"
        ));
    }
}

/// Advances a progress bar as blocks pass through to the wrapped sink.
pub struct ProgressSink<S: PcmSink> {
    inner: S,
    pb: Option<ProgressBar>,
    sample_rate: u32,
    start_time: Instant,
    blocks: u64,
    frames: u64,
}

impl<S: PcmSink> ProgressSink<S> {
    pub fn new(inner: S, pb: Option<ProgressBar>, sample_rate: u32, start_time: Instant) -> Self {
        Self {
            inner,
            pb,
            sample_rate,
            start_time,
            blocks: 0,
            frames: 0,
        }
    }

    fn update_progress_display(&self) {
        let Some(pb) = &self.pb else {
            return;
        };
        pb.set_position(self.frames);
        if self.blocks.is_multiple_of(30) {
            let audio_duration_secs = self.frames as f64 / f64::from(self.sample_rate.max(1));
            let realtime_multiplier =
                audio_duration_secs / self.start_time.elapsed().as_secs_f64();
            pb.set_message(format!(
                "speed: {realtime_multiplier:.1}x | timestamp: {}",
                time_str(audio_duration_secs)
            ));
        }
    }
}

impl<S: PcmSink> PcmSink for ProgressSink<S> {
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        self.inner.write_block(buffer)?;
        self.blocks += 1;
        self.frames += buffer.frames() as u64;
        self.update_progress_display();
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close()
    }
}
