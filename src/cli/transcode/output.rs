use std::fs::File;
use std::path::{Path, PathBuf};

use flacpcm::container::{PcmSink, SinkStats};
use flacpcm::container::raw::RawPcmWriter;
use flacpcm::container::w64::W64Writer;
use flacpcm::container::wav::WavWriter;
use flacpcm::process::convert::InterleavedBuffer;
use flacpcm::structs::format::{Container, OutputFormat};
use flacpcm::utils::errors::SinkError;

/// Appends `expected_ext` unless the path already ends with it.
pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match (base_path.extension(), base_path.file_name()) {
        (Some(existing_ext), _) if existing_ext == expected_ext => base_path.to_path_buf(),
        (Some(_), Some(file_name)) => {
            let mut path = base_path.to_path_buf();
            path.set_file_name(format!("{}.{}", file_name.to_string_lossy(), expected_ext));
            path
        }
        _ => base_path.with_extension(expected_ext),
    }
}

/// File-backed sink for the container chosen in the output format.
pub enum AudioWriter {
    Wav(WavWriter<File>),
    W64(W64Writer<File>),
    Pcm(RawPcmWriter<File>),
}

impl AudioWriter {
    pub fn create(path: &Path, format: &OutputFormat) -> Result<Self, SinkError> {
        log::info!("Writing {format} to {}", path.display());
        Ok(match format.container {
            Container::Wav => AudioWriter::Wav(WavWriter::create(path, format)?),
            Container::W64 => AudioWriter::W64(W64Writer::create(path, format)?),
            Container::Pcm => AudioWriter::Pcm(RawPcmWriter::create(path, format)?),
        })
    }

    pub fn stats(&self) -> SinkStats {
        match self {
            AudioWriter::Wav(writer) => writer.stats(),
            AudioWriter::W64(writer) => writer.stats(),
            AudioWriter::Pcm(writer) => writer.stats(),
        }
    }
}

impl PcmSink for AudioWriter {
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        match self {
            AudioWriter::Wav(writer) => writer.write_block(buffer),
            AudioWriter::W64(writer) => writer.write_block(buffer),
            AudioWriter::Pcm(writer) => writer.write_block(buffer),
        }
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let closed = match self {
            AudioWriter::Wav(writer) => writer.close(),
            AudioWriter::W64(writer) => writer.close(),
            AudioWriter::Pcm(writer) => writer.close(),
        };
        closed?;

        let stats = self.stats();
        log::info!(
            "Wrote {} bytes of {}-bit PCM ({} channels, {} Hz)",
            stats.data_written,
            stats.bits_per_sample,
            stats.channels,
            stats.sample_rate
        );
        Ok(())
    }
}
