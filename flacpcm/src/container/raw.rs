use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::{PcmSink, SinkStats, check_buffer, write_samples};
use crate::process::convert::InterleavedBuffer;
use crate::structs::format::{OutputFormat, SampleDepth};
use crate::utils::errors::SinkError;

/// Headerless little-endian PCM; the reader has to know the format.
pub struct RawPcmWriter<W: Write> {
    writer: BufWriter<W>,
    format: OutputFormat,
    depth: SampleDepth,
    data_written: u64,
    closed: bool,
}

impl RawPcmWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P, format: &OutputFormat) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file, format)
    }
}

impl<W: Write> RawPcmWriter<W> {
    pub fn new(writer: W, format: &OutputFormat) -> Result<Self, SinkError> {
        let depth = format.validate()?;
        Ok(Self {
            writer: BufWriter::new(writer),
            format: *format,
            depth,
            data_written: 0,
            closed: false,
        })
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            data_written: self.data_written,
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
            bits_per_sample: self.format.bits_per_sample,
        }
    }
}

impl<W: Write> PcmSink for RawPcmWriter<W> {
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        check_buffer(&self.format, self.depth, buffer)?;
        write_samples(&mut self.writer, buffer)?;
        self.data_written += buffer.byte_len();
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        self.writer.flush()?;
        Ok(())
    }
}
