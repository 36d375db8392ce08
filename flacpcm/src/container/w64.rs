use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::{FmtChunk, PcmSink, SinkStats, check_buffer, write_samples};
use crate::join_bytes_le;
use crate::process::convert::InterleavedBuffer;
use crate::structs::format::{OutputFormat, SampleDepth};
use crate::utils::errors::SinkError;

// W64 GUIDs as defined in Sony Wave64 specification
pub const W64_RIFF_GUID: [u8; 16] = [
    0x72, 0x69, 0x66, 0x66, 0x2E, 0x91, 0xCF, 0x11, 0xA5, 0xD6, 0x28, 0xDB, 0x04, 0xC1, 0x00, 0x00,
];
pub const W64_WAVE_GUID: [u8; 16] = [
    0x77, 0x61, 0x76, 0x65, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_FMT_GUID: [u8; 16] = [
    0x66, 0x6D, 0x74, 0x20, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_DATA_GUID: [u8; 16] = [
    0x64, 0x61, 0x74, 0x61, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];

/// GUID plus 64-bit size.
const CHUNK_HEADER_SIZE: u64 = 24;

/// Sony Wave64 writer; 64-bit chunk sizes lift the 4 GiB WAV limit.
pub struct W64Writer<W: Write + Seek> {
    writer: BufWriter<W>,
    format: OutputFormat,
    depth: SampleDepth,
    file_size_position: u64,
    data_size_position: u64,
    data_written: u64,
    closed: bool,
}

impl W64Writer<File> {
    pub fn create<P: AsRef<Path>>(path: P, format: &OutputFormat) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file, format)
    }
}

impl<W: Write + Seek> W64Writer<W> {
    pub fn new(writer: W, format: &OutputFormat) -> Result<Self, SinkError> {
        let depth = format.validate()?;

        let mut w64 = Self {
            writer: BufWriter::new(writer),
            format: *format,
            depth,
            file_size_position: 0,
            data_size_position: 0,
            data_written: 0,
            closed: false,
        };
        w64.write_header()?;
        Ok(w64)
    }

    fn write_header(&mut self) -> io::Result<()> {
        let fmt_chunk_size = CHUNK_HEADER_SIZE + FmtChunk::SIZE;
        let header = join_bytes_le!(
            W64_RIFF_GUID,
            0u64, // file size, patched in finish()
            W64_WAVE_GUID,
            W64_FMT_GUID,
            fmt_chunk_size,
            FmtChunk::pcm(&self.format),
            W64_DATA_GUID,
            0u64, // data size, patched in finish()
        );

        let start = self.writer.stream_position()?;
        self.file_size_position = start + 16;
        self.data_size_position = start + header.len() as u64 - 8;
        self.writer.write_all(&header)
    }

    pub fn write_samples(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        check_buffer(&self.format, self.depth, buffer)?;

        write_samples(&mut self.writer, buffer)?;
        self.data_written += buffer.byte_len();
        Ok(())
    }

    /// Finish writing and update file size headers
    pub fn finish(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.writer.flush()?;

        let current_pos = self.writer.stream_position()?;

        // Data chunk size includes its own GUID and size field
        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        let data_chunk_size = self.data_written + CHUNK_HEADER_SIZE;
        self.writer.write_all(&data_chunk_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(self.file_size_position))?;
        self.writer.write_all(&current_pos.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        Ok(())
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

impl<W: Write + Seek> PcmSink for W64Writer<W> {
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        self.write_samples(buffer)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.finish()
    }
}
