use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::{FmtChunk, PcmSink, RiffChunk, SinkStats, check_buffer, write_samples};
use crate::process::convert::InterleavedBuffer;
use crate::structs::format::{OutputFormat, SampleDepth};
use crate::utils::errors::SinkError;

/// Bytes the RIFF size field counts besides the data chunk payload: the
/// `WAVE` tag, the fmt chunk and the data chunk header.
const RIFF_OVERHEAD: u64 = 4 + 8 + FmtChunk::SIZE + 8;

/// Largest data chunk payload, pad byte included, a 32-bit RIFF size can describe.
pub const MAX_DATA_BYTES: u64 = u32::MAX as u64 - RIFF_OVERHEAD;

/// Whether `data_bytes` of audio plus its pad byte still fit the 32-bit sizes.
fn fits_data_chunk(data_bytes: u64) -> bool {
    data_bytes + data_bytes % 2 <= MAX_DATA_BYTES
}

/// RIFF WAVE writer for integer PCM.
///
/// Chunk sizes are written as zero and patched by [`WavWriter::finish`].
pub struct WavWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    format: OutputFormat,
    depth: SampleDepth,
    riff_size_position: u64,
    data_size_position: u64,
    data_written: u64,
    closed: bool,
}

impl WavWriter<File> {
    /// Creates `path` and writes the header.
    pub fn create<P: AsRef<Path>>(path: P, format: &OutputFormat) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file, format)
    }
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(writer: W, format: &OutputFormat) -> Result<Self, SinkError> {
        let depth = format.validate()?;

        let mut wav = Self {
            writer: BufWriter::new(writer),
            format: *format,
            depth,
            riff_size_position: 0,
            data_size_position: 0,
            data_written: 0,
            closed: false,
        };
        wav.write_header()?;
        Ok(wav)
    }

    fn write_header(&mut self) -> Result<(), SinkError> {
        self.writer.write_all(b"RIFF")?;
        self.riff_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // patched in finish()
        self.writer.write_all(b"WAVE")?;

        FmtChunk::pcm(&self.format).write_all(&mut self.writer)?;

        self.writer.write_all(b"data")?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?; // patched in finish()

        Ok(())
    }

    pub fn write_samples(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        check_buffer(&self.format, self.depth, buffer)?;

        let bytes = buffer.byte_len();
        if !fits_data_chunk(self.data_written + bytes) {
            return Err(SinkError::ContainerFull {
                container: "WAV",
                limit: MAX_DATA_BYTES,
            });
        }

        write_samples(&mut self.writer, buffer)?;
        self.data_written += bytes;
        Ok(())
    }

    /// Pads the data chunk and patches both size fields.
    pub fn finish(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if self.data_written % 2 == 1 {
            self.writer.write_all(&[0])?;
        }
        self.writer.flush()?;

        let end = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer
            .write_all(&(self.data_written as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(self.riff_size_position))?;
        let riff_size = end - (self.riff_size_position + 4);
        self.writer.write_all(&(riff_size as u32).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn into_inner(self) -> std::io::Result<W> {
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

impl<W: Write + Seek> PcmSink for WavWriter<W> {
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        self.write_samples(buffer)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tests::stereo_buffer;
    use std::io::Cursor;

    fn u32_at(buffer: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buffer[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn header_layout() {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()), &OutputFormat::default()).unwrap();
        writer.finish().unwrap();
        let buffer = writer.into_inner().unwrap().into_inner();

        assert_eq!(&buffer[0..4], b"RIFF");
        assert_eq!(&buffer[8..12], b"WAVE");
        assert_eq!(&buffer[12..16], b"fmt ");
        assert_eq!(&buffer[36..40], b"data");
        assert_eq!(u32_at(&buffer, 4), 36);
        assert_eq!(u32_at(&buffer, 40), 0);
        assert_eq!(buffer.len(), 44);
    }

    #[test]
    fn sizes_are_patched_on_finish() {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()), &OutputFormat::default()).unwrap();
        writer
            .write_samples(&stereo_buffer(SampleDepth::Sixteen, &[1, 2, 3], &[4, 5, 6]))
            .unwrap();
        assert_eq!(writer.stats().data_written, 12);
        writer.finish().unwrap();

        let buffer = writer.into_inner().unwrap().into_inner();
        assert_eq!(buffer.len(), 56);
        assert_eq!(u32_at(&buffer, 4), 48);
        assert_eq!(u32_at(&buffer, 40), 12);
        assert_eq!(&buffer[44..48], &[1, 0, 4, 0]);
    }

    #[test]
    fn odd_data_size_gets_pad_byte() {
        let format = OutputFormat {
            channels: 1,
            bits_per_sample: 24,
            ..Default::default()
        };
        let samples = [7];
        let planes = [&samples[..]];
        let block = crate::structs::block::Block::new(&planes).unwrap();
        let buffer = crate::process::convert::interleave(
            &block,
            crate::process::convert::Conversion::new(24, SampleDepth::TwentyFour),
        )
        .unwrap();

        let mut writer = WavWriter::new(Cursor::new(Vec::new()), &format).unwrap();
        writer.write_samples(&buffer).unwrap();
        writer.finish().unwrap();

        let out = writer.into_inner().unwrap().into_inner();
        assert_eq!(u32_at(&out, 40), 3);
        assert_eq!(out.len(), 48);
        assert_eq!(u32_at(&out, 4), 40);
    }

    #[test]
    fn data_limit_leaves_room_for_the_pad_byte() {
        assert_eq!(MAX_DATA_BYTES, u32::MAX as u64 - 36);
        assert!(fits_data_chunk(MAX_DATA_BYTES - 1));
        // odd, so its pad byte would push the RIFF size to 2^32
        assert!(!fits_data_chunk(MAX_DATA_BYTES));
        assert!(!fits_data_chunk(MAX_DATA_BYTES + 1));

        let riff_size = RIFF_OVERHEAD + MAX_DATA_BYTES - 1;
        assert!(riff_size <= u32::MAX as u64);
    }

    #[test]
    fn writes_after_finish_fail() {
        let mut writer = WavWriter::new(Cursor::new(Vec::new()), &OutputFormat::default()).unwrap();
        writer.finish().unwrap();
        assert!(matches!(
            writer.write_samples(&stereo_buffer(SampleDepth::Sixteen, &[1], &[2])),
            Err(SinkError::Closed)
        ));
    }

    #[test]
    fn create_reports_unopenable_path() {
        let result = WavWriter::create(
            "/nonexistent-directory/for/flacpcm/out.wav",
            &OutputFormat::default(),
        );
        assert!(matches!(result, Err(SinkError::Open { .. })));
    }
}
