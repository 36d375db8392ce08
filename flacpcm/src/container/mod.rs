//! Output sinks for interleaved PCM.
//!
//! Every writer takes [`InterleavedBuffer`]s one block at a time and writes
//! them little-endian at the descriptor's bit depth:
//!
//! - **RIFF WAV** ([`wav::WavWriter`]): 32-bit chunk sizes, patched on close
//! - **Sony Wave64** ([`w64::W64Writer`]): GUID chunk ids, 64-bit sizes
//! - **Raw PCM** ([`raw::RawPcmWriter`]): samples only

use std::io::{self, Write};

use flacpcm_macros::{ToBytes, riff_chunk};

use crate::byteorder::{WriteBytesLe, write_packed_24_le};
use crate::process::convert::{InterleavedBuffer, Samples};
use crate::structs::format::{OutputFormat, SampleDepth};
use crate::utils::errors::SinkError;

pub mod raw;
pub mod w64;
pub mod wav;

/// WAVE_FORMAT_PCM.
pub const FORMAT_TAG_PCM: u16 = 1;

/// Consumer of interleaved blocks.
pub trait PcmSink {
    /// Writes one block's samples. An empty buffer is accepted and writes nothing.
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError>;

    /// Flushes buffered data and completes the container. Further writes fail.
    fn close(&mut self) -> Result<(), SinkError>;
}

impl<S: PcmSink + ?Sized> PcmSink for Box<S> {
    fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
        (**self).write_block(buffer)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}

pub trait RiffChunk {
    fn chunk_id(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    /// Writes id, 32-bit size and body, plus the pad byte for odd sizes.
    fn write_all<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let data = self.chunk_data();
        writer.write_all(self.chunk_id())?;
        writer.write_all(&(data.len() as u32).to_le_bytes())?;
        writer.write_all(&data)?;
        if data.len() % 2 == 1 {
            writer.write_all(&[0])?;
        }
        Ok(())
    }
}

/// Body of the `fmt ` chunk for integer PCM, shared by WAV and W64.
#[derive(Debug, Clone, PartialEq, Eq, ToBytes)]
#[riff_chunk(b"fmt ")]
pub struct FmtChunk {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FmtChunk {
    pub const SIZE: u64 = 16;

    pub fn pcm(format: &OutputFormat) -> Self {
        Self {
            format_tag: FORMAT_TAG_PCM,
            channels: format.channels,
            sample_rate: format.sample_rate,
            byte_rate: format.byte_rate(),
            block_align: format.block_align() as u16,
            bits_per_sample: format.bits_per_sample,
        }
    }
}

/// Rejects buffers that do not match the sink's format.
pub(crate) fn check_buffer(
    format: &OutputFormat,
    depth: SampleDepth,
    buffer: &InterleavedBuffer,
) -> Result<(), SinkError> {
    if buffer.channels() != usize::from(format.channels) {
        return Err(SinkError::ChannelMismatch {
            expected: usize::from(format.channels),
            actual: buffer.channels(),
        });
    }
    if buffer.depth() != depth {
        return Err(SinkError::DepthMismatch {
            expected: depth.bits(),
            actual: buffer.depth().bits(),
        });
    }
    Ok(())
}

/// Writes samples little-endian; 24-bit samples take three bytes.
pub(crate) fn write_samples<W: Write>(writer: &mut W, buffer: &InterleavedBuffer) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(buffer.byte_len() as usize);
    match (buffer.samples(), buffer.depth()) {
        (Samples::I16(samples), _) => samples.write_le(&mut bytes),
        (Samples::I32(samples), SampleDepth::TwentyFour) => write_packed_24_le(samples, &mut bytes),
        (Samples::I32(samples), _) => samples.write_le(&mut bytes),
    }
    writer.write_all(&bytes)
}

/// Summary of what a writer has produced so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkStats {
    pub data_written: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::process::convert::{Conversion, interleave};
    use crate::structs::block::Block;

    pub(crate) fn stereo_buffer(depth: SampleDepth, left: &[i32], right: &[i32]) -> InterleavedBuffer {
        let planes = [left, right];
        let block = Block::new(&planes).unwrap();
        interleave(&block, Conversion::new(depth.bits(), depth)).unwrap()
    }

    #[test]
    fn fmt_chunk_layout() {
        let fmt = FmtChunk::pcm(&OutputFormat::default());
        let mut out = Vec::new();
        fmt.write_all(&mut out).unwrap();

        assert_eq!(&out[0..4], b"fmt ");
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 16);
        assert_eq!(&out[8..10], &1u16.to_le_bytes());
        assert_eq!(&out[10..12], &2u16.to_le_bytes());
        assert_eq!(&out[12..16], &44100u32.to_le_bytes());
        assert_eq!(&out[16..20], &176_400u32.to_le_bytes());
        assert_eq!(&out[20..22], &4u16.to_le_bytes());
        assert_eq!(&out[22..24], &16u16.to_le_bytes());
        assert_eq!(out.len(), 24);
    }

    #[test]
    fn sample_bytes_follow_depth() {
        let mut out = Vec::new();
        write_samples(&mut out, &stereo_buffer(SampleDepth::Sixteen, &[1], &[-2])).unwrap();
        assert_eq!(out, vec![0x01, 0x00, 0xFE, 0xFF]);

        let mut out = Vec::new();
        write_samples(
            &mut out,
            &stereo_buffer(SampleDepth::TwentyFour, &[0x123456], &[-1]),
        )
        .unwrap();
        assert_eq!(out, vec![0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF]);

        let mut out = Vec::new();
        write_samples(&mut out, &stereo_buffer(SampleDepth::ThirtyTwo, &[1], &[-1])).unwrap();
        assert_eq!(out, vec![1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let format = OutputFormat::default();
        let mono = {
            let samples = [1, 2];
            let planes = [&samples[..]];
            let block = Block::new(&planes).unwrap();
            interleave(&block, Conversion::new(16, SampleDepth::Sixteen)).unwrap()
        };
        assert!(matches!(
            check_buffer(&format, SampleDepth::Sixteen, &mono),
            Err(SinkError::ChannelMismatch {
                expected: 2,
                actual: 1
            })
        ));

        let wide = stereo_buffer(SampleDepth::ThirtyTwo, &[1], &[2]);
        assert!(matches!(
            check_buffer(&format, SampleDepth::Sixteen, &wide),
            Err(SinkError::DepthMismatch { .. })
        ));
    }
}
