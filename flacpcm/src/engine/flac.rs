use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use claxon::frame::FrameReader;
use claxon::metadata::{MetadataBlock, read_metadata_block};
use log::debug;

use super::frame::{DEFAULT_MAX_FRAME_BYTES, FrameScanner, Span};
use super::{Anomaly, AnomalyKind, BlockHandler, Completion, DecodeEngine, StreamInfo, WriteStatus};
use crate::structs::block::Block;
use crate::utils::errors::EngineError;

/// Decodes a FLAC stream block by block and pushes each block to a handler.
///
/// Metadata other than STREAMINFO is skipped and the MD5 signature is never
/// checked, so a stream whose signature does not match still transcodes.
/// Frame CRCs are enforced by `claxon`. A frame that fails them is reported
/// through [`BlockHandler::on_error`] and decoding resumes at the next frame
/// header. Only a stream cut off inside its last frame ends the loop early.
///
/// # Example
///
/// ```rust,no_run
/// use flacpcm::engine::{Anomaly, BlockHandler, DecodeEngine, WriteStatus};
/// use flacpcm::engine::flac::FlacEngine;
/// use flacpcm::structs::block::Block;
///
/// struct Count(usize);
///
/// impl BlockHandler for Count {
///     fn on_block(&mut self, block: &Block<'_>) -> WriteStatus {
///         self.0 += block.frame_count();
///         WriteStatus::Continue
///     }
///
///     fn on_error(&mut self, anomaly: &Anomaly) {
///         eprintln!("{anomaly}");
///     }
/// }
///
/// let mut engine = FlacEngine::open("input.flac")?;
/// let mut count = Count(0);
/// let completion = engine.process_until_end_of_stream(&mut count);
/// engine.finish()?;
/// println!("{completion}: {} frames", count.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FlacEngine<R: Read> {
    scanner: FrameScanner<R>,
    info: StreamInfo,
    buffer: Vec<i32>,
    blocks_decoded: u64,
    bytes_skipped: u64,
}

impl FlacEngine<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read> FlacEngine<R> {
    /// Reads the stream header from `source` and prepares for decoding.
    pub fn new(mut source: R) -> Result<Self, EngineError> {
        let header = read_stream_header(&mut source)?;
        let info = header.info;

        debug!(
            "FLAC stream: {} Hz, {} channels, {} bits, {} samples",
            info.sample_rate,
            info.channels,
            info.bits_per_sample,
            info.total_samples
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            scanner: FrameScanner::new(source, header.max_frame_bytes),
            info,
            buffer: Vec::new(),
            blocks_decoded: 0,
            bytes_skipped: 0,
        })
    }

    pub fn blocks_decoded(&self) -> u64 {
        self.blocks_decoded
    }

    fn anomaly(&self, kind: AnomalyKind, detail: String) -> Anomaly {
        Anomaly {
            kind,
            block_index: self.blocks_decoded,
            detail,
        }
    }
}

impl<R: Read> DecodeEngine for FlacEngine<R> {
    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn process_until_end_of_stream(&mut self, handler: &mut dyn BlockHandler) -> Completion {
        let mut buffer = std::mem::take(&mut self.buffer);

        loop {
            let (len, last) = match self.scanner.next_span() {
                Ok(Some(Span::Frame { len, last })) => (len, last),
                Ok(Some(Span::Unsynced(len))) => {
                    self.scanner.consume(len);
                    self.bytes_skipped += len as u64;
                    let anomaly = self.anomaly(
                        AnomalyKind::LostSync,
                        format!("skipped {len} bytes before the next frame header"),
                    );
                    handler.on_error(&anomaly);
                    continue;
                }
                Ok(None) => {
                    self.buffer = buffer;
                    return Completion::EndOfStream;
                }
                Err(e) => {
                    let anomaly = self.anomaly(AnomalyKind::UnparseableStream, e.to_string());
                    handler.on_error(&anomaly);
                    return Completion::Incomplete(anomaly);
                }
            };

            let mut frames = FrameReader::new(Cursor::new(&self.scanner.pending()[..len]));
            let decoded = frames.read_next_or_eof(buffer);
            let used = frames.into_inner().position() as usize;
            self.scanner.consume(len);

            let block = match decoded {
                Ok(Some(block)) => block,
                Ok(None) => {
                    let anomaly = self.anomaly(
                        AnomalyKind::Truncated,
                        "stream ends inside a frame header".to_string(),
                    );
                    handler.on_error(&anomaly);
                    return Completion::Incomplete(anomaly);
                }
                Err(e) => {
                    self.bytes_skipped += len as u64;
                    let anomaly = anomaly_from_error(&e, self.blocks_decoded);
                    handler.on_error(&anomaly);
                    if last && anomaly.kind == AnomalyKind::Truncated {
                        return Completion::Incomplete(anomaly);
                    }
                    buffer = Vec::new();
                    continue;
                }
            };

            let status = {
                let planes: Vec<&[i32]> = (0..block.channels()).map(|ch| block.channel(ch)).collect();
                match Block::new(&planes) {
                    Ok(view) => handler.on_block(&view),
                    Err(e) => {
                        let anomaly = self.anomaly(AnomalyKind::UnparseableStream, e.to_string());
                        handler.on_error(&anomaly);
                        return Completion::Incomplete(anomaly);
                    }
                }
            };

            self.blocks_decoded += 1;
            buffer = block.into_buffer();

            if status == WriteStatus::Abort {
                self.buffer = buffer;
                return Completion::Aborted;
            }

            if used < len {
                let skipped = len - used;
                self.bytes_skipped += skipped as u64;
                let anomaly = self.anomaly(
                    AnomalyKind::LostSync,
                    format!("skipped {skipped} bytes after a frame"),
                );
                handler.on_error(&anomaly);
            }
        }
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        debug!(
            "FLAC decoder finished after {} blocks, {} bytes skipped",
            self.blocks_decoded, self.bytes_skipped
        );
        self.buffer = Vec::new();
        Ok(())
    }
}

/// Reads only the stream header of a FLAC source.
pub fn read_info<R: Read>(mut source: R) -> Result<StreamInfo, EngineError> {
    Ok(read_stream_header(&mut source)?.info)
}

struct StreamHeader {
    info: StreamInfo,
    max_frame_bytes: usize,
}

/// Reads the `fLaC` marker and every metadata block, leaving `source` at the
/// first frame. Only STREAMINFO is decoded.
fn read_stream_header<R: Read>(source: &mut R) -> Result<StreamHeader, EngineError> {
    let mut marker = [0u8; 4];
    source.read_exact(&mut marker)?;
    if &marker != b"fLaC" {
        return Err(claxon::Error::FormatError("invalid stream header").into());
    }

    let mut header = None;
    loop {
        let mut block_header = [0u8; 4];
        source.read_exact(&mut block_header)?;
        let is_last = block_header[0] & 0x80 != 0;
        let block_type = block_header[0] & 0x7F;
        let length = u32::from_be_bytes([0, block_header[1], block_header[2], block_header[3]]);

        match block_type {
            0 => {
                let mut body = vec![0u8; length as usize];
                source.read_exact(&mut body)?;
                if let MetadataBlock::StreamInfo(info) =
                    read_metadata_block(&mut Cursor::new(&body[..]), block_type, length)?
                {
                    header = Some(stream_header(&info)?);
                }
            }
            127 => return Err(claxon::Error::FormatError("invalid metadata block type").into()),
            _ => {
                let skipped = io::copy(&mut source.by_ref().take(u64::from(length)), &mut io::sink())?;
                if skipped != u64::from(length) {
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
                }
            }
        }

        if is_last {
            break;
        }
    }

    header.ok_or_else(|| claxon::Error::FormatError("streaminfo block missing").into())
}

fn stream_header(info: &claxon::metadata::StreamInfo) -> Result<StreamHeader, EngineError> {
    if info.bits_per_sample == 0 || info.bits_per_sample > 32 {
        return Err(EngineError::UnsupportedSourceDepth(info.bits_per_sample));
    }

    Ok(StreamHeader {
        info: StreamInfo {
            sample_rate: info.sample_rate,
            channels: info.channels,
            bits_per_sample: info.bits_per_sample,
            total_samples: info.samples,
            min_block_size: info.min_block_size,
            max_block_size: info.max_block_size,
            md5: info.md5sum,
        },
        max_frame_bytes: info
            .max_frame_size
            .map_or(DEFAULT_MAX_FRAME_BYTES, |size| 2 * size as usize),
    })
}

fn anomaly_from_error(error: &claxon::Error, block_index: u64) -> Anomaly {
    let (kind, detail) = match error {
        claxon::Error::IoError(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            (AnomalyKind::Truncated, e.to_string())
        }
        claxon::Error::IoError(e) => (AnomalyKind::UnparseableStream, e.to_string()),
        claxon::Error::FormatError(msg) => {
            let lower = msg.to_ascii_lowercase();
            let kind = if lower.contains("crc") {
                AnomalyKind::CrcMismatch
            } else if lower.contains("sync") {
                AnomalyKind::LostSync
            } else if lower.contains("header") {
                AnomalyKind::BadHeader
            } else {
                AnomalyKind::UnparseableStream
            };
            (kind, (*msg).to_string())
        }
        claxon::Error::Unsupported(msg) => (AnomalyKind::UnparseableStream, (*msg).to_string()),
    };

    Anomaly {
        kind,
        block_index,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO16: &[u8] = include_bytes!("../../../testdata/stereo16.flac");
    const STEREO16_TRUNCATED: &[u8] = include_bytes!("../../../testdata/stereo16-truncated.flac");

    #[derive(Default)]
    struct Collect {
        planes: Vec<Vec<Vec<i32>>>,
        anomalies: Vec<Anomaly>,
        abort_after: Option<usize>,
    }

    impl BlockHandler for Collect {
        fn on_block(&mut self, block: &Block<'_>) -> WriteStatus {
            self.planes
                .push(block.planes().iter().map(|p| p.to_vec()).collect());
            match self.abort_after {
                Some(n) if self.planes.len() >= n => WriteStatus::Abort,
                _ => WriteStatus::Continue,
            }
        }

        fn on_error(&mut self, anomaly: &Anomaly) {
            self.anomalies.push(anomaly.clone());
        }
    }

    fn expected_left(frame: i32) -> Vec<i32> {
        (0..16).map(|i| (frame * 16 + i) * 100 - 1600).collect()
    }

    fn expected_right(frame: i32) -> Vec<i32> {
        (0..16).map(|i| -(frame * 16 + i) * 37 + 5).collect()
    }

    #[test]
    fn reports_stream_info() {
        let engine = FlacEngine::new(STEREO16).unwrap();
        let info = engine.stream_info();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.total_samples, Some(32));
        assert_eq!(info.min_block_size, 16);
        assert_eq!(info.max_block_size, 16);
    }

    #[test]
    fn reads_header_only() {
        let info = read_info(STEREO16).unwrap();
        assert_eq!(info.channels, 2);
        assert_eq!(info.md5_hex(), "0".repeat(32));
    }

    #[test]
    fn delivers_blocks_in_stream_order() {
        let mut engine = FlacEngine::new(STEREO16).unwrap();
        let mut collect = Collect::default();

        let completion = engine.process_until_end_of_stream(&mut collect);
        engine.finish().unwrap();

        assert_eq!(completion, Completion::EndOfStream);
        assert!(collect.anomalies.is_empty());
        assert_eq!(engine.blocks_decoded(), 2);
        assert_eq!(
            collect.planes,
            vec![
                vec![expected_left(0), expected_right(0)],
                vec![expected_left(1), expected_right(1)],
            ]
        );
    }

    #[test]
    fn abort_stops_the_loop() {
        let mut engine = FlacEngine::new(STEREO16).unwrap();
        let mut collect = Collect {
            abort_after: Some(1),
            ..Default::default()
        };

        assert_eq!(
            engine.process_until_end_of_stream(&mut collect),
            Completion::Aborted
        );
        assert_eq!(collect.planes.len(), 1);
    }

    #[test]
    fn truncated_stream_reports_once_and_stops() {
        let mut engine = FlacEngine::new(STEREO16_TRUNCATED).unwrap();
        let mut collect = Collect::default();

        let completion = engine.process_until_end_of_stream(&mut collect);

        assert!(matches!(completion, Completion::Incomplete(_)));
        assert_eq!(collect.anomalies.len(), 1);
        assert_eq!(collect.anomalies[0].block_index, 1);
        assert_eq!(collect.planes, vec![vec![expected_left(0), expected_right(0)]]);
    }

    #[test]
    fn corrupt_frame_is_reported_and_skipped() {
        let mut data = STEREO16.to_vec();
        data[0x40] ^= 0xFF;

        let mut engine = FlacEngine::new(&data[..]).unwrap();
        let mut collect = Collect::default();
        let completion = engine.process_until_end_of_stream(&mut collect);

        assert_eq!(completion, Completion::EndOfStream);
        assert_eq!(collect.anomalies.len(), 1);
        assert_eq!(collect.anomalies[0].kind, AnomalyKind::CrcMismatch);
        assert_eq!(collect.anomalies[0].block_index, 0);
        assert_eq!(collect.planes, vec![vec![expected_left(1), expected_right(1)]]);
    }

    #[test]
    fn garbage_between_frames_loses_sync_once() {
        let frame1 = 42 + 75;
        let mut data = STEREO16[..frame1].to_vec();
        data.extend_from_slice(&[0xFF, 0x00, 0x42, 0x42]);
        data.extend_from_slice(&STEREO16[frame1..]);

        let mut engine = FlacEngine::new(&data[..]).unwrap();
        let mut collect = Collect::default();
        let completion = engine.process_until_end_of_stream(&mut collect);

        assert_eq!(completion, Completion::EndOfStream);
        assert_eq!(collect.anomalies.len(), 1);
        assert_eq!(collect.anomalies[0].kind, AnomalyKind::LostSync);
        assert_eq!(collect.planes.len(), 2);
        assert_eq!(collect.planes[1], vec![expected_left(1), expected_right(1)]);
    }

    #[test]
    fn skips_non_streaminfo_metadata() {
        let mut data = STEREO16[..4].to_vec();
        // STREAMINFO without its last-block flag, then a 5-byte padding block
        data.push(STEREO16[4] & 0x7F);
        data.extend_from_slice(&STEREO16[5..42]);
        data.extend_from_slice(&[0x81, 0, 0, 5, 0, 0, 0, 0, 0]);
        data.extend_from_slice(&STEREO16[42..]);

        let mut engine = FlacEngine::new(&data[..]).unwrap();
        let mut collect = Collect::default();

        assert_eq!(
            engine.process_until_end_of_stream(&mut collect),
            Completion::EndOfStream
        );
        assert!(collect.anomalies.is_empty());
        assert_eq!(collect.planes.len(), 2);
    }

    #[test]
    fn rejects_non_flac_input() {
        assert!(matches!(
            FlacEngine::new(&b"RIFF\0\0\0\0WAVE"[..]),
            Err(EngineError::Flac(_))
        ));
    }
}
