//! Frame boundary detection over a raw FLAC frame stream.
//!
//! FLAC frames carry no length field. A frame is taken to end where the CRC-16
//! over everything since its header becomes zero and a plausible frame header
//! follows (or the stream ends). Bytes that do not start a plausible header are
//! handed back as an unsynchronised span so the caller can report and skip them.

use std::io::{self, Read};

use crate::utils::crc::{CRC_FRAME_ALG, CRC_FRAME_HEADER_ALG, Crc8, Crc16};

const CRC8: Crc8 = Crc8::new(&CRC_FRAME_HEADER_ALG);
const CRC16: Crc16 = Crc16::new(&CRC_FRAME_ALG);

const READ_CHUNK: usize = 16 * 1024;

/// Upper bound on a frame when STREAMINFO does not record one: 65535 samples of
/// eight 32-bit verbatim channels plus header and footer.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 65535 * 8 * 4 + 64;

/// Outcome of checking for a frame header at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderCheck {
    Valid(usize),
    Invalid,
    /// More bytes are needed to decide.
    Incomplete,
}

/// A run of bytes at the front of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// Starts with a frame header. `last` is set when the span runs to the end
    /// of the stream without its CRC checking out.
    Frame { len: usize, last: bool },
    /// Bytes before the next plausible frame header.
    Unsynced(usize),
}

pub struct FrameScanner<R: Read> {
    source: R,
    pending: Vec<u8>,
    eof: bool,
    max_frame_bytes: usize,
}

impl<R: Read> FrameScanner<R> {
    pub fn new(source: R, max_frame_bytes: usize) -> Self {
        Self {
            source,
            pending: Vec::with_capacity(READ_CHUNK),
            eof: false,
            max_frame_bytes,
        }
    }

    /// Bytes read from the source and not yet consumed.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn consume(&mut self, len: usize) {
        self.pending.drain(..len.min(self.pending.len()));
    }

    /// Locates the next span. Returns `None` once the stream is exhausted.
    pub fn next_span(&mut self) -> io::Result<Option<Span>> {
        if self.pending.is_empty() && !self.fill()? {
            return Ok(None);
        }

        let span = match self.header_at(0)? {
            HeaderCheck::Valid(header_len) => self.frame_span(header_len)?,
            HeaderCheck::Incomplete => Span::Frame {
                len: self.pending.len(),
                last: true,
            },
            HeaderCheck::Invalid => Span::Unsynced(self.find_header(1)?),
        };

        Ok(Some(span))
    }

    /// Appends one read from the source. Returns false at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        let start = self.pending.len();
        self.pending.resize(start + READ_CHUNK, 0);
        let read = loop {
            match self.source.read(&mut self.pending[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pending.truncate(start);
                    return Err(e);
                }
            }
        };
        self.pending.truncate(start + read);

        if read == 0 {
            self.eof = true;
        }
        Ok(read > 0)
    }

    fn header_at(&mut self, pos: usize) -> io::Result<HeaderCheck> {
        loop {
            let check = check_header(self.pending.get(pos..).unwrap_or_default());
            if check != HeaderCheck::Incomplete || !self.fill()? {
                return Ok(check);
            }
        }
    }

    /// Scans forward from `from` for a plausible header and returns its offset.
    fn find_header(&mut self, from: usize) -> io::Result<usize> {
        let mut pos = from;
        loop {
            if pos >= self.pending.len() && !self.fill()? {
                return Ok(self.pending.len());
            }
            if pos >= self.max_frame_bytes {
                return Ok(pos);
            }
            if self.pending[pos] == 0xFF && self.header_at(pos)? != HeaderCheck::Invalid {
                return Ok(pos);
            }
            pos += 1;
        }
    }

    fn frame_span(&mut self, header_len: usize) -> io::Result<Span> {
        let mut crc = CRC16.checksum(&self.pending[..header_len]);
        let mut pos = header_len;
        // first plausible header after this one, whatever the CRC says
        let mut next_header = None;

        loop {
            if pos >= self.pending.len() && !self.fill()? {
                return Ok(match next_header {
                    Some(len) if crc != 0 => Span::Frame { len, last: false },
                    _ => Span::Frame {
                        len: pos,
                        last: crc != 0,
                    },
                });
            }

            if self.pending[pos] == 0xFF && matches!(self.header_at(pos)?, HeaderCheck::Valid(_)) {
                if crc == 0 {
                    return Ok(Span::Frame {
                        len: pos,
                        last: false,
                    });
                }
                next_header.get_or_insert(pos);
            }

            if pos >= self.max_frame_bytes {
                return Ok(Span::Frame {
                    len: next_header.unwrap_or(pos),
                    last: false,
                });
            }

            crc = CRC16.update_byte(crc, self.pending[pos]);
            pos += 1;
        }
    }
}

/// Checks whether `bytes` starts with a frame header whose CRC-8 matches.
fn check_header(bytes: &[u8]) -> HeaderCheck {
    use HeaderCheck::*;

    match bytes {
        [] | [0xFF] => return Incomplete,
        [b0, ..] if *b0 != 0xFF => return Invalid,
        [_, b1, ..] if b1 & 0xFE != 0xF8 => return Invalid,
        [_, _] | [_, _, _] => return Incomplete,
        _ => {}
    }

    let block_size_code = bytes[2] >> 4;
    let sample_rate_code = bytes[2] & 0x0F;
    if block_size_code == 0 || sample_rate_code == 0x0F {
        return Invalid;
    }

    let channel_code = bytes[3] >> 4;
    let depth_code = (bytes[3] >> 1) & 0x07;
    if channel_code > 0b1010 || depth_code == 0b011 || depth_code == 0b111 || bytes[3] & 1 != 0 {
        return Invalid;
    }

    let Some(&lead) = bytes.get(4) else {
        return Incomplete;
    };
    let continuation = match lead {
        0x00..=0x7F => 0,
        0xC0..=0xDF => 1,
        0xE0..=0xEF => 2,
        0xF0..=0xF7 => 3,
        0xF8..=0xFB => 4,
        0xFC..=0xFD => 5,
        0xFE => 6,
        _ => return Invalid,
    };
    let mut len = 5 + continuation;
    if bytes[5..bytes.len().min(len)]
        .iter()
        .any(|b| b & 0xC0 != 0x80)
    {
        return Invalid;
    }

    len += match block_size_code {
        0b0110 => 1,
        0b0111 => 2,
        _ => 0,
    };
    len += match sample_rate_code {
        0b1100 => 1,
        0b1101 | 0b1110 => 2,
        _ => 0,
    };

    match bytes.get(len) {
        None => Incomplete,
        Some(&crc) if CRC8.checksum(&bytes[..len]) == crc => Valid(len + 1),
        Some(_) => Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO16: &[u8] = include_bytes!("../../../testdata/stereo16.flac");
    const FRAMES: usize = 42;
    const FRAME_LEN: usize = 75;

    fn spans(data: &[u8]) -> Vec<Span> {
        let mut scanner = FrameScanner::new(data, DEFAULT_MAX_FRAME_BYTES);
        let mut spans = Vec::new();
        while let Some(span) = scanner.next_span().unwrap() {
            let len = match span {
                Span::Frame { len, .. } | Span::Unsynced(len) => len,
            };
            scanner.consume(len);
            spans.push(span);
        }
        spans
    }

    #[test]
    fn recognises_fixture_header() {
        assert_eq!(check_header(&STEREO16[FRAMES..]), HeaderCheck::Valid(7));
        assert_eq!(check_header(&STEREO16[FRAMES..FRAMES + 5]), HeaderCheck::Incomplete);
        assert_eq!(check_header(&STEREO16[FRAMES + 1..]), HeaderCheck::Invalid);

        let mut header = STEREO16[FRAMES..FRAMES + 7].to_vec();
        header[6] ^= 1;
        assert_eq!(check_header(&header), HeaderCheck::Invalid);
    }

    #[test]
    fn splits_frames_on_crc() {
        assert_eq!(
            spans(&STEREO16[FRAMES..]),
            vec![
                Span::Frame {
                    len: FRAME_LEN,
                    last: false
                },
                Span::Frame {
                    len: FRAME_LEN,
                    last: false
                },
            ]
        );
    }

    #[test]
    fn corrupt_frame_ends_at_next_header() {
        let mut data = STEREO16[FRAMES..].to_vec();
        data[20] ^= 0xFF;

        assert_eq!(
            spans(&data),
            vec![
                Span::Frame {
                    len: FRAME_LEN,
                    last: false
                },
                Span::Frame {
                    len: FRAME_LEN,
                    last: false
                },
            ]
        );
    }

    #[test]
    fn leading_garbage_is_unsynced() {
        let mut data = vec![0x00, 0xFF, 0x12];
        data.extend_from_slice(&STEREO16[FRAMES..]);

        assert_eq!(spans(&data)[0], Span::Unsynced(3));
        assert_eq!(spans(&data).len(), 3);
    }

    #[test]
    fn cut_frame_is_last() {
        let data = &STEREO16[FRAMES..STEREO16.len() - 20];

        assert_eq!(
            spans(data),
            vec![
                Span::Frame {
                    len: FRAME_LEN,
                    last: false
                },
                Span::Frame {
                    len: FRAME_LEN - 20,
                    last: true
                },
            ]
        );
    }
}
