use crate::structs::block::Block;
use crate::structs::format::SampleDepth;
use crate::utils::errors::ConvertError;

/// Bit-width adjustment from the stream's native depth to the target depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitScale {
    Unchanged,
    /// Left shift; the low bits are zero-filled.
    Widen(u32),
    /// Arithmetic right shift; the low bits are truncated, never rounded.
    Narrow(u32),
}

impl BitScale {
    pub fn new(source_bits: u32, target: SampleDepth) -> Self {
        let target_bits = target.bits();
        match source_bits.cmp(&target_bits) {
            std::cmp::Ordering::Equal => BitScale::Unchanged,
            std::cmp::Ordering::Less => BitScale::Widen(target_bits - source_bits),
            std::cmp::Ordering::Greater => BitScale::Narrow(source_bits - target_bits),
        }
    }

    #[inline]
    pub fn apply(self, sample: i32) -> i32 {
        match self {
            BitScale::Unchanged => sample,
            BitScale::Widen(shift) => sample << shift,
            BitScale::Narrow(shift) => sample >> shift,
        }
    }
}

/// How planar source samples map onto the target container width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub scale: BitScale,
    pub depth: SampleDepth,
}

impl Conversion {
    pub fn new(source_bits: u32, depth: SampleDepth) -> Self {
        Self {
            scale: BitScale::new(source_bits, depth),
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    I16(Vec<i16>),
    /// 24-bit values sit in the low bits of each slot.
    I32(Vec<i32>),
}

/// Interleaved samples for one block: frame-major, channel 0 first in each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavedBuffer {
    depth: SampleDepth,
    channels: usize,
    samples: Samples,
}

impl InterleavedBuffer {
    pub fn depth(&self) -> SampleDepth {
        self.depth
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total sample count, `frames * channels`.
    pub fn len(&self) -> usize {
        match &self.samples {
            Samples::I16(v) => v.len(),
            Samples::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frames(&self) -> usize {
        self.len() / self.channels
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    /// Size of the samples once written at the target width.
    pub fn byte_len(&self) -> u64 {
        self.len() as u64 * u64::from(self.depth.bytes())
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match &self.samples {
            Samples::I16(v) => Some(v),
            Samples::I32(_) => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.samples {
            Samples::I16(_) => None,
            Samples::I32(v) => Some(v),
        }
    }
}

/// Interleaves a planar block at the target depth.
///
/// The result always holds `frame_count * channel_count` samples, and sample
/// `i * channel_count + c` is channel `c`, frame `i`, scaled by `conversion`.
/// The only failure is running out of memory for the result.
pub fn interleave(
    block: &Block<'_>,
    conversion: Conversion,
) -> Result<InterleavedBuffer, ConvertError> {
    let channels = block.channel_count();
    let frames = block.frame_count();
    let alloc_error = ConvertError::Allocation { frames, channels };
    let len = frames.checked_mul(channels).ok_or(alloc_error.clone())?;
    let scale = conversion.scale;

    let samples = match conversion.depth {
        SampleDepth::Sixteen => {
            let mut out = zeroed::<i16>(len).ok_or(alloc_error)?;
            fill(&mut out, block, |sample| scale.apply(sample) as i16);
            Samples::I16(out)
        }
        SampleDepth::TwentyFour | SampleDepth::ThirtyTwo => {
            let mut out = zeroed::<i32>(len).ok_or(alloc_error)?;
            fill(&mut out, block, |sample| scale.apply(sample));
            Samples::I32(out)
        }
    };

    Ok(InterleavedBuffer {
        depth: conversion.depth,
        channels,
        samples,
    })
}

#[cfg(test)]
thread_local! {
    /// Makes every reservation on this thread fail.
    pub(crate) static FAIL_RESERVE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

fn zeroed<T: Copy + Default>(len: usize) -> Option<Vec<T>> {
    #[cfg(test)]
    {
        if FAIL_RESERVE.with(std::cell::Cell::get) {
            return None;
        }
    }

    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).ok()?;
    buffer.resize(len, T::default());
    Some(buffer)
}

fn fill<T>(out: &mut [T], block: &Block<'_>, convert: impl Fn(i32) -> T) {
    let planes = block.planes();
    // Block guarantees at least one channel, so chunk size is non-zero.
    for (frame, slots) in out.chunks_exact_mut(planes.len()).enumerate() {
        for (slot, plane) in slots.iter_mut().zip(planes) {
            *slot = convert(plane[frame]);
        }
    }
}
