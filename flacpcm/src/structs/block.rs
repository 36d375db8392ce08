use crate::utils::errors::BlockError;

/// One decoded block in planar layout, borrowed from the decoding engine.
///
/// The borrow ends with the callback that received it, so the block can
/// never outlive the engine's frame buffer.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    planes: &'a [&'a [i32]],
    frames: usize,
}

impl<'a> Block<'a> {
    /// Wraps per-channel sample slices. Every slice must hold the same
    /// number of frames; zero frames is valid.
    pub fn new(planes: &'a [&'a [i32]]) -> Result<Self, BlockError> {
        let first = planes.first().ok_or(BlockError::NoChannels)?;
        let frames = first.len();

        if let Some((channel, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, plane)| plane.len() != frames)
        {
            return Err(BlockError::ChannelLengthMismatch {
                channel,
                expected: frames,
                actual: plane.len(),
            });
        }

        Ok(Self { planes, frames })
    }

    pub fn channel_count(&self) -> usize {
        self.planes.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &'a [i32] {
        self.planes[index]
    }

    pub fn planes(&self) -> &'a [&'a [i32]] {
        self.planes
    }
}
