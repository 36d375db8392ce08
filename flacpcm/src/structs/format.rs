use std::fmt::Display;

use crate::utils::errors::FormatError;

/// Largest channel count a FLAC stream can carry.
pub const MAX_CHANNELS: u16 = 8;

/// Largest sample rate a FLAC stream can signal.
pub const MAX_SAMPLE_RATE: u32 = 655_350;

/// Target sample width of the interleaved output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleDepth {
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl SampleDepth {
    pub fn bits(self) -> u32 {
        match self {
            SampleDepth::Sixteen => 16,
            SampleDepth::TwentyFour => 24,
            SampleDepth::ThirtyTwo => 32,
        }
    }

    /// Bytes per sample in the container.
    pub fn bytes(self) -> u32 {
        self.bits() / 8
    }
}

impl TryFrom<u16> for SampleDepth {
    type Error = FormatError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(SampleDepth::Sixteen),
            24 => Ok(SampleDepth::TwentyFour),
            32 => Ok(SampleDepth::ThirtyTwo),
            other => Err(FormatError::UnsupportedBitDepth(other)),
        }
    }
}

impl Display for SampleDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// RIFF WAVE, PCM format tag.
    Wav,
    /// Sony Wave64.
    W64,
    /// Headerless little-endian PCM.
    Pcm,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Container::Wav | Container::W64 => "wav",
            Container::Pcm => "pcm",
        }
    }
}

impl Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Wav => write!(f, "WAV"),
            Container::W64 => write!(f, "W64"),
            Container::Pcm => write!(f, "raw PCM"),
        }
    }
}

/// Output format descriptor, fixed for a whole session.
///
/// Fields hold the requested values as given; [`OutputFormat::validate`]
/// decides whether the combination can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub container: Container,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            container: Container::Wav,
        }
    }
}

impl OutputFormat {
    /// Checks every field and returns the target sample depth.
    pub fn validate(&self) -> Result<SampleDepth, FormatError> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(FormatError::UnsupportedChannels {
                actual: self.channels,
                max: MAX_CHANNELS,
            });
        }

        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(FormatError::InvalidSampleRate {
                actual: self.sample_rate,
                max: MAX_SAMPLE_RATE,
            });
        }

        SampleDepth::try_from(self.bits_per_sample)
    }

    /// Bytes per interleaved frame. Only meaningful for a valid format.
    pub fn block_align(&self) -> u32 {
        u32::from(self.channels) * u32::from(self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align()
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}ch {} Hz {}-bit",
            self.container, self.channels, self.sample_rate, self.bits_per_sample
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_cd_stereo_wav() {
        let format = OutputFormat::default();
        assert_eq!(format.validate(), Ok(SampleDepth::Sixteen));
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), 176_400);
    }

    #[test]
    fn rejects_bad_channel_counts() {
        for channels in [0, 9] {
            let format = OutputFormat {
                channels,
                ..Default::default()
            };
            assert!(matches!(
                format.validate(),
                Err(FormatError::UnsupportedChannels { .. })
            ));
        }
    }

    #[test]
    fn rejects_bad_sample_rates() {
        for sample_rate in [0, MAX_SAMPLE_RATE + 1] {
            let format = OutputFormat {
                sample_rate,
                ..Default::default()
            };
            assert!(matches!(
                format.validate(),
                Err(FormatError::InvalidSampleRate { .. })
            ));
        }
    }

    #[test]
    fn accepts_only_container_depths() {
        for (bits, depth) in [
            (16, SampleDepth::Sixteen),
            (24, SampleDepth::TwentyFour),
            (32, SampleDepth::ThirtyTwo),
        ] {
            let format = OutputFormat {
                bits_per_sample: bits,
                ..Default::default()
            };
            assert_eq!(format.validate(), Ok(depth));
        }

        let format = OutputFormat {
            bits_per_sample: 20,
            ..Default::default()
        };
        assert_eq!(
            format.validate(),
            Err(FormatError::UnsupportedBitDepth(20))
        );
    }
}
