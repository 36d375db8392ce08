use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use flacpcm::structs::format::OutputFormat;
use serde::Deserialize;

use crate::cli::command::{ContainerArg, TranscodeArgs};

/// Output format defaults loaded from YAML. Every field is optional.
///
/// ```yaml
/// channels: 2
/// sample_rate: 48000
/// bits_per_sample: 24
/// container: w64
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    #[serde(alias = "bits")]
    pub bits_per_sample: Option<u16>,
    pub container: Option<ContainerArg>,
}

impl FormatConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserialises to unit, not to a map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }
}

/// Command-line flags win over the config file, which wins over the defaults.
pub fn resolve_format(args: &TranscodeArgs, config: Option<&FormatConfig>) -> OutputFormat {
    let defaults = OutputFormat::default();
    let config = config.cloned().unwrap_or_default();

    OutputFormat {
        channels: args
            .channels
            .or(config.channels)
            .unwrap_or(defaults.channels),
        sample_rate: args
            .sample_rate
            .or(config.sample_rate)
            .unwrap_or(defaults.sample_rate),
        bits_per_sample: args
            .bits
            .or(config.bits_per_sample)
            .unwrap_or(defaults.bits_per_sample),
        container: args
            .container
            .or(config.container)
            .map(Into::into)
            .unwrap_or(defaults.container),
    }
}
