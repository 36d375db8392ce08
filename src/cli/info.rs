use anyhow::Result;
use flacpcm::engine::StreamInfo;
use flacpcm::engine::flac::read_info;
use indicatif::MultiProgress;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use crate::timestamp::time_str;

pub fn cmd_info(args: &InfoArgs, _cli: &Cli, _multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing FLAC stream: {}", args.input.display());

    let info = read_info(InputReader::new(&args.input)?)?;
    display_stream_info(&info);

    Ok(())
}

fn display_stream_info(info: &StreamInfo) {
    println!();
    println!("FLAC Stream Information");
    println!("=======================");
    println!();
    for (label, value) in stream_info_lines(info) {
        println!("  {label:<26}{value}");
    }
    println!();
}

fn stream_info_lines(info: &StreamInfo) -> Vec<(&'static str, String)> {
    let mut lines = vec![
        ("Sampling rate", format!("{} Hz", info.sample_rate)),
        ("Channels", info.channels.to_string()),
        ("Bits per sample", info.bits_per_sample.to_string()),
        (
            "Block size",
            if info.min_block_size == info.max_block_size {
                format!("{} samples", info.max_block_size)
            } else {
                format!(
                    "{}-{} samples",
                    info.min_block_size, info.max_block_size
                )
            },
        ),
    ];

    match (info.total_samples, info.duration_secs()) {
        (Some(total), Some(duration)) => {
            lines.push(("Total samples", total.to_string()));
            lines.push(("Duration", time_str(duration)));
        }
        _ => lines.push(("Total samples", "unknown".to_string())),
    }

    let md5 = if info.md5 == [0; 16] {
        "not set".to_string()
    } else {
        info.md5_hex()
    };
    lines.push(("MD5 signature", md5));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO16: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/stereo16.flac");

    #[test]
    fn describes_fixture() {
        let info = read_info(InputReader::new(STEREO16).unwrap()).unwrap();
        let lines = stream_info_lines(&info);

        assert!(lines.contains(&("Sampling rate", "44100 Hz".to_string())));
        assert!(lines.contains(&("Channels", "2".to_string())));
        assert!(lines.contains(&("Block size", "16 samples".to_string())));
        assert!(lines.contains(&("Total samples", "32".to_string())));
        assert!(lines.contains(&("MD5 signature", "not set".to_string())));
    }
}
