use std::time::Instant;

use anyhow::Result;
use flacpcm::engine::flac::FlacEngine;
use flacpcm::process::session::{Session, SessionPolicy};
use indicatif::MultiProgress;

use super::output::{AudioWriter, create_path_with_extension};
use super::progress::{
    ProgressSink, create_progress_bar, estimate_total_samples, finalize_progress_bar,
};
use crate::cli::command::{Cli, TranscodeArgs};
use crate::config::{FormatConfig, resolve_format};
use crate::input::{InputReader, is_pipe};

pub fn cmd_transcode(args: &TranscodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let config = args
        .config
        .as_deref()
        .map(FormatConfig::load)
        .transpose()?;
    let format = resolve_format(args, config.as_ref());
    let output_path = create_path_with_extension(&args.output, format.container.extension());

    let policy = if cli.strict {
        SessionPolicy::strict()
    } else {
        SessionPolicy::default()
    };

    // Estimating the length opens the input a second time, which a pipe cannot do.
    let total_samples = match multi {
        Some(_) if !is_pipe(&args.input) => match estimate_total_samples(&args.input) {
            Ok(total) => total,
            Err(e) => {
                log::warn!("Progress estimation failed: {e}");
                None
            }
        },
        _ => None,
    };
    let pb = multi
        .map(|multi| create_progress_bar(multi, total_samples))
        .transpose()?;

    log::info!(
        "Transcoding {} to {}",
        args.input.display(),
        output_path.display()
    );
    let start_time = Instant::now();

    let mut session = Session::new(args.input.display().to_string(), format).with_policy(policy);
    let result = session.run(
        |format| {
            let writer = AudioWriter::create(&output_path, format)?;
            Ok(ProgressSink::new(
                writer,
                pb.clone(),
                format.sample_rate,
                start_time,
            ))
        },
        || FlacEngine::new(InputReader::new(&args.input)?),
    );

    match result {
        Ok(report) => {
            finalize_progress_bar(
                &pb,
                total_samples,
                report.stats.frames,
                report.format.sample_rate,
                start_time,
            );
            log::info!("Transcoding completed successfully");
            Ok(())
        }
        Err(e) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("transcode failed");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command::Action;
    use clap::Parser;
    use flacpcm::utils::errors::{SinkError, TranscodeError};

    const STEREO16: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/stereo16.flac");
    const TRUNCATED: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/stereo16-truncated.flac"
    );

    fn run(argv: &[&str]) -> Result<()> {
        let cli = Cli::try_parse_from(argv)?;
        match cli.action()? {
            Action::Transcode(args) => cmd_transcode(args, &cli, None),
            Action::Info(_) => unreachable!(),
        }
    }

    #[test]
    fn transcodes_fixture_to_wav() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        run(&["flacpcmd", "transcode", STEREO16, out.to_str().unwrap()]).unwrap();

        let bytes = std::fs::read(dir.path().join("out.wav")).unwrap();
        assert_eq!(bytes.len(), 44 + 32 * 2 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
    }

    #[test]
    fn bare_form_transcodes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bare.wav");

        run(&["flacpcmd", STEREO16, out.to_str().unwrap()]).unwrap();

        assert_eq!(std::fs::metadata(&out).unwrap().len(), 44 + 32 * 2 * 2);
    }

    #[test]
    fn thirty_two_bit_raw_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pcm");

        run(&[
            "flacpcmd",
            "transcode",
            STEREO16,
            out.to_str().unwrap(),
            "--bits",
            "32",
            "--container",
            "pcm",
        ])
        .unwrap();

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(bytes.len(), 32 * 2 * 4);
        // frame 0 left is -1600, shifted into the top half
        assert_eq!(
            i32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            -1600 << 16
        );
    }

    #[test]
    fn truncated_input_fails_only_when_strict() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("partial.wav");
        let out = out.to_str().unwrap();

        run(&["flacpcmd", "transcode", TRUNCATED, out]).unwrap();
        assert!(std::fs::metadata(out).unwrap().len() > 44);

        let err = run(&["flacpcmd", "--strict", "transcode", TRUNCATED, out]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TranscodeError>(),
            Some(TranscodeError::Incomplete { .. })
        ));
    }

    #[test]
    fn unopenable_output_is_an_error() {
        let err = run(&[
            "flacpcmd",
            "transcode",
            STEREO16,
            "/nonexistent-directory/for/flacpcm/out.wav",
        ])
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TranscodeError>(),
            Some(TranscodeError::SinkOpen(SinkError::Open { .. }))
        ));
    }

    #[test]
    fn channel_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mono.wav");

        let err = run(&[
            "flacpcmd",
            "transcode",
            STEREO16,
            out.to_str().unwrap(),
            "--channels",
            "1",
        ])
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TranscodeError>(),
            Some(TranscodeError::ChannelCountMismatch { .. })
        ));
    }
}
