use std::fmt::Display;

use log::{debug, info, warn};

use super::convert::Conversion;
use super::report::ErrorReporter;
use super::step::{BlockTranscoder, TranscodeStats};
use crate::container::PcmSink;
use crate::engine::{Anomaly, Completion, DecodeEngine, StreamInfo};
use crate::log_or_err;
use crate::structs::format::OutputFormat;
use crate::utils::errors::{EngineError, SinkError, TranscodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Validating,
    Opening,
    Decoding,
    Finalizing,
    Closed,
    Failed,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Validating => "validating",
            SessionState::Opening => "opening",
            SessionState::Decoding => "decoding",
            SessionState::Finalizing => "finalizing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Decides which non-fatal conditions end a session.
///
/// Conditions are raised at [`log::Level::Warn`]; they are only logged unless
/// `fail_level` is at least as verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub fail_level: log::Level,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
        }
    }
}

impl SessionPolicy {
    /// Incomplete streams and decoder anomalies become fatal.
    pub fn strict() -> Self {
        Self {
            fail_level: log::Level::Warn,
        }
    }
}

/// Outcome of a session that reached [`SessionState::Closed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub stream: StreamInfo,
    pub format: OutputFormat,
    pub stats: TranscodeStats,
    pub completion: Completion,
    pub anomalies: Vec<Anomaly>,
}

impl SessionReport {
    /// Seconds of audio written, at the output sample rate.
    pub fn duration_secs(&self) -> f64 {
        self.stats.frames as f64 / f64::from(self.format.sample_rate.max(1))
    }
}

/// One input, one sink, one output format.
///
/// ```text
/// Idle -> Validating -> Opening -> Decoding -> Finalizing -> Closed
///              \            \          \            \
///               +------------+----------+------------+--> Failed
/// ```
///
/// Whatever was acquired before a failure is released before [`Session::run`]
/// returns: the engine is finished and the sink closed, errors from either
/// are logged and dropped.
#[derive(Debug)]
pub struct Session {
    input: String,
    format: OutputFormat,
    policy: SessionPolicy,
    state: SessionState,
    history: Vec<SessionState>,
}

impl Session {
    pub fn new(input: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            input: input.into(),
            format,
            policy: SessionPolicy::default(),
            state: SessionState::Idle,
            history: vec![SessionState::Idle],
        }
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every state visited by the last run, starting with `Idle`.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// Runs the session to completion.
    ///
    /// The format is validated before either opener is called, and the sink
    /// is opened before the engine, so neither a bad format nor an
    /// unopenable output touches the input.
    pub fn run<S, E, FS, FE>(
        &mut self,
        open_sink: FS,
        open_engine: FE,
    ) -> Result<SessionReport, TranscodeError>
    where
        S: PcmSink,
        E: DecodeEngine,
        FS: FnOnce(&OutputFormat) -> Result<S, SinkError>,
        FE: FnOnce() -> Result<E, EngineError>,
    {
        self.state = SessionState::Idle;
        self.history = vec![SessionState::Idle];

        self.enter(SessionState::Validating);
        let depth = match self.format.validate() {
            Ok(depth) => depth,
            Err(e) => return self.fail(e.into()),
        };

        self.enter(SessionState::Opening);
        let mut sink = match open_sink(&self.format) {
            Ok(sink) => sink,
            Err(e) => return self.fail(TranscodeError::SinkOpen(e)),
        };
        let mut engine = match open_engine() {
            Ok(engine) => engine,
            Err(e) => {
                close_quietly(&mut sink);
                return self.fail(TranscodeError::EngineOpen(e));
            }
        };

        let stream = engine.stream_info();
        if let Err(e) = self.check_stream(&stream) {
            abandon(&mut engine, &mut sink);
            return self.fail(e);
        }

        self.enter(SessionState::Decoding);
        let mut reporter = ErrorReporter::new(self.input.as_str());
        let (completion, stats, step_error) = {
            let mut step = BlockTranscoder::new(
                &mut sink,
                &mut reporter,
                Conversion::new(stream.bits_per_sample, depth),
                usize::from(self.format.channels),
            );
            let completion = engine.process_until_end_of_stream(&mut step);
            (completion, step.stats(), step.take_error())
        };

        let fatal = match (step_error, &completion) {
            (Some(e), _) => Some(e),
            (None, Completion::Aborted) => Some(TranscodeError::Aborted {
                input: self.input.clone(),
            }),
            _ => None,
        };
        if let Some(e) = fatal {
            abandon(&mut engine, &mut sink);
            return self.fail(e);
        }

        let verdict = self.check_completion(&completion, &reporter);

        self.enter(SessionState::Finalizing);
        if let Err(e) = engine.finish() {
            if let Err(e) = self.finish_failed(e) {
                close_quietly(&mut sink);
                return self.fail(e);
            }
        }
        if let Err(e) = sink.close() {
            return self.fail(TranscodeError::Close(e));
        }
        if let Err(e) = verdict {
            return self.fail(e);
        }

        self.enter(SessionState::Closed);
        let report = SessionReport {
            stream,
            format: self.format,
            stats,
            completion,
            anomalies: reporter.into_anomalies(),
        };
        info!(
            "Transcoded {}: {} blocks, {} frames, {} samples ({:.3} s), {} anomalies",
            self.input,
            report.stats.blocks,
            report.stats.frames,
            report.stats.samples,
            report.duration_secs(),
            report.anomalies.len()
        );
        Ok(report)
    }

    fn check_stream(&self, stream: &StreamInfo) -> Result<(), TranscodeError> {
        let format_channels = usize::from(self.format.channels);
        if stream.channels as usize != format_channels {
            return Err(TranscodeError::ChannelCountMismatch {
                stream: stream.channels as usize,
                format: format_channels,
            });
        }

        if stream.sample_rate != self.format.sample_rate {
            warn!(
                "{} is sampled at {} Hz, output declares {} Hz; samples are not resampled",
                self.input, stream.sample_rate, self.format.sample_rate
            );
        }

        debug!(
            "Converting {}-bit stream to {}",
            stream.bits_per_sample, self.format
        );
        Ok(())
    }

    fn check_completion(
        &self,
        completion: &Completion,
        reporter: &ErrorReporter,
    ) -> Result<(), TranscodeError> {
        if let Completion::Incomplete(anomaly) = completion {
            log_or_err!(
                self.policy,
                log::Level::Warn,
                TranscodeError::Incomplete {
                    input: self.input.clone(),
                    reason: anomaly.to_string(),
                }
            );
        }
        if reporter.count() > 0 {
            log_or_err!(
                self.policy,
                log::Level::Warn,
                TranscodeError::Anomalies {
                    input: self.input.clone(),
                    count: reporter.count(),
                }
            );
        }
        Ok(())
    }

    fn finish_failed(&self, e: EngineError) -> Result<(), TranscodeError> {
        log_or_err!(self.policy, log::Level::Warn, TranscodeError::Finish(e));
        Ok(())
    }

    fn enter(&mut self, state: SessionState) {
        debug!("Session {}: {} -> {}", self.input, self.state, state);
        self.state = state;
        self.history.push(state);
    }

    fn fail<T>(&mut self, e: TranscodeError) -> Result<T, TranscodeError> {
        self.enter(SessionState::Failed);
        Err(e)
    }
}

/// Best-effort release after a fatal error; secondary failures are only logged.
fn abandon<E: DecodeEngine, S: PcmSink>(engine: &mut E, sink: &mut S) {
    if let Err(e) = engine.finish() {
        warn!("Finishing decoder after failure: {e}");
    }
    close_quietly(sink);
}

fn close_quietly<S: PcmSink>(sink: &mut S) {
    if let Err(e) = sink.close() {
        warn!("Closing output after failure: {e}");
    }
}
