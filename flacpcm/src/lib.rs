//! Block-wise FLAC to interleaved PCM transcoding.
//!
//! ## Technical Overview
//!
//! A push-model decoder hands planar blocks of `i32` samples to a handler one
//! at a time. Each block is interleaved frame by frame, scaled to the output
//! bit depth and written to a sink before the next block is decoded, so memory
//! use is bounded by the largest block in the stream.
//!
//! ### Bit Depth
//!
//! - Same depth: samples are copied
//! - Wider output: left shift, low bits zero
//! - Narrower output: arithmetic right shift, low bits dropped
//!
//! ### Containers
//!
//! RIFF WAV, Sony Wave64 and headerless little-endian PCM.
//!
//! ## Quick Start
//!
//! 1. Describe the output with [`structs::format::OutputFormat`]
//! 2. Run a [`process::session::Session`] with a sink opener and an engine opener
//! 3. Inspect the returned [`process::session::SessionReport`]
//!
//! ```rust,no_run
//! use flacpcm::container::wav::WavWriter;
//! use flacpcm::engine::flac::FlacEngine;
//! use flacpcm::process::session::Session;
//! use flacpcm::structs::format::OutputFormat;
//!
//! let format = OutputFormat {
//!     bits_per_sample: 24,
//!     ..Default::default()
//! };
//!
//! let mut session = Session::new("input.flac", format);
//! let report = session.run(
//!     |format| WavWriter::create("output.wav", format),
//!     || FlacEngine::open("input.flac"),
//! )?;
//!
//! println!("{} frames written", report.stats.frames);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Little-endian serialisation used by the container writers.
pub mod byteorder;

/// Output containers and the [`container::PcmSink`] capability.
///
/// - **WAV** ([`container::wav`])
/// - **Wave64** ([`container::w64`])
/// - **Raw PCM** ([`container::raw`])
pub mod container;

/// Decoding engines and the callback contract they drive.
pub mod engine;

/// Conversion, the per-block step, anomaly reporting and the session driver.
///
/// 1. **Conversion** ([`process::convert`]): planar to interleaved, bit scaling
/// 2. **Step** ([`process::step`]): one sink write per decoded block
/// 3. **Reporting** ([`process::report`]): decoder anomalies
/// 4. **Session** ([`process::session`]): lifecycle state machine
pub mod process;

/// Data types shared across the crate.
///
/// - **Blocks** ([`structs::block`]): borrowed planar sample blocks
/// - **Formats** ([`structs::format`]): output format descriptor
pub mod structs;

/// Error types and the `log_or_err!` macro.
pub mod utils;
