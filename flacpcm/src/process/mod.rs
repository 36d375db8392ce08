/// Planar to interleaved sample conversion.
///
/// Provides [`interleave`](convert::interleave) and the
/// [`InterleavedBuffer`](convert::InterleavedBuffer) it produces.
pub mod convert;

/// Observational handling of decoder-signalled anomalies.
pub mod report;

/// The per-block transcode step driven by the engine.
pub mod step;

/// Session lifecycle: validation, sink and engine set-up, decode loop, cleanup.
///
/// Provides the [`Session`](session::Session) state machine.
pub mod session;

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::container::PcmSink;
    use crate::engine::{
        Anomaly, BlockHandler, Completion, DecodeEngine, StreamInfo, WriteStatus,
    };
    use crate::process::convert::InterleavedBuffer;
    use crate::structs::block::Block;
    use crate::utils::errors::{EngineError, SinkError};

    #[derive(Debug, Default)]
    pub(crate) struct SinkLog {
        pub writes: Vec<InterleavedBuffer>,
        pub closes: usize,
    }

    /// Sink that records every write; optionally fails the n-th write (0-based).
    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingSink {
        pub log: Rc<RefCell<SinkLog>>,
        pub fail_write: Option<usize>,
    }

    impl PcmSink for RecordingSink {
        fn write_block(&mut self, buffer: &InterleavedBuffer) -> Result<(), SinkError> {
            let mut log = self.log.borrow_mut();
            if self.fail_write == Some(log.writes.len()) {
                return Err(SinkError::Io(std::io::Error::other("disk full")));
            }
            log.writes.push(buffer.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            self.log.borrow_mut().closes += 1;
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    pub(crate) enum Event {
        Block(Vec<Vec<i32>>),
        Anomaly(Anomaly),
        /// Reports the anomaly and ends the loop as incomplete.
        Fault(Anomaly),
    }

    /// Engine that replays a fixed list of events.
    #[derive(Debug)]
    pub(crate) struct ScriptedEngine {
        pub info: StreamInfo,
        pub events: Vec<Event>,
        pub finished: Rc<RefCell<usize>>,
        pub fail_finish: bool,
    }

    impl ScriptedEngine {
        pub fn new(info: StreamInfo, events: Vec<Event>) -> Self {
            Self {
                info,
                events,
                finished: Rc::default(),
                fail_finish: false,
            }
        }
    }

    impl DecodeEngine for ScriptedEngine {
        fn stream_info(&self) -> StreamInfo {
            self.info
        }

        fn process_until_end_of_stream(&mut self, handler: &mut dyn BlockHandler) -> Completion {
            for event in &self.events {
                match event {
                    Event::Block(data) => {
                        let planes: Vec<&[i32]> = data.iter().map(Vec::as_slice).collect();
                        let block = Block::new(&planes).expect("scripted block is well formed");
                        if handler.on_block(&block) == WriteStatus::Abort {
                            return Completion::Aborted;
                        }
                    }
                    Event::Anomaly(anomaly) => handler.on_error(anomaly),
                    Event::Fault(anomaly) => {
                        handler.on_error(anomaly);
                        return Completion::Incomplete(anomaly.clone());
                    }
                }
            }
            Completion::EndOfStream
        }

        fn finish(&mut self) -> Result<(), EngineError> {
            *self.finished.borrow_mut() += 1;
            if self.fail_finish {
                return Err(EngineError::Io(std::io::Error::other("decoder state lost")));
            }
            Ok(())
        }
    }

    pub(crate) fn stereo16_info() -> StreamInfo {
        StreamInfo {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            total_samples: None,
            min_block_size: 16,
            max_block_size: 4096,
            md5: [0; 16],
        }
    }
}
