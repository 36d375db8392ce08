//! Data structures shared by the converter, the engine and the sinks.

pub mod block;
pub mod format;
