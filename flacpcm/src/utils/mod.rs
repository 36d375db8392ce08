//! Supporting infrastructure: error types, the fail-level macro and CRCs.

pub mod crc;
pub mod errors;
