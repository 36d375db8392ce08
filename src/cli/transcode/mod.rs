pub mod output;
pub mod progress;
mod transcode_impl;

pub use transcode_impl::cmd_transcode;
