//! Incremental consumer for the line-framed event stream
//!
//! The backend answers a turn with a chunked HTTP body carrying newline-framed
//! `data: <json>` records. The transport hands us byte fragments with
//! arbitrary boundaries; this module turns them into well-formed application
//! events and absorbs everything it does not recognize.

mod classifier;
mod decoder;

#[cfg(test)]
mod proptests;

pub use classifier::{classify, StreamEvent};
pub use decoder::FrameDecoder;
