//! Dataset collection: raw samples streamed to a network sink.

pub mod router;
pub mod sink;

pub use router::RawForwarder;
pub use sink::{NetworkSink, SinkConfig, TcpSink};
