//! Owns both radar UART streams end to end: byte read, frame parse, post-
//! parse filtering, and disconnect tracking, dispatched through synchronous
//! callbacks on a single pinned thread.

mod connection;
mod filter;
mod ingest;
mod port;

pub use connection::{ConnectionState, DisconnectTracker};
pub use filter::{apply_filters, FilterConfig};
pub use ingest::{spawn_pinned, RadarCallbacks, RadarIngest, RadarIngestConfig, StreamStats};
pub use port::{FixtureUartPort, UartPort};

#[cfg(feature = "hardware")]
pub use port::SerialUartPort;
