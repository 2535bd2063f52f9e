//! # Xyeshark Core Library
//!
//! Bridges a Midea HVAC Xye bus (RS-485) to the local network:
//! - Delimits bus frames with the `0xAA` / `0x55` sentinels
//! - Forwards each frame as an `HVAC_shark` UDP datagram
//! - Traces frames as hex lines and optional capture files
//!
//! Payloads are relayed untouched; checksums and command codes are left to
//! whoever listens on the network.
//!
//! ## Example
//!
//! ```rust,no_run
//! use xyeshark_core::{
//!     BroadcastConfig, Bridge, DecoderConfig, FrameDecoder, HexFrameLog, SerialConfig,
//!     SerialSource, UdpBroadcaster,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let source = SerialSource::open(SerialConfig::new("/dev/ttyUSB0", 4800))?;
//!     let decoder = FrameDecoder::new(DecoderConfig::default())?;
//!     let sink = UdpBroadcaster::new(&BroadcastConfig::default())?;
//!
//!     let mut bridge = Bridge::new(source, decoder, sink, HexFrameLog::stdout());
//!     bridge.run()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{AppConfig, ConfigError, LoggingConfig};
pub use crate::core::bridge::{Bridge, BridgeStats, StopReason};
pub use crate::core::broadcast::{encode_datagram, BroadcastConfig, BroadcastError, UdpBroadcaster};
pub use crate::core::codec::{CodecError, HexCodec};
pub use crate::core::logger::{CaptureLog, FrameLogs, HexFrameLog, TracingFrameLog};
pub use crate::core::protocol::{
    DecoderConfig, DecoderState, DecoderStats, FrameDecoder, FrameEnd, FrameLog, FrameSink,
};
pub use crate::core::transport::{
    ByteSource, ReplaySource, SerialConfig, SerialParity, SerialSource, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
