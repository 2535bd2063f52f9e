//! Byte sources feeding the frame decoder
//!
//! Supports:
//! - Serial ports (RS-485 adapters on the Xye bus)
//! - Replay of capture files and raw dumps

mod replay;
mod serial;

pub use replay::ReplaySource;
pub use serial::{list_ports, SerialConfig, SerialParity, SerialSource};

use crate::core::codec::CodecError;
use thiserror::Error;

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Capture text that does not parse as hex
    #[error("Bad capture line {line}")]
    Capture {
        /// 1-based line number
        line: usize,
        #[source]
        source: CodecError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,
}

/// Source statistics
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SourceStats {
    /// Bytes handed out
    pub bytes_read: u64,
    /// Underlying reads that returned data
    pub reads: u64,
}

/// A polled byte stream.
///
/// The polling loop asks whether a byte is available and then reads exactly
/// one. `available` may wait briefly (a serial read timeout) but never
/// indefinitely.
pub trait ByteSource {
    /// Whether a byte can be read now
    fn available(&mut self) -> Result<bool, TransportError>;

    /// Take the next byte; only valid after `available` returned `true`
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// The stream has ended and will never yield more bytes
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Human readable description
    fn connection_info(&self) -> String;

    /// Statistics
    fn stats(&self) -> SourceStats;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn available(&mut self) -> Result<bool, TransportError> {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        (**self).read_byte()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn connection_info(&self) -> String {
        (**self).connection_info()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}
