//! Serial port byte source

use super::{ByteSource, SourceStats, TransportError};
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

/// Default Xye bus speed
pub const DEFAULT_BAUD_RATE: u32 = 4800;

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl std::str::FromStr for SerialParity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            _ => Err(format!("unknown parity: {}", s)),
        }
    }
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Read timeout in milliseconds; bounds how long `available` waits
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    /// Create a new serial configuration with 8N1 framing
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            read_timeout_ms: 100,
        }
    }

    /// Set data bits
    #[must_use]
    pub fn data_bits(mut self, bits: u8) -> Self {
        self.data_bits = bits;
        self
    }

    /// Set stop bits
    #[must_use]
    pub fn stop_bits(mut self, bits: u8) -> Self {
        self.stop_bits = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Check port settings
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.baud_rate == 0 {
            return Err(TransportError::InvalidConfiguration(
                "baud rate must be positive".to_string(),
            ));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(TransportError::InvalidConfiguration(format!(
                "data bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(TransportError::InvalidConfiguration(format!(
                "stop bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }

    /// Short line description, e.g. `/dev/ttyUSB0 @ 4800 baud (8N1)`
    pub fn describe(&self) -> String {
        format!(
            "{} @ {} baud ({}{}{})",
            self.port,
            self.baud_rate,
            self.data_bits,
            match self.parity {
                SerialParity::None => "N",
                SerialParity::Odd => "O",
                SerialParity::Even => "E",
            },
            self.stop_bits,
        )
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new("", DEFAULT_BAUD_RATE)
    }
}

/// Serial port source.
///
/// Reads whatever the driver has in one call and hands it out a byte at a
/// time, so the decoder always sees single bytes.
pub struct SerialSource {
    config: SerialConfig,
    port: Box<dyn SerialPort>,
    pending: VecDeque<u8>,
    chunk: Vec<u8>,
    stats: SourceStats,
}

impl SerialSource {
    /// Open the port
    pub fn open(config: SerialConfig) -> Result<Self, TransportError> {
        config.validate()?;
        if config.port.is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "no serial port given".to_string(),
            ));
        }

        let data_bits = match config.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match config.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let parity = match config.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        };

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => TransportError::PortNotFound(config.port.clone()),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    TransportError::PortNotFound(config.port.clone())
                }
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied(config.port.clone())
                }
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        tracing::info!(port = %config.describe(), "serial port open");

        Ok(Self {
            config,
            port,
            pending: VecDeque::with_capacity(4096),
            chunk: vec![0u8; 4096],
            stats: SourceStats::default(),
        })
    }

    /// Port configuration
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn fill(&mut self) -> Result<(), TransportError> {
        match self.port.read(&mut self.chunk) {
            Ok(0) => Err(TransportError::Disconnected),
            Ok(n) => {
                self.pending.extend(&self.chunk[..n]);
                self.stats.reads += 1;
                tracing::trace!(bytes = n, "serial read");
                Ok(())
            }
            // No data within the read timeout
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(TransportError::IoError(e)),
        }
    }
}

impl ByteSource for SerialSource {
    fn available(&mut self) -> Result<bool, TransportError> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(!self.pending.is_empty())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        let byte = self.pending.pop_front().ok_or_else(|| {
            TransportError::IoError(std::io::ErrorKind::WouldBlock.into())
        })?;
        self.stats.bytes_read += 1;
        Ok(byte)
    }

    fn connection_info(&self) -> String {
        self.config.describe()
    }

    fn stats(&self) -> SourceStats {
        self.stats
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))
}
