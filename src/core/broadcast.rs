//! HVAC_shark datagram framing and UDP forwarding
//!
//! Every frame is sent as one datagram:
//!
//! | Offset | Size | Content                          |
//! |--------|------|----------------------------------|
//! | 0      | 10   | `HVAC_shark`                     |
//! | 10     | 1    | manufacturer id (1 = Midea)      |
//! | 11     | 1    | bus type id (0 = Xye)            |
//! | 12     | 1    | reserved, 0                      |
//! | 13     | N    | frame bytes, sentinels included  |

use crate::core::protocol::FrameSink;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use thiserror::Error;

/// Datagram magic
pub const MAGIC: &[u8; 10] = b"HVAC_shark";

/// Header length in bytes
pub const HEADER_LEN: usize = MAGIC.len() + 3;

/// Manufacturer id for Midea
pub const MANUFACTURER_MIDEA: u8 = 1;

/// Bus type id for the Xye bus
pub const BUS_TYPE_XYE: u8 = 0;

/// Default destination port
pub const DEFAULT_PORT: u16 = 22222;

/// Broadcast errors
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// Destination did not resolve to any address
    #[error("Cannot resolve destination {0}")]
    Resolve(String),

    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination and header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Destination host, `255.255.255.255` for a LAN broadcast
    pub host: String,
    /// Destination port
    pub port: u16,
    /// Manufacturer id written at offset 10
    pub manufacturer: u8,
    /// Bus type id written at offset 11
    pub bus_type: u8,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::BROADCAST.to_string(),
            port: DEFAULT_PORT,
            manufacturer: MANUFACTURER_MIDEA,
            bus_type: BUS_TYPE_XYE,
        }
    }
}

impl BroadcastConfig {
    /// Create a config for the given destination with Midea/Xye ids
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Default::default()
        }
    }

    /// Resolve host and port to a socket address
    pub fn destination(&self) -> Result<SocketAddr, BroadcastError> {
        let target = format!("{}:{}", self.host, self.port);
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| BroadcastError::Resolve(target.clone()))?
            .find(SocketAddr::is_ipv4)
            .ok_or(BroadcastError::Resolve(target))
    }
}

/// Build a datagram: identification header followed by the frame
pub fn encode_datagram(manufacturer: u8, bus_type: u8, frame: &[u8]) -> Bytes {
    let mut datagram = BytesMut::with_capacity(HEADER_LEN + frame.len());
    datagram.put_slice(MAGIC);
    datagram.put_u8(manufacturer);
    datagram.put_u8(bus_type);
    datagram.put_u8(0);
    datagram.put_slice(frame);
    datagram.freeze()
}

/// Sender statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderStats {
    /// Datagrams sent
    pub datagrams_sent: u64,
    /// Bytes sent, headers included
    pub bytes_sent: u64,
    /// Failed sends
    pub errors: u64,
}

/// UDP frame sink
pub struct UdpBroadcaster {
    socket: UdpSocket,
    destination: SocketAddr,
    manufacturer: u8,
    bus_type: u8,
    stats: SenderStats,
}

impl UdpBroadcaster {
    /// Bind an ephemeral socket and resolve the destination
    pub fn new(config: &BroadcastConfig) -> Result<Self, BroadcastError> {
        let destination = config.destination()?;
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_broadcast(true)?;

        tracing::info!(%destination, "forwarding frames");

        Ok(Self {
            socket,
            destination,
            manufacturer: config.manufacturer,
            bus_type: config.bus_type,
            stats: SenderStats::default(),
        })
    }

    /// Send one frame, returning the datagram size
    pub fn send(&mut self, frame: &[u8]) -> Result<usize, BroadcastError> {
        let datagram = encode_datagram(self.manufacturer, self.bus_type, frame);
        let sent = self.socket.send_to(&datagram, self.destination)?;

        self.stats.datagrams_sent += 1;
        self.stats.bytes_sent += sent as u64;
        Ok(sent)
    }

    /// Destination address
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Statistics
    pub fn stats(&self) -> SenderStats {
        self.stats
    }
}

impl FrameSink for UdpBroadcaster {
    fn emit(&mut self, frame: &[u8]) {
        if let Err(e) = self.send(frame) {
            self.stats.errors += 1;
            tracing::warn!(destination = %self.destination, "failed to send frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_datagram_layout() {
        let datagram = encode_datagram(MANUFACTURER_MIDEA, BUS_TYPE_XYE, &[0xAA, 0x01, 0x55]);
        assert_eq!(datagram.len(), HEADER_LEN + 3);
        assert_eq!(&datagram[..10], b"HVAC_shark");
        assert_eq!(&datagram[10..13], &[1, 0, 0]);
        assert_eq!(&datagram[13..], &[0xAA, 0x01, 0x55]);
    }

    #[test]
    fn test_default_config() {
        let config = BroadcastConfig::default();
        assert_eq!(config.host, "255.255.255.255");
        assert_eq!(config.port, 22222);
        assert_eq!(
            config.destination().unwrap(),
            "255.255.255.255:22222".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_ipv6_only_destination_rejected() {
        let config = BroadcastConfig::new("::1", 1);
        assert!(matches!(config.destination(), Err(BroadcastError::Resolve(_))));
    }

    #[test]
    fn test_sink_sends_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut sink = UdpBroadcaster::new(&BroadcastConfig::new("127.0.0.1", port)).unwrap();
        sink.emit(&[0xAA, 0xC0, 0x55]);

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"HVAC_shark\x01\x00\x00\xAA\xC0\x55");
        assert_eq!(sink.stats().datagrams_sent, 1);
        assert_eq!(sink.stats().bytes_sent, n as u64);
    }
}
