//! Core module containing the bridge functionality
//!
//! This module provides:
//! - Byte sources (serial port, capture replay)
//! - The sentinel frame decoder for the Xye bus
//! - HVAC_shark datagram encoding and UDP forwarding
//! - Hex codec for frame display
//! - Frame logs (console trace, tracing events, capture files)
//! - The polling bridge tying them together

pub mod bridge;
pub mod broadcast;
pub mod codec;
pub mod logger;
pub mod protocol;
pub mod transport;
