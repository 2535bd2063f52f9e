//! Hex rendering and parsing of frame bytes
//!
//! Used for the console trace, capture files and replay input.

mod hex;

pub use self::hex::HexCodec;

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Invalid input format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Hex digits that do not form whole bytes
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] ::hex::FromHexError),
}

/// Render bytes as `AA 01 02 55`
pub fn to_hex(data: &[u8]) -> String {
    HexCodec::new().encode(data)
}
