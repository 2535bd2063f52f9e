//! Hexadecimal codec for frame bytes

use super::CodecError;

/// Uppercase, space separated hex codec for frame display and capture files
#[derive(Debug, Clone, Copy, Default)]
pub struct HexCodec;

impl HexCodec {
    /// New codec
    pub fn new() -> Self {
        Self
    }

    /// Encode bytes on a single line
    pub fn encode(&self, data: &[u8]) -> String {
        let mut output = String::with_capacity(data.len() * 3);
        for (i, byte) in data.iter().enumerate() {
            if i > 0 {
                output.push(' ');
            }
            output.push_str(&format!("{:02X}", byte));
        }
        output
    }

    /// Encode bytes followed by a newline
    pub fn encode_line(&self, data: &[u8]) -> String {
        let mut line = self.encode(data);
        line.push('\n');
        line
    }

    /// Decode hex text, ignoring separators and `0x` prefixes
    pub fn decode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        let mut cleaned = String::with_capacity(text.len());
        for token in text.split(|c: char| c.is_whitespace() || c == ',') {
            let token = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if let Some(c) = token.chars().find(|c| !c.is_ascii_hexdigit()) {
                return Err(CodecError::InvalidFormat(format!(
                    "unexpected character {:?} in {:?}",
                    c, token
                )));
            }
            cleaned.push_str(token);
        }

        Ok(::hex::decode(cleaned)?)
    }
}
