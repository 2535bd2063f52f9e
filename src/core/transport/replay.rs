//! Replays recorded bus traffic through the decoder

use super::{ByteSource, SourceStats, TransportError};
use crate::core::logger::parse_capture_line;
use bytes::{Buf, Bytes};
use std::path::{Path, PathBuf};

/// In-memory byte source, exhausted once every byte has been read
pub struct ReplaySource {
    data: Bytes,
    origin: Option<PathBuf>,
    stats: SourceStats,
}

impl ReplaySource {
    /// Replay raw bytes
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            origin: None,
            stats: SourceStats::default(),
        }
    }

    /// Replay capture text (one hex line per chunk, see `parse_capture_line`)
    pub fn from_capture(text: &str) -> Result<Self, TransportError> {
        let mut data = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let bytes = parse_capture_line(line).map_err(|source| TransportError::Capture {
                line: number + 1,
                source,
            })?;
            if let Some(bytes) = bytes {
                data.extend_from_slice(&bytes);
            }
        }
        Ok(Self::from_bytes(data))
    }

    /// Load a capture file, or a raw binary dump when `raw` is set
    pub fn open(path: impl AsRef<Path>, raw: bool) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let mut source = if raw {
            Self::from_bytes(std::fs::read(path)?)
        } else {
            Self::from_capture(&std::fs::read_to_string(path)?)?
        };
        source.origin = Some(path.to_path_buf());

        tracing::info!(path = %path.display(), bytes = source.remaining(), "replay loaded");
        Ok(source)
    }

    /// Bytes not yet read
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }
}

impl ByteSource for ReplaySource {
    fn available(&mut self) -> Result<bool, TransportError> {
        Ok(self.data.has_remaining())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        if !self.data.has_remaining() {
            return Err(TransportError::Disconnected);
        }
        self.stats.bytes_read += 1;
        Ok(self.data.get_u8())
    }

    fn is_exhausted(&self) -> bool {
        !self.data.has_remaining()
    }

    fn connection_info(&self) -> String {
        match &self.origin {
            Some(path) => format!("replay of {}", path.display()),
            None => format!("replay of {} bytes", self.data.len() + self.stats.bytes_read as usize),
        }
    }

    fn stats(&self) -> SourceStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_until_exhausted() {
        let mut source = ReplaySource::from_bytes(vec![0xAA, 0x55]);
        assert!(source.available().unwrap());
        assert_eq!(source.read_byte().unwrap(), 0xAA);
        assert_eq!(source.read_byte().unwrap(), 0x55);
        assert!(!source.available().unwrap());
        assert!(source.is_exhausted());
        assert!(matches!(source.read_byte(), Err(TransportError::Disconnected)));
        assert_eq!(source.stats().bytes_read, 2);
    }

    #[test]
    fn test_from_capture_concatenates_lines() {
        let text = "# captured on the outdoor unit\n\
                    [2026-10-15 08:00:00.000] RX AA C0 55\n\
                    \n\
                    AA 01\n";
        let source = ReplaySource::from_capture(text).unwrap();
        assert_eq!(source.remaining(), 5);
    }

    #[test]
    fn test_from_capture_reports_line() {
        let err = ReplaySource::from_capture("AA 55\nnot hex\n").err().unwrap();
        assert!(matches!(err, TransportError::Capture { line: 2, .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_open_raw_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xAA, 0x01, 0x55]).unwrap();

        let source = ReplaySource::open(file.path(), true).unwrap();
        assert_eq!(source.remaining(), 3);
        assert!(source.connection_info().starts_with("replay of "));
    }

    #[test]
    fn test_open_missing_file() {
        let result = ReplaySource::open("/nonexistent/capture.txt", false);
        assert!(matches!(result, Err(TransportError::IoError(_))));
    }
}
