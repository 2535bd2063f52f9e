//! Frame logging
//!
//! Diagnostic sinks for decoded frames: the console hex trace, `tracing`
//! events, and a timestamped capture file that `replay` can read back.

use crate::core::codec::{CodecError, HexCodec};
use crate::core::protocol::FrameLog;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Console prefix for frames flushed by the overflow guard
pub const LENGTH_EXCEEDED_PREFIX: &str = "Frame error: Data length exceeded. Data received: ";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Why a frame was logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FrameKind {
    /// Closed normally or by a restart
    Frame,
    /// Flushed by the overflow guard
    LengthExceeded,
}

impl FrameKind {
    /// Capture file tag
    pub fn tag(&self) -> &'static str {
        match self {
            FrameKind::Frame => "RX",
            FrameKind::LengthExceeded => "OV",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "RX" => Some(FrameKind::Frame),
            "OV" => Some(FrameKind::LengthExceeded),
            _ => None,
        }
    }
}

/// A single captured frame
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FrameEntry {
    /// When the frame left the decoder
    pub timestamp: DateTime<Local>,
    /// How it ended
    pub kind: FrameKind,
    /// Frame bytes, sentinels included
    pub data: Vec<u8>,
}

impl FrameEntry {
    /// Create new entry stamped now
    pub fn new(kind: FrameKind, data: &[u8]) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            data: data.to_vec(),
        }
    }

    /// Format as a capture line: `[timestamp] RX AA 01 55`
    pub fn to_capture_line(&self) -> String {
        format!(
            "[{}] {} {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.kind.tag(),
            HexCodec::new().encode(&self.data)
        )
    }
}

/// Extract the bytes of one capture line.
///
/// Accepts capture lines written by [`CaptureLog`] as well as bare hex
/// (`AA 01 55`). Blank lines and `#` comments yield `None`.
pub fn parse_capture_line(line: &str) -> Result<Option<Vec<u8>>, CodecError> {
    let mut rest = line.trim();
    if rest.is_empty() || rest.starts_with('#') {
        return Ok(None);
    }

    if rest.starts_with('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| CodecError::InvalidFormat(format!("unterminated timestamp: {}", line)))?;
        rest = rest[close + 1..].trim_start();
    }

    if let Some((tag, data)) = rest.split_once(char::is_whitespace) {
        if FrameKind::from_tag(tag).is_some() {
            rest = data;
        }
    } else if FrameKind::from_tag(rest).is_some() {
        return Ok(Some(Vec::new()));
    }

    HexCodec::new().decode(rest).map(Some)
}

/// Writes each frame as a hex line, the way the original dongle prints to
/// its serial console
pub struct HexFrameLog<W: Write> {
    writer: W,
    codec: HexCodec,
}

impl HexFrameLog<io::Stdout> {
    /// Log to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> HexFrameLog<W> {
    /// Log to any writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codec: HexCodec::new(),
        }
    }

    /// Consume and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, prefix: &str, frame: &[u8]) {
        let line = self.codec.encode_line(frame);
        if let Err(e) = write!(self.writer, "{}{}", prefix, line) {
            tracing::debug!("frame trace write failed: {}", e);
        }
    }
}

impl<W: Write> FrameLog for HexFrameLog<W> {
    fn frame(&mut self, frame: &[u8]) {
        self.write_line("", frame);
    }

    fn length_exceeded(&mut self, frame: &[u8]) {
        self.write_line(LENGTH_EXCEEDED_PREFIX, frame);
    }
}

/// Reports frames as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFrameLog;

impl FrameLog for TracingFrameLog {
    fn frame(&mut self, frame: &[u8]) {
        tracing::debug!(len = frame.len(), frame = %HexCodec::new().encode(frame), "frame");
    }

    fn length_exceeded(&mut self, frame: &[u8]) {
        tracing::warn!(
            len = frame.len(),
            frame = %HexCodec::new().encode(frame),
            "frame length exceeded"
        );
    }
}

/// Appends timestamped capture lines to a file
pub struct CaptureLog {
    file: BufWriter<File>,
    path: PathBuf,
    lines_logged: usize,
}

impl CaptureLog {
    /// Open (or create) a capture file for appending
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        tracing::info!(path = %path.display(), "capturing frames");

        Ok(Self {
            file: BufWriter::new(file),
            path,
            lines_logged: 0,
        })
    }

    /// Capture file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far
    pub fn lines_logged(&self) -> usize {
        self.lines_logged
    }

    /// Flush to disk
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    fn log(&mut self, kind: FrameKind, frame: &[u8]) {
        let entry = FrameEntry::new(kind, frame);
        if let Err(e) = writeln!(self.file, "{}", entry.to_capture_line()) {
            tracing::warn!(path = %self.path.display(), "capture write failed: {}", e);
            return;
        }
        self.lines_logged += 1;

        // Flush periodically
        if self.lines_logged % 100 == 0 {
            let _ = self.file.flush();
        }
    }
}

impl FrameLog for CaptureLog {
    fn frame(&mut self, frame: &[u8]) {
        self.log(FrameKind::Frame, frame);
    }

    fn length_exceeded(&mut self, frame: &[u8]) {
        self.log(FrameKind::LengthExceeded, frame);
    }
}

impl Drop for CaptureLog {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}

/// Fans each frame out to several logs
#[derive(Default)]
pub struct FrameLogs {
    logs: Vec<Box<dyn FrameLog + Send>>,
}

impl FrameLogs {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a log
    #[must_use]
    pub fn with(mut self, log: impl FrameLog + Send + 'static) -> Self {
        self.logs.push(Box::new(log));
        self
    }

    /// Number of logs
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// No logs attached
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

impl FrameLog for FrameLogs {
    fn frame(&mut self, frame: &[u8]) {
        for log in &mut self.logs {
            log.frame(frame);
        }
    }

    fn length_exceeded(&mut self, frame: &[u8]) {
        for log in &mut self.logs {
            log.length_exceeded(frame);
        }
    }
}
