//! Sentinel-delimited frame decoder for the Xye bus
//!
//! The bus master opens every frame with `0xAA` and closes it with `0x55`.
//! [`FrameDecoder`] is fed one byte at a time from the polling loop and hands
//! each finished (or abandoned) frame to a [`FrameSink`] and a [`FrameLog`].
//!
//! ```
//! use xyeshark_core::core::protocol::{DecoderConfig, FrameDecoder};
//!
//! let mut decoder = FrameDecoder::new(DecoderConfig::default()).unwrap();
//! let mut frames: Vec<Vec<u8>> = Vec::new();
//! let mut log = ();
//!
//! for byte in [0xAA, 0x01, 0x02, 0x55] {
//!     decoder.process_byte(byte, &mut frames, &mut log);
//! }
//! assert_eq!(frames, vec![vec![0xAA, 0x01, 0x02, 0x55]]);
//! ```

use serde::{Deserialize, Serialize};

/// Frame start sentinel sent by the bus master
pub const START_BYTE: u8 = 0xAA;

/// Frame end sentinel
pub const END_BYTE: u8 = 0x55;

/// Default frame buffer capacity
pub const DEFAULT_CAPACITY: usize = 128;

/// Smallest capacity that can hold a sentinel and one more byte
pub const MIN_CAPACITY: usize = 2;

/// Largest capacity whose frames still fit in one UDP datagram after the
/// 13 byte identification header
pub const MAX_CAPACITY: usize = 65_507 - 13;

/// Receives frames delimited by the decoder.
///
/// The slice is only valid for the duration of the call; the decoder reuses
/// its buffer as soon as `emit` returns.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink {
    /// Forward one frame
    fn emit(&mut self, frame: &[u8]);
}

/// Diagnostic trace of the frames leaving the decoder
#[cfg_attr(test, mockall::automock)]
pub trait FrameLog {
    /// A frame was closed by an end sentinel or cut short by a new start
    fn frame(&mut self, frame: &[u8]);

    /// A frame hit the overflow guard before any end sentinel arrived
    fn length_exceeded(&mut self, frame: &[u8]);
}

impl FrameSink for Vec<Vec<u8>> {
    fn emit(&mut self, frame: &[u8]) {
        self.push(frame.to_vec());
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn emit(&mut self, frame: &[u8]) {
        (**self).emit(frame);
    }
}

/// Discards every frame
impl FrameSink for () {
    fn emit(&mut self, _frame: &[u8]) {}
}

/// Discards everything
impl FrameLog for () {
    fn frame(&mut self, _frame: &[u8]) {}

    fn length_exceeded(&mut self, _frame: &[u8]) {}
}

impl<T: FrameLog + ?Sized> FrameLog for Box<T> {
    fn frame(&mut self, frame: &[u8]) {
        (**self).frame(frame);
    }

    fn length_exceeded(&mut self, frame: &[u8]) {
        (**self).length_exceeded(frame);
    }
}

/// Decoder configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecoderError {
    /// Start and end sentinels must differ
    #[error("start and end sentinel are both 0x{0:02X}")]
    SameSentinels(u8),

    /// Capacity out of range
    #[error("frame capacity {0} outside {min}..={max}", min = MIN_CAPACITY, max = MAX_CAPACITY)]
    Capacity(usize),
}

/// Framing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Byte that opens a frame
    pub start_byte: u8,
    /// Byte that closes a frame
    pub end_byte: u8,
    /// Frame buffer capacity; frames are flushed at `capacity - 1` bytes
    pub capacity: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            start_byte: START_BYTE,
            end_byte: END_BYTE,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with custom sentinels
    pub fn new(start_byte: u8, end_byte: u8, capacity: usize) -> Self {
        Self {
            start_byte,
            end_byte,
            capacity,
        }
    }

    /// Set capacity
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check sentinels and capacity
    pub fn validate(&self) -> Result<(), DecoderError> {
        if self.start_byte == self.end_byte {
            return Err(DecoderError::SameSentinels(self.start_byte));
        }
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(DecoderError::Capacity(self.capacity));
        }
        Ok(())
    }
}

/// Decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecoderState {
    /// Waiting for a start sentinel
    #[default]
    Idle,
    /// Collecting a frame
    Accumulating,
}

/// How a frame left the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameEnd {
    /// Closed by the end sentinel
    Complete,
    /// Cut short by a new start sentinel; a new frame is already open
    Restarted,
    /// Flushed by the overflow guard
    Overflow,
}

/// Decoder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Bytes handed to the decoder
    pub bytes_seen: u64,
    /// Bytes discarded while idle
    pub bytes_dropped: u64,
    /// Frames closed by the end sentinel
    pub frames_complete: u64,
    /// Frames cut short by a new start sentinel
    pub frames_restarted: u64,
    /// Frames flushed by the overflow guard
    pub frames_overflowed: u64,
}

impl DecoderStats {
    /// Total frames handed to the sink
    pub fn frames_emitted(&self) -> u64 {
        self.frames_complete + self.frames_restarted + self.frames_overflowed
    }
}

/// Streaming sentinel frame decoder.
///
/// Holds at most one frame. The buffer is allocated once with the configured
/// capacity and never grows past `capacity - 1` bytes.
#[derive(Debug)]
pub struct FrameDecoder {
    config: DecoderConfig,
    state: DecoderState,
    buffer: Vec<u8>,
    stats: DecoderStats,
}

impl FrameDecoder {
    /// Create a decoder, rejecting invalid configurations
    pub fn new(config: DecoderConfig) -> Result<Self, DecoderError> {
        config.validate()?;
        Ok(Self {
            config,
            state: DecoderState::Idle,
            buffer: Vec::with_capacity(config.capacity),
            stats: DecoderStats::default(),
        })
    }

    /// Feed one byte.
    ///
    /// Calls `sink` and `log` at most once each. Returns how a frame ended if
    /// this byte ended one.
    pub fn process_byte<S, L>(&mut self, byte: u8, sink: &mut S, log: &mut L) -> Option<FrameEnd>
    where
        S: FrameSink + ?Sized,
        L: FrameLog + ?Sized,
    {
        self.stats.bytes_seen += 1;

        match self.state {
            DecoderState::Idle if byte == self.config.start_byte => {
                self.open(byte);
                None
            }
            DecoderState::Idle => {
                self.stats.bytes_dropped += 1;
                None
            }
            DecoderState::Accumulating if byte == self.config.end_byte => {
                self.buffer.push(byte);
                log.frame(&self.buffer);
                sink.emit(&self.buffer);
                self.reset();
                self.stats.frames_complete += 1;
                Some(FrameEnd::Complete)
            }
            DecoderState::Accumulating if byte == self.config.start_byte => {
                log.frame(&self.buffer);
                sink.emit(&self.buffer);
                self.open(byte);
                self.stats.frames_restarted += 1;
                Some(FrameEnd::Restarted)
            }
            DecoderState::Accumulating => {
                self.buffer.push(byte);
                if self.buffer.len() < self.config.capacity - 1 {
                    return None;
                }
                tracing::debug!(len = self.buffer.len(), "overflow guard");
                log.length_exceeded(&self.buffer);
                sink.emit(&self.buffer);
                self.reset();
                self.stats.frames_overflowed += 1;
                Some(FrameEnd::Overflow)
            }
        }
    }

    /// Feed a chunk, returning how many frames were emitted
    pub fn process<S, L>(&mut self, data: &[u8], sink: &mut S, log: &mut L) -> usize
    where
        S: FrameSink + ?Sized,
        L: FrameLog + ?Sized,
    {
        let mut frames = 0;
        for &byte in data {
            if self.process_byte(byte, &mut *sink, &mut *log).is_some() {
                frames += 1;
            }
        }
        frames
    }

    /// Drop any partial frame and return to idle
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Idle;
    }

    /// Current state
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Bytes of the frame in progress
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// No frame in progress
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Configuration in use
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Counters since creation
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    fn open(&mut self, start: u8) {
        self.buffer.clear();
        self.buffer.push(start);
        self.state = DecoderState::Accumulating;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(DecoderConfig::default()).unwrap()
    }

    fn feed(decoder: &mut FrameDecoder, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        decoder.process(data, &mut frames, &mut ());
        frames
    }

    #[test]
    fn test_complete_frame() {
        let mut dec = decoder();
        let frames = feed(&mut dec, &[0xAA, 0x01, 0x02, 0x55]);
        assert_eq!(frames, vec![vec![0xAA, 0x01, 0x02, 0x55]]);
        assert_eq!(dec.state(), DecoderState::Idle);
        assert!(dec.is_empty());
    }

    #[test]
    fn test_restart_flushes_partial_frame() {
        let mut dec = decoder();
        let frames = feed(&mut dec, &[0xAA, 0x01, 0xAA, 0x02, 0x55]);
        assert_eq!(frames, vec![vec![0xAA, 0x01], vec![0xAA, 0x02, 0x55]]);
        assert_eq!(dec.stats().frames_restarted, 1);
        assert_eq!(dec.stats().frames_complete, 1);
    }

    #[test]
    fn test_restart_leaves_new_frame_open() {
        let mut dec = decoder();
        let mut frames = Vec::new();
        dec.process(&[0xAA, 0x10], &mut frames, &mut ());
        let end = dec.process_byte(0xAA, &mut frames, &mut ());
        assert_eq!(end, Some(FrameEnd::Restarted));
        assert_eq!(dec.state(), DecoderState::Accumulating);
        assert_eq!(dec.buffered(), &[0xAA]);
    }

    #[test]
    fn test_overflow_guard() {
        let mut dec = decoder();
        let mut input = vec![0xAA];
        input.extend(std::iter::repeat(0x11).take(127));

        let frames = feed(&mut dec, &input);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 127);
        assert_eq!(frames[0][0], 0xAA);
        assert_eq!(dec.state(), DecoderState::Idle);
        assert_eq!(dec.stats().frames_overflowed, 1);
        // The last filler arrives after the flush and is dropped
        assert_eq!(dec.stats().bytes_dropped, 1);
    }

    #[test]
    fn test_overflow_reported_as_length_exceeded() {
        let mut dec = FrameDecoder::new(DecoderConfig::default().capacity(4)).unwrap();
        let mut sink = MockFrameSink::new();
        let mut log = MockFrameLog::new();
        let mut seq = Sequence::new();

        log.expect_frame().never();
        log.expect_length_exceeded()
            .withf(|frame| *frame == [0xAA, 0x01, 0x02])
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_emit()
            .withf(|frame| *frame == [0xAA, 0x01, 0x02])
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        dec.process(&[0xAA, 0x01, 0x02], &mut sink, &mut log);
        assert_eq!(dec.state(), DecoderState::Idle);
    }

    #[test]
    fn test_idle_bytes_dropped_without_start() {
        let mut dec = decoder();
        let mut sink = MockFrameSink::new();
        sink.expect_emit().never();

        dec.process(&[0x01, 0x55, 0x02, 0x03, 0x55], &mut sink, &mut ());
        assert_eq!(dec.state(), DecoderState::Idle);
        assert_eq!(dec.stats().bytes_dropped, 5);
    }

    #[test]
    fn test_first_start_opens_frame() {
        let mut dec = decoder();
        let frames = feed(&mut dec, &[0x55, 0x13, 0xAA, 0xC0, 0x55, 0x77]);
        assert_eq!(frames, vec![vec![0xAA, 0xC0, 0x55]]);
    }

    #[test]
    fn test_log_sees_every_emitted_frame() {
        let mut dec = decoder();
        let mut log = MockFrameLog::new();
        log.expect_frame().times(2).return_const(());
        log.expect_length_exceeded().never();

        let mut frames = Vec::new();
        dec.process(&[0xAA, 0x01, 0xAA, 0x02, 0x55], &mut frames, &mut log);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_buffer_stays_bounded() {
        let capacity = 16;
        let mut dec = FrameDecoder::new(DecoderConfig::default().capacity(capacity)).unwrap();
        let mut frames = Vec::new();

        // Pseudo-random walk over every byte value, sentinels included
        let mut x: u32 = 0x1234_5678;
        for _ in 0..10_000 {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let byte = (x >> 16) as u8;
            let end = dec.process_byte(byte, &mut frames, &mut ());

            assert!(dec.len() < capacity);
            match end {
                Some(FrameEnd::Restarted) => {
                    assert_eq!(dec.state(), DecoderState::Accumulating);
                    assert_eq!(dec.len(), 1);
                }
                Some(_) => {
                    assert_eq!(dec.state(), DecoderState::Idle);
                    assert_eq!(dec.len(), 0);
                }
                None => {}
            }
        }
        assert!(frames.iter().all(|f| f.len() < capacity && f[0] == 0xAA));
    }

    #[test]
    fn test_payload_relayed_verbatim() {
        let payload: Vec<u8> = (0u8..=0xFF)
            .filter(|&b| b != START_BYTE && b != END_BYTE)
            .take(40)
            .collect();
        let mut input = vec![START_BYTE];
        input.extend_from_slice(&payload);
        input.push(END_BYTE);

        let frames = feed(&mut decoder(), &input);
        assert_eq!(frames, vec![input]);
    }

    #[test]
    fn test_custom_sentinels() {
        let mut dec = FrameDecoder::new(DecoderConfig::new(0x02, 0x03, 32)).unwrap();
        let frames = feed(&mut dec, &[0xAA, 0x02, 0x41, 0x03]);
        assert_eq!(frames, vec![vec![0x02, 0x41, 0x03]]);
    }

    #[test]
    fn test_invalid_config() {
        assert_eq!(
            FrameDecoder::new(DecoderConfig::new(0xAA, 0xAA, 128)).unwrap_err(),
            DecoderError::SameSentinels(0xAA)
        );
        assert_eq!(
            FrameDecoder::new(DecoderConfig::default().capacity(1)).unwrap_err(),
            DecoderError::Capacity(1)
        );
        assert!(FrameDecoder::new(DecoderConfig::default().capacity(MAX_CAPACITY + 1)).is_err());
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut dec = decoder();
        feed(&mut dec, &[0xAA, 0x01]);
        dec.reset();
        assert_eq!(dec.state(), DecoderState::Idle);
        assert!(feed(&mut dec, &[0x55]).is_empty());
    }
}
