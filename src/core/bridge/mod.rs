//! Bus bridge: byte source -> frame decoder -> frame sink
//!
//! The bridge owns the polling loop. Each pass asks the source whether a
//! byte is available, reads exactly one and hands it to the decoder, which
//! forwards finished frames to the sink.

use crate::core::protocol::{DecoderStats, FrameDecoder, FrameEnd, FrameLog, FrameSink};
use crate::core::transport::{ByteSource, SourceStats, TransportError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a bridge run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Stop flag cleared
    Stopped,
    /// Source ran out of bytes
    Exhausted,
}

/// Bridge statistics
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BridgeStats {
    /// Source counters
    pub source: SourceStats,
    /// Decoder counters
    pub decoder: DecoderStats,
    /// How the run ended
    pub stop_reason: StopReason,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Serial bus to frame sink bridge
pub struct Bridge<S, K, L> {
    source: S,
    decoder: FrameDecoder,
    sink: K,
    log: L,
    running: Arc<AtomicBool>,
}

impl<S, K, L> Bridge<S, K, L>
where
    S: ByteSource,
    K: FrameSink,
    L: FrameLog,
{
    /// Create new bridge
    pub fn new(source: S, decoder: FrameDecoder, sink: K, log: L) -> Self {
        Self {
            source,
            decoder,
            sink,
            log,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that keeps the loop alive; store `false` to stop it
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Poll one byte through the decoder, if one is available
    pub fn poll(&mut self) -> Result<Option<FrameEnd>, TransportError> {
        if !self.source.available()? {
            return Ok(None);
        }
        let byte = self.source.read_byte()?;
        Ok(self.decoder.process_byte(byte, &mut self.sink, &mut self.log))
    }

    /// Run until stopped or the source is exhausted
    pub fn run(&mut self) -> Result<BridgeStats, TransportError> {
        let started = Instant::now();
        tracing::info!(source = %self.source.connection_info(), "bridge running");

        let stop_reason = loop {
            if !self.is_running() {
                break StopReason::Stopped;
            }
            if self.source.is_exhausted() {
                break StopReason::Exhausted;
            }

            if let Err(e) = self.poll() {
                tracing::error!("bridge stopped: {}", e);
                return Err(e);
            }
        };

        let stats = self.stats(stop_reason, started.elapsed());
        tracing::info!(
            frames = stats.decoder.frames_emitted(),
            overflowed = stats.decoder.frames_overflowed,
            bytes = stats.source.bytes_read,
            reason = ?stop_reason,
            "bridge finished"
        );
        Ok(stats)
    }

    /// Decoder in use
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Frame sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Take the parts back
    pub fn into_parts(self) -> (S, FrameDecoder, K, L) {
        (self.source, self.decoder, self.sink, self.log)
    }

    fn stats(&self, stop_reason: StopReason, elapsed: Duration) -> BridgeStats {
        BridgeStats {
            source: self.source.stats(),
            decoder: self.decoder.stats(),
            stop_reason,
            elapsed,
        }
    }
}
