//! Bus protocol framing
//!
//! Only transport framing lives here. Xye payloads (command codes, checksums,
//! temperatures) are relayed untouched.

pub mod framing;

pub use framing::{
    DecoderConfig, DecoderError, DecoderState, DecoderStats, FrameDecoder, FrameEnd, FrameLog,
    FrameSink, END_BYTE, START_BYTE,
};
