use thiserror::Error;

/// Reasons a TCP payload is not a valid WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("frame size mismatch: header describes {expected} bytes, buffer holds {actual}")]
    LengthMismatch { expected: u64, actual: usize },
    #[error("frame length overflows: payload length {payload_length}")]
    LengthOverflow { payload_length: u64 },
}
