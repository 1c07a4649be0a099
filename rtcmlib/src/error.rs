use thiserror::Error;

/// Errors raised while pulling bits out of a message payload.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BitReaderError {
    #[error("requested {requested} bits but only {available} remain in the payload")]
    Underrun { requested: u32, available: u32 },
    #[error("bit width {0} is out of range for this extraction (max 64)")]
    InvalidWidth(u32),
}

/// Failure to decode a single message payload once its frame has already
/// passed CRC validation. Per the frame/message error model, a `DecodeError`
/// never propagates out of `feed_byte`: the caller only ever sees a
/// `FrameResult`, and the frame producing this error is dropped after being
/// logged at `debug` level.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("message type {0} payload too short")]
    Truncated(u16),
    #[error(transparent)]
    BitReader(#[from] BitReaderError),
}
