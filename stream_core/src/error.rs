use thiserror::Error;

/// Errors produced while parsing a transport delivery.
///
/// A decode failure is never fatal to the stream: the caller drops the
/// delivery, logs it and waits for the next one.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("truncated frame: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
}

/// Errors surfaced by the playout side.
#[derive(Debug, Error)]
pub enum PlayoutError {
    /// The sink rejected a write. Retry/abort policy belongs to the caller
    /// driving the scheduler, not to this crate.
    #[error("sink write failed: {0}")]
    SinkWrite(#[from] anyhow::Error),
}
