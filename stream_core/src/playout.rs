//! Paced delivery of reassembled audio to the playback sink.
//!
//! The scheduler gates playback behind a minimum buffered duration so network
//! jitter does not immediately translate into audible gaps, then drains the
//! ready queue one chunk per poll tick. When the queue runs dry it drops back
//! to buffering and waits for the safety margin again instead of resuming
//! under-buffered. Once the source marks the stream finished, a leftover tail
//! smaller than the gate is flushed instead of held.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::error::PlayoutError;
use crate::metrics::StreamMetrics;
use crate::queue::ReassemblyQueue;

/// Consumer of decoded PCM, e.g. an audio output device or a file writer.
///
/// Writes may block or rate-limit; the scheduler never holds the queue lock
/// across a write.
pub trait Sink: Send {
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutState {
    Buffering,
    Playing,
}

pub struct PlayoutScheduler<S: Sink> {
    queue: Arc<ReassemblyQueue>,
    sink: S,
    state: PlayoutState,
    min_buffer_bytes: usize,
    poll_interval: Duration,
    metrics: StreamMetrics,
}

impl<S: Sink> PlayoutScheduler<S> {
    pub fn new(
        queue: Arc<ReassemblyQueue>,
        sink: S,
        config: &StreamConfig,
        metrics: StreamMetrics,
    ) -> Self {
        Self {
            queue,
            sink,
            state: PlayoutState::Buffering,
            min_buffer_bytes: config.min_buffer_bytes(),
            poll_interval: config.poll_interval(),
            metrics,
        }
    }

    pub fn state(&self) -> PlayoutState {
        self.state
    }

    /// One periodic step of the playout task.
    ///
    /// Sink failures are propagated to the caller; whether to retry or tear
    /// the stream down is its decision.
    pub fn drive(&mut self) -> Result<(), PlayoutError> {
        match self.state {
            PlayoutState::Buffering => {
                let stats = self.queue.stats();
                if stats.buffered_bytes >= self.min_buffer_bytes {
                    info!(
                        buffered = stats.buffered_bytes,
                        threshold = self.min_buffer_bytes,
                        "buffer primed, starting playout"
                    );
                    self.state = PlayoutState::Playing;
                } else if stats.finished && stats.pending_len == 0 && stats.ready_len > 0 {
                    // The source is done and nothing more can become ready;
                    // a tail below the gate must still play out.
                    info!(
                        buffered = stats.buffered_bytes,
                        "stream finished, flushing buffered tail"
                    );
                    self.state = PlayoutState::Playing;
                }
                Ok(())
            }
            PlayoutState::Playing => match self.queue.try_pop() {
                Some(chunk) => {
                    self.sink
                        .write(&chunk.data)
                        .map_err(PlayoutError::SinkWrite)?;
                    self.metrics.record_played(chunk.byte_len());
                    Ok(())
                }
                None => {
                    debug!("queue drained, re-buffering");
                    self.metrics.record_underrun();
                    self.state = PlayoutState::Buffering;
                    Ok(())
                }
            },
        }
    }

    /// Drive the scheduler on a fixed poll period until the owning task is
    /// stopped or a sink write fails.
    pub async fn run(mut self) -> Result<(), PlayoutError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            self.drive()?;
        }
    }

    /// Hand the sink back, e.g. to finalize a file writer.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
