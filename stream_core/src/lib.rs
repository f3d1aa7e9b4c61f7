//! Core of the streaming TTS playback client: decodes sequence-tagged audio
//! frames from an unreliable transport, reassembles them in strict order and
//! paces them out to a playback sink.
//!
//! The transport calls [`StreamSession::on_delivery`] from its own execution
//! context; a [`playout::PlayoutScheduler`] task drains the shared
//! [`queue::ReassemblyQueue`] on the consumer side. The queue's single lock
//! is the only state shared between the two sides.

pub mod config;
pub mod error;
pub mod metrics;
pub mod playout;
pub mod protocol;
pub mod queue;

use std::sync::Arc;

use tracing::{debug, warn};

pub use config::StreamConfig;
pub use error::{DecodeError, PlayoutError};
pub use metrics::{MetricsSnapshot, StreamMetrics};
pub use playout::{PlayoutScheduler, PlayoutState, Sink};
pub use protocol::Frame;
pub use queue::{Chunk, PushOutcome, ReassemblyQueue};

/// Producer-side state for one active synthesis stream.
///
/// Holds the reassembly queue the playout scheduler shares and the
/// end-of-stream marker. One instance per active request; `reset` rewinds it
/// for the next one.
pub struct StreamSession {
    queue: Arc<ReassemblyQueue>,
    metrics: StreamMetrics,
}

impl StreamSession {
    pub fn new(config: &StreamConfig) -> Self {
        Self::with_metrics(config, StreamMetrics::new())
    }

    pub fn with_metrics(config: &StreamConfig, metrics: StreamMetrics) -> Self {
        Self {
            queue: Arc::new(ReassemblyQueue::new(config.queue_depth, metrics.clone())),
            metrics,
        }
    }

    /// Shared handle to the reassembly queue, for wiring up a scheduler.
    pub fn queue(&self) -> Arc<ReassemblyQueue> {
        Arc::clone(&self.queue)
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    /// Entry point for the transport: decode one delivery and feed the queue.
    ///
    /// Malformed deliveries are logged and dropped, never fatal. Returns the
    /// queue outcome for audio-bearing frames, `None` otherwise.
    pub fn on_delivery(&self, raw: &[u8]) -> Option<PushOutcome> {
        match protocol::decode(raw) {
            Ok(Frame::Ack) => {
                self.metrics.record_frame_decoded();
                self.metrics.record_ack();
                debug!("server ack");
                None
            }
            Ok(Frame::Ignorable) => {
                self.metrics.record_frame_decoded();
                None
            }
            Ok(Frame::AudioChunk { sequence, payload }) => {
                self.metrics.record_frame_decoded();
                Some(self.queue.push(Chunk::new(sequence, payload)))
            }
            Ok(Frame::FinalChunk { sequence, payload }) => {
                self.metrics.record_frame_decoded();
                debug!(sequence, "final chunk received");
                // Ordinary for reassembly purposes; playout just drains what
                // remains.
                self.queue.mark_finished();
                Some(self.queue.push(Chunk::new(sequence, payload)))
            }
            Err(e) => {
                warn!(error = %e, len = raw.len(), "dropping undecodable delivery");
                self.metrics.record_decode_failure();
                None
            }
        }
    }

    /// Whether the final-chunk marker for the current request has arrived.
    pub fn final_seen(&self) -> bool {
        self.queue.stats().finished
    }

    /// Final marker seen and nothing left to reassemble or play.
    pub fn is_drained(&self) -> bool {
        let stats = self.queue.stats();
        stats.finished && stats.pending_len == 0 && stats.ready_len == 0
    }

    /// Rewind for a new synthesis request.
    pub fn reset(&self) {
        self.queue.reset();
    }
}
