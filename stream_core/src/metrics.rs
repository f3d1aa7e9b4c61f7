// Counters for stream pipeline observability

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Shared counters covering the whole delivery-to-playout path.
///
/// Cloning is cheap; all clones update the same counters. Every counter is
/// best-effort (`Relaxed`) since none of them participate in coordination.
#[derive(Debug, Clone, Default)]
pub struct StreamMetrics {
    pub frames_decoded: Arc<AtomicU64>,
    pub acks_received: Arc<AtomicU64>,
    pub decode_failures: Arc<AtomicU64>,
    pub chunks_enqueued: Arc<AtomicU64>,
    pub stale_discarded: Arc<AtomicU64>,
    pub dropped_overflow: Arc<AtomicU64>,
    pub chunks_played: Arc<AtomicU64>,
    pub bytes_played: Arc<AtomicU64>,
    pub underruns: Arc<AtomicU64>,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame_decoded(&self) {
        self.frames_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ack(&self) {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.chunks_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow_drop(&self) {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_played(&self, bytes: usize) {
        self.chunks_played.fetch_add(1, Ordering::Relaxed);
        self.bytes_played.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            chunks_enqueued: self.chunks_enqueued.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            chunks_played: self.chunks_played.load(Ordering::Relaxed),
            bytes_played: self.bytes_played.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub frames_decoded: u64,
    pub acks_received: u64,
    pub decode_failures: u64,
    pub chunks_enqueued: u64,
    pub stale_discarded: u64,
    pub dropped_overflow: u64,
    pub chunks_played: u64,
    pub bytes_played: u64,
    pub underruns: u64,
}
