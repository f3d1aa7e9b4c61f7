//! Sequenced reassembly of network-delivered audio chunks.
//!
//! Deliveries may arrive out of logical order. Chunks are parked in an
//! ordered `pending` map until their sequence number is the next one expected,
//! then released into a bounded `ready` FIFO the playout side drains. When
//! `ready` is full the chunk is dropped instead of blocking: the producer
//! shares an execution context with network reception and must never stall.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::metrics::StreamMetrics;

/// One unit of audio awaiting ordered playout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub sequence: i32,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(sequence: i32, data: Vec<u8>) -> Self {
        Self { sequence, data }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// What happened to a pushed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Sequence older than the release cursor; discarded.
    StaleDiscarded,
    /// Parked in the holding area, waiting for an earlier sequence.
    Pending,
    /// The cursor advanced. `released` chunks entered the ready queue and
    /// `dropped` lists the sequences lost to the capacity bound. Empty
    /// chunks advance the cursor without occupying a ready slot, so both
    /// fields can be zero.
    Advanced { released: usize, dropped: Vec<i32> },
}

/// Snapshot of queue state, for logs and diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub pending_len: usize,
    pub ready_len: usize,
    pub buffered_bytes: usize,
    pub next_sequence: i32,
    pub finished: bool,
}

#[derive(Debug, Default)]
struct QueueInner {
    pending: BTreeMap<i32, Chunk>,
    ready: VecDeque<Chunk>,
    next_sequence: i32,
    buffered_bytes: usize,
    finished: bool,
}

/// Holding area plus bounded ready-to-play channel, shared between the
/// producer (transport callback) and consumer (playout scheduler) sides.
///
/// One lock guards all state; it is held only for the duration of each call,
/// never across a sink write or a network read.
#[derive(Debug)]
pub struct ReassemblyQueue {
    inner: Mutex<QueueInner>,
    queue_depth: usize,
    metrics: StreamMetrics,
}

impl ReassemblyQueue {
    pub fn new(queue_depth: usize, metrics: StreamMetrics) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            queue_depth,
            metrics,
        }
    }

    /// Accept one decoded chunk from the producer side. Never blocks.
    pub fn push(&self, chunk: Chunk) -> PushOutcome {
        let mut inner = self.inner.lock().unwrap();

        if chunk.sequence < inner.next_sequence {
            debug!(
                sequence = chunk.sequence,
                next = inner.next_sequence,
                "stale chunk discarded"
            );
            self.metrics.record_stale();
            return PushOutcome::StaleDiscarded;
        }

        // Same sequence replaces the earlier arrival, so a duplicate is never
        // counted twice.
        inner.pending.insert(chunk.sequence, chunk);

        let start_sequence = inner.next_sequence;
        let mut released = 0usize;
        let mut dropped = Vec::new();
        loop {
            let next = inner.next_sequence;
            let Some(chunk) = inner.pending.remove(&next) else {
                break;
            };
            if chunk.byte_len() == 0 {
                // Nothing to play; consume the sequence number without
                // spending a ready slot.
                debug!(sequence = chunk.sequence, "empty chunk consumed");
            } else if inner.ready.len() >= self.queue_depth {
                warn!(
                    sequence = chunk.sequence,
                    depth = self.queue_depth,
                    "ready queue full, dropping chunk"
                );
                self.metrics.record_overflow_drop();
                dropped.push(chunk.sequence);
            } else {
                inner.buffered_bytes += chunk.byte_len();
                inner.ready.push_back(chunk);
                self.metrics.record_enqueued();
                released += 1;
            }
            inner.next_sequence += 1;
        }

        if inner.next_sequence == start_sequence {
            PushOutcome::Pending
        } else {
            PushOutcome::Advanced { released, dropped }
        }
    }

    /// Dequeue the oldest ready chunk. Non-blocking; `None` when empty.
    pub fn try_pop(&self) -> Option<Chunk> {
        let mut inner = self.inner.lock().unwrap();
        let chunk = inner.ready.pop_front()?;
        inner.buffered_bytes -= chunk.byte_len();
        Some(chunk)
    }

    /// Bytes currently sitting in the ready queue awaiting playout.
    pub fn buffered_bytes(&self) -> usize {
        self.inner.lock().unwrap().buffered_bytes
    }

    /// Note that the source has sent its last chunk for this request. The
    /// playout side uses this to flush a buffered tail smaller than the
    /// start-of-playback gate.
    pub fn mark_finished(&self) {
        self.inner.lock().unwrap().finished = true;
    }

    /// Clear everything and rewind the cursor; called when a new synthesis
    /// request begins.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        let stats = Self::stats_of(&inner);
        inner.pending.clear();
        inner.ready.clear();
        inner.next_sequence = 0;
        inner.buffered_bytes = 0;
        inner.finished = false;
        debug!(
            pending = stats.pending_len,
            ready = stats.ready_len,
            "reassembly queue reset"
        );
    }

    pub fn stats(&self) -> QueueStats {
        Self::stats_of(&self.inner.lock().unwrap())
    }

    fn stats_of(inner: &QueueInner) -> QueueStats {
        QueueStats {
            pending_len: inner.pending.len(),
            ready_len: inner.ready.len(),
            buffered_bytes: inner.buffered_bytes,
            next_sequence: inner.next_sequence,
            finished: inner.finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn queue(depth: usize) -> ReassemblyQueue {
        ReassemblyQueue::new(depth, StreamMetrics::new())
    }

    fn chunk(sequence: i32, len: usize) -> Chunk {
        Chunk::new(sequence, vec![sequence as u8; len])
    }

    #[test]
    fn test_in_order_release() {
        let q = queue(8);
        assert_eq!(
            q.push(chunk(0, 4)),
            PushOutcome::Advanced {
                released: 1,
                dropped: vec![]
            }
        );
        assert_eq!(
            q.push(chunk(1, 4)),
            PushOutcome::Advanced {
                released: 1,
                dropped: vec![]
            }
        );
        assert_eq!(q.try_pop().unwrap().sequence, 0);
        assert_eq!(q.try_pop().unwrap().sequence, 1);
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn test_gap_holds_until_filled() {
        let q = queue(8);
        assert_eq!(q.push(chunk(1, 4)), PushOutcome::Pending);
        assert_eq!(q.push(chunk(2, 4)), PushOutcome::Pending);
        assert!(q.try_pop().is_none());

        // Filling the gap releases everything held behind it.
        assert_eq!(
            q.push(chunk(0, 4)),
            PushOutcome::Advanced {
                released: 3,
                dropped: vec![]
            }
        );
        assert_eq!(q.try_pop().unwrap().sequence, 0);
        assert_eq!(q.try_pop().unwrap().sequence, 1);
        assert_eq!(q.try_pop().unwrap().sequence, 2);
    }

    #[test]
    fn test_random_permutation_drains_in_order() {
        let n = 64;
        let q = queue(n as usize);
        let mut sequences: Vec<i32> = (0..n).collect();
        sequences.shuffle(&mut rand::thread_rng());

        for seq in sequences {
            q.push(chunk(seq, 8));
        }

        for expected in 0..n {
            assert_eq!(q.try_pop().unwrap().sequence, expected);
        }
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn test_stale_duplicate_discarded() {
        let q = queue(8);
        q.push(chunk(0, 4));
        assert_eq!(q.try_pop().unwrap().sequence, 0);

        assert_eq!(q.push(chunk(0, 4)), PushOutcome::StaleDiscarded);
        assert_eq!(q.buffered_bytes(), 0);
    }

    #[test]
    fn test_duplicate_in_pending_counts_once() {
        let q = queue(8);
        q.push(chunk(1, 4));
        // Same sequence, different payload: replaces, never double-counts.
        q.push(Chunk::new(1, vec![0xFF; 6]));
        q.push(chunk(0, 4));

        assert_eq!(q.buffered_bytes(), 4 + 6);
        assert_eq!(q.try_pop().unwrap().byte_len(), 4);
        let second = q.try_pop().unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(second.data, vec![0xFF; 6]);
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn test_overflow_drops_instead_of_blocking() {
        let q = queue(1);
        assert_eq!(
            q.push(chunk(0, 4)),
            PushOutcome::Advanced {
                released: 1,
                dropped: vec![]
            }
        );
        assert_eq!(
            q.push(chunk(1, 4)),
            PushOutcome::Advanced {
                released: 0,
                dropped: vec![1]
            }
        );

        // The dropped sequence is consumed by the cursor: exactly one chunk
        // retained, playout continues from the survivor.
        assert_eq!(q.buffered_bytes(), 4);
        assert_eq!(q.try_pop().unwrap().sequence, 0);
        assert!(q.try_pop().is_none());
        assert_eq!(q.stats().next_sequence, 2);
    }

    #[test]
    fn test_byte_accounting_under_interleaving() {
        use rand::Rng;

        // Depth larger than the total push count so nothing overflows here.
        let q = queue(512);
        let mut rng = rand::thread_rng();
        let mut expected: usize = 0;
        let mut next_push = 0i32;

        for _ in 0..500 {
            if rng.gen_bool(0.6) {
                let len = rng.gen_range(1..32);
                assert_eq!(
                    q.push(chunk(next_push, len)),
                    PushOutcome::Advanced {
                        released: 1,
                        dropped: vec![]
                    }
                );
                expected += len;
                next_push += 1;
            } else if let Some(c) = q.try_pop() {
                expected -= c.byte_len();
            }
            assert_eq!(q.buffered_bytes(), expected);
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let q = queue(8);
        q.push(chunk(0, 4));
        q.push(chunk(2, 4));
        q.mark_finished();
        assert!(q.buffered_bytes() > 0);

        q.reset();

        let stats = q.stats();
        assert_eq!(stats.pending_len, 0);
        assert_eq!(stats.ready_len, 0);
        assert_eq!(stats.buffered_bytes, 0);
        assert_eq!(stats.next_sequence, 0);
        assert!(!stats.finished);

        // Sequence numbering restarts for the new request.
        assert_eq!(
            q.push(chunk(0, 4)),
            PushOutcome::Advanced {
                released: 1,
                dropped: vec![]
            }
        );
    }

    #[test]
    fn test_zero_length_chunk_advances_cursor_without_queuing() {
        let q = queue(8);
        assert_eq!(
            q.push(chunk(0, 0)),
            PushOutcome::Advanced {
                released: 0,
                dropped: vec![]
            }
        );
        assert_eq!(q.buffered_bytes(), 0);
        assert_eq!(q.stats().ready_len, 0);
        assert!(q.try_pop().is_none());

        // The consumed sequence number does not gap the stream.
        assert_eq!(
            q.push(chunk(1, 4)),
            PushOutcome::Advanced {
                released: 1,
                dropped: vec![]
            }
        );
        assert_eq!(q.try_pop().unwrap().sequence, 1);
    }
}
