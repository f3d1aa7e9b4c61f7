// Configuration for the stream pipeline

use std::time::Duration;

use serde::Deserialize;

/// Tunables for reassembly and playout.
///
/// Defaults match the upstream service profile: 24 kHz mono 16-bit PCM, half
/// a second of safety buffer before playback starts.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Maximum chunks held in the ready-to-play queue.
    pub queue_depth: usize,
    /// Buffered audio required before playout starts (and after a stall).
    pub min_buffer_duration_ms: u32,
    pub sample_rate_hz: u32,
    pub bytes_per_sample: u32,
    /// Consumer-side poll period.
    pub poll_interval_ms: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_depth: 32,
            min_buffer_duration_ms: 500,
            sample_rate_hz: 24_000,
            bytes_per_sample: 2,
            poll_interval_ms: 2,
        }
    }
}

impl StreamConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let queue_depth = std::env::var("QUEUE_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.queue_depth);

        let min_buffer_duration_ms = std::env::var("MIN_BUFFER_DURATION_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.min_buffer_duration_ms);

        let sample_rate_hz = std::env::var("SAMPLE_RATE_HZ")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.sample_rate_hz);

        let bytes_per_sample = std::env::var("BYTES_PER_SAMPLE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.bytes_per_sample);

        let poll_interval_ms = std::env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.poll_interval_ms);

        Self {
            queue_depth,
            min_buffer_duration_ms,
            sample_rate_hz,
            bytes_per_sample,
            poll_interval_ms,
        }
    }

    /// The buffering-gate threshold in bytes, derived from the stream's fixed
    /// sample format. Divides last so rates not divisible by 1000 keep their
    /// precision.
    pub fn min_buffer_bytes(&self) -> usize {
        (self.min_buffer_duration_ms as u64
            * self.sample_rate_hz as u64
            * self.bytes_per_sample as u64
            / 1000) as usize
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_buffer_bytes_derivation() {
        let config = StreamConfig {
            min_buffer_duration_ms: 500,
            sample_rate_hz: 16_000,
            bytes_per_sample: 2,
            ..StreamConfig::default()
        };
        assert_eq!(config.min_buffer_bytes(), 16_000);
    }

    #[test]
    fn test_min_buffer_bytes_keeps_sub_millisecond_precision() {
        let config = StreamConfig {
            min_buffer_duration_ms: 500,
            sample_rate_hz: 44_100,
            bytes_per_sample: 2,
            ..StreamConfig::default()
        };
        // 88.2 bytes/ms, not 88: 500 ms must gate at 44100 bytes.
        assert_eq!(config.min_buffer_bytes(), 44_100);
    }

    #[test]
    fn test_default_profile() {
        let config = StreamConfig::default();
        // 24 kHz * 2 bytes = 48 bytes/ms, 500 ms gate.
        assert_eq!(config.min_buffer_bytes(), 24_000);
        assert_eq!(config.poll_interval(), Duration::from_millis(2));
    }
}
