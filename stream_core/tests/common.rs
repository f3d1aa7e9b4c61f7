//! Common utilities for integration tests

use std::sync::{Arc, Mutex};

use stream_core::protocol;
use stream_core::Sink;

/// Sink that records everything written to it.
pub struct MemorySink {
    written: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Returns the sink and a shared handle to its output buffer, so the
    /// buffer stays inspectable after the sink moves into a scheduler.
    pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                written: Arc::clone(&written),
            },
            written,
        )
    }
}

impl Sink for MemorySink {
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        self.written.lock().unwrap().extend_from_slice(pcm);
        Ok(())
    }
}

/// Sink whose every write fails, like an unplugged output device.
pub struct FailingSink;

impl Sink for FailingSink {
    fn write(&mut self, _pcm: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("output device gone")
    }
}

pub fn audio_frame(sequence: i32, payload: &[u8]) -> Vec<u8> {
    protocol::encode_audio_frame(sequence, payload, false)
}

pub fn final_frame(sequence: i32, payload: &[u8]) -> Vec<u8> {
    protocol::encode_audio_frame(sequence, payload, true)
}
