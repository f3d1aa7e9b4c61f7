//! WAV file playback sink.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use hound::{SampleFormat, WavSpec, WavWriter};
use stream_core::Sink;

/// Writes 16-bit little-endian PCM into a mono WAV file.
///
/// Stands in for a hardware output device; the stream's pacing behavior is
/// identical either way.
pub struct WavFileSink {
    writer: WavWriter<BufWriter<File>>,
    // A write may end mid-sample; the odd byte carries into the next write.
    pending: Option<u8>,
}

impl WavFileSink {
    pub fn create(path: &Path, sample_rate_hz: u32) -> anyhow::Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: sample_rate_hz,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("creating {}", path.display()))?;
        Ok(Self {
            writer,
            pending: None,
        })
    }

    pub fn finalize(self) -> anyhow::Result<()> {
        self.writer.finalize().context("finalizing wav file")?;
        Ok(())
    }
}

impl Sink for WavFileSink {
    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        let mut bytes = pcm;
        if let Some(lo) = self.pending.take() {
            if let Some((&hi, rest)) = bytes.split_first() {
                self.writer
                    .write_sample(i16::from_le_bytes([lo, hi]))
                    .context("writing wav sample")?;
                bytes = rest;
            } else {
                self.pending = Some(lo);
                return Ok(());
            }
        }
        let mut pairs = bytes.chunks_exact(2);
        for pair in &mut pairs {
            self.writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .context("writing wav sample")?;
        }
        self.pending = pairs.remainder().first().copied();
        Ok(())
    }
}
