pub mod sink;

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use stream_core::{protocol, StreamConfig, StreamSession};
use tracing::info;

use crate::sink::WavFileSink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    let config = StreamConfig::from_env();
    let session_id = uuid::Uuid::new_v4().to_string();
    let output: PathBuf = std::env::var("OUTPUT_WAV")
        .unwrap_or_else(|_| "playout.wav".into())
        .into();

    info!(
        session_id,
        queue_depth = config.queue_depth,
        min_buffer_ms = config.min_buffer_duration_ms,
        sample_rate_hz = config.sample_rate_hz,
        output = %output.display(),
        "starting playback session"
    );

    let session = Arc::new(StreamSession::new(&config));
    let sink = WavFileSink::create(&output, config.sample_rate_hz)?;
    let mut scheduler = stream_core::PlayoutScheduler::new(
        session.queue(),
        sink,
        &config,
        session.metrics().clone(),
    );

    // Simulated network: tone sliced unevenly, lightly reordered, delivered
    // with random gaps.
    let deliveries = jittered_deliveries(&config);
    info!(frames = deliveries.len(), "feeding simulated deliveries");

    let producer = tokio::spawn({
        let session = Arc::clone(&session);
        async move {
            for (delay, frame) in deliveries {
                tokio::time::sleep(delay).await;
                session.on_delivery(&frame);
            }
        }
    });

    let mut interval = tokio::time::interval(config.poll_interval());
    loop {
        interval.tick().await;
        scheduler.drive()?;
        if session.is_drained() {
            break;
        }
    }
    producer.await?;

    scheduler.into_sink().finalize()?;

    let snapshot = session.metrics().snapshot();
    info!(
        session_id,
        metrics = %serde_json::to_string(&snapshot)?,
        "playback session complete"
    );
    Ok(())
}

/// Two seconds of a 440 Hz tone, cut into uneven sequence-tagged frames,
/// reordered within small windows and assigned random inter-arrival delays.
fn jittered_deliveries(config: &StreamConfig) -> Vec<(Duration, Vec<u8>)> {
    let mut rng = rand::thread_rng();

    let total_samples = config.sample_rate_hz as usize * 2;
    let mut pcm = Vec::with_capacity(total_samples * 2);
    for n in 0..total_samples {
        let t = n as f32 / config.sample_rate_hz as f32;
        let sample = (0.3 * (TAU * 440.0 * t).sin() * i16::MAX as f32) as i16;
        pcm.extend_from_slice(&sample.to_le_bytes());
    }

    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut rest = pcm.as_slice();
    while !rest.is_empty() {
        let take = (rng.gen_range(150..=600) * 2).min(rest.len());
        let (chunk, tail) = rest.split_at(take);
        chunks.push(chunk.to_vec());
        rest = tail;
    }

    let last = chunks.len() - 1;
    let mut frames: Vec<Vec<u8>> = chunks
        .iter()
        .enumerate()
        .map(|(seq, chunk)| protocol::encode_audio_frame(seq as i32, chunk, seq == last))
        .collect();

    // Reorder within windows narrower than the queue depth, so displacement
    // stays recoverable.
    let window = (config.queue_depth / 2).max(2);
    for group in frames.chunks_mut(window) {
        group.shuffle(&mut rng);
    }

    frames
        .into_iter()
        .map(|frame| (Duration::from_millis(rng.gen_range(0..6)), frame))
        .collect()
}
