//! Offline drift-correction simulation.
//!
//! Runs a synthetic capture stream through [`AudioProcessorPipeline`] into a
//! simulated send queue whose consumer clock runs slightly fast, reporting
//! the queue depth after every block, and logs how the resampling ratio
//! holds the queue near its target.
//!
//! ```text
//! mic-conditioner [path/to/pipeline.toml]
//! RUST_LOG=debug mic-conditioner        # also log drift mode changes
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;

use mic_conditioner::config::PipelineConfig;
use mic_conditioner::pipeline::{AudioProcessorPipeline, ReportError};

// ---------------------------------------------------------------------------
// Simulation parameters
// ---------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: usize = 2;
/// 10 ms blocks.
const BLOCK_FRAMES: usize = SAMPLE_RATE as usize / 100;
/// Consumer clock runs 0.3 % faster than the capture clock.
const CONSUMER_DRIFT: f64 = 1.003;
const SIMULATED_SECS: usize = 30;

// ---------------------------------------------------------------------------
// Capture source
// ---------------------------------------------------------------------------

/// Interleaved 440 Hz tone, continuous across blocks.
struct ToneSource {
    phase: f32,
}

impl ToneSource {
    fn next_block(&mut self) -> Vec<i16> {
        let step = 2.0 * std::f32::consts::PI * 440.0 / SAMPLE_RATE as f32;
        let mut block = Vec::with_capacity(BLOCK_FRAMES * CHANNELS);
        for _ in 0..BLOCK_FRAMES {
            let v = (6_000.0 * self.phase.sin()) as i16;
            block.extend(std::iter::repeat(v).take(CHANNELS));
            self.phase = (self.phase + step) % (2.0 * std::f32::consts::PI);
        }
        block
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("mic-conditioner drift simulation starting up");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => PipelineConfig::load_from(&path),
        None => PipelineConfig::load(),
    }
    .unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        PipelineConfig::default()
    });

    let mut pipeline = AudioProcessorPipeline::new(&config);
    let reporter = pipeline.queue_depth_reporter();
    log::info!("stages: {}", pipeline.stage_names().join(" → "));

    let mut source = ToneSource { phase: 0.0 };
    let mut queue: VecDeque<i16> = VecDeque::with_capacity(SAMPLE_RATE as usize * CHANNELS);
    let consume_per_block = BLOCK_FRAMES as f64 * CONSUMER_DRIFT;
    let mut consume_debt = 0.0_f64;

    for block_idx in 1..=SIMULATED_SECS * 100 {
        let out = pipeline.process(source.next_block(), CHANNELS);
        queue.extend(out);

        // consumer side: whole frames only, carry the fraction
        consume_debt += consume_per_block;
        let frames = (consume_debt as usize).min(queue.len() / CHANNELS);
        consume_debt -= frames as f64;
        consume_debt = consume_debt.min(consume_per_block);
        queue.drain(..frames * CHANNELS);

        let queued_ms = (queue.len() / CHANNELS) as u64 * 1_000 / SAMPLE_RATE as u64;
        match reporter.report(queued_ms) {
            Ok(()) => {}
            Err(ReportError::Full) => log::debug!("report dropped, pipeline behind"),
            Err(ReportError::PipelineGone) => {
                log::warn!("pipeline gone, stopping simulation");
                break;
            }
        }

        if block_idx % 100 == 0 {
            log::info!(
                "t={:>2}s queued={:>3}ms ratio={:.5}",
                block_idx / 100,
                queued_ms,
                reporter.current_ratio()
            );
        }
    }

    if let Err(e) = pipeline.release() {
        log::warn!("{e}");
    }
    log::info!("simulation finished");
}
