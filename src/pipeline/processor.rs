//! Pipeline orchestrator. Owns every stage and threads each block through
//! them in a fixed order.
//!
//! # Stage order
//!
//! ```text
//! noise reduction → dereverb → AGC → VAD → amplifier → resampler
//! ```
//!
//! * AGC and VAD make level decisions, so they see the denoised signal.
//! * The gate runs before the amplifier so gated silence is never boosted.
//! * The resampler is last: it is the only stage that changes the block
//!   length, and it must work on the final levelled signal.
//!
//! # Ownership
//!
//! All methods take `&mut self`.  The pipeline is `Send` (it can be moved
//! into the audio callback) but not `Sync`; cross-thread drift reports go
//! through a [`QueueDepthReporter`] instead of shared access.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};

use thiserror::Error;

use crate::audio::{
    AgcEffect, AmplifierEffect, AudioEffect, DereverbEffect, NoiseReducer, ResamplerEffect,
    VadEffect,
};
use crate::config::{ConfigError, PipelineConfig};

use super::reporter::{QueueDepthReporter, SharedRatio, REPORT_CAPACITY};

// ---------------------------------------------------------------------------
// ReleaseError
// ---------------------------------------------------------------------------

/// One or more stages failed to release.  Every stage was still given the
/// chance to release.
#[derive(Debug, Error)]
#[error("{} stage(s) failed to release: {}", .failures.len(), .failures.join("; "))]
pub struct ReleaseError {
    /// `"<stage>: <reason>"` per failure, in pipeline order.
    pub failures: Vec<String>,
}

// ---------------------------------------------------------------------------
// AudioProcessorPipeline
// ---------------------------------------------------------------------------

/// Owns the six stages and applies them in order.
///
/// ```rust
/// use mic_conditioner::config::PipelineConfig;
/// use mic_conditioner::pipeline::AudioProcessorPipeline;
///
/// let mut config = PipelineConfig::default();
/// config.amplifier.gain = 2.0;
///
/// let mut pipeline = AudioProcessorPipeline::new(&config);
/// assert_eq!(pipeline.process(vec![100, -100], 1), vec![200, -200]);
/// ```
pub struct AudioProcessorPipeline {
    noise_reducer: Box<dyn AudioEffect>,
    dereverb: Box<dyn AudioEffect>,
    agc: AgcEffect,
    vad: VadEffect,
    amplifier: AmplifierEffect,
    resampler: ResamplerEffect,

    config: PipelineConfig,
    report_tx: SyncSender<u64>,
    report_rx: Receiver<u64>,
    ratio: SharedRatio,
    released: bool,
}

impl Default for AudioProcessorPipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl AudioProcessorPipeline {
    /// Build a pipeline with the built-in noise reduction and dereverb stages.
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_stages(
            config,
            Box::new(NoiseReducer::new(config.noise_reduction.clone())),
            Box::new(DereverbEffect::new(config.dereverb.clone())),
        )
    }

    /// Build a pipeline with custom noise reduction and dereverb stages.
    pub fn with_stages(
        config: &PipelineConfig,
        noise_reducer: Box<dyn AudioEffect>,
        dereverb: Box<dyn AudioEffect>,
    ) -> Self {
        let (report_tx, report_rx) = mpsc::sync_channel(REPORT_CAPACITY);
        Self {
            noise_reducer,
            dereverb,
            agc: AgcEffect::new(config.agc.clone()),
            vad: VadEffect::new(config.vad.clone()),
            amplifier: AmplifierEffect::new(config.amplifier.clone()),
            resampler: ResamplerEffect::new(config.drift.clone()),
            config: config.clone(),
            report_tx,
            report_rx,
            ratio: SharedRatio::new(1.0),
            released: false,
        }
    }

    /// The stages in processing order.
    fn stages_mut(&mut self) -> [&mut dyn AudioEffect; 6] {
        [
            self.noise_reducer.as_mut(),
            self.dereverb.as_mut(),
            &mut self.agc,
            &mut self.vad,
            &mut self.amplifier,
            &mut self.resampler,
        ]
    }

    /// Stage names in processing order.
    pub fn stage_names(&self) -> [&'static str; 6] {
        [
            self.noise_reducer.name(),
            self.dereverb.name(),
            self.agc.name(),
            self.vad.name(),
            self.amplifier.name(),
            self.resampler.name(),
        ]
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    /// Run one interleaved block through every stage.
    ///
    /// The returned block replaces the caller's buffer; its length differs
    /// from the input only when the resampler is active.  A zero channel
    /// count yields an empty block.
    pub fn process(&mut self, mut block: Vec<i16>, channels: usize) -> Vec<i16> {
        if self.released {
            return block;
        }
        if channels == 0 {
            block.clear();
            return block;
        }

        self.apply_queue_reports();

        for stage in self.stages_mut() {
            block = stage.process(block, channels);
        }
        block
    }

    // -----------------------------------------------------------------------
    // Drift control
    // -----------------------------------------------------------------------

    /// Feed one queue-depth observation to the drift controller and return
    /// the ratio the next block will use.
    pub fn update_playback_ratio(&mut self, queued_ms: u64) -> f64 {
        let ratio = self.resampler.update_playback_ratio(queued_ms);
        self.ratio.store(ratio);
        ratio
    }

    /// Handle for reporting queue depth from another thread.
    pub fn queue_depth_reporter(&self) -> QueueDepthReporter {
        QueueDepthReporter::new(self.report_tx.clone(), self.ratio.clone())
    }

    /// Apply pending reports in arrival order, at most `REPORT_CAPACITY`
    /// per block.
    fn apply_queue_reports(&mut self) {
        let mut applied = false;
        for queued_ms in self.report_rx.try_iter().take(REPORT_CAPACITY) {
            self.resampler.update_playback_ratio(queued_ms);
            applied = true;
        }
        if applied {
            self.ratio.store(self.resampler.ratio());
        }
    }

    pub fn playback_ratio(&self) -> f64 {
        self.resampler.ratio()
    }

    /// Force the resampling ratio until the next queue-depth update.
    /// Unusable ratios (non-finite, non-positive) are ignored.
    pub fn set_playback_ratio(&mut self, ratio: f64) -> f64 {
        let ratio = self.resampler.set_ratio(ratio);
        self.ratio.store(ratio);
        ratio
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Swap every stage's configuration.  Accumulated state is kept.
    ///
    /// The configuration is validated first; on error nothing changes.
    pub fn apply_config(&mut self, config: &PipelineConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            log::warn!("pipeline: config rejected: {e}");
            return Err(e);
        }

        for stage in self.stages_mut() {
            stage.apply_config(config);
        }
        self.config = config.clone();

        log::info!(
            "pipeline: config applied (nr={}, dereverb={}, agc={}, vad={}@{}, gain={})",
            config.noise_reduction.enabled,
            config.dereverb.enabled,
            config.agc.enabled,
            config.vad.enabled,
            config.vad.threshold,
            config.amplifier.gain
        );
        Ok(())
    }

    /// External speech probability for the voice-activity gate.
    pub fn set_speech_probability(&mut self, probability: Option<f32>) {
        self.vad.set_speech_probability(probability);
    }

    pub fn agc(&self) -> &AgcEffect {
        &self.agc
    }

    pub fn vad(&self) -> &VadEffect {
        &self.vad
    }

    pub fn amplifier(&self) -> &AmplifierEffect {
        &self.amplifier
    }

    pub fn resampler(&self) -> &ResamplerEffect {
        &self.resampler
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Clear transient state in every stage.  A stage that panics is logged
    /// and skipped; the remaining stages are still reset.
    pub fn reset(&mut self) {
        for stage in self.stages_mut() {
            let name = stage.name();
            if panic::catch_unwind(AssertUnwindSafe(|| stage.reset())).is_err() {
                log::warn!("pipeline: stage {name} panicked during reset");
            }
        }
        // drop reports that describe the old stream
        self.report_rx.try_iter().take(REPORT_CAPACITY).for_each(drop);
        self.ratio.store(self.resampler.ratio());
    }

    /// Release every stage.  Idempotent; after the first call `process`
    /// returns blocks unchanged.
    pub fn release(&mut self) -> Result<(), ReleaseError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut failures = Vec::new();
        for stage in self.stages_mut() {
            let name = stage.name();
            match panic::catch_unwind(AssertUnwindSafe(|| stage.release())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!("pipeline: {e}");
                    failures.push(format!("{name}: {e}"));
                }
                Err(_) => {
                    log::warn!("pipeline: stage {name} panicked during release");
                    failures.push(format!("{name}: panicked"));
                }
            }
        }

        log::info!("pipeline: released");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReleaseError { failures })
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for AudioProcessorPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("pipeline: release on drop: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
