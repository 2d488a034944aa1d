//! Drift-compensating linear-interpolation resampler.
//!
//! The capture clock and the consumer clock never run at exactly the same
//! rate.  [`ResamplerEffect`] stretches (`ratio < 1`) or shrinks
//! (`ratio > 1`) each block so the downstream queue stays near its target
//! depth; the ratio comes from the embedded [`DriftController`].
//!
//! ## Continuity across blocks
//!
//! Interpolation runs over a virtual frame sequence: index 0 is the last
//! frame of the previous block, indices `1..=n` are the current block's
//! frames.  The read position left over after the last emitted frame is
//! carried into the next call (shifted by `n`), so a steady ratio produces
//! one continuous output stream regardless of block boundaries.  On the very
//! first block the previous frame is seeded from the block's own first frame
//! and reading starts at position 1.0.
//!
//! The output scratch buffer only ever grows (doubling), so the steady state
//! performs no allocation.

use crate::config::{DriftConfig, PipelineConfig};

use super::drift::DriftController;
use super::effect::{clamp_i16, AudioEffect};

/// Ratios closer to 1.0 than this are treated as unity.
const UNITY_TOLERANCE: f64 = 0.000_05;

/// Resampling stage with built-in drift control.
///
/// ```rust
/// use mic_conditioner::audio::{AudioEffect, ResamplerEffect};
///
/// let mut rs = ResamplerEffect::default();
/// rs.set_ratio(0.5);
/// let out = rs.process(vec![0; 200], 2); // 100 stereo frames
/// assert_eq!(out.len() / 2, 198);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResamplerEffect {
    controller: DriftController,
    /// Read position, in frames, relative to the carried previous frame.
    phase: f64,
    /// Last frame of the previous block; empty until the first block.
    prev_frame: Vec<i16>,
    /// Grow-only output buffer; only `..written` is meaningful.
    scratch: Vec<i16>,
}

impl ResamplerEffect {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            controller: DriftController::new(config),
            ..Self::default()
        }
    }

    pub fn drift_config(&self) -> &DriftConfig {
        self.controller.config()
    }

    pub fn set_drift_config(&mut self, config: DriftConfig) {
        self.controller.set_config(config);
    }

    /// Current resampling ratio (input frames consumed per output frame).
    pub fn ratio(&self) -> f64 {
        self.controller.ratio()
    }

    /// Force the ratio; the next controller update overwrites it.  See
    /// [`DriftController::set_ratio`] for the accepted range.  Returns the
    /// ratio now in effect.
    pub fn set_ratio(&mut self, ratio: f64) -> f64 {
        self.controller.set_ratio(ratio)
    }

    /// Fractional read position carried into the next block.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn integral(&self) -> f64 {
        self.controller.integral()
    }

    pub fn controller(&self) -> &DriftController {
        &self.controller
    }

    /// Report the downstream queue depth and return the ratio the next
    /// block will be resampled with.
    pub fn update_playback_ratio(&mut self, queued_ms: u64) -> f64 {
        self.controller.update(queued_ms)
    }

    /// Make sure `scratch` can hold at least `needed` samples.
    fn ensure_scratch(&mut self, needed: usize) {
        if self.scratch.len() < needed {
            let grown = (self.scratch.len() * 2).max(needed);
            self.scratch.resize(grown, 0);
        }
    }

    /// Resample `input` into `scratch`; returns the number of samples written.
    fn resample_into_scratch(&mut self, input: &[i16], channels: usize, ratio: f64) -> usize {
        let input_frames = input.len() / channels;
        if input_frames <= 1 {
            self.ensure_scratch(input.len());
            self.scratch[..input.len()].copy_from_slice(input);
            return input.len();
        }

        if self.prev_frame.len() != channels {
            self.prev_frame.clear();
            self.prev_frame.extend_from_slice(&input[..channels]);
            self.phase = 1.0;
        }

        // +1 for the carried previous frame
        let virtual_frames = input_frames + 1;
        let estimated = ((input_frames as f64 / ratio) + 4.0) as usize;
        self.ensure_scratch(estimated.max(8) * channels);

        let prev = &self.prev_frame;
        let sample = |frame: usize, channel: usize| -> i32 {
            if frame == 0 {
                prev[channel] as i32
            } else {
                input[(frame - 1) * channels + channel] as i32
            }
        };

        let mut pos = self.phase;
        let mut out_frames = 0usize;

        loop {
            let base = pos as usize;
            if base + 1 >= virtual_frames {
                break;
            }
            let frac = pos - base as f64;

            let required = (out_frames + 1) * channels;
            if required > self.scratch.len() {
                let grown = (self.scratch.len() * 2).max(required);
                self.scratch.resize(grown, 0);
            }

            let out_base = out_frames * channels;
            for c in 0..channels {
                let s0 = sample(base, c);
                let s1 = sample(base + 1, c);
                let v = s0 as f64 + (s1 - s0) as f64 * frac;
                self.scratch[out_base + c] = clamp_i16(v as i32);
            }

            out_frames += 1;
            pos += ratio;
        }

        let last = (input_frames - 1) * channels;
        self.prev_frame.copy_from_slice(&input[last..last + channels]);
        self.phase = pos - input_frames as f64;

        out_frames * channels
    }
}

impl AudioEffect for ResamplerEffect {
    fn name(&self) -> &'static str {
        "resampler"
    }

    fn process(&mut self, mut block: Vec<i16>, channels: usize) -> Vec<i16> {
        let ratio = self.controller.ratio();
        if (ratio - 1.0).abs() < UNITY_TOLERANCE {
            return block;
        }
        if channels == 0 {
            block.clear();
            return block;
        }

        let written = self.resample_into_scratch(&block, channels, ratio);

        // Reuse the caller's allocation for the result; it only grows when
        // the output is longer than the input.
        block.clear();
        block.extend_from_slice(&self.scratch[..written]);
        block
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.prev_frame.clear();
        self.controller.reset();
    }

    fn apply_config(&mut self, config: &PipelineConfig) {
        self.set_drift_config(config.drift.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
