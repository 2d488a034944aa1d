//! RMS-driven automatic gain control.
//!
//! ## Algorithm
//!
//! Per block:
//!
//! 1. Block RMS of the normalised samples.
//! 2. Desired gain = target RMS / block RMS, clamped to `[0.5, 5.0]`.
//! 3. The gain envelope follows the desired gain with an asymmetric
//!    exponential blend: 0.005 when lowering, 0.01 when raising.  Near
//!    silence the envelope relaxes toward unity instead.
//! 4. The envelope, clamped to `[0.8, 5.0]`, is applied with saturation.

use crate::config::{AgcConfig, PipelineConfig};

use super::effect::{apply_gain, block_rms, AudioEffect, FULL_SCALE};

/// Below this block RMS the signal is treated as silence.
const SILENCE_RMS: f64 = 0.001;
const DESIRED_GAIN_MIN: f32 = 0.5;
const DESIRED_GAIN_MAX: f32 = 5.0;
const APPLIED_GAIN_MIN: f32 = 0.8;
const APPLIED_GAIN_MAX: f32 = 5.0;
/// Blend factor when the desired gain is below the envelope.
const LOWER_SMOOTHING: f32 = 0.005;
/// Blend factor when the desired gain is above the envelope.
const RAISE_SMOOTHING: f32 = 0.01;
/// Blend factor toward unity during silence.
const SILENCE_RELAX: f32 = 0.001;

/// Automatic gain control stage.
#[derive(Debug, Clone, Default)]
pub struct AgcEffect {
    config: AgcConfig,
    /// Smoothed gain.  `0.0` means "not yet seeded".
    envelope: f32,
    last_gain: Option<f32>,
}

impl AgcEffect {
    pub fn new(config: AgcConfig) -> Self {
        Self {
            config,
            envelope: 0.0,
            last_gain: None,
        }
    }

    pub fn config(&self) -> &AgcConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AgcConfig) {
        self.config = config;
    }

    /// Gain applied to the most recent active block, `None` before the first
    /// one or after a reset.
    pub fn current_gain(&self) -> Option<f32> {
        self.last_gain
    }

    fn update_envelope(&mut self, rms: f64) {
        let target_rms = (self.config.target_level as f64 / FULL_SCALE).clamp(0.01, 0.9);

        if rms > SILENCE_RMS {
            let desired =
                ((target_rms / (rms + 1e-6)) as f32).clamp(DESIRED_GAIN_MIN, DESIRED_GAIN_MAX);

            if self.envelope == 0.0 {
                self.envelope = 1.0;
            }

            let smoothing = if desired < self.envelope {
                LOWER_SMOOTHING
            } else {
                RAISE_SMOOTHING
            };
            self.envelope = self.envelope * (1.0 - smoothing) + desired * smoothing;
        } else {
            self.envelope = self.envelope * (1.0 - SILENCE_RELAX) + SILENCE_RELAX;
        }
    }
}

impl AudioEffect for AgcEffect {
    fn name(&self) -> &'static str {
        "agc"
    }

    fn process(&mut self, mut block: Vec<i16>, _channels: usize) -> Vec<i16> {
        if !self.config.enabled || self.config.target_level <= 0 || block.is_empty() {
            return block;
        }

        self.update_envelope(block_rms(&block));

        let gain = self.envelope.clamp(APPLIED_GAIN_MIN, APPLIED_GAIN_MAX);
        self.last_gain = Some(gain);
        apply_gain(&mut block, gain);
        block
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.last_gain = None;
    }

    fn apply_config(&mut self, config: &PipelineConfig) {
        self.set_config(config.agc.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn agc(target_level: i32) -> AgcEffect {
        AgcEffect::new(AgcConfig {
            enabled: true,
            target_level,
        })
    }

    fn tone(amplitude: f32, len: usize) -> Vec<i16> {
        let step = 2.0 * std::f32::consts::PI * 440.0 / 48_000.0;
        (0..len)
            .map(|i| (amplitude * (step * i as f32).sin()) as i16)
            .collect()
    }

    #[test]
    fn disabled_passes_through() {
        let mut stage = AgcEffect::new(AgcConfig {
            enabled: false,
            target_level: 32_000,
        });
        let block = tone(1_000.0, 480);
        assert_eq!(stage.process(block.clone(), 1), block);
        assert!(stage.current_gain().is_none());
    }

    #[test]
    fn non_positive_target_passes_through() {
        let mut stage = agc(0);
        let block = tone(1_000.0, 480);
        assert_eq!(stage.process(block.clone(), 1), block);
    }

    #[test]
    fn first_block_seeds_envelope_near_unity() {
        let mut stage = agc(32_000);
        stage.process(tone(1_000.0, 480), 1);
        // seeded at 1.0, then one raising step toward 5.0
        let gain = stage.current_gain().unwrap();
        assert!((gain - (0.99 + 5.0 * 0.01)).abs() < 1e-4, "gain={gain}");
    }

    #[test]
    fn quiet_signal_gain_rises_gradually() {
        let mut stage = agc(32_000);
        let mut prev = 0.0;
        for _ in 0..50 {
            stage.process(tone(1_000.0, 480), 1);
            let g = stage.current_gain().unwrap();
            assert!(g >= prev);
            prev = g;
        }
        assert!(prev > 1.3 && prev <= APPLIED_GAIN_MAX, "gain={prev}");
    }

    #[test]
    fn loud_signal_converges_without_oscillation() {
        // RMS ≈ 0.43 against a 0.1 target → desired gain clamps to 0.5,
        // applied gain settles on the 0.8 floor.
        let mut stage = agc(3_277);
        let mut gains = Vec::new();
        for _ in 0..2_000 {
            stage.process(tone(20_000.0, 480), 1);
            gains.push(stage.current_gain().unwrap());
        }

        for pair in gains.windows(2) {
            // monotonic descent: never climbs back by more than a smoothing step
            assert!(pair[1] <= pair[0] + RAISE_SMOOTHING, "{} → {}", pair[0], pair[1]);
        }
        let last = *gains.last().unwrap();
        assert!((last - APPLIED_GAIN_MIN).abs() < 1e-3, "gain={last}");
    }

    #[test]
    fn silence_relaxes_toward_unity() {
        let mut stage = agc(32_000);
        for _ in 0..500 {
            stage.process(tone(1_000.0, 480), 1);
        }
        let raised = stage.current_gain().unwrap();
        assert!(raised > 2.0);

        for _ in 0..5_000 {
            stage.process(vec![0; 480], 1);
        }
        let relaxed = stage.current_gain().unwrap();
        assert!(relaxed < raised);
        assert!((relaxed - 1.0).abs() < 0.05, "gain={relaxed}");
    }

    #[test]
    fn silence_on_fresh_stage_uses_gain_floor() {
        let mut stage = agc(32_000);
        let out = stage.process(vec![0; 16], 1);
        assert_eq!(out, vec![0; 16]);
        // envelope 0.001 clamps up to the 0.8 floor
        assert!((stage.current_gain().unwrap() - APPLIED_GAIN_MIN).abs() < 1e-6);
    }

    #[test]
    fn output_stays_in_range() {
        let mut stage = agc(32_000);
        for _ in 0..1_000 {
            let out = stage.process(vec![i16::MIN, i16::MAX, 30_000, -30_000], 2);
            assert_eq!(out.len(), 4);
        }
        let out = stage.process(vec![i16::MAX, i16::MIN], 2);
        assert_eq!(out[0].signum(), 1);
        assert_eq!(out[1].signum(), -1);
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut used = agc(32_000);
        for _ in 0..100 {
            used.process(tone(1_000.0, 480), 1);
        }
        used.reset();
        assert!(used.current_gain().is_none());

        let mut fresh = agc(32_000);
        let block = tone(2_000.0, 480);
        assert_eq!(used.process(block.clone(), 1), fresh.process(block, 1));
    }
}
