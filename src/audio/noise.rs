//! Noise-floor expander used as the default noise reduction stage.
//!
//! A lightweight stand-in for a spectral denoiser: the block RMS of
//! background noise is tracked with a fast-fall / slow-rise follower, and
//! blocks that sit close to that floor are pushed down by up to
//! `max_attenuation_db`.  Blocks well above the floor (speech) pass at unity.
//!
//! Any other [`AudioEffect`] can take this slot in the pipeline; see
//! [`AudioProcessorPipeline::with_stages`](crate::pipeline::AudioProcessorPipeline::with_stages).

use crate::config::{NoiseReductionConfig, PipelineConfig};

use super::effect::{apply_gain, block_rms, AudioEffect};

/// Follower coefficient when the block is quieter than the floor.
const FLOOR_FALL: f64 = 0.5;
/// Follower coefficient when the block is louder than the floor.
const FLOOR_RISE: f64 = 0.002;
/// Floor never drops below this (digital silence would pin SNR at infinity).
const MIN_FLOOR: f64 = 1e-5;
/// Gain smoothing toward a higher target.
const OPEN_SMOOTHING: f32 = 0.5;
/// Gain smoothing toward a lower target.
const CLOSE_SMOOTHING: f32 = 0.2;

/// Usable attenuation depth: negative depths would boost, NaN disables.
fn attenuation_db(db: f32) -> f32 {
    if db.is_nan() {
        0.0
    } else {
        db.max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct NoiseReducer {
    config: NoiseReductionConfig,
    noise_floor: Option<f64>,
    gain: f32,
}

impl Default for NoiseReducer {
    fn default() -> Self {
        Self::new(NoiseReductionConfig::default())
    }
}

impl NoiseReducer {
    pub fn new(config: NoiseReductionConfig) -> Self {
        Self {
            config,
            noise_floor: None,
            gain: 1.0,
        }
    }

    pub fn config(&self) -> &NoiseReductionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: NoiseReductionConfig) {
        self.config = config;
    }

    /// Current noise floor estimate (normalised RMS).
    pub fn noise_floor(&self) -> Option<f64> {
        self.noise_floor
    }

    /// Smoothed gain applied to the last block.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn track_floor(&mut self, rms: f64) -> f64 {
        let floor = match self.noise_floor {
            None => rms,
            Some(f) if rms < f => f + (rms - f) * FLOOR_FALL,
            Some(f) => f + (rms - f) * FLOOR_RISE,
        }
        .max(MIN_FLOOR);
        self.noise_floor = Some(floor);
        floor
    }
}

impl AudioEffect for NoiseReducer {
    fn name(&self) -> &'static str {
        "noise_reduction"
    }

    fn process(&mut self, mut block: Vec<i16>, _channels: usize) -> Vec<i16> {
        if !self.config.enabled || block.is_empty() {
            return block;
        }

        let rms = block_rms(&block);
        let floor = self.track_floor(rms);

        let floor_gain = 10f32.powf(-attenuation_db(self.config.max_attenuation_db) / 20.0);
        let open_ratio = self.config.open_ratio.max(1.01);
        let snr = (rms / floor) as f32;
        let target = ((snr - 1.0) / (open_ratio - 1.0)).clamp(floor_gain, 1.0);

        let smoothing = if target > self.gain {
            OPEN_SMOOTHING
        } else {
            CLOSE_SMOOTHING
        };
        self.gain += (target - self.gain) * smoothing;

        if self.gain < 1.0 {
            apply_gain(&mut block, self.gain);
        }
        block
    }

    fn reset(&mut self) {
        self.noise_floor = None;
        self.gain = 1.0;
    }

    fn apply_config(&mut self, config: &PipelineConfig) {
        self.set_config(config.noise_reduction.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reducer() -> NoiseReducer {
        NoiseReducer::new(NoiseReductionConfig {
            enabled: true,
            ..NoiseReductionConfig::default()
        })
    }

    fn hiss(level: i16, len: usize) -> Vec<i16> {
        (0..len).map(|i| if i % 2 == 0 { level } else { -level }).collect()
    }

    #[test]
    fn disabled_passes_through() {
        let mut nr = NoiseReducer::default();
        assert_eq!(nr.process(hiss(200, 64), 1), hiss(200, 64));
        assert!(nr.noise_floor().is_none());
    }

    #[test]
    fn steady_noise_is_attenuated() {
        let mut nr = reducer();
        let mut out = Vec::new();
        for _ in 0..50 {
            out = nr.process(hiss(400, 480), 1);
        }
        // 12 dB ≈ ×0.251
        assert!(out[0] > 90 && out[0] < 110, "sample={}", out[0]);
    }

    #[test]
    fn speech_above_floor_passes_at_unity() {
        let mut nr = reducer();
        for _ in 0..50 {
            nr.process(hiss(400, 480), 1);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            out = nr.process(hiss(8_000, 480), 1);
        }
        assert!(nr.gain() > 0.99, "gain={}", nr.gain());
        assert!(out[0] >= 7_900, "sample={}", out[0]);
    }

    #[test]
    fn digital_silence_stays_silent() {
        let mut nr = reducer();
        for _ in 0..10 {
            assert_eq!(nr.process(vec![0; 32], 1), vec![0; 32]);
        }
        assert!(nr.noise_floor().unwrap() >= MIN_FLOOR);
    }

    #[test]
    fn reset_forgets_floor() {
        let mut nr = reducer();
        for _ in 0..20 {
            nr.process(hiss(400, 480), 1);
        }
        nr.reset();
        assert!(nr.noise_floor().is_none());
        assert_eq!(nr.gain(), 1.0);

        let mut fresh = reducer();
        assert_eq!(nr.process(hiss(300, 64), 1), fresh.process(hiss(300, 64), 1));
    }

    #[test]
    fn negative_or_nan_attenuation_never_boosts() {
        for db in [-6.0, f32::NAN, f32::NEG_INFINITY] {
            let mut nr = NoiseReducer::new(NoiseReductionConfig {
                enabled: true,
                max_attenuation_db: db,
                ..NoiseReductionConfig::default()
            });
            for _ in 0..10 {
                let out = nr.process(hiss(400, 480), 1);
                assert!(out[0] <= 400, "db={db} sample={}", out[0]);
            }
        }
    }
}
