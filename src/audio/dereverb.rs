//! Decay-tail suppressor used as the default dereverberation stage.
//!
//! Room reverb shows up as block energy that decays smoothly after the
//! direct sound stops.  The stage keeps a peak-hold envelope of block RMS
//! that decays by `tail_decay` per block; a block quieter than the envelope
//! is assumed to be mostly tail and is scaled by
//! `(rms / envelope) ^ strength`.  Blocks at or above the envelope pass
//! untouched.

use crate::config::{DereverbConfig, PipelineConfig};

use super::effect::{apply_gain, block_rms, AudioEffect};

/// Envelopes below this are treated as silence.
const SILENCE_RMS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct DereverbEffect {
    config: DereverbConfig,
    envelope: f64,
}

impl Default for DereverbEffect {
    fn default() -> Self {
        Self::new(DereverbConfig::default())
    }
}

impl DereverbEffect {
    pub fn new(config: DereverbConfig) -> Self {
        Self {
            config,
            envelope: 0.0,
        }
    }

    pub fn config(&self) -> &DereverbConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DereverbConfig) {
        self.config = config;
    }

    pub fn envelope(&self) -> f64 {
        self.envelope
    }
}

impl AudioEffect for DereverbEffect {
    fn name(&self) -> &'static str {
        "dereverb"
    }

    fn process(&mut self, mut block: Vec<i16>, _channels: usize) -> Vec<i16> {
        if !self.config.enabled || block.is_empty() {
            return block;
        }

        let rms = block_rms(&block);
        let decayed = self.envelope * self.config.tail_decay.clamp(0.0, 0.999) as f64;
        self.envelope = rms.max(decayed);

        if self.envelope > SILENCE_RMS && rms < self.envelope {
            let gain = (rms / self.envelope).powf(self.config.strength.max(0.0) as f64) as f32;
            apply_gain(&mut block, gain);
        }
        block
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn apply_config(&mut self, config: &PipelineConfig) {
        self.set_config(config.dereverb.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dereverb(strength: f32) -> DereverbEffect {
        DereverbEffect::new(DereverbConfig {
            enabled: true,
            tail_decay: 0.9,
            strength,
        })
    }

    #[test]
    fn steady_signal_is_untouched() {
        let mut d = dereverb(1.0);
        for _ in 0..20 {
            assert_eq!(d.process(vec![5_000, -5_000], 2), vec![5_000, -5_000]);
        }
    }

    #[test]
    fn tail_after_loud_block_is_suppressed() {
        let mut d = dereverb(1.0);
        d.process(vec![10_000; 64], 1);
        // envelope 0.305 → 0.275; tail rms 0.061 → gain ≈ 0.22
        let out = d.process(vec![2_000; 64], 1);
        assert!(out[0] < 500, "sample={}", out[0]);
        assert!(out[0] > 300, "sample={}", out[0]);
    }

    #[test]
    fn zero_strength_disables_suppression() {
        let mut d = dereverb(0.0);
        d.process(vec![10_000; 64], 1);
        assert_eq!(d.process(vec![2_000; 64], 1), vec![2_000; 64]);
    }

    #[test]
    fn disabled_passes_through() {
        let mut d = DereverbEffect::default();
        d.process(vec![10_000; 64], 1);
        assert_eq!(d.process(vec![2_000; 4], 1), vec![2_000; 4]);
        assert_eq!(d.envelope(), 0.0);
    }

    #[test]
    fn reset_clears_envelope() {
        let mut d = dereverb(1.0);
        d.process(vec![10_000; 64], 1);
        d.reset();
        assert_eq!(d.envelope(), 0.0);
        assert_eq!(d.process(vec![2_000; 4], 1), vec![2_000; 4]);
    }
}
