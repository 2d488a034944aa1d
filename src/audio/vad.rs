//! Energy / probability driven voice-activity gate.
//!
//! Each block gets a binary speech decision.  Non-speech blocks are zeroed
//! outright (hard gate, no fade).
//!
//! ## Decision
//!
//! `required = 1 - threshold / 100`.  When an external speech-probability
//! hint is present (e.g. from a neural noise suppressor), the block is
//! speech iff `hint >= required`.  Otherwise the block RMS is compared to
//! `required * 0.12`, which maps confidence onto an energy floor.

use crate::config::{PipelineConfig, VadConfig};

use super::effect::{block_rms, AudioEffect};

/// Maps the required confidence onto a block-RMS floor.
const ENERGY_CALIBRATION: f32 = 0.12;

/// Voice-activity gate stage.
#[derive(Debug, Clone, Default)]
pub struct VadEffect {
    config: VadConfig,
    speech_probability: Option<f32>,
    last_decision: Option<bool>,
}

impl VadEffect {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            speech_probability: None,
            last_decision: None,
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VadConfig) {
        self.config = config;
    }

    /// Supply (or clear) an external speech probability in `[0.0, 1.0]`.
    /// While set, it replaces the energy estimate.
    pub fn set_speech_probability(&mut self, probability: Option<f32>) {
        self.speech_probability = probability;
    }

    pub fn speech_probability(&self) -> Option<f32> {
        self.speech_probability
    }

    /// `Some(true)` if the last gated block was speech, `None` before the
    /// first enabled block or after a reset.
    pub fn last_decision(&self) -> Option<bool> {
        self.last_decision
    }

    /// Returns `true` when `block` should be let through.
    fn is_speech(&self, block: &[i16]) -> bool {
        let sensitivity = self.config.threshold.clamp(0, 100) as f32 / 100.0;
        let required = 1.0 - sensitivity;

        match self.speech_probability {
            Some(p) => p >= required,
            None => block_rms(block) as f32 >= required * ENERGY_CALIBRATION,
        }
    }
}

impl AudioEffect for VadEffect {
    fn name(&self) -> &'static str {
        "vad"
    }

    fn process(&mut self, mut block: Vec<i16>, _channels: usize) -> Vec<i16> {
        if !self.config.enabled {
            return block;
        }

        let speech = self.is_speech(&block);
        self.last_decision = Some(speech);
        if !speech {
            block.fill(0);
        }
        block
    }

    fn reset(&mut self) {
        self.speech_probability = None;
        self.last_decision = None;
    }

    fn apply_config(&mut self, config: &PipelineConfig) {
        self.set_config(config.vad.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn vad(threshold: i32) -> VadEffect {
        VadEffect::new(VadConfig {
            enabled: true,
            threshold,
        })
    }

    #[test]
    fn silence_is_gated() {
        let mut stage = vad(10);
        let out = stage.process(vec![0; 480], 1);
        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(stage.last_decision(), Some(false));
    }

    #[test]
    fn loud_block_passes() {
        // required = 0.9 → floor 0.108; constant 8000 → RMS ≈ 0.244
        let mut stage = vad(10);
        let block = vec![8_000_i16; 480];
        assert_eq!(stage.process(block.clone(), 1), block);
        assert_eq!(stage.last_decision(), Some(true));
    }

    #[test]
    fn quiet_block_is_zeroed() {
        // RMS ≈ 0.03 < 0.108
        let mut stage = vad(10);
        let out = stage.process(vec![1_000, -1_000, 1_000, -1_000], 2);
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn full_sensitivity_lets_everything_through() {
        let mut stage = vad(100);
        let out = stage.process(vec![0, 1, 0, -1], 1);
        assert_eq!(out, vec![0, 1, 0, -1]);
        assert_eq!(stage.last_decision(), Some(true));
    }

    #[test]
    fn threshold_is_clamped() {
        let mut stage = vad(250);
        assert_eq!(stage.process(vec![1, 2], 1), vec![1, 2]);

        let mut stage = vad(-5);
        assert_eq!(stage.process(vec![1_000; 4], 1), vec![0; 4]);
    }

    #[test]
    fn probability_hint_overrides_energy() {
        let mut stage = vad(50); // required = 0.5
        stage.set_speech_probability(Some(0.6));
        assert_eq!(stage.process(vec![0, 0, 5], 1), vec![0, 0, 5]);

        stage.set_speech_probability(Some(0.4));
        assert_eq!(stage.process(vec![20_000; 3], 1), vec![0; 3]);
    }

    #[test]
    fn disabled_passes_through() {
        let mut stage = VadEffect::new(VadConfig {
            enabled: false,
            threshold: 0,
        });
        assert_eq!(stage.process(vec![3, 4], 1), vec![3, 4]);
        assert!(stage.last_decision().is_none());
    }

    #[test]
    fn reset_clears_hint() {
        let mut stage = vad(50);
        stage.set_speech_probability(Some(1.0));
        stage.process(vec![0; 4], 1);
        stage.reset();
        assert!(stage.speech_probability().is_none());
        assert!(stage.last_decision().is_none());

        // back to the energy path: silence is gated again
        assert_eq!(stage.process(vec![0, 1], 1), vec![0, 0]);
    }
}
