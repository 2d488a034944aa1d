//! Fixed linear gain stage.

use crate::config::{AmplifierConfig, PipelineConfig};

use super::effect::{apply_gain, AudioEffect};

/// Multiplies every sample by the configured gain, saturating at the `i16`
/// limits.
///
/// ```rust
/// use mic_conditioner::audio::{AmplifierEffect, AudioEffect};
/// use mic_conditioner::config::AmplifierConfig;
///
/// let mut amp = AmplifierEffect::new(AmplifierConfig { gain: 2.0 });
/// assert_eq!(amp.process(vec![100, -100], 1), vec![200, -200]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AmplifierEffect {
    config: AmplifierConfig,
}

impl AmplifierEffect {
    pub fn new(config: AmplifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AmplifierConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AmplifierConfig) {
        self.config = config;
    }
}

impl AudioEffect for AmplifierEffect {
    fn name(&self) -> &'static str {
        "amplifier"
    }

    fn process(&mut self, mut block: Vec<i16>, _channels: usize) -> Vec<i16> {
        if self.config.gain == 1.0 {
            return block;
        }
        apply_gain(&mut block, self.config.gain);
        block
    }

    fn reset(&mut self) {}

    fn apply_config(&mut self, config: &PipelineConfig) {
        self.set_config(config.amplifier.clone());
    }
}
