//! The stage contract shared by every pipeline effect, plus the sample
//! helpers the stages have in common.

use thiserror::Error;

use crate::config::PipelineConfig;

// ---------------------------------------------------------------------------
// EffectError
// ---------------------------------------------------------------------------

/// Failure reported by a stage while freeing its resources.
///
/// The built-in stages hold nothing that can fail to free; pluggable stages
/// wrapping native handles use this to surface close errors.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("failed to release {stage}: {reason}")]
    Release { stage: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// AudioEffect
// ---------------------------------------------------------------------------

/// One processing stage of the pipeline.
///
/// Blocks are interleaved `i16` samples with `channels` samples per frame.
/// A stage takes the block by value and returns the block the next stage
/// should see.  Most stages mutate in place and hand the same `Vec` back;
/// the resampler may return a different length, so callers must always use
/// the returned value.
///
/// All methods take `&mut self`: a stage is owned by exactly one caller and
/// may be moved to the audio thread (`Send`) but never shared.
pub trait AudioEffect: Send {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Transform one block.  Never fails; degenerate input (empty block,
    /// zero channels) degrades to an empty or unchanged block.
    fn process(&mut self, block: Vec<i16>, channels: usize) -> Vec<i16>;

    /// Clear transient history.  Idempotent, keeps allocations.
    fn reset(&mut self);

    /// Pick this stage's settings out of a full pipeline configuration.
    /// Stages without settings ignore it.
    fn apply_config(&mut self, _config: &PipelineConfig) {}

    /// Free held resources.  Must tolerate repeated calls.  No `process`
    /// call follows a release.
    fn release(&mut self) -> Result<(), EffectError> {
        self.reset();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sample helpers
// ---------------------------------------------------------------------------

/// Full-scale divisor used to normalise `i16` samples to `[-1.0, 1.0)`.
pub const FULL_SCALE: f64 = 32_768.0;

/// Saturate a widened sample back into the `i16` range.
#[inline]
pub fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Multiply every sample by `gain`, truncating toward zero and saturating.
pub fn apply_gain(block: &mut [i16], gain: f32) {
    for sample in block.iter_mut() {
        // float → int `as` truncates and saturates
        *sample = clamp_i16((*sample as f32 * gain) as i32);
    }
}

/// Root-mean-square of the normalised samples.  `0.0` for an empty block.
pub fn block_rms(block: &[i16]) -> f64 {
    if block.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = block
        .iter()
        .map(|&s| {
            let n = s as f64 / FULL_SCALE;
            n * n
        })
        .sum();
    (sum_sq / block.len() as f64).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_saturates_both_ends() {
        assert_eq!(clamp_i16(40_000), i16::MAX);
        assert_eq!(clamp_i16(-40_000), i16::MIN);
        assert_eq!(clamp_i16(123), 123);
    }

    #[test]
    fn apply_gain_truncates_toward_zero() {
        let mut block = [3, -3];
        apply_gain(&mut block, 0.5);
        assert_eq!(block, [1, -1]);
    }

    #[test]
    fn apply_gain_saturates() {
        let mut block = [20_000, -20_000];
        apply_gain(&mut block, 4.0);
        assert_eq!(block, [i16::MAX, i16::MIN]);
    }

    #[test]
    fn rms_of_empty_block_is_zero() {
        assert_eq!(block_rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_constant_block() {
        let block = vec![16_384_i16; 64];
        assert!((block_rms(&block) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn default_release_resets() {
        struct Counter(u32);
        impl AudioEffect for Counter {
            fn name(&self) -> &'static str {
                "counter"
            }
            fn process(&mut self, block: Vec<i16>, _channels: usize) -> Vec<i16> {
                self.0 += 1;
                block
            }
            fn reset(&mut self) {
                self.0 = 0;
            }
        }

        let mut c = Counter(0);
        c.process(vec![1], 1);
        assert_eq!(c.0, 1);
        c.release().unwrap();
        c.release().unwrap();
        assert_eq!(c.0, 0);
    }
}
