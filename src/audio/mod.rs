//! Processing stages: the effect contract and every stage that implements it.
//!
//! # Stages
//!
//! ```text
//! NoiseReducer → DereverbEffect → AgcEffect → VadEffect
//!             → AmplifierEffect → ResamplerEffect (+ DriftController)
//! ```
//!
//! Every stage implements [`AudioEffect`]: it takes an owned, interleaved
//! `i16` block and returns the block for the next stage.  Only the resampler
//! changes the block length.
//!
//! # Quick Start
//!
//! ```rust
//! use mic_conditioner::audio::{AgcEffect, AudioEffect};
//! use mic_conditioner::config::AgcConfig;
//!
//! let mut agc = AgcEffect::new(AgcConfig { enabled: true, target_level: 16_000 });
//! let block = vec![1_000_i16; 960]; // 10 ms stereo @ 48 kHz
//! let block = agc.process(block, 2);
//! assert_eq!(block.len(), 960);
//! ```

pub mod agc;
pub mod amplifier;
pub mod dereverb;
pub mod drift;
pub mod effect;
pub mod noise;
pub mod resample;
pub mod vad;

pub use agc::AgcEffect;
pub use amplifier::AmplifierEffect;
pub use dereverb::DereverbEffect;
pub use drift::{DriftController, DriftMode, MAX_RATIO, MIN_RATIO};
pub use effect::{apply_gain, block_rms, clamp_i16, AudioEffect, EffectError};
pub use noise::NoiseReducer;
pub use resample::ResamplerEffect;
pub use vad::VadEffect;
