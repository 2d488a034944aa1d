//! Per-stage configuration value objects, defaults and TOML persistence.
//!
//! Every struct implements `Serialize`, `Deserialize`, `Default` and `Clone`
//! so a whole [`PipelineConfig`] can be round-tripped through a TOML file and
//! handed to [`AudioProcessorPipeline::apply_config`] in one step.
//!
//! [`AudioProcessorPipeline::apply_config`]: crate::pipeline::AudioProcessorPipeline::apply_config

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A configuration value that the pipeline refuses to run with.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("amplifier gain must be finite and >= 0 (got {0})")]
    InvalidGain(f32),

    #[error("VAD threshold must be within 0..=100 (got {0})")]
    VadThresholdOutOfRange(i32),

    #[error("{field} must be within {min}..={max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("drift target queue depth must be > 0 ms (got {0})")]
    InvalidDriftTarget(f64),
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

// ---------------------------------------------------------------------------
// AmplifierConfig
// ---------------------------------------------------------------------------

/// Fixed output gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplifierConfig {
    /// Linear multiplier; `1.0` leaves the block untouched.
    pub gain: f32,
}

impl Default for AmplifierConfig {
    fn default() -> Self {
        Self { gain: 1.0 }
    }
}

// ---------------------------------------------------------------------------
// AgcConfig
// ---------------------------------------------------------------------------

/// Automatic gain control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgcConfig {
    pub enabled: bool,
    /// Target level in absolute sample units (full scale = 32768).
    /// Values `<= 0` disable the stage.
    pub target_level: i32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target_level: 32_000,
        }
    }
}

// ---------------------------------------------------------------------------
// VadConfig
// ---------------------------------------------------------------------------

/// Voice-activity gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    pub enabled: bool,
    /// Sensitivity in `0..=100`.  Higher values let quieter blocks through.
    pub threshold: i32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// NoiseReductionConfig
// ---------------------------------------------------------------------------

/// Noise-floor expander used as the default noise reduction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseReductionConfig {
    pub enabled: bool,
    /// Deepest attenuation applied to blocks sitting on the noise floor, in dB.
    pub max_attenuation_db: f32,
    /// Block RMS / noise floor ratio at which the expander is fully open.
    pub open_ratio: f32,
}

impl Default for NoiseReductionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attenuation_db: 12.0,
            open_ratio: 4.0,
        }
    }
}

// ---------------------------------------------------------------------------
// DereverbConfig
// ---------------------------------------------------------------------------

/// Decay-tail suppressor used as the default dereverberation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DereverbConfig {
    pub enabled: bool,
    /// Per-block decay of the tracked energy envelope (`0.0..1.0`).
    pub tail_decay: f32,
    /// Exponent applied to the tail ratio; `0.0` = no suppression.
    pub strength: f32,
}

impl Default for DereverbConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tail_decay: 0.85,
            strength: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// DriftConfig
// ---------------------------------------------------------------------------

/// Tuning of the queue-depth PI controller that drives the resampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Queue depth the controller steers towards, in milliseconds.
    pub target_queue_ms: f64,
    /// Error magnitude (ms) beyond which the hard override ratios apply.
    pub override_band_ms: f64,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Symmetric clamp of the integral accumulator.
    pub integral_limit: f64,
    /// Symmetric clamp of the ratio adjustment around 1.0.
    pub max_adjust: f64,
    /// Ratio used while the queue is far above target.
    pub speed_up_ratio: f64,
    /// Ratio used while the queue is far below target.
    pub slow_down_ratio: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            target_queue_ms: 60.0,
            override_band_ms: 100.0,
            kp: 0.0002,
            ki: 0.000002,
            integral_limit: 10_000.0,
            max_adjust: 0.10,
            speed_up_ratio: 1.10,
            slow_down_ratio: 0.95,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig  (top-level)
// ---------------------------------------------------------------------------

/// Complete pipeline configuration, serialised as `pipeline.toml`.
///
/// ```rust,no_run
/// use mic_conditioner::config::PipelineConfig;
///
/// // Defaults when the file does not exist yet
/// let mut config = PipelineConfig::load().unwrap();
/// config.agc.enabled = true;
/// config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub noise_reduction: NoiseReductionConfig,
    pub dereverb: DereverbConfig,
    pub agc: AgcConfig,
    pub vad: VadConfig,
    pub amplifier: AmplifierConfig,
    pub drift: DriftConfig,
}

impl PipelineConfig {
    /// Reject values the stages cannot run with.
    ///
    /// Stages clamp at run time anyway; this catches typos in hand-edited
    /// files before they silently turn into clamped behaviour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gain = self.amplifier.gain;
        if !gain.is_finite() || gain < 0.0 {
            return Err(ConfigError::InvalidGain(gain));
        }

        if !(0..=100).contains(&self.vad.threshold) {
            return Err(ConfigError::VadThresholdOutOfRange(self.vad.threshold));
        }

        check_range(
            "noise_reduction.max_attenuation_db",
            self.noise_reduction.max_attenuation_db as f64,
            0.0,
            60.0,
        )?;
        check_range(
            "noise_reduction.open_ratio",
            self.noise_reduction.open_ratio as f64,
            1.01,
            100.0,
        )?;
        check_range("dereverb.tail_decay", self.dereverb.tail_decay as f64, 0.0, 0.999)?;
        check_range("dereverb.strength", self.dereverb.strength as f64, 0.0, 4.0)?;

        let drift = &self.drift;
        if !drift.target_queue_ms.is_finite() || drift.target_queue_ms <= 0.0 {
            return Err(ConfigError::InvalidDriftTarget(drift.target_queue_ms));
        }
        check_range("drift.override_band_ms", drift.override_band_ms, 0.0, 10_000.0)?;
        check_range("drift.kp", drift.kp, 0.0, 1.0)?;
        check_range("drift.ki", drift.ki, 0.0, 1.0)?;
        check_range("drift.integral_limit", drift.integral_limit, 0.0, 1.0e9)?;
        check_range("drift.max_adjust", drift.max_adjust, 0.0, 0.5)?;
        check_range("drift.speed_up_ratio", drift.speed_up_ratio, 0.5, 2.0)?;
        check_range("drift.slow_down_ratio", drift.slow_down_ratio, 0.5, 2.0)?;

        Ok(())
    }

    /// Load from the platform-appropriate `pipeline.toml`.
    ///
    /// Returns `Ok(PipelineConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path and validate the result.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the platform-appropriate `pipeline.toml`, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
