//! Pipeline configuration.
//!
//! Provides [`PipelineConfig`] (all stage settings), one value object per
//! stage, [`AppPaths`] for the platform config directory, and TOML
//! persistence via `PipelineConfig::load` / `PipelineConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AgcConfig, AmplifierConfig, ConfigError, DereverbConfig, DriftConfig, NoiseReductionConfig,
    PipelineConfig, VadConfig,
};
