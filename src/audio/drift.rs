//! Queue-depth PI controller that derives the resampling ratio.
//!
//! The transport layer reports how many milliseconds of audio sit in its
//! send/playback queue.  The controller steers that depth toward a target
//! by nudging the ratio the resampler consumes input at:
//!
//! ```text
//! error = queued_ms - target_ms
//!
//! error >  band  →  ratio = speed_up_ratio      (hard override)
//! error < -band  →  ratio = slow_down_ratio     (hard override)
//! otherwise      →  integral = clamp(integral + error, ±integral_limit)
//!                   adjust   = clamp(kp·error + ki·integral, ±max_adjust)
//!                   ratio    = clamp(1 + adjust, 1 ± max_adjust)
//! ```
//!
//! The integral is left untouched while an override is active.

use crate::config::DriftConfig;

/// Bounds for any ratio the resampler is allowed to run at.
pub const MIN_RATIO: f64 = 0.25;
pub const MAX_RATIO: f64 = 4.0;

/// `None` for ratios the resampler cannot run at (non-finite or
/// non-positive); otherwise the ratio clamped to `MIN_RATIO..=MAX_RATIO`.
fn usable_ratio(ratio: f64) -> Option<f64> {
    (ratio.is_finite() && ratio > 0.0).then(|| ratio.clamp(MIN_RATIO, MAX_RATIO))
}

/// Magnitude of a symmetric limit; NaN disables the term.
fn magnitude(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.abs()
    }
}

/// Which branch produced the current ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftMode {
    /// Proportional-integral tracking.
    Tracking,
    /// Queue far above target.
    SpeedUp,
    /// Queue far below target.
    SlowDown,
}

/// PI controller state.
///
/// ```rust
/// use mic_conditioner::audio::DriftController;
/// use mic_conditioner::config::DriftConfig;
///
/// let mut drift = DriftController::new(DriftConfig::default());
/// assert_eq!(drift.update(200), 1.10); // 140 ms over target → override
/// ```
#[derive(Debug, Clone)]
pub struct DriftController {
    config: DriftConfig,
    integral: f64,
    ratio: f64,
    mode: DriftMode,
}

impl Default for DriftController {
    fn default() -> Self {
        Self::new(DriftConfig::default())
    }
}

impl DriftController {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            integral: 0.0,
            ratio: 1.0,
            mode: DriftMode::Tracking,
        }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    /// Swap tuning.  Accumulated state is kept.
    pub fn set_config(&mut self, config: DriftConfig) {
        self.config = config;
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn mode(&self) -> DriftMode {
        self.mode
    }

    /// Feed one queue-depth observation and return the new ratio.
    ///
    /// A ratio the tuning cannot produce sensibly (non-finite, or a
    /// non-positive override) is dropped and the previous ratio kept.
    pub fn update(&mut self, queued_ms: u64) -> f64 {
        let cfg = &self.config;
        let error = queued_ms as f64 - cfg.target_queue_ms;
        if !error.is_finite() {
            log::warn!("drift: ignoring report, target {} ms", cfg.target_queue_ms);
            return self.ratio;
        }

        let (mode, ratio) = if error > cfg.override_band_ms {
            (DriftMode::SpeedUp, cfg.speed_up_ratio)
        } else if error < -cfg.override_band_ms {
            (DriftMode::SlowDown, cfg.slow_down_ratio)
        } else {
            let integral_limit = magnitude(cfg.integral_limit);
            self.integral = (self.integral + error).clamp(-integral_limit, integral_limit);

            let max_adjust = magnitude(cfg.max_adjust);
            let adjust = (error * cfg.kp + self.integral * cfg.ki).clamp(-max_adjust, max_adjust);
            (DriftMode::Tracking, (1.0 + adjust).clamp(1.0 - max_adjust, 1.0 + max_adjust))
        };

        match usable_ratio(ratio) {
            Some(ratio) => self.ratio = ratio,
            None => log::warn!(
                "drift: {mode:?} produced unusable ratio {ratio}, keeping {}",
                self.ratio
            ),
        }

        if mode != self.mode {
            log::debug!(
                "drift: {:?} → {:?} (queued={queued_ms}ms, ratio={:.4})",
                self.mode,
                mode,
                self.ratio
            );
            self.mode = mode;
        }

        self.ratio
    }

    /// Force the ratio, e.g. for fixed-rate conversion.  The next
    /// [`update`](Self::update) overwrites it.
    ///
    /// Non-finite and non-positive ratios are ignored; the rest are clamped
    /// to [`MIN_RATIO`]`..=`[`MAX_RATIO`].  Returns the ratio now in effect.
    pub fn set_ratio(&mut self, ratio: f64) -> f64 {
        match usable_ratio(ratio) {
            Some(ratio) => self.ratio = ratio,
            None => log::warn!("drift: ignoring ratio {ratio}, keeping {}", self.ratio),
        }
        self.ratio
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.ratio = 1.0;
        self.mode = DriftMode::Tracking;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
