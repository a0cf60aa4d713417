//! Engine configuration.
//!
//! Every section has defaults, so an empty TOML document is a valid
//! configuration. Settings are plain values handed to constructors; nothing
//! here is global.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::ExerciseType;

/// Which scheduler drives the review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    Fsrs,
    Sm2,
}

impl Default for SchedulerKind {
    fn default() -> Self {
        Self::Fsrs
    }
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fsrs => "fsrs",
            Self::Sm2 => "sm2",
        })
    }
}

impl FromStr for SchedulerKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fsrs" => Ok(Self::Fsrs),
            "sm2" => Ok(Self::Sm2),
            other => Err(EngineError::InvalidSettings(format!(
                "unknown scheduler {other:?}"
            ))),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub scheduler: SchedulerKind,
    #[serde(default)]
    pub fsrs: FsrsSettings,
    #[serde(default)]
    pub sm2: Sm2Settings,
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
    #[serde(default)]
    pub rating: RatingSettings,
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub grading: GradingSettings,
}

/// FSRS-5 parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsrsSettings {
    #[serde(default = "default_request_retention")]
    pub request_retention: f64,
    #[serde(default = "default_maximum_interval")]
    pub maximum_interval: f64,
    #[serde(default = "default_weights")]
    pub weights: [f64; 19],
}

impl Default for FsrsSettings {
    fn default() -> Self {
        Self {
            request_retention: default_request_retention(),
            maximum_interval: default_maximum_interval(),
            weights: default_weights(),
        }
    }
}

/// Legacy SM-2 parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sm2Settings {
    #[serde(default = "default_initial_ease")]
    pub initial_ease: f64,
    #[serde(default = "default_min_ease")]
    pub min_ease: f64,
    #[serde(default = "default_max_ease")]
    pub max_ease: f64,
    /// Interval after the first successful review, in days.
    #[serde(default = "default_initial_interval")]
    pub initial_interval: i64,
    /// Interval after the second successful review, in days.
    #[serde(default = "default_sm2_graduating_interval")]
    pub graduating_interval: i64,
}

impl Default for Sm2Settings {
    fn default() -> Self {
        Self {
            initial_ease: default_initial_ease(),
            min_ease: default_min_ease(),
            max_ease: default_max_ease(),
            initial_interval: default_initial_interval(),
            graduating_interval: default_sm2_graduating_interval(),
        }
    }
}

/// Card lifecycle thresholds shared by both schedulers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// A learning card moves to review once its interval reaches this many days.
    #[serde(default = "default_graduating_threshold")]
    pub graduating_threshold_days: f64,
    #[serde(default = "default_learning_step")]
    pub learning_step_minutes: i64,
    #[serde(default = "default_again_step")]
    pub again_step_minutes: i64,
    #[serde(default = "default_relearning_step")]
    pub relearning_step_minutes: i64,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            graduating_threshold_days: default_graduating_threshold(),
            learning_step_minutes: default_learning_step(),
            again_step_minutes: default_again_step(),
            relearning_step_minutes: default_relearning_step(),
        }
    }
}

/// Response-time bands used by rating inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSettings {
    /// Answers faster than this are rated Easy.
    #[serde(default = "default_fast_ms")]
    pub fast_ms: u64,
    /// Answers at or beyond this are rated Hard.
    #[serde(default = "default_slow_ms")]
    pub slow_ms: u64,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            fast_ms: default_fast_ms(),
            slow_ms: default_slow_ms(),
        }
    }
}

/// Target share of each exercise type within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRatios {
    pub write: f64,
    pub fill_in: f64,
    pub predict: f64,
}

impl Default for TypeRatios {
    fn default() -> Self {
        Self {
            write: 0.5,
            fill_in: 0.25,
            predict: 0.25,
        }
    }
}

impl TypeRatios {
    pub fn ratio(&self, exercise_type: ExerciseType) -> f64 {
        match exercise_type {
            ExerciseType::Write => self.write,
            ExerciseType::FillIn => self.fill_in,
            ExerciseType::Predict => self.predict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSettings {
    #[serde(default)]
    pub type_ratios: TypeRatios,
    /// Minimum deficit before a type is preferred over a random pick.
    #[serde(default = "default_deficit_threshold")]
    pub deficit_threshold: f64,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            type_ratios: TypeRatios::default(),
            deficit_threshold: default_deficit_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSettings {
    #[serde(default = "default_oracle_timeout_ms")]
    pub oracle_timeout_ms: u64,
    #[serde(default = "default_coaching_feedback")]
    pub default_coaching_feedback: String,
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            oracle_timeout_ms: default_oracle_timeout_ms(),
            default_coaching_feedback: default_coaching_feedback(),
        }
    }
}

// Default value functions
fn default_request_retention() -> f64 {
    0.9
}

fn default_maximum_interval() -> f64 {
    36500.0
}

fn default_weights() -> [f64; 19] {
    [
        0.40255, 1.18385, 3.173, 15.69105, // w[0-3]: initial stability for Again, Hard, Good, Easy
        7.1949,  // w[4]: initial difficulty
        0.5345,  // w[5]: initial difficulty slope
        1.4604,  // w[6]: difficulty delta per grade
        0.0046,  // w[7]: mean reversion weight
        1.54575, // w[8]: recall stability scale
        0.1192,  // w[9]: stability saturation
        1.01925, // w[10]: retrievability effect
        1.9395,  // w[11]: forget stability scale
        0.11,    // w[12]: difficulty on forget
        0.29605, // w[13]: stability on forget
        2.2698,  // w[14]: retrievability on forget
        0.2315,  // w[15]: hard penalty
        2.9898,  // w[16]: easy bonus
        0.51655, // w[17]: short-term scale
        0.6621,  // w[18]: short-term grade offset
    ]
}

fn default_initial_ease() -> f64 {
    2.5
}

fn default_min_ease() -> f64 {
    1.3
}

fn default_max_ease() -> f64 {
    2.5
}

fn default_initial_interval() -> i64 {
    1
}

fn default_sm2_graduating_interval() -> i64 {
    6
}

fn default_graduating_threshold() -> f64 {
    1.0
}

fn default_learning_step() -> i64 {
    10
}

fn default_again_step() -> i64 {
    1
}

fn default_relearning_step() -> i64 {
    10
}

fn default_fast_ms() -> u64 {
    15_000
}

fn default_slow_ms() -> u64 {
    30_000
}

fn default_deficit_threshold() -> f64 {
    0.10
}

fn default_oracle_timeout_ms() -> u64 {
    5_000
}

fn default_coaching_feedback() -> String {
    "Great job! Consider trying the suggested approach next time.".to_string()
}

impl EngineSettings {
    /// Parse settings from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: EngineSettings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON document.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let settings: EngineSettings = serde_json::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&contents)?;
        tracing::info!(scheduler = %settings.scheduler, "Loaded engine settings from {:?}", path);
        Ok(settings)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let retention = self.fsrs.request_retention;
        if !(retention > 0.0 && retention < 1.0) {
            return Err(EngineError::InvalidSettings(format!(
                "fsrs.request_retention must be in (0, 1), got {retention}"
            )));
        }
        if self.fsrs.maximum_interval < 1.0 {
            return Err(EngineError::InvalidSettings(
                "fsrs.maximum_interval must be at least one day".to_string(),
            ));
        }
        if self.sm2.min_ease > self.sm2.max_ease {
            return Err(EngineError::InvalidSettings(format!(
                "sm2.min_ease ({}) exceeds sm2.max_ease ({})",
                self.sm2.min_ease, self.sm2.max_ease
            )));
        }
        if self.rating.fast_ms > self.rating.slow_ms {
            return Err(EngineError::InvalidSettings(
                "rating.fast_ms must not exceed rating.slow_ms".to_string(),
            ));
        }

        let ratios = &self.selection.type_ratios;
        let values = [ratios.write, ratios.fill_in, ratios.predict];
        if values.iter().any(|r| *r < 0.0) {
            return Err(EngineError::InvalidSettings(
                "selection.type_ratios must not be negative".to_string(),
            ));
        }
        let total: f64 = values.iter().sum();
        if (total - 1.0).abs() > 0.01 {
            return Err(EngineError::InvalidSettings(format!(
                "selection.type_ratios must sum to 1.0, got {total}"
            )));
        }
        Ok(())
    }
}
