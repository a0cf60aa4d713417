//! Spaced repetition scheduling.
//!
//! Two layers:
//! - [`MemoryModel`]: pure stability/difficulty update formulas (FSRS).
//! - [`Scheduler`]: the card lifecycle contract shared by every scheduler,
//!   implemented by [`ReviewEngine`] (lifecycle over a memory model) and by
//!   the legacy [`sm2::Sm2`] scheduler.

pub mod engine;
pub mod fsrs;
pub mod sm2;

pub use engine::{elapsed_days_between, next_status, ReviewEngine};

use crate::settings::{EngineSettings, SchedulerKind};
use crate::types::{CardState, Rating};
use chrono::{DateTime, Utc};

/// Result of reviewing a card once.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub new_state: CardState,
    pub was_correct: bool,
}

/// Trait for spaced repetition schedulers.
///
/// Implementations are deterministic: the same `(state, rating, now)`
/// always yields the same result.
pub trait Scheduler: Send + Sync {
    /// Scheduler identifier.
    fn name(&self) -> &'static str;

    /// Calculate the next state after a review.
    fn review(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> ReviewResult;

    /// Initial state for a subconcept first seen at `now`.
    fn initial_state(&self, now: DateTime<Utc>) -> CardState {
        CardState::new(now)
    }

    /// Outcome of each possible rating, for next-interval hints.
    fn preview(&self, state: &CardState, now: DateTime<Utc>) -> Vec<(Rating, ReviewResult)> {
        Rating::ALL
            .iter()
            .map(|rating| (*rating, self.review(state, *rating, now)))
            .collect()
    }
}

/// Memory strength of one card as seen by a [`MemoryModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryState {
    /// Days until recall probability drops to the requested retention.
    pub stability: f64,
    /// Normalized difficulty, `0.0..=1.0`.
    pub difficulty: f64,
}

/// Pluggable stability/difficulty update formulas.
pub trait MemoryModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Memory state after the very first review.
    fn initial(&self, rating: Rating) -> MemoryState;

    /// Memory state after a review `elapsed_days` after the previous one.
    fn next(&self, prior: MemoryState, rating: Rating, elapsed_days: f64) -> MemoryState;

    /// Interval in days at which recall probability reaches the target retention.
    fn interval_days(&self, stability: f64) -> f64;

    /// Probability of recall `elapsed_days` after the last review.
    fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64;
}

/// Build the scheduler selected by `settings`.
pub fn get_scheduler(settings: &EngineSettings) -> Box<dyn Scheduler> {
    match settings.scheduler {
        SchedulerKind::Fsrs => Box::new(ReviewEngine::new(
            fsrs::Fsrs::from_settings(&settings.fsrs),
            settings.lifecycle.clone(),
        )),
        SchedulerKind::Sm2 => Box::new(sm2::Sm2::new(
            settings.sm2.clone(),
            settings.lifecycle.clone(),
        )),
    }
}
