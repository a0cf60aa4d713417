//! SM-2 spaced repetition algorithm.
//!
//! Kept for older call sites that still speak the 0-5 quality scale. It runs
//! behind the same [`Scheduler`] contract as the FSRS engine and shares its
//! lifecycle transitions.

use super::engine::{next_status, sanitize, LAPSE_STABILITY_CEILING};
use super::{ReviewResult, Scheduler};
use crate::rating::rating_to_quality;
use crate::settings::{LifecycleSettings, Sm2Settings};
use crate::types::{CardState, CardStatus, Rating};
use chrono::{DateTime, Duration, Utc};

/// Repetition data in the shape legacy callers store it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyReview {
    pub ease_factor: f64,
    pub interval: i64,
    pub repetitions: u32,
}

/// SM-2 algorithm with configurable parameters.
#[derive(Debug, Clone, Default)]
pub struct Sm2 {
    pub settings: Sm2Settings,
    pub lifecycle: LifecycleSettings,
}

impl Sm2 {
    pub fn new(settings: Sm2Settings, lifecycle: LifecycleSettings) -> Self {
        Self { settings, lifecycle }
    }

    /// A review that has never been graded.
    pub fn initial_review(&self) -> LegacyReview {
        LegacyReview {
            ease_factor: self.settings.initial_ease,
            interval: 0,
            repetitions: 0,
        }
    }

    /// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), clamped.
    pub fn next_ease(&self, ease_factor: f64, quality: u8) -> f64 {
        let q = quality.min(5) as f64;
        let ease = ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
        ease.clamp(self.settings.min_ease, self.settings.max_ease)
    }

    /// Apply one graded review on the 0-5 quality scale.
    pub fn apply_quality(&self, review: &LegacyReview, quality: u8) -> LegacyReview {
        let quality = quality.min(5);
        let ease_factor = self.next_ease(review.ease_factor, quality);

        if quality < 3 {
            return LegacyReview {
                ease_factor,
                interval: 1,
                repetitions: 0,
            };
        }

        let repetitions = review.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => self.settings.initial_interval,
            2 => self.settings.graduating_interval,
            _ => (review.interval.max(1) as f64 * ease_factor).round() as i64,
        };
        LegacyReview {
            ease_factor,
            interval: interval.max(1),
            repetitions,
        }
    }

    /// Map the ease factor onto the 0-1 difficulty scale (low ease = hard).
    fn difficulty_from_ease(&self, ease_factor: f64) -> f64 {
        let span = self.settings.max_ease - self.settings.min_ease;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.settings.max_ease - ease_factor) / span).clamp(0.0, 1.0)
    }
}

impl Scheduler for Sm2 {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn initial_state(&self, now: DateTime<Utc>) -> CardState {
        CardState {
            ease_factor: self.settings.initial_ease,
            ..CardState::new(now)
        }
    }

    fn review(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> ReviewResult {
        let prior = sanitize(state);
        let ease_factor = if prior.ease_factor.is_finite() && prior.ease_factor > 0.0 {
            prior.ease_factor
        } else {
            tracing::warn!(ease_factor = state.ease_factor, "resetting invalid ease factor");
            self.settings.initial_ease
        };

        let legacy = self.apply_quality(
            &LegacyReview {
                ease_factor,
                interval: prior.scheduled_days,
                repetitions: prior.streak,
            },
            rating_to_quality(rating),
        );
        let lapsed = prior.status == CardStatus::Review && rating == Rating::Again;
        let status = next_status(
            prior.status,
            rating,
            legacy.interval as f64,
            self.lifecycle.graduating_threshold_days,
        );
        let elapsed = prior
            .last_review
            .map(|last| super::elapsed_days_between(last, now))
            .unwrap_or(0.0);
        let mut stability = legacy.interval as f64;
        if lapsed && prior.stability > 0.0 {
            stability = stability.min(prior.stability * LAPSE_STABILITY_CEILING);
        }

        tracing::debug!(
            from = ?prior.status,
            to = ?status,
            ?rating,
            interval = legacy.interval,
            ease_factor = legacy.ease_factor,
            "reviewed card (sm2)"
        );

        ReviewResult {
            new_state: CardState {
                status,
                stability,
                difficulty: self.difficulty_from_ease(legacy.ease_factor),
                reps: prior.reps.saturating_add(1),
                lapses: prior.lapses.saturating_add(lapsed as u32),
                elapsed_days: elapsed.floor() as i64,
                scheduled_days: legacy.interval,
                due: now + Duration::days(legacy.interval),
                last_review: Some(now),
                ease_factor: legacy.ease_factor,
                streak: legacy.repetitions,
            },
            was_correct: rating.is_success(),
        }
    }
}
