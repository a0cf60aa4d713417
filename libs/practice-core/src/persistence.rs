//! Row shapes for the progress store.
//!
//! Column names match the store exactly; `state` is the 0-3 status code.
//! Decoding never fails: rows edited by hand or left behind by migrations
//! are repaired on the way in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CardState, CardStatus, ExerciseAttempt, SubconceptProgress};

/// One row of the subconcept progress table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRow {
    pub user_id: Uuid,
    pub language: String,
    pub subconcept_slug: String,
    pub stability: f64,
    pub difficulty: f64,
    pub state: i16,
    pub reps: i32,
    pub lapses: i32,
    pub elapsed_days: i64,
    pub scheduled_days: i64,
    pub next_review: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(default = "crate::types::default_ease_factor")]
    pub ease_factor: f64,
    #[serde(default)]
    pub streak: i32,
}

impl ProgressRow {
    pub fn from_progress(progress: &SubconceptProgress) -> Self {
        let card = &progress.card;
        Self {
            user_id: progress.user_id,
            language: progress.language.clone(),
            subconcept_slug: progress.subconcept_slug.clone(),
            stability: card.stability,
            difficulty: card.difficulty,
            state: card.status.as_code(),
            reps: saturating_i32(card.reps),
            lapses: saturating_i32(card.lapses),
            elapsed_days: card.elapsed_days,
            scheduled_days: card.scheduled_days,
            next_review: card.due,
            last_reviewed: card.last_review,
            ease_factor: card.ease_factor,
            streak: saturating_i32(card.streak),
        }
    }

    /// Decode into engine types, repairing what can be repaired.
    pub fn to_progress(&self) -> SubconceptProgress {
        let reps = non_negative(self.reps, "reps", &self.subconcept_slug);
        let status = CardStatus::from_code(self.state.into()).unwrap_or_else(|err| {
            let inferred = if reps == 0 {
                CardStatus::New
            } else {
                CardStatus::Review
            };
            tracing::warn!(
                subconcept = %self.subconcept_slug,
                %err,
                ?inferred,
                "unknown progress state"
            );
            inferred
        });

        SubconceptProgress {
            user_id: self.user_id,
            language: self.language.clone(),
            subconcept_slug: self.subconcept_slug.clone(),
            card: CardState {
                status,
                stability: self.stability,
                difficulty: self.difficulty,
                reps,
                lapses: non_negative(self.lapses, "lapses", &self.subconcept_slug),
                elapsed_days: self.elapsed_days.max(0),
                scheduled_days: self.scheduled_days.max(0),
                due: self.next_review,
                last_review: self.last_reviewed,
                ease_factor: self.ease_factor,
                streak: non_negative(self.streak, "streak", &self.subconcept_slug),
            },
        }
    }
}

/// One row of the exercise attempt table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRow {
    pub user_id: Uuid,
    pub exercise_slug: String,
    pub times_seen: i32,
    pub times_correct: i32,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl AttemptRow {
    pub fn from_attempt(attempt: &ExerciseAttempt) -> Self {
        Self {
            user_id: attempt.user_id,
            exercise_slug: attempt.exercise_slug.clone(),
            times_seen: saturating_i32(attempt.times_seen),
            times_correct: saturating_i32(attempt.times_correct),
            last_seen_at: attempt.last_seen_at,
        }
    }

    pub fn to_attempt(&self) -> ExerciseAttempt {
        let times_seen = non_negative(self.times_seen, "times_seen", &self.exercise_slug);
        ExerciseAttempt {
            user_id: self.user_id,
            exercise_slug: self.exercise_slug.clone(),
            times_seen,
            times_correct: non_negative(self.times_correct, "times_correct", &self.exercise_slug)
                .min(times_seen),
            last_seen_at: self.last_seen_at,
        }
    }
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn non_negative(value: i32, column: &str, key: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        tracing::warn!(column, value, key, "clamping negative count");
        0
    })
}
