//! Card lifecycle over a pluggable memory model.
//!
//! New → Learning → Review, with Review → Relearning on a lapse and
//! Relearning → Review once the interval grows back past the graduating
//! threshold.

use super::{MemoryModel, MemoryState, ReviewResult, Scheduler};
use crate::settings::LifecycleSettings;
use crate::types::{CardState, CardStatus, Rating};
use chrono::{DateTime, Duration, Utc};

/// Post-lapse stability never exceeds this share of the pre-lapse value.
pub(crate) const LAPSE_STABILITY_CEILING: f64 = 0.45;

/// Lifecycle state machine wrapping a [`MemoryModel`].
#[derive(Debug, Clone)]
pub struct ReviewEngine<M> {
    model: M,
    lifecycle: LifecycleSettings,
}

impl<M: MemoryModel> ReviewEngine<M> {
    pub fn new(model: M, lifecycle: LifecycleSettings) -> Self {
        Self { model, lifecycle }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Current probability of recall; zero for cards never reviewed.
    pub fn retrievability(&self, state: &CardState, now: DateTime<Utc>) -> f64 {
        match state.last_review {
            Some(last) if state.status != CardStatus::New => self
                .model
                .retrievability(elapsed_days_between(last, now), state.stability),
            _ => 0.0,
        }
    }
}

impl<M: MemoryModel> Scheduler for ReviewEngine<M> {
    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn review(&self, state: &CardState, rating: Rating, now: DateTime<Utc>) -> ReviewResult {
        let prior = sanitize(state);
        let elapsed = prior
            .last_review
            .map(|last| elapsed_days_between(last, now))
            .unwrap_or(0.0);
        let lapsed = prior.status == CardStatus::Review && rating == Rating::Again;

        let mut memory = match prior_memory(&prior) {
            Some(memory) => self.model.next(memory, rating, elapsed),
            None => self.model.initial(rating),
        };
        if lapsed && prior.stability > 0.0 {
            memory.stability = memory
                .stability
                .min(prior.stability * LAPSE_STABILITY_CEILING);
        }
        if !memory.stability.is_finite() || memory.stability < 0.0 {
            memory.stability = 0.0;
        }
        memory.difficulty = clamp_unit(memory.difficulty);

        let interval = self.model.interval_days(memory.stability);
        let status = next_status(
            prior.status,
            rating,
            interval,
            self.lifecycle.graduating_threshold_days,
        );
        let (scheduled_days, due) = self.schedule(status, rating, interval, now);

        tracing::debug!(
            from = ?prior.status,
            to = ?status,
            ?rating,
            stability = memory.stability,
            scheduled_days,
            "reviewed card"
        );

        ReviewResult {
            new_state: CardState {
                status,
                stability: memory.stability,
                difficulty: memory.difficulty,
                reps: prior.reps.saturating_add(1),
                lapses: prior.lapses.saturating_add(lapsed as u32),
                elapsed_days: elapsed.floor() as i64,
                scheduled_days,
                due,
                last_review: Some(now),
                ease_factor: prior.ease_factor,
                streak: prior.streak,
            },
            was_correct: rating.is_success(),
        }
    }
}

impl<M> ReviewEngine<M> {
    /// Review cards are due whole days out; the others come back after a
    /// short step measured in minutes.
    fn schedule(
        &self,
        status: CardStatus,
        rating: Rating,
        interval: f64,
        now: DateTime<Utc>,
    ) -> (i64, DateTime<Utc>) {
        match status {
            CardStatus::Review => {
                let days = whole_days(interval);
                (days, now + Duration::days(days))
            }
            CardStatus::New | CardStatus::Learning | CardStatus::Relearning => {
                let minutes = if rating == Rating::Again {
                    self.lifecycle.again_step_minutes
                } else if status == CardStatus::Relearning {
                    self.lifecycle.relearning_step_minutes
                } else {
                    self.lifecycle.learning_step_minutes
                };
                (0, now + Duration::minutes(minutes.max(1)))
            }
        }
    }
}

/// Lifecycle transition shared by every scheduler.
pub fn next_status(
    current: CardStatus,
    rating: Rating,
    interval_days: f64,
    graduating_threshold_days: f64,
) -> CardStatus {
    match (current, rating) {
        (CardStatus::New, _) => CardStatus::Learning,
        (CardStatus::Review, Rating::Again) => CardStatus::Relearning,
        (CardStatus::Review, _) => CardStatus::Review,
        (status, Rating::Again) => status,
        (_, _) if interval_days >= graduating_threshold_days => CardStatus::Review,
        (status, _) => status,
    }
}

/// Fractional days between two instants, never negative.
pub fn elapsed_days_between(last: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = now.signed_duration_since(last).num_seconds() as f64;
    (seconds / 86400.0).max(0.0)
}

pub(crate) fn whole_days(interval: f64) -> i64 {
    if interval.is_finite() {
        (interval.round() as i64).max(1)
    } else {
        1
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Repair fields that direct data edits or migrations can corrupt.
pub(crate) fn sanitize(state: &CardState) -> CardState {
    let mut clean = state.clone();
    if !clean.stability.is_finite() || clean.stability < 0.0 {
        tracing::warn!(stability = state.stability, "resetting invalid stability");
        clean.stability = 0.0;
    }
    if !clean.difficulty.is_finite() || !(0.0..=1.0).contains(&clean.difficulty) {
        tracing::warn!(difficulty = state.difficulty, "clamping invalid difficulty");
        clean.difficulty = clamp_unit(clean.difficulty);
    }
    if clean.elapsed_days < 0 || clean.scheduled_days < 0 {
        tracing::warn!(
            elapsed_days = state.elapsed_days,
            scheduled_days = state.scheduled_days,
            "clamping negative day counts"
        );
        clean.elapsed_days = clean.elapsed_days.max(0);
        clean.scheduled_days = clean.scheduled_days.max(0);
    }
    if clean.status != CardStatus::New && clean.reps == 0 {
        tracing::warn!(status = ?state.status, "card has a reviewed status but no reps");
    }
    clean
}

/// Memory state worth continuing from, or `None` when the card must be
/// initialized from this rating.
fn prior_memory(state: &CardState) -> Option<MemoryState> {
    if state.status == CardStatus::New || state.stability <= 0.0 {
        return None;
    }
    Some(MemoryState {
        stability: state.stability,
        difficulty: state.difficulty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::fsrs::Fsrs;
    use chrono::TimeZone;

    fn engine() -> ReviewEngine<Fsrs> {
        ReviewEngine::new(Fsrs::default(), LifecycleSettings::default())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn review_card(stability: f64, now: DateTime<Utc>) -> CardState {
        CardState {
            status: CardStatus::Review,
            stability,
            difficulty: 0.5,
            reps: 5,
            scheduled_days: stability.round() as i64,
            due: now,
            last_review: Some(now - Duration::days(stability.round() as i64)),
            ..CardState::new(now)
        }
    }

    #[test]
    fn new_card_first_review_good() {
        let result = engine().review(&CardState::new(t0()), Rating::Good, t0());

        assert_eq!(result.new_state.status, CardStatus::Learning);
        assert_eq!(result.new_state.reps, 1);
        assert!(result.new_state.due > t0());
        assert!(result.was_correct);
    }

    #[test]
    fn new_card_goes_to_learning_for_every_rating() {
        for rating in Rating::ALL {
            let result = engine().review(&CardState::new(t0()), rating, t0());
            assert_eq!(result.new_state.status, CardStatus::Learning);
            assert_eq!(result.new_state.lapses, 0);
        }
    }

    #[test]
    fn learning_card_graduates_once_interval_is_long_enough() {
        let engine = engine();
        let first = engine.review(&CardState::new(t0()), Rating::Good, t0());
        let later = first.new_state.due;
        let second = engine.review(&first.new_state, Rating::Good, later);

        assert_eq!(second.new_state.status, CardStatus::Review);
        assert!(second.new_state.scheduled_days >= 1);
        assert!(second.new_state.due >= later + Duration::days(1));
    }

    #[test]
    fn learning_card_stays_on_again() {
        let engine = engine();
        let first = engine.review(&CardState::new(t0()), Rating::Easy, t0());
        let second = engine.review(&first.new_state, Rating::Again, first.new_state.due);

        assert_eq!(second.new_state.status, CardStatus::Learning);
        assert_eq!(second.new_state.scheduled_days, 0);
        assert!(!second.was_correct);
    }

    #[test]
    fn review_card_lapses_on_again() {
        let now = t0();
        let state = review_card(10.0, now);
        let result = engine().review(&state, Rating::Again, now);

        assert_eq!(result.new_state.status, CardStatus::Relearning);
        assert_eq!(result.new_state.lapses, 1);
        assert!(result.new_state.stability < 10.0 * 0.5);
    }

    #[test]
    fn small_stability_still_halves_on_lapse() {
        let now = t0();
        let state = review_card(1.0, now);
        let result = engine().review(&state, Rating::Again, now);
        assert!(result.new_state.stability < 0.5);
        assert!(result.new_state.stability >= 0.0);
    }

    #[test]
    fn relearning_returns_to_review() {
        let engine = engine();
        let now = t0();
        let lapsed = engine.review(&review_card(20.0, now), Rating::Again, now);
        assert_eq!(lapsed.new_state.status, CardStatus::Relearning);

        let mut state = lapsed.new_state;
        let mut at = state.due;
        for _ in 0..10 {
            if state.status == CardStatus::Review {
                break;
            }
            state = engine.review(&state, Rating::Good, at).new_state;
            at = state.due;
        }
        assert_eq!(state.status, CardStatus::Review);
        assert_eq!(state.lapses, 1);
    }

    #[test]
    fn lapses_only_increment_from_review() {
        let engine = engine();
        let now = t0();
        let learning = engine.review(&CardState::new(now), Rating::Again, now);
        let again = engine.review(&learning.new_state, Rating::Again, learning.new_state.due);
        assert_eq!(again.new_state.lapses, 0);
    }

    #[test]
    fn stability_ordered_by_rating() {
        let engine = engine();
        let now = t0();
        let states = [
            CardState::new(now),
            review_card(10.0, now),
            engine.review(&CardState::new(now), Rating::Hard, now).new_state,
        ];
        for state in states {
            let at = state.due;
            let hard = engine.review(&state, Rating::Hard, at).new_state.stability;
            let good = engine.review(&state, Rating::Good, at).new_state.stability;
            let easy = engine.review(&state, Rating::Easy, at).new_state.stability;
            assert!(easy >= good, "easy {easy} < good {good}");
            assert!(good >= hard, "good {good} < hard {hard}");
        }
    }

    #[test]
    fn review_is_deterministic() {
        let engine = engine();
        let now = t0();
        let state = review_card(7.0, now);
        let a = engine.review(&state, Rating::Hard, now);
        let b = engine.review(&state, Rating::Hard, now);
        assert_eq!(a, b);
    }

    #[test]
    fn immediate_re_review_is_due_in_the_future() {
        let engine = engine();
        let now = t0();
        let first = engine.review(&CardState::new(now), Rating::Again, now);
        let second = engine.review(&first.new_state, Rating::Again, now);
        assert!(second.new_state.due > now);
        assert_eq!(second.new_state.reps, 2);
    }

    #[test]
    fn corrupted_state_is_handled() {
        let now = t0();
        let state = CardState {
            status: CardStatus::Review,
            stability: f64::NAN,
            difficulty: 4.0,
            reps: 0,
            elapsed_days: -3,
            scheduled_days: -1,
            last_review: Some(now + Duration::days(2)),
            ..CardState::new(now)
        };
        let result = engine().review(&state, Rating::Good, now);
        assert!(result.new_state.stability >= 0.0);
        assert!((0.0..=1.0).contains(&result.new_state.difficulty));
        assert_eq!(result.new_state.elapsed_days, 0);
        assert_eq!(result.new_state.reps, 1);
        assert!(result.new_state.due > now);
    }

    #[test]
    fn retrievability_is_zero_for_new_cards() {
        let engine = engine();
        let now = t0();
        assert_eq!(engine.retrievability(&CardState::new(now), now), 0.0);

        let state = review_card(10.0, now);
        let r = engine.retrievability(&state, now);
        assert!((r - 0.9).abs() < 0.01);
    }

    #[test]
    fn next_status_table() {
        use CardStatus::*;
        assert_eq!(next_status(New, Rating::Easy, 30.0, 1.0), Learning);
        assert_eq!(next_status(Learning, Rating::Good, 0.5, 1.0), Learning);
        assert_eq!(next_status(Learning, Rating::Good, 1.0, 1.0), Review);
        assert_eq!(next_status(Learning, Rating::Again, 5.0, 1.0), Learning);
        assert_eq!(next_status(Review, Rating::Again, 5.0, 1.0), Relearning);
        assert_eq!(next_status(Review, Rating::Hard, 0.2, 1.0), Review);
        assert_eq!(next_status(Relearning, Rating::Good, 2.0, 1.0), Review);
        assert_eq!(next_status(Relearning, Rating::Again, 2.0, 1.0), Relearning);
    }

    #[test]
    fn elapsed_days_never_negative() {
        let now = t0();
        assert_eq!(elapsed_days_between(now + Duration::days(1), now), 0.0);
        assert!((elapsed_days_between(now - Duration::hours(36), now) - 1.5).abs() < 1e-9);
    }
}
