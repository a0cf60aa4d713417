//! FSRS (Free Spaced Repetition Scheduler) memory model.
//!
//! FSRS-5 formulas over the DSR model:
//! - Difficulty (D): card difficulty 1-10 internally, 0-1 at the boundary
//! - Stability (S): days until retention drops to the requested level
//! - Retrievability (R): probability of recall

use super::{MemoryModel, MemoryState};
use crate::settings::FsrsSettings;
use crate::types::Rating;

const DECAY: f64 = -0.5;
const FACTOR: f64 = 19.0 / 81.0;
const MIN_STABILITY: f64 = 0.01;

/// FSRS memory model with explicit parameters.
#[derive(Debug, Clone)]
pub struct Fsrs {
    pub request_retention: f64,
    pub maximum_interval: f64,
    /// FSRS-5 parameters (19 weights).
    pub w: [f64; 19],
}

impl Default for Fsrs {
    fn default() -> Self {
        Self::from_settings(&FsrsSettings::default())
    }
}

impl MemoryModel for Fsrs {
    fn name(&self) -> &'static str {
        "fsrs"
    }

    fn initial(&self, rating: Rating) -> MemoryState {
        MemoryState {
            stability: self.initial_stability(rating),
            difficulty: to_unit(self.initial_difficulty(rating)),
        }
    }

    fn next(&self, prior: MemoryState, rating: Rating, elapsed_days: f64) -> MemoryState {
        let d = from_unit(prior.difficulty);
        let s = prior.stability.max(MIN_STABILITY);
        let elapsed = elapsed_days.max(0.0);

        let stability = if elapsed < 1.0 {
            // Same-day review
            self.next_short_term_stability(s, rating)
        } else {
            let r = self.retrievability(elapsed, s);
            if rating == Rating::Again {
                self.next_forget_stability(d, s, r)
            } else {
                self.next_recall_stability(d, s, r, rating)
            }
        };

        MemoryState {
            stability: stability.clamp(MIN_STABILITY, self.maximum_interval),
            difficulty: to_unit(self.next_difficulty(d, rating)),
        }
    }

    /// I = S / FACTOR * (R^(1/DECAY) - 1) where R = request_retention
    fn interval_days(&self, stability: f64) -> f64 {
        if self.request_retention <= 0.0 || self.request_retention >= 1.0 {
            return stability.min(self.maximum_interval);
        }
        let interval = stability / FACTOR * (self.request_retention.powf(1.0 / DECAY) - 1.0);
        interval.clamp(0.0, self.maximum_interval)
    }

    /// R = (1 + FACTOR * t / S)^DECAY
    fn retrievability(&self, elapsed_days: f64, stability: f64) -> f64 {
        if stability <= 0.0 {
            return 0.0;
        }
        (1.0 + FACTOR * elapsed_days.max(0.0) / stability).powf(DECAY)
    }
}

impl Fsrs {
    pub fn from_settings(settings: &FsrsSettings) -> Self {
        Self {
            request_retention: settings.request_retention,
            maximum_interval: settings.maximum_interval,
            w: settings.weights,
        }
    }

    fn grade(rating: Rating) -> f64 {
        rating.to_value() as f64
    }

    /// S0(G) = w[G-1]
    fn initial_stability(&self, rating: Rating) -> f64 {
        let index = (rating.to_value() - 1) as usize;
        self.w[index].max(MIN_STABILITY)
    }

    /// D0(G) = w[4] - e^(w[5] * (G - 1)) + 1
    fn initial_difficulty(&self, rating: Rating) -> f64 {
        let d0 = self.w[4] - (self.w[5] * (Self::grade(rating) - 1.0)).exp() + 1.0;
        d0.clamp(1.0, 10.0)
    }

    /// Linear damping towards 10, then mean reversion towards D0(Easy).
    fn next_difficulty(&self, d: f64, rating: Rating) -> f64 {
        let delta = -self.w[6] * (Self::grade(rating) - 3.0);
        let damped = d + delta * (10.0 - d) / 9.0;
        let reverted = self.w[7] * self.initial_difficulty(Rating::Easy) + (1.0 - self.w[7]) * damped;
        reverted.clamp(1.0, 10.0)
    }

    /// S' = S * (e^w[8] * (11 - D) * S^-w[9] * (e^(w[10] * (1 - R)) - 1) * penalty * bonus + 1)
    fn next_recall_stability(&self, d: f64, s: f64, r: f64, rating: Rating) -> f64 {
        let hard_penalty = if rating == Rating::Hard { self.w[15] } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { self.w[16] } else { 1.0 };
        let growth = self.w[8].exp()
            * (11.0 - d)
            * s.powf(-self.w[9])
            * ((self.w[10] * (1.0 - r)).exp() - 1.0)
            * hard_penalty
            * easy_bonus;
        s * (growth + 1.0)
    }

    /// S' = w[11] * D^-w[12] * ((S + 1)^w[13] - 1) * e^(w[14] * (1 - R))
    fn next_forget_stability(&self, d: f64, s: f64, r: f64) -> f64 {
        let forget = self.w[11]
            * d.powf(-self.w[12])
            * ((s + 1.0).powf(self.w[13]) - 1.0)
            * (self.w[14] * (1.0 - r)).exp();
        let short_term_floor = s / (self.w[17] * self.w[18]).exp();
        forget.min(short_term_floor)
    }

    /// S' = S * e^(w[17] * (G - 3 + w[18]))
    fn next_short_term_stability(&self, s: f64, rating: Rating) -> f64 {
        s * (self.w[17] * (Self::grade(rating) - 3.0 + self.w[18])).exp()
    }
}

fn to_unit(d: f64) -> f64 {
    ((d - 1.0) / 9.0).clamp(0.0, 1.0)
}

fn from_unit(d: f64) -> f64 {
    1.0 + 9.0 * d.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_memory(stability: f64, difficulty: f64) -> MemoryState {
        MemoryState {
            stability,
            difficulty,
        }
    }

    #[test]
    fn initial_stability_values() {
        let fsrs = Fsrs::default();

        let s_again = fsrs.initial(Rating::Again).stability;
        let s_hard = fsrs.initial(Rating::Hard).stability;
        let s_good = fsrs.initial(Rating::Good).stability;
        let s_easy = fsrs.initial(Rating::Easy).stability;

        assert!(s_again < s_hard);
        assert!(s_hard < s_good);
        assert!(s_good < s_easy);
    }

    #[test]
    fn initial_difficulty_values() {
        let fsrs = Fsrs::default();

        // Initial difficulty should decrease with rating
        let d_again = fsrs.initial(Rating::Again).difficulty;
        let d_hard = fsrs.initial(Rating::Hard).difficulty;
        let d_good = fsrs.initial(Rating::Good).difficulty;
        let d_easy = fsrs.initial(Rating::Easy).difficulty;

        assert!(d_again > d_hard);
        assert!(d_hard > d_good);
        assert!(d_good > d_easy);
        for d in [d_again, d_hard, d_good, d_easy] {
            assert!((0.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn stability_increases_on_successful_recall() {
        let fsrs = Fsrs::default();
        let next = fsrs.next(review_memory(5.0, 0.5), Rating::Good, 5.0);
        assert!(next.stability > 5.0);
    }

    #[test]
    fn stability_decreases_on_lapse() {
        let fsrs = Fsrs::default();
        let next = fsrs.next(review_memory(10.0, 0.5), Rating::Again, 10.0);
        assert!(next.stability < 10.0);
    }

    #[test]
    fn difficulty_moves_with_rating() {
        let fsrs = Fsrs::default();
        let prior = review_memory(5.0, 0.5);
        assert!(fsrs.next(prior, Rating::Easy, 5.0).difficulty < 0.5);
        assert!(fsrs.next(prior, Rating::Again, 5.0).difficulty > 0.5);
    }

    #[test]
    fn difficulty_clamped_to_bounds() {
        let fsrs = Fsrs::default();
        let hardest = fsrs.next(review_memory(5.0, 1.0), Rating::Again, 5.0);
        assert!(hardest.difficulty <= 1.0);
        let easiest = fsrs.next(review_memory(5.0, 0.0), Rating::Easy, 5.0);
        assert!(easiest.difficulty >= 0.0);
    }

    #[test]
    fn rating_order_is_preserved_long_term() {
        let fsrs = Fsrs::default();
        let prior = review_memory(10.0, 0.4);
        let hard = fsrs.next(prior, Rating::Hard, 12.0).stability;
        let good = fsrs.next(prior, Rating::Good, 12.0).stability;
        let easy = fsrs.next(prior, Rating::Easy, 12.0).stability;
        assert!(easy >= good);
        assert!(good >= hard);
    }

    #[test]
    fn rating_order_is_preserved_same_day() {
        let fsrs = Fsrs::default();
        let prior = review_memory(0.4, 0.8);
        let hard = fsrs.next(prior, Rating::Hard, 0.0).stability;
        let good = fsrs.next(prior, Rating::Good, 0.0).stability;
        let easy = fsrs.next(prior, Rating::Easy, 0.0).stability;
        assert!(easy >= good);
        assert!(good >= hard);
        assert!(good > 0.4);
    }

    #[test]
    fn interval_respects_maximum() {
        let fsrs = Fsrs::default();
        assert!(fsrs.interval_days(50000.0) <= fsrs.maximum_interval);
    }

    #[test]
    fn interval_equals_stability_at_ninety_percent() {
        let fsrs = Fsrs::default();
        assert!((fsrs.interval_days(10.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn retrievability_formula() {
        let fsrs = Fsrs::default();

        // At t=0, R should be 1.0
        let r = fsrs.retrievability(0.0, 10.0);
        assert!((r - 1.0).abs() < 0.001);

        // At t=S, R equals the default requested retention
        let r = fsrs.retrievability(10.0, 10.0);
        assert!((r - 0.9).abs() < 0.001);

        assert_eq!(fsrs.retrievability(3.0, 0.0), 0.0);
    }
}
