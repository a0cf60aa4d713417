//! Rating inference: turn a graded answer into a scheduler rating.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::settings::RatingSettings;
use crate::types::Rating;

/// What the grader and the UI know about one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingInput {
    pub is_correct: bool,
    pub hint_used: bool,
    pub response_time_ms: u64,
    /// The answer matched structurally rather than literally.
    #[serde(default)]
    pub used_ast_match: bool,
}

/// Infer a rating from correctness, hints and response time.
///
/// A wrong answer is always `Again`. Correct answers are banded by response
/// time (fast → Easy, medium → Good, slow → Hard), then capped at `Hard`
/// when a hint was used and at `Good` for structural matches.
pub fn infer_rating(input: &RatingInput, settings: &RatingSettings) -> Rating {
    if !input.is_correct {
        return Rating::Again;
    }

    let banded = if input.response_time_ms < settings.fast_ms {
        Rating::Easy
    } else if input.response_time_ms < settings.slow_ms {
        Rating::Good
    } else {
        Rating::Hard
    };

    if input.hint_used {
        banded.min(Rating::Hard)
    } else if input.used_ast_match {
        banded.min(Rating::Good)
    } else {
        banded
    }
}

/// Legacy 0-5 quality → rating.
pub fn quality_to_rating(quality: u8) -> Result<Rating> {
    match quality {
        0..=2 => Ok(Rating::Again),
        3 => Ok(Rating::Hard),
        4 => Ok(Rating::Good),
        5 => Ok(Rating::Easy),
        other => Err(EngineError::InvalidQuality(other)),
    }
}

/// Rating → legacy 0-5 quality, for call sites that still store quality.
pub fn rating_to_quality(rating: Rating) -> u8 {
    match rating {
        Rating::Again => 1,
        Rating::Hard => 3,
        Rating::Good => 4,
        Rating::Easy => 5,
    }
}
