//! Exercise selection for one subconcept.
//!
//! Learning phase walks the levels in order and serves unseen exercises
//! first; review phase serves the least-seen exercise. Both prefer a pattern
//! different from the last one shown when several candidates tie.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::settings::SelectionSettings;
use crate::types::{Exercise, ExerciseAttempt, ExerciseLevel, ExerciseType, Phase};

/// The subconcept being practised and its current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubconceptInfo {
    pub subconcept_slug: String,
    pub phase: Phase,
}

impl SubconceptInfo {
    pub fn new(subconcept_slug: impl Into<String>, phase: Phase) -> Self {
        Self {
            subconcept_slug: subconcept_slug.into(),
            phase,
        }
    }
}

/// Pick the next exercise for a subconcept, or `None` if it has none.
pub fn select_exercise<'a, R: Rng + ?Sized>(
    info: &SubconceptInfo,
    exercises: &'a [Exercise],
    attempts: &[ExerciseAttempt],
    last_pattern: Option<&str>,
    rng: &mut R,
) -> Option<&'a Exercise> {
    let pool: Vec<&Exercise> = exercises
        .iter()
        .filter(|e| e.subconcept == info.subconcept_slug)
        .collect();
    if pool.is_empty() {
        return None;
    }

    let seen = times_seen_by_slug(attempts);
    let selected = match info.phase {
        Phase::Learning => select_by_level(&pool, &seen, last_pattern, rng)
            .or_else(|| select_least_seen(&pool, &seen, last_pattern, rng)),
        Phase::Review => select_least_seen(&pool, &seen, last_pattern, rng),
    };

    if let Some(exercise) = selected {
        tracing::debug!(
            subconcept = %info.subconcept_slug,
            phase = ?info.phase,
            exercise = %exercise.slug,
            "selected exercise"
        );
    }
    selected
}

/// First level (in progression order) that still has unseen exercises.
fn select_by_level<'a, R: Rng + ?Sized>(
    pool: &[&'a Exercise],
    seen: &HashMap<&str, u32>,
    last_pattern: Option<&str>,
    rng: &mut R,
) -> Option<&'a Exercise> {
    for level in ExerciseLevel::ORDER {
        let unseen: Vec<&Exercise> = pool
            .iter()
            .copied()
            .filter(|e| e.level == level && times_seen(seen, e) == 0)
            .collect();
        if !unseen.is_empty() {
            return pick_avoiding_pattern(&unseen, last_pattern, rng);
        }
    }
    None
}

/// Exercises with the minimum `times_seen` across the whole pool.
fn select_least_seen<'a, R: Rng + ?Sized>(
    pool: &[&'a Exercise],
    seen: &HashMap<&str, u32>,
    last_pattern: Option<&str>,
    rng: &mut R,
) -> Option<&'a Exercise> {
    let min_seen = pool.iter().map(|e| times_seen(seen, e)).min()?;
    let least: Vec<&Exercise> = pool
        .iter()
        .copied()
        .filter(|e| times_seen(seen, e) == min_seen)
        .collect();
    pick_avoiding_pattern(&least, last_pattern, rng)
}

/// Uniform pick among equally ranked candidates, preferring a pattern other
/// than `last_pattern` when one exists.
fn pick_avoiding_pattern<'a, R: Rng + ?Sized>(
    candidates: &[&'a Exercise],
    last_pattern: Option<&str>,
    rng: &mut R,
) -> Option<&'a Exercise> {
    if let (Some(last), true) = (last_pattern, candidates.len() > 1) {
        let varied: Vec<&Exercise> = candidates
            .iter()
            .copied()
            .filter(|e| e.pattern != last)
            .collect();
        if !varied.is_empty() {
            return varied.choose(rng).copied();
        }
    }
    candidates.choose(rng).copied()
}

/// Pick an exercise whose type is furthest below its target share in this
/// session.
///
/// An empty history prefers `write`. Otherwise the type with the largest
/// deficit (`target - actual`) wins when that deficit exceeds the configured
/// threshold; if no type qualifies the pick is uniform over `candidates`.
pub fn select_exercise_by_type<'a, R: Rng + ?Sized>(
    candidates: &[&'a Exercise],
    session_history: &[ExerciseType],
    settings: &SelectionSettings,
    rng: &mut R,
) -> Option<&'a Exercise> {
    if candidates.is_empty() {
        return None;
    }

    let preferred = if session_history.is_empty() {
        Some(ExerciseType::Write)
    } else {
        most_needed_type(candidates, session_history, settings)
    };

    if let Some(exercise_type) = preferred {
        let of_type: Vec<&Exercise> = candidates
            .iter()
            .copied()
            .filter(|e| e.exercise_type == exercise_type)
            .collect();
        if let Some(exercise) = of_type.choose(rng) {
            return Some(*exercise);
        }
    }
    candidates.choose(rng).copied()
}

/// Deficit of each exercise type over the session history.
pub fn type_deficits(
    session_history: &[ExerciseType],
    settings: &SelectionSettings,
) -> Vec<(ExerciseType, f64)> {
    let total = session_history.len().max(1) as f64;
    ExerciseType::ALL
        .iter()
        .map(|t| {
            let count = session_history.iter().filter(|h| *h == t).count() as f64;
            (*t, settings.type_ratios.ratio(*t) - count / total)
        })
        .collect()
}

fn most_needed_type(
    candidates: &[&Exercise],
    session_history: &[ExerciseType],
    settings: &SelectionSettings,
) -> Option<ExerciseType> {
    type_deficits(session_history, settings)
        .into_iter()
        .filter(|(t, _)| candidates.iter().any(|e| e.exercise_type == *t))
        .filter(|(_, deficit)| *deficit > settings.deficit_threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}

fn times_seen_by_slug(attempts: &[ExerciseAttempt]) -> HashMap<&str, u32> {
    attempts
        .iter()
        .map(|a| (a.exercise_slug.as_str(), a.times_seen))
        .collect()
}

fn times_seen(seen: &HashMap<&str, u32>, exercise: &Exercise) -> u32 {
    seen.get(exercise.slug.as_str()).copied().unwrap_or(0)
}
