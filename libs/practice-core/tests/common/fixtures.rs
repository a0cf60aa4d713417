//! Exercise content and progress rows for integration tests.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use practice_core::types::{
    CardState, CardStatus, ConstructType, Exercise, ExerciseAttempt, ExerciseLevel, ExerciseType,
    SubconceptProgress, TargetConstruct,
};

/// Minimal exercise; tests override what they care about.
pub fn exercise(slug: &str, subconcept: &str, level: ExerciseLevel, pattern: &str) -> Exercise {
    Exercise {
        slug: slug.to_string(),
        subconcept: subconcept.to_string(),
        level,
        pattern: pattern.to_string(),
        exercise_type: ExerciseType::Write,
        code: None,
        expected_answer: format!("{slug}()"),
        accepted_solutions: vec![],
        expected_output: None,
        target_construct: None,
        verification_script: None,
        verify_by_execution: false,
        grading_strategy: None,
    }
}

pub fn print_name() -> Exercise {
    Exercise {
        exercise_type: ExerciseType::FillIn,
        expected_answer: "print(name)".to_string(),
        ..exercise("print-name", "print", ExerciseLevel::Intro, "output")
    }
}

/// Slice exercise that also accepts spelling the items out.
pub fn middle_items() -> Exercise {
    Exercise {
        exercise_type: ExerciseType::FillIn,
        expected_answer: "items[1:4]".to_string(),
        accepted_solutions: vec!["items[1], items[2], items[3]".to_string()],
        target_construct: Some(TargetConstruct {
            construct: ConstructType::Slice,
            feedback: None,
        }),
        ..exercise("middle-items", "slicing", ExerciseLevel::Practice, "extract")
    }
}

pub fn doubled_list() -> Exercise {
    Exercise {
        expected_answer: "doubled = [x * 2 for x in numbers]".to_string(),
        accepted_solutions: vec!["doubled = list(map(lambda x: x * 2, numbers))".to_string()],
        target_construct: Some(TargetConstruct {
            construct: ConstructType::ListComprehension,
            feedback: Some("A list comprehension says this in one line.".to_string()),
        }),
        ..exercise("doubled-list", "comprehensions", ExerciseLevel::Intro, "transform")
    }
}

pub fn greeting() -> Exercise {
    Exercise {
        expected_answer: "print(f\"Hello, {name}!\")".to_string(),
        expected_output: Some("Hello, Ada!".to_string()),
        target_construct: Some(TargetConstruct {
            construct: ConstructType::FString,
            feedback: None,
        }),
        ..exercise("greeting", "f-strings", ExerciseLevel::Intro, "format")
    }
}

pub fn predict_set() -> Exercise {
    Exercise {
        exercise_type: ExerciseType::Predict,
        code: Some("print({3, 1, 2})".to_string()),
        expected_answer: "{1, 2, 3}".to_string(),
        accepted_solutions: vec!["{3, 1, 2}".to_string()],
        ..exercise("predict-set", "sets", ExerciseLevel::Edge, "predict-output")
    }
}

pub fn verified_square() -> Exercise {
    Exercise {
        expected_answer: "def square(n):\n    return n * n".to_string(),
        verification_script: Some("assert square(3) == 9".to_string()),
        ..exercise("verified-square", "functions", ExerciseLevel::Practice, "define")
    }
}

/// Every content fixture above.
pub fn all_exercises() -> Vec<Exercise> {
    vec![
        print_name(),
        middle_items(),
        doubled_list(),
        greeting(),
        predict_set(),
        verified_square(),
    ]
}

pub fn progress(slug: &str, now: DateTime<Utc>) -> SubconceptProgress {
    SubconceptProgress::new(Uuid::nil(), "python", slug, now)
}

/// A card in review that was last seen `stability` days before `now`.
pub fn review_progress(slug: &str, stability: f64, now: DateTime<Utc>) -> SubconceptProgress {
    let days = stability.round() as i64;
    SubconceptProgress {
        card: CardState {
            status: CardStatus::Review,
            stability,
            difficulty: 0.5,
            reps: 6,
            lapses: 0,
            elapsed_days: days,
            scheduled_days: days,
            due: now,
            last_review: Some(now - Duration::days(days)),
            ..CardState::new(now)
        },
        ..progress(slug, now)
    }
}

pub fn attempt(slug: &str, times_seen: u32) -> ExerciseAttempt {
    ExerciseAttempt {
        times_seen,
        ..ExerciseAttempt::new(Uuid::nil(), slug)
    }
}
