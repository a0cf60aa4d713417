//! Core types shared by the scheduler, selector and grading pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Card learning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Review,
    Relearning,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::New
    }
}

impl CardStatus {
    /// Integer code used by the progress table (0-3).
    pub fn as_code(self) -> i16 {
        match self {
            Self::New => 0,
            Self::Learning => 1,
            Self::Review => 2,
            Self::Relearning => 3,
        }
    }

    /// Decode the progress table's integer code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::New),
            1 => Ok(Self::Learning),
            2 => Ok(Self::Review),
            3 => Ok(Self::Relearning),
            other => Err(EngineError::InvalidStateCode(other)),
        }
    }
}

/// Rating for a review, ordered by strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self != Self::Again
    }
}

impl TryFrom<u8> for Rating {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_value(value).ok_or(EngineError::InvalidRating(value))
    }
}

/// Scheduling state of one subconcept for one learner.
///
/// `stability` is measured in days, `difficulty` lies in `0.0..=1.0`.
/// `ease_factor` and `streak` are only advanced by the legacy SM-2
/// scheduler and are carried through untouched by the memory-model engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardState {
    pub status: CardStatus,
    pub stability: f64,
    pub difficulty: f64,
    pub reps: u32,
    pub lapses: u32,
    pub elapsed_days: i64,
    pub scheduled_days: i64,
    pub due: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    #[serde(default)]
    pub streak: u32,
}

pub(crate) fn default_ease_factor() -> f64 {
    2.5
}

impl Default for CardState {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl CardState {
    /// Fresh state for a subconcept first seen at `now`; due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            status: CardStatus::New,
            stability: 0.0,
            difficulty: 0.0,
            reps: 0,
            lapses: 0,
            elapsed_days: 0,
            scheduled_days: 0,
            due: now,
            last_review: None,
            ease_factor: default_ease_factor(),
            streak: 0,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Exercise-selection mode derived from the scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Learning,
    Review,
}

impl Phase {
    pub fn from_status(status: CardStatus) -> Self {
        match status {
            CardStatus::Review => Self::Review,
            CardStatus::New | CardStatus::Learning | CardStatus::Relearning => Self::Learning,
        }
    }
}

/// One progress row per (user, language, subconcept).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubconceptProgress {
    pub user_id: Uuid,
    pub language: String,
    pub subconcept_slug: String,
    #[serde(flatten)]
    pub card: CardState,
}

impl SubconceptProgress {
    /// Row created on first exposure to a subconcept.
    pub fn new(
        user_id: Uuid,
        language: impl Into<String>,
        subconcept_slug: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            language: language.into(),
            subconcept_slug: subconcept_slug.into(),
            card: CardState::new(now),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_status(self.card.status)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.card.is_due(now)
    }
}

/// Per-exercise presentation counters for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseAttempt {
    pub user_id: Uuid,
    pub exercise_slug: String,
    pub times_seen: u32,
    pub times_correct: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl ExerciseAttempt {
    pub fn new(user_id: Uuid, exercise_slug: impl Into<String>) -> Self {
        Self {
            user_id,
            exercise_slug: exercise_slug.into(),
            times_seen: 0,
            times_correct: 0,
            last_seen_at: None,
        }
    }

    /// Count one grading pass, whatever the scheduler phase.
    pub fn record(&mut self, is_correct: bool, now: DateTime<Utc>) {
        self.times_seen = self.times_seen.saturating_add(1);
        if is_correct {
            self.times_correct = self.times_correct.saturating_add(1);
        }
        self.last_seen_at = Some(now);
    }
}

/// Difficulty tier of an exercise within its subconcept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseLevel {
    Intro,
    Practice,
    Edge,
    Integrated,
}

impl ExerciseLevel {
    /// Progression order used in the learning phase.
    pub const ORDER: [ExerciseLevel; 4] = [
        ExerciseLevel::Intro,
        ExerciseLevel::Practice,
        ExerciseLevel::Edge,
        ExerciseLevel::Integrated,
    ];
}

/// What the learner is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    Write,
    FillIn,
    Predict,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 3] = [ExerciseType::Write, ExerciseType::FillIn, ExerciseType::Predict];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::FillIn => "fill-in",
            Self::Predict => "predict",
        }
    }
}

/// How correctness of an answer is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStrategy {
    /// Normalized string equality.
    Exact,
    /// Structural equality of the token stream.
    Ast,
    /// Lexical token equality.
    Token,
    /// Run the code through the execution oracle.
    Execution,
}

impl GradingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Ast => "ast",
            Self::Token => "token",
            Self::Execution => "execution",
        }
    }

    /// Whether the strategy needs the external execution oracle.
    pub fn needs_oracle(&self) -> bool {
        matches!(self, Self::Execution)
    }
}

/// Language idioms an exercise can coach towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructType {
    Slice,
    /// Any list, dict or set comprehension, or generator expression.
    Comprehension,
    ListComprehension,
    DictComprehension,
    SetComprehension,
    GeneratorExpression,
    FString,
    Enumerate,
    Zip,
    Lambda,
    Ternary,
    Walrus,
    With,
}

/// The idiom an exercise wants to teach, with optional coaching text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConstruct {
    #[serde(rename = "type")]
    pub construct: ConstructType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Immutable exercise content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub slug: String,
    pub subconcept: String,
    pub level: ExerciseLevel,
    pub pattern: String,
    pub exercise_type: ExerciseType,
    /// Snippet shown to the learner; predict exercises run it through the oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub expected_answer: String,
    #[serde(default)]
    pub accepted_solutions: Vec<String>,
    /// Output a write exercise must print when graded by execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_construct: Option<TargetConstruct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_script: Option<String>,
    /// Older content flags execution grading with a boolean.
    #[serde(default)]
    pub verify_by_execution: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_strategy: Option<GradingStrategy>,
}

impl Exercise {
    /// Reject content the grader cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.expected_answer.trim().is_empty() {
            return Err(EngineError::MissingExpectedAnswer {
                slug: self.slug.clone(),
            });
        }
        Ok(())
    }
}
