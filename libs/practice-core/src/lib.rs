//! Adaptive practice engine for code exercises.
//!
//! Provides:
//! - Review scheduling (FSRS memory model, legacy SM-2) with a shared card lifecycle
//! - Rating inference from correctness, hints and response time
//! - Exercise selection by level progression, least-seen and type balance
//! - Answer grading (exact, token, structural, execution) with construct coaching
//! - Due-set management and progress-store row mapping

pub mod algorithm;
pub mod due;
pub mod error;
pub mod grading;
pub mod logging;
pub mod persistence;
pub mod rating;
pub mod selector;
pub mod session;
pub mod settings;
pub mod types;

pub use algorithm::{get_scheduler, MemoryModel, MemoryState, ReviewEngine, ReviewResult, Scheduler};
pub use due::{get_due_subconcepts, DueSet};
pub use error::{EngineError, Result};
pub use grading::{
    grade_answer, grade_with_strategy, resolve_strategy, should_show_coaching, ExecutionContext,
    ExecutionOracle, FallbackReason, GradeReport, GradingResult, StrategyPlan,
};
pub use persistence::{AttemptRow, ProgressRow};
pub use rating::{infer_rating, quality_to_rating, rating_to_quality, RatingInput};
pub use selector::{select_exercise, select_exercise_by_type, SubconceptInfo};
pub use session::{AnswerSubmission, PracticeEngine, ReviewOutcome};
pub use settings::{EngineSettings, SchedulerKind};
pub use types::{
    CardState, CardStatus, ConstructType, Exercise, ExerciseAttempt, ExerciseLevel, ExerciseType,
    GradingStrategy, Phase, Rating, SubconceptProgress, TargetConstruct,
};
