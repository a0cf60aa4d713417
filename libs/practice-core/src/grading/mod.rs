//! Answer grading: strategy resolution, in-process matchers, the execution
//! oracle seam and construct coaching.

pub mod construct;
pub mod lexer;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod strategy;

pub use construct::detect_construct;
pub use normalize::normalize_code;
pub use oracle::{ExecutionContext, ExecutionOracle, ExecutionOutcome, Expectation, OracleError};
pub use pipeline::{
    grade_answer, grade_with_strategy, should_show_coaching, FallbackReason, GradeReport,
    GradingResult,
};
pub use strategy::{resolve_strategy, MatchKind, StrategyPlan};
