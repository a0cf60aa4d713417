//! One answered exercise, end to end: grade, infer a rating, reschedule the
//! subconcept and count the attempt.
//!
//! Nothing here touches storage. The caller loads the rows, hands them in
//! and persists what comes back.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::algorithm::{get_scheduler, Scheduler};
use crate::error::Result;
use crate::grading::{grade_answer, grade_with_strategy, ExecutionContext, ExecutionOracle, GradeReport};
use crate::rating::{infer_rating, RatingInput};
use crate::selector::{select_exercise, SubconceptInfo};
use crate::settings::EngineSettings;
use crate::types::{Exercise, ExerciseAttempt, Rating, SubconceptProgress};

/// What the learner submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub answer: String,
    #[serde(default)]
    pub hint_used: bool,
    pub response_time_ms: u64,
}

/// Rows to persist after one answer, plus how it was graded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub progress: SubconceptProgress,
    pub attempt: ExerciseAttempt,
    pub rating: Rating,
    pub report: GradeReport,
}

/// Scheduler, selector and grader configured from one [`EngineSettings`].
pub struct PracticeEngine {
    settings: EngineSettings,
    scheduler: Box<dyn Scheduler>,
}

impl PracticeEngine {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        let scheduler = get_scheduler(&settings);
        tracing::info!(scheduler = scheduler.name(), "practice engine ready");
        Ok(Self {
            settings,
            scheduler,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    /// Progress row for a subconcept the learner has never practised.
    pub fn start_progress(
        &self,
        user_id: Uuid,
        language: &str,
        subconcept_slug: &str,
        now: DateTime<Utc>,
    ) -> SubconceptProgress {
        SubconceptProgress {
            user_id,
            language: language.to_string(),
            subconcept_slug: subconcept_slug.to_string(),
            card: self.scheduler.initial_state(now),
        }
    }

    /// Reschedule a subconcept after a rated review.
    pub fn review(
        &self,
        progress: &SubconceptProgress,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> SubconceptProgress {
        let result = self.scheduler.review(&progress.card, rating, now);
        SubconceptProgress {
            card: result.new_state,
            ..progress.clone()
        }
    }

    /// Next exercise for the subconcept in `progress`, in its current phase.
    pub fn select<'a, R: Rng + ?Sized>(
        &self,
        progress: &SubconceptProgress,
        exercises: &'a [Exercise],
        attempts: &[ExerciseAttempt],
        last_pattern: Option<&str>,
        rng: &mut R,
    ) -> Option<&'a Exercise> {
        let info = SubconceptInfo::new(progress.subconcept_slug.clone(), progress.phase());
        select_exercise(&info, exercises, attempts, last_pattern, rng)
    }

    /// Grade without an execution oracle.
    pub fn grade(&self, answer: &str, exercise: &Exercise) -> GradeReport {
        grade_answer(answer, exercise, &self.settings.grading)
    }

    /// Grade through `oracle` when given, then apply the result.
    pub async fn answer_exercise(
        &self,
        progress: &SubconceptProgress,
        attempt: Option<&ExerciseAttempt>,
        exercise: &Exercise,
        submission: &AnswerSubmission,
        oracle: Option<&dyn ExecutionOracle>,
        now: DateTime<Utc>,
    ) -> ReviewOutcome {
        let context = match oracle {
            Some(oracle) => ExecutionContext::new(oracle, &self.settings.grading),
            None => ExecutionContext::unavailable(&self.settings.grading),
        };
        let report = grade_with_strategy(
            &submission.answer,
            exercise,
            Some(&context),
            &self.settings.grading,
        )
        .await;
        self.apply_grading(progress, attempt, exercise, submission, report, now)
    }

    /// Turn a grading report into the rows to persist.
    pub fn apply_grading(
        &self,
        progress: &SubconceptProgress,
        attempt: Option<&ExerciseAttempt>,
        exercise: &Exercise,
        submission: &AnswerSubmission,
        report: GradeReport,
        now: DateTime<Utc>,
    ) -> ReviewOutcome {
        let rating = infer_rating(
            &RatingInput {
                is_correct: report.result.is_correct,
                hint_used: submission.hint_used,
                response_time_ms: submission.response_time_ms,
                used_ast_match: report.result.used_ast_match,
            },
            &self.settings.rating,
        );

        let mut attempt = attempt
            .cloned()
            .unwrap_or_else(|| ExerciseAttempt::new(progress.user_id, exercise.slug.clone()));
        attempt.record(report.result.is_correct, now);

        let progress = self.review(progress, rating, now);
        tracing::debug!(
            subconcept = %progress.subconcept_slug,
            exercise = %exercise.slug,
            ?rating,
            due = %progress.card.due,
            "applied answer"
        );

        ReviewOutcome {
            progress,
            attempt,
            rating,
            report,
        }
    }
}

impl std::fmt::Debug for PracticeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeEngine")
            .field("scheduler", &self.scheduler.name())
            .finish()
    }
}
