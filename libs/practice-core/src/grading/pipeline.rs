//! Two-pass grading.
//!
//! Pass 1 decides correctness with the resolved strategy. Pass 2 runs only
//! for correct answers to exercises with a target construct and decides
//! whether to coach.

use serde::{Deserialize, Serialize};

use super::construct::detect_construct;
use super::normalize::normalize_code;
use super::oracle::{ExecutionContext, Expectation, OracleError};
use super::strategy::{match_answer, resolve_strategy, MatchKind, StrategyPlan};
use crate::settings::GradingSettings;
use crate::types::{Exercise, ExerciseType, GradingStrategy};

/// Why the fallback strategy graded the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    InfraUnavailable,
    ExecutionError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingResult {
    pub is_correct: bool,
    pub grading_method: GradingStrategy,
    /// `None` unless the answer is correct and the exercise has a target
    /// construct.
    pub used_target_construct: Option<bool>,
    pub coaching_feedback: Option<String>,
    pub normalized_user_answer: String,
    pub normalized_expected_answer: String,
    /// The accepted alternative that matched, if it was not the expected answer.
    pub matched_alternative: Option<String>,
    /// Matched only after structural canonicalization.
    #[serde(default)]
    pub used_ast_match: bool,
}

/// Grading result plus what happened to the execution infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeReport {
    #[serde(flatten)]
    pub result: GradingResult,
    pub infra_available: bool,
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl GradeReport {
    pub fn is_correct(&self) -> bool {
        self.result.is_correct
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Verdict {
    is_correct: bool,
    method: GradingStrategy,
    matched_alternative: Option<String>,
    used_ast_match: bool,
}

impl Verdict {
    fn incorrect(method: GradingStrategy) -> Self {
        Self {
            is_correct: false,
            method,
            matched_alternative: None,
            used_ast_match: false,
        }
    }
}

/// Grade an answer, running execution-graded exercises through the oracle
/// in `context`.
///
/// Falls back to the plan's secondary strategy only when the oracle is
/// missing, unavailable, errors or times out. A wrong answer is never
/// regraded.
pub async fn grade_with_strategy(
    user_answer: &str,
    exercise: &Exercise,
    context: Option<&ExecutionContext<'_>>,
    settings: &GradingSettings,
) -> GradeReport {
    let plan = resolve_strategy(exercise);
    let primary = match plan.primary {
        GradingStrategy::Execution => execute(user_answer, exercise, context).await,
        strategy => Ok(compare(strategy, user_answer, exercise)),
    };
    finish(user_answer, exercise, plan, primary, settings)
}

/// Grade without any execution infrastructure.
///
/// Execution-graded exercises go straight to their fallback with
/// [`FallbackReason::InfraUnavailable`].
pub fn grade_answer(user_answer: &str, exercise: &Exercise, settings: &GradingSettings) -> GradeReport {
    let plan = resolve_strategy(exercise);
    let primary = if plan.primary.needs_oracle() {
        Err(FallbackReason::InfraUnavailable)
    } else {
        Ok(compare(plan.primary, user_answer, exercise))
    };
    finish(user_answer, exercise, plan, primary, settings)
}

/// Show coaching only for correct answers that skipped the target construct.
pub fn should_show_coaching(result: &GradingResult) -> bool {
    result.is_correct && result.used_target_construct == Some(false)
}

fn finish(
    user_answer: &str,
    exercise: &Exercise,
    plan: StrategyPlan,
    primary: Result<Verdict, FallbackReason>,
    settings: &GradingSettings,
) -> GradeReport {
    debug_assert!(
        !exercise.expected_answer.trim().is_empty(),
        "exercise {} has no expected answer",
        exercise.slug
    );

    let (verdict, fallback_reason) = match primary {
        Ok(verdict) => (verdict, None),
        Err(reason) => {
            let fallback = plan.fallback.unwrap_or(GradingStrategy::Exact);
            (compare(fallback, user_answer, exercise), Some(reason))
        }
    };

    let (used_target_construct, coaching_feedback) = match &exercise.target_construct {
        Some(target) if verdict.is_correct => {
            if detect_construct(user_answer, target.construct) {
                (Some(true), None)
            } else {
                let feedback = target
                    .feedback
                    .clone()
                    .unwrap_or_else(|| settings.default_coaching_feedback.clone());
                (Some(false), Some(feedback))
            }
        }
        _ => (None, None),
    };

    tracing::debug!(
        exercise = %exercise.slug,
        method = verdict.method.as_str(),
        correct = verdict.is_correct,
        fallback = ?fallback_reason,
        "graded answer"
    );

    GradeReport {
        result: GradingResult {
            is_correct: verdict.is_correct,
            grading_method: verdict.method,
            used_target_construct,
            coaching_feedback,
            normalized_user_answer: normalize_code(user_answer),
            normalized_expected_answer: normalize_code(&exercise.expected_answer),
            matched_alternative: verdict.matched_alternative,
            used_ast_match: verdict.used_ast_match,
        },
        infra_available: fallback_reason.is_none(),
        fallback_used: fallback_reason.is_some(),
        fallback_reason,
    }
}

/// Compare against the expected answer, then each accepted alternative in
/// order. First match wins.
fn compare(strategy: GradingStrategy, user_answer: &str, exercise: &Exercise) -> Verdict {
    let method = match strategy {
        GradingStrategy::Execution => GradingStrategy::Exact,
        other => other,
    };

    if let Some(kind) = match_answer(method, user_answer, &exercise.expected_answer) {
        return Verdict {
            is_correct: true,
            method,
            matched_alternative: None,
            used_ast_match: kind == MatchKind::Structural,
        };
    }

    exercise
        .accepted_solutions
        .iter()
        .find_map(|alternative| {
            match_answer(method, user_answer, alternative).map(|kind| Verdict {
                is_correct: true,
                method,
                matched_alternative: Some(alternative.clone()),
                used_ast_match: kind == MatchKind::Structural,
            })
        })
        .unwrap_or_else(|| Verdict::incorrect(method))
}

/// What to send to the oracle: the program and what it must satisfy.
fn execution_request(user_answer: &str, exercise: &Exercise) -> Option<(String, Expectation)> {
    if let Some(script) = &exercise.verification_script {
        return Some((user_answer.to_string(), Expectation::Assertion(script.clone())));
    }
    match exercise.exercise_type {
        ExerciseType::Predict => exercise
            .code
            .clone()
            .map(|code| (code, Expectation::Output(user_answer.to_string()))),
        ExerciseType::Write | ExerciseType::FillIn => exercise
            .expected_output
            .clone()
            .map(|output| (user_answer.to_string(), Expectation::Output(output))),
    }
}

async fn execute(
    user_answer: &str,
    exercise: &Exercise,
    context: Option<&ExecutionContext<'_>>,
) -> Result<Verdict, FallbackReason> {
    let Some(context) = context.filter(|c| c.oracle.is_some()) else {
        return Err(FallbackReason::InfraUnavailable);
    };
    let Some((code, expectation)) = execution_request(user_answer, exercise) else {
        tracing::warn!(
            exercise = %exercise.slug,
            "execution-graded exercise has nothing to run"
        );
        return Err(FallbackReason::ExecutionError);
    };

    match context.run(&code, &expectation).await {
        Ok(outcome) if outcome.success => Ok(Verdict {
            is_correct: true,
            method: GradingStrategy::Execution,
            matched_alternative: None,
            used_ast_match: false,
        }),
        Ok(outcome) => {
            // Output that differs only in presentation order (set literals)
            // is still accepted when it matches an answer literally.
            let literal = compare(GradingStrategy::Exact, user_answer, exercise);
            if literal.is_correct {
                Ok(literal)
            } else {
                tracing::debug!(
                    exercise = %exercise.slug,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "execution did not match"
                );
                Ok(Verdict::incorrect(GradingStrategy::Execution))
            }
        }
        Err(OracleError::Unavailable) => Err(FallbackReason::InfraUnavailable),
        Err(err) => {
            tracing::warn!(exercise = %exercise.slug, %err, "execution oracle failed");
            Err(FallbackReason::ExecutionError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConstructType, ExerciseLevel, TargetConstruct};
    use pretty_assertions::assert_eq;

    fn exercise(exercise_type: ExerciseType, expected: &str) -> Exercise {
        Exercise {
            slug: "demo".to_string(),
            subconcept: "demo".to_string(),
            level: ExerciseLevel::Intro,
            pattern: "demo".to_string(),
            exercise_type,
            code: None,
            expected_answer: expected.to_string(),
            accepted_solutions: vec![],
            expected_output: None,
            target_construct: None,
            verification_script: None,
            verify_by_execution: false,
            grading_strategy: None,
        }
    }

    #[test]
    fn exact_answer_is_correct() {
        let e = exercise(ExerciseType::FillIn, "print(name)");
        let report = grade_answer("print(name)", &e, &GradingSettings::default());
        assert!(report.is_correct());
        assert_eq!(report.result.grading_method, GradingStrategy::Exact);
        assert!(!report.fallback_used);
        assert!(report.infra_available);
        assert_eq!(report.result.used_target_construct, None);
        assert_eq!(report.result.coaching_feedback, None);
    }

    #[test]
    fn empty_answer_is_incorrect() {
        let e = exercise(ExerciseType::FillIn, "print(name)");
        for answer in ["", "   ", "\n\t"] {
            let report = grade_answer(answer, &e, &GradingSettings::default());
            assert!(!report.is_correct());
            assert_eq!(report.result.normalized_user_answer, "");
        }
    }

    #[test]
    fn accepted_alternative_is_reported() {
        let mut e = exercise(ExerciseType::FillIn, "items[1:4]");
        e.accepted_solutions = vec![
            "items[1:-1]".to_string(),
            "items[1], items[2], items[3]".to_string(),
        ];
        let report = grade_answer("items[1],items[2],  items[3]", &e, &GradingSettings::default());
        assert!(report.is_correct());
        assert_eq!(
            report.result.matched_alternative.as_deref(),
            Some("items[1], items[2], items[3]")
        );
    }

    #[test]
    fn structural_match_is_flagged() {
        let e = exercise(ExerciseType::Write, "print('hello')");
        let report = grade_answer("print(\"hello\")", &e, &GradingSettings::default());
        assert!(report.is_correct());
        assert_eq!(report.result.grading_method, GradingStrategy::Ast);
        assert!(report.result.used_ast_match);
    }

    #[test]
    fn coaching_when_construct_missing() {
        let mut e = exercise(ExerciseType::FillIn, "items[1:4]");
        e.accepted_solutions = vec!["items[1], items[2], items[3]".to_string()];
        e.target_construct = Some(TargetConstruct {
            construct: ConstructType::Slice,
            feedback: None,
        });
        let settings = GradingSettings::default();

        let alternative = grade_answer("items[1], items[2], items[3]", &e, &settings);
        assert_eq!(alternative.result.used_target_construct, Some(false));
        assert_eq!(
            alternative.result.coaching_feedback.as_deref(),
            Some(settings.default_coaching_feedback.as_str())
        );
        assert!(should_show_coaching(&alternative.result));

        let sliced = grade_answer("items[1:4]", &e, &settings);
        assert_eq!(sliced.result.used_target_construct, Some(true));
        assert_eq!(sliced.result.coaching_feedback, None);
        assert!(!should_show_coaching(&sliced.result));
    }

    #[test]
    fn custom_coaching_feedback_wins() {
        let mut e = exercise(ExerciseType::FillIn, "items[1:4]");
        e.accepted_solutions = vec!["items[1], items[2], items[3]".to_string()];
        e.target_construct = Some(TargetConstruct {
            construct: ConstructType::Slice,
            feedback: Some("Try slice notation.".to_string()),
        });
        let report = grade_answer("items[1], items[2], items[3]", &e, &GradingSettings::default());
        assert_eq!(
            report.result.coaching_feedback.as_deref(),
            Some("Try slice notation.")
        );
    }

    #[test]
    fn wrong_answer_skips_construct_pass() {
        let mut e = exercise(ExerciseType::FillIn, "items[1:4]");
        e.target_construct = Some(TargetConstruct {
            construct: ConstructType::Slice,
            feedback: None,
        });
        let report = grade_answer("items[0:4]", &e, &GradingSettings::default());
        assert!(!report.is_correct());
        assert_eq!(report.result.used_target_construct, None);
        assert_eq!(report.result.coaching_feedback, None);
        assert!(!should_show_coaching(&report.result));
    }

    #[test]
    fn execution_without_oracle_falls_back() {
        let mut e = exercise(ExerciseType::Predict, "[1, 2]");
        e.code = Some("print([1, 2])".to_string());
        let report = grade_answer("[1,2]", &e, &GradingSettings::default());
        assert!(report.is_correct());
        assert!(report.fallback_used);
        assert!(!report.infra_available);
        assert_eq!(report.fallback_reason, Some(FallbackReason::InfraUnavailable));
        assert_eq!(report.result.grading_method, GradingStrategy::Exact);
    }

    #[test]
    fn wrong_answer_without_fallback_is_not_regraded() {
        let mut e = exercise(ExerciseType::Write, "total = sum(xs)");
        e.grading_strategy = Some(GradingStrategy::Token);
        let report = grade_answer("total = max(xs)", &e, &GradingSettings::default());
        assert!(!report.is_correct());
        assert!(!report.fallback_used);
        assert_eq!(report.fallback_reason, None);
    }

    #[test]
    fn fallback_reason_serializes_snake_case() {
        let json = serde_json::to_string(&FallbackReason::InfraUnavailable).unwrap();
        assert_eq!(json, "\"infra_unavailable\"");
    }

    #[test]
    fn report_flattens_result() {
        let e = exercise(ExerciseType::FillIn, "x");
        let value = serde_json::to_value(grade_answer("x", &e, &GradingSettings::default())).unwrap();
        assert_eq!(value["is_correct"], true);
        assert_eq!(value["grading_method"], "exact");
        assert_eq!(value["fallback_used"], false);
        assert!(value.get("fallback_reason").is_none());
    }
}
