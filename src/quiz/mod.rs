// src/quiz/mod.rs

pub mod adaptive;
pub mod placement;
pub mod presenter;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::models::question::{
    AnswerRecord, CorrectAnswer, PlacementResult, Question, QuizScore, WrongAnswer,
};
use crate::models::streak::StreakData;

/// Lifecycle of a quiz run. `check_answer` and `advance` are only legal in
/// the phases the machine says they are; illegal calls are explicit
/// rejects, never silent state corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    AwaitingAnswer,
    AnswerChecked,
    Submitting,
    Completed,
    Failed,
}

/// Filter parameters for adaptive question fetching and scoring.
#[derive(Debug, Clone, Default)]
pub struct QuizScope {
    pub topic: Option<String>,
    pub module_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// An AI explanation resolved out-of-band. Keyed by question id so a late
/// arrival for a superseded question is never attributed to the wrong one.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub question_id: i64,
    pub text: String,
}

/// Everything a quiz run can report when it finishes. `percentage` is only
/// present when the backend scored the run authoritatively; `placement`
/// only for the placement quiz.
#[derive(Debug, Clone)]
pub struct QuizOutcome {
    pub score: u32,
    pub total: u32,
    pub percentage: Option<u32>,
    pub wrong_answers: Vec<WrongAnswer>,
    pub placement: Option<PlacementResult>,
}

/// What `advance()` produced.
#[derive(Debug)]
pub enum QuizStep {
    Next,
    Finished(QuizOutcome),
}

#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn placement_questions(&self) -> Result<Vec<Question>, ClientError>;

    async fn quiz_questions(&self, scope: &QuizScope) -> Result<Vec<Question>, ClientError>;

    /// Level-matched questions for the current user.
    async fn questions_by_level(
        &self,
        module_id: i64,
        quantity: u32,
    ) -> Result<Vec<Question>, ClientError>;
}

#[async_trait]
pub trait PlacementClassifier: Send + Sync {
    /// Sends the correctly answered `{question_id, level}` pairs and
    /// receives the user's placement classification.
    async fn classify_placement(
        &self,
        user_id: i64,
        correct: &[CorrectAnswer],
    ) -> Result<PlacementResult, ClientError>;
}

#[async_trait]
pub trait QuizScorer: Send + Sync {
    /// Authoritative scoring of the full answer list.
    async fn score_quiz(
        &self,
        answers: &[AnswerRecord],
        scope: &QuizScope,
    ) -> Result<QuizScore, ClientError>;
}

#[async_trait]
pub trait Explainer: Send + Sync {
    /// Explains why `correct_answer` answers `question`. Infallible by
    /// contract: every failure inside degrades to a neutral fallback
    /// string, so a broken AI backend can never fail a quiz.
    async fn explain(&self, question: &str, correct_answer: &str) -> String;
}

#[async_trait]
pub trait StreakTracker: Send + Sync {
    /// Registers today's activity. Called best-effort on quiz completion.
    async fn record_activity(&self) -> Result<StreakData, ClientError>;
}

fn find_question(questions: &[Question], question_id: i64) -> Option<&Question> {
    questions.iter().find(|q| q.id == question_id)
}

/// Whether the recorded answer picked the correct option. A missing
/// question or a malformed question without a correct option counts as
/// wrong.
pub(crate) fn answer_is_correct(questions: &[Question], answer: &AnswerRecord) -> bool {
    find_question(questions, answer.question_id)
        .and_then(Question::correct_option)
        .map(|opt| opt.id == answer.selected_option_id)
        .unwrap_or(false)
}

/// `{question_id, level}` for every correctly answered question, in answer
/// order. This is the placement submission payload.
pub(crate) fn correct_answers(
    questions: &[Question],
    answers: &[AnswerRecord],
) -> Vec<CorrectAnswer> {
    answers
        .iter()
        .filter(|a| answer_is_correct(questions, a))
        .filter_map(|a| {
            find_question(questions, a.question_id).map(|q| CorrectAnswer {
                question_id: q.id,
                level: q.level,
            })
        })
        .collect()
}

/// Locally computed detail records for every question answered
/// incorrectly. Needed by the presenter even when backend scoring fails.
pub(crate) fn wrong_answers(questions: &[Question], answers: &[AnswerRecord]) -> Vec<WrongAnswer> {
    answers
        .iter()
        .filter(|a| !answer_is_correct(questions, a))
        .filter_map(|a| {
            find_question(questions, a.question_id).map(|q| WrongAnswer {
                question: q.text.clone(),
                correct_answer: q
                    .correct_option()
                    .map(|o| o.text.clone())
                    .unwrap_or_default(),
                user_answer: q
                    .option_text(&a.selected_option_id)
                    .unwrap_or_default()
                    .to_string(),
                level: q.level,
                review: None,
            })
        })
        .collect()
}

pub(crate) fn local_score(questions: &[Question], answers: &[AnswerRecord]) -> u32 {
    answers
        .iter()
        .filter(|a| answer_is_correct(questions, a))
        .count() as u32
}
