// src/quiz/presenter.rs

use crate::models::question::WrongAnswer;
use crate::quiz::QuizOutcome;

/// Feedback band for a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTier {
    Excellent,
    Good,
    NeedsPractice,
}

impl FeedbackTier {
    fn for_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            FeedbackTier::Excellent
        } else if percentage >= 60 {
            FeedbackTier::Good
        } else {
            FeedbackTier::NeedsPractice
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent! You have mastered this content.",
            FeedbackTier::Good => "Good work! You are on the right track.",
            FeedbackTier::NeedsPractice => "Keep practicing. Practice makes perfect!",
        }
    }
}

/// Display model for the results screen.
#[derive(Debug, Clone)]
pub struct QuizSummary {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub tier: FeedbackTier,
    pub wrong_answers: Vec<WrongAnswer>,
}

/// Pure transformation from a raw result into the display model. When the
/// backend sent no percentage it is computed locally; an empty quiz is a
/// defined edge case (0%), not an error.
pub fn present(
    score: u32,
    total: u32,
    percentage: Option<u32>,
    wrong_answers: Vec<WrongAnswer>,
) -> QuizSummary {
    let percentage = percentage.unwrap_or_else(|| {
        if total == 0 {
            0
        } else {
            (score as f64 / total as f64 * 100.0).round() as u32
        }
    });
    QuizSummary {
        score,
        total,
        percentage,
        tier: FeedbackTier::for_percentage(percentage),
        wrong_answers,
    }
}

pub fn present_outcome(outcome: QuizOutcome) -> QuizSummary {
    present(
        outcome.score,
        outcome.total,
        outcome.percentage,
        outcome.wrong_answers,
    )
}
