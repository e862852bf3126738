// src/quiz/adaptive.rs

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::models::question::{AnswerRecord, Question, shuffle_questions_and_options};
use crate::quiz::{
    Explanation, Explainer, QuestionSource, QuizOutcome, QuizPhase, QuizScope, QuizScorer,
    QuizStep, StreakTracker, local_score, wrong_answers,
};
use crate::session::store::SessionStore;

/// Where an adaptive run gets its questions.
#[derive(Debug, Clone)]
pub enum AdaptiveSource {
    /// A previously prepared list stashed in the session store; consumed
    /// once.
    Prepared,
    /// Fresh fetch filtered by topic/module/category.
    Filtered(QuizScope),
    /// Level-matched fetch for a module.
    ByLevel { module_id: i64, quantity: u32 },
}

/// A level-scoped quiz over a module, category or topic.
///
/// Same machine shape as the placement quiz, with three differences: both
/// question order and option order are shuffled; completion submits the
/// full answer list for authoritative scoring; and a failed submission is
/// not fatal: the run completes in degraded mode with the locally
/// computed score and no percentage.
pub struct AdaptiveQuiz {
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<AnswerRecord>,
    score: u32,
    phase: QuizPhase,
    selected: Option<String>,
    scope: QuizScope,
    scorer: Arc<dyn QuizScorer>,
    explainer: Arc<dyn Explainer>,
    streaks: Arc<dyn StreakTracker>,
    explanations_tx: mpsc::UnboundedSender<Explanation>,
    explanations_rx: mpsc::UnboundedReceiver<Explanation>,
}

impl AdaptiveQuiz {
    pub async fn load(
        source: AdaptiveSource,
        questions_from: &dyn QuestionSource,
        scorer: Arc<dyn QuizScorer>,
        explainer: Arc<dyn Explainer>,
        streaks: Arc<dyn StreakTracker>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let (mut questions, scope) = match source {
            AdaptiveSource::Prepared => {
                let questions = store.take_stashed_questions().ok_or_else(|| {
                    ClientError::Validation("No prepared quiz was found.".to_string())
                })?;
                (questions, QuizScope::default())
            }
            AdaptiveSource::Filtered(scope) => {
                let questions = questions_from.quiz_questions(&scope).await?;
                (questions, scope)
            }
            AdaptiveSource::ByLevel {
                module_id,
                quantity,
            } => {
                let questions = questions_from.questions_by_level(module_id, quantity).await?;
                (
                    questions,
                    QuizScope {
                        module_id: Some(module_id),
                        ..QuizScope::default()
                    },
                )
            }
        };
        shuffle_questions_and_options(&mut questions);

        let (explanations_tx, explanations_rx) = mpsc::unbounded_channel();
        Ok(Self {
            questions,
            current_index: 0,
            answers: Vec::new(),
            score: 0,
            phase: QuizPhase::AwaitingAnswer,
            selected: None,
            scope,
            scorer,
            explainer,
            streaks,
            explanations_tx,
            explanations_rx,
        })
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn progress(&self) -> (usize, usize) {
        (
            (self.current_index + 1).min(self.questions.len()),
            self.questions.len(),
        )
    }

    /// Same contract as the placement engine's `check_answer`.
    pub fn check_answer(&mut self, selected: Option<&str>) -> Result<bool, ClientError> {
        if self.phase != QuizPhase::AwaitingAnswer {
            return Err(ClientError::Validation(
                "This answer was already checked.".to_string(),
            ));
        }
        let Some(selected) = selected else {
            return Err(ClientError::Validation(
                "Select an option before checking.".to_string(),
            ));
        };
        let question = self
            .current_question()
            .ok_or_else(|| ClientError::Validation("No question to answer.".to_string()))?;

        let correct = question
            .correct_option()
            .map(|opt| opt.id == selected)
            .unwrap_or(false);

        if correct {
            self.score += 1;
        } else {
            self.spawn_explanation(question.clone());
        }

        self.selected = Some(selected.to_string());
        self.phase = QuizPhase::AnswerChecked;
        Ok(correct)
    }

    fn spawn_explanation(&self, question: Question) {
        let tx = self.explanations_tx.clone();
        let explainer = Arc::clone(&self.explainer);
        let correct_text = question
            .correct_option()
            .map(|o| o.text.clone())
            .unwrap_or_default();
        tokio::spawn(async move {
            let text = explainer.explain(&question.text, &correct_text).await;
            let _ = tx.send(Explanation {
                question_id: question.id,
                text,
            });
        });
    }

    /// Records the checked answer; on the last question submits the full
    /// answer list for scoring, degrading to the local score when the
    /// backend call fails.
    pub async fn advance(&mut self) -> Result<QuizStep, ClientError> {
        if self.phase != QuizPhase::AnswerChecked {
            return Err(ClientError::Validation(
                "Check the current answer before advancing.".to_string(),
            ));
        }

        let question_id = self
            .current_question()
            .map(|q| q.id)
            .ok_or_else(|| ClientError::Validation("No question to record.".to_string()))?;
        self.answers.push(AnswerRecord {
            question_id,
            selected_option_id: self.selected.take().unwrap_or_default(),
        });
        self.current_index += 1;

        if self.current_index < self.questions.len() {
            self.phase = QuizPhase::AwaitingAnswer;
            return Ok(QuizStep::Next);
        }

        self.phase = QuizPhase::Submitting;
        // Wrong-answer details are always computed locally; the presenter
        // needs them whatever the scoring call does.
        let wrong = wrong_answers(&self.questions, &self.answers);

        let outcome = match self.scorer.score_quiz(&self.answers, &self.scope).await {
            Ok(scored) => QuizOutcome {
                score: scored.score,
                total: scored.total,
                percentage: Some(scored.percentage),
                wrong_answers: wrong,
                placement: None,
            },
            Err(e) => {
                tracing::warn!("Quiz submission failed, falling back to local score: {}", e);
                QuizOutcome {
                    score: local_score(&self.questions, &self.answers),
                    total: self.questions.len() as u32,
                    percentage: None,
                    wrong_answers: wrong,
                    placement: None,
                }
            }
        };

        let streaks = Arc::clone(&self.streaks);
        tokio::spawn(async move {
            if let Err(e) = streaks.record_activity().await {
                tracing::warn!("Streak update failed: {}", e);
            }
        });

        self.phase = QuizPhase::Completed;
        Ok(QuizStep::Finished(outcome))
    }

    pub async fn next_explanation(&mut self) -> Option<Explanation> {
        self.explanations_rx.recv().await
    }

    pub fn try_next_explanation(&mut self) -> Option<Explanation> {
        self.explanations_rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::fakes::*;
    use crate::session::store::LocalSessionStore;

    async fn quiz_with(
        questions: Vec<Question>,
        scorer: Arc<FakeScorer>,
        store: Arc<LocalSessionStore>,
    ) -> AdaptiveQuiz {
        let source = FakeSource { questions };
        AdaptiveQuiz::load(
            AdaptiveSource::Filtered(QuizScope {
                topic: Some("grammar".to_string()),
                ..QuizScope::default()
            }),
            &source,
            scorer,
            Arc::new(FakeExplainer::new()),
            Arc::new(FakeStreaks),
            store,
        )
        .await
        .unwrap()
    }

    async fn run_to_completion(quiz: &mut AdaptiveQuiz, pick: &str) -> QuizOutcome {
        loop {
            quiz.check_answer(Some(pick)).unwrap();
            match quiz.advance().await.unwrap() {
                QuizStep::Next => {
                    assert!(quiz.score() as usize <= quiz.answers().len());
                }
                QuizStep::Finished(outcome) => return outcome,
            }
        }
    }

    #[tokio::test]
    async fn authoritative_scoring_carries_percentage() {
        let questions: Vec<_> = (1..=4).map(|i| question(i, 2, "a")).collect();
        let store = Arc::new(LocalSessionStore::in_memory());
        let mut quiz = quiz_with(questions, Arc::new(FakeScorer { fail: false }), store).await;

        let outcome = run_to_completion(&mut quiz, "a").await;
        assert_eq!(outcome.score, 4);
        assert_eq!(outcome.percentage, Some(100));
        assert!(outcome.placement.is_none());
        assert_eq!(quiz.phase(), QuizPhase::Completed);
    }

    #[tokio::test]
    async fn scorer_failure_degrades_to_local_score() {
        let questions: Vec<_> = (1..=3).map(|i| question(i, 1, "a")).collect();
        let store = Arc::new(LocalSessionStore::in_memory());
        let mut quiz = quiz_with(questions, Arc::new(FakeScorer { fail: true }), store).await;

        quiz.check_answer(Some("a")).unwrap();
        quiz.advance().await.unwrap();
        quiz.check_answer(Some("x")).unwrap();
        quiz.advance().await.unwrap();
        quiz.check_answer(Some("a")).unwrap();
        let outcome = match quiz.advance().await.unwrap() {
            QuizStep::Finished(outcome) => outcome,
            QuizStep::Next => panic!("expected the quiz to finish"),
        };

        // Degraded mode: local score, no percentage, wrong answers intact.
        assert_eq!(outcome.score, 2);
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.percentage, None);
        assert_eq!(outcome.wrong_answers.len(), 1);
        assert_eq!(quiz.phase(), QuizPhase::Completed);
    }

    #[tokio::test]
    async fn prepared_questions_are_consumed_once() {
        let store = Arc::new(LocalSessionStore::in_memory());
        store
            .stash_questions(&[question(1, 1, "a")])
            .unwrap();

        let source = FakeSource { questions: vec![] };
        let quiz = AdaptiveQuiz::load(
            AdaptiveSource::Prepared,
            &source,
            Arc::new(FakeScorer { fail: false }),
            Arc::new(FakeExplainer::new()),
            Arc::new(FakeStreaks),
            store.clone(),
        )
        .await
        .unwrap();
        assert!(!quiz.is_empty());

        // Second run finds nothing: the stash was single-use.
        let again = AdaptiveQuiz::load(
            AdaptiveSource::Prepared,
            &source,
            Arc::new(FakeScorer { fail: false }),
            Arc::new(FakeExplainer::new()),
            Arc::new(FakeStreaks),
            store,
        )
        .await;
        assert!(matches!(again, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn shuffled_questions_keep_one_correct_option_each() {
        let questions: Vec<_> = (1..=10).map(|i| question(i, 3, "a")).collect();
        let store = Arc::new(LocalSessionStore::in_memory());
        let mut quiz = quiz_with(questions, Arc::new(FakeScorer { fail: false }), store).await;

        let (_, total) = quiz.progress();
        assert_eq!(total, 10);
        while let Some(q) = quiz.current_question() {
            assert_eq!(q.options.iter().filter(|o| o.is_correct).count(), 1);
            let correct_id = q.correct_option().unwrap().id.clone();
            quiz.check_answer(Some(&correct_id)).unwrap();
            if let QuizStep::Finished(_) = quiz.advance().await.unwrap() {
                break;
            }
        }
    }
}
