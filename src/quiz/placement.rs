// src/quiz/placement.rs

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::models::question::{AnswerRecord, Question, shuffle_options};
use crate::quiz::{
    Explanation, Explainer, PlacementClassifier, QuizOutcome, QuizPhase, QuizStep, StreakTracker,
    correct_answers, wrong_answers,
};
use crate::session::store::SessionStore;

/// The one-shot placement quiz.
///
/// State machine: AwaitingAnswer ⇄ AnswerChecked, then Submitting and
/// either Completed or Failed. Question order is kept as served
/// (easiest-first); only each question's options are shuffled. On
/// completion the correctly answered `{question_id, level}` pairs go to the
/// classification backend and the resulting level is written into the
/// session store.
pub struct PlacementQuiz {
    questions: Vec<Question>,
    current_index: usize,
    answers: Vec<AnswerRecord>,
    score: u32,
    phase: QuizPhase,
    selected: Option<String>,
    user_id: i64,
    classifier: Arc<dyn PlacementClassifier>,
    explainer: Arc<dyn Explainer>,
    streaks: Arc<dyn StreakTracker>,
    store: Arc<dyn SessionStore>,
    explanations_tx: mpsc::UnboundedSender<Explanation>,
    explanations_rx: mpsc::UnboundedReceiver<Explanation>,
}

impl PlacementQuiz {
    pub async fn load(
        source: &dyn crate::quiz::QuestionSource,
        classifier: Arc<dyn PlacementClassifier>,
        explainer: Arc<dyn Explainer>,
        streaks: Arc<dyn StreakTracker>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let user_id = store
            .load()
            .user()
            .map(|u| u.id)
            .ok_or(ClientError::AuthRequired)?;

        let mut questions = source.placement_questions().await?;
        shuffle_options(&mut questions);

        let (explanations_tx, explanations_rx) = mpsc::unbounded_channel();
        Ok(Self {
            questions,
            current_index: 0,
            answers: Vec::new(),
            score: 0,
            phase: QuizPhase::AwaitingAnswer,
            selected: None,
            user_id,
            classifier,
            explainer,
            streaks,
            store,
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

    /// 1-based position and total, for progress display.
    pub fn progress(&self) -> (usize, usize) {
        (
            (self.current_index + 1).min(self.questions.len()),
            self.questions.len(),
        )
    }

    /// Checks the selected option against the question's correct one.
    /// Legal only while awaiting an answer; a missing selection is a
    /// validation reject. A wrong answer fires an AI-explanation request
    /// that resolves out-of-band and can never fail the quiz.
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
            // Receiver may be gone if the quiz was torn down; that is fine.
            let _ = tx.send(Explanation {
                question_id: question.id,
                text,
            });
        });
    }

    /// Records the checked answer and moves to the next question, or
    /// submits the run when this was the last one. Legal only after
    /// `check_answer`.
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
        self.submit().await.map(QuizStep::Finished)
    }

    /// Re-runs the classification submission after a failure. The answers
    /// collected so far are still here; no reload needed.
    pub async fn retry_submit(&mut self) -> Result<QuizOutcome, ClientError> {
        if self.phase != QuizPhase::Failed {
            return Err(ClientError::Validation(
                "There is no failed submission to retry.".to_string(),
            ));
        }
        self.submit().await
    }

    async fn submit(&mut self) -> Result<QuizOutcome, ClientError> {
        self.phase = QuizPhase::Submitting;

        let correct = correct_answers(&self.questions, &self.answers);
        let wrong = wrong_answers(&self.questions, &self.answers);

        match self
            .classifier
            .classify_placement(self.user_id, &correct)
            .await
        {
            Ok(result) => {
                if let Err(e) = self.store.set_placement_level(&result.placement_level) {
                    tracing::error!("Failed to persist placement level: {}", e);
                }
                let streaks = Arc::clone(&self.streaks);
                tokio::spawn(async move {
                    if let Err(e) = streaks.record_activity().await {
                        tracing::warn!("Streak update failed: {}", e);
                    }
                });
                self.phase = QuizPhase::Completed;
                Ok(QuizOutcome {
                    score: self.score,
                    total: self.questions.len() as u32,
                    percentage: None,
                    wrong_answers: wrong,
                    placement: Some(result),
                })
            }
            Err(e) => {
                tracing::error!("Placement submission failed: {}", e);
                self.phase = QuizPhase::Failed;
                Err(ClientError::Submission(e.to_string()))
            }
        }
    }

    /// Next resolved AI explanation, if any. Entries carry the question id
    /// they belong to; the caller decides whether a late arrival is still
    /// current or shown out-of-band.
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
    use crate::session::store::{LocalSessionStore, Session};
    use crate::models::user::User;
    use std::time::Duration;

    fn store_with_user() -> Arc<LocalSessionStore> {
        let store = Arc::new(LocalSessionStore::in_memory());
        store
            .save(&Session::new(
                "tok".to_string(),
                None,
                Some(User {
                    id: 9,
                    name: "Ana".to_string(),
                    email: "ana@example.com".to_string(),
                    placement_level: None,
                }),
            ))
            .unwrap();
        store
    }

    async fn quiz_with(
        questions: Vec<crate::models::question::Question>,
        classifier: Arc<FakeClassifier>,
        store: Arc<LocalSessionStore>,
    ) -> PlacementQuiz {
        let source = FakeSource { questions };
        PlacementQuiz::load(
            &source,
            classifier,
            Arc::new(FakeExplainer::new()),
            Arc::new(FakeStreaks),
            store,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn all_correct_run_submits_every_question() {
        let questions: Vec<_> = (1..=8).map(|i| question(i, (i % 5) + 1, "a")).collect();
        let classifier = Arc::new(FakeClassifier::new("3"));
        let store = store_with_user();
        let mut quiz = quiz_with(questions, classifier.clone(), store.clone()).await;

        let outcome = loop {
            assert!(quiz.check_answer(Some("a")).unwrap());
            match quiz.advance().await.unwrap() {
                QuizStep::Next => {
                    // Invariant: score <= answers <= questions.
                    assert!(quiz.score() as usize <= quiz.answers().len());
                    assert!(quiz.answers().len() <= 8);
                }
                QuizStep::Finished(outcome) => break outcome,
            }
        };

        assert_eq!(outcome.score, 8);
        assert_eq!(outcome.total, 8);
        assert!(outcome.wrong_answers.is_empty());
        assert_eq!(outcome.placement.unwrap().placement_level, "3");
        assert_eq!(quiz.phase(), QuizPhase::Completed);

        let (user_id, payload) = classifier.seen.lock().unwrap()[0].clone();
        assert_eq!(user_id, 9);
        assert_eq!(payload.len(), 8);

        // Placement completion is a partial session update.
        assert!(store.is_placed());
    }

    #[tokio::test]
    async fn wrong_answer_collects_detail_and_explanation() {
        let questions = vec![question(1, 2, "a"), question(2, 4, "a")];
        let classifier = Arc::new(FakeClassifier::new("1"));
        let store = store_with_user();
        let mut quiz = quiz_with(questions, classifier.clone(), store).await;

        assert!(!quiz.check_answer(Some("x")).unwrap());
        // Quiz progression is independent of the explanation request.
        assert!(matches!(quiz.advance().await.unwrap(), QuizStep::Next));

        assert!(quiz.check_answer(Some("a")).unwrap());
        let outcome = match quiz.advance().await.unwrap() {
            QuizStep::Finished(outcome) => outcome,
            QuizStep::Next => panic!("expected the quiz to finish"),
        };

        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.wrong_answers.len(), 1);
        let wrong = &outcome.wrong_answers[0];
        assert_eq!(wrong.question, "Question 1");
        assert_eq!(wrong.correct_answer, "right 1");
        assert_eq!(wrong.user_answer, "wrong 1");
        assert_eq!(wrong.level, 2);

        // Only the correct question reaches the classifier.
        let (_, payload) = classifier.seen.lock().unwrap()[0].clone();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[0].question_id, 2);
        assert_eq!(payload[0].level, 4);

        // The fired explanation arrives keyed by its question id.
        let explanation = tokio::time::timeout(Duration::from_secs(1), quiz.next_explanation())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(explanation.question_id, 1);
    }

    #[tokio::test]
    async fn guards_reject_out_of_order_calls() {
        let questions = vec![question(1, 1, "a")];
        let classifier = Arc::new(FakeClassifier::new("1"));
        let store = store_with_user();
        let mut quiz = quiz_with(questions, classifier, store).await;

        // advance before check
        assert!(matches!(
            quiz.advance().await,
            Err(ClientError::Validation(_))
        ));

        // check with no selection
        assert!(matches!(
            quiz.check_answer(None),
            Err(ClientError::Validation(_))
        ));
        assert_eq!(quiz.phase(), QuizPhase::AwaitingAnswer);

        // double check
        quiz.check_answer(Some("a")).unwrap();
        assert!(matches!(
            quiz.check_answer(Some("a")),
            Err(ClientError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn failed_submission_keeps_answers_and_is_retryable() {
        let questions = vec![question(1, 1, "a")];
        let classifier = Arc::new(FakeClassifier::new("2"));
        *classifier.fail.lock().unwrap() = true;
        let store = store_with_user();
        let mut quiz = quiz_with(questions, classifier.clone(), store.clone()).await;

        quiz.check_answer(Some("a")).unwrap();
        let err = quiz.advance().await.unwrap_err();
        assert!(matches!(err, ClientError::Submission(_)));
        assert!(err.is_retryable());
        assert_eq!(quiz.phase(), QuizPhase::Failed);
        assert_eq!(quiz.answers().len(), 1);
        assert!(!store.is_placed());

        // Backend recovers; retry succeeds without reloading questions.
        *classifier.fail.lock().unwrap() = false;
        let outcome = quiz.retry_submit().await.unwrap();
        assert_eq!(outcome.score, 1);
        assert_eq!(quiz.phase(), QuizPhase::Completed);
        assert!(store.is_placed());
    }

    #[tokio::test]
    async fn load_requires_an_authenticated_user() {
        let source = FakeSource { questions: vec![] };
        let store = Arc::new(LocalSessionStore::in_memory());
        let result = PlacementQuiz::load(
            &source,
            Arc::new(FakeClassifier::new("1")),
            Arc::new(FakeExplainer::new()),
            Arc::new(FakeStreaks),
            store,
        )
        .await;
        assert!(matches!(result, Err(ClientError::AuthRequired)));
    }
}
