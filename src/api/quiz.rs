// src/api/quiz.rs

use async_trait::async_trait;
use serde_json::json;

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::models::question::{
    AnswerRecord, CorrectAnswer, PlacementResult, Question, QuizScore,
};
use crate::quiz::{PlacementClassifier, QuestionSource, QuizScope, QuizScorer};

impl ApiClient {
    /// GET /nivelamento: the fixed placement question set, served
    /// easiest-first.
    pub async fn fetch_placement_questions(&self) -> Result<Vec<Question>, ClientError> {
        let response = self.http.get(self.url("nivelamento")?).send().await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// GET /questions with optional topic/module/category filters.
    pub async fn fetch_quiz_questions(
        &self,
        scope: &QuizScope,
    ) -> Result<Vec<Question>, ClientError> {
        let mut url = self.url("questions")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(topic) = &scope.topic {
                pairs.append_pair("topic", topic);
            }
            if let Some(module_id) = scope.module_id {
                pairs.append_pair("moduleId", &module_id.to_string());
            }
            if let Some(category_id) = scope.category_id {
                pairs.append_pair("categoryId", &category_id.to_string());
            }
        }
        let response = self.http.get(url).send().await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// POST /questions/by-level: level-matched questions for a module.
    pub async fn fetch_questions_by_level(
        &self,
        module_id: i64,
        user_id: i64,
        quantity: u32,
    ) -> Result<Vec<Question>, ClientError> {
        let response = self
            .http
            .post(self.url("questions/by-level")?)
            .json(&json!({
                "module_id": module_id,
                "user_id": user_id,
                "quantity": quantity,
            }))
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// POST /questions/submit-quiz. The bearer header is attached only
    /// when the deployment is configured to want it.
    pub async fn submit_quiz(
        &self,
        answers: &[AnswerRecord],
        scope: &QuizScope,
    ) -> Result<QuizScore, ClientError> {
        let mut request = self.http.post(self.url("questions/submit-quiz")?).json(&json!({
            "answers": answers,
            "topic": scope.topic,
            "moduleId": scope.module_id,
            "categoryId": scope.category_id,
        }));
        if self.submit_quiz_requires_auth {
            request = request.header("Authorization", self.bearer()?);
        }
        let response = request.send().await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// POST /nivelamento/resultado: sends the correctly answered
    /// questions, receives the placement classification.
    pub async fn submit_placement(
        &self,
        user_id: i64,
        correct: &[CorrectAnswer],
    ) -> Result<PlacementResult, ClientError> {
        let response = self
            .http
            .post(self.url("nivelamento/resultado")?)
            .json(&json!({
                "user_id": user_id,
                "respostas": correct,
            }))
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl QuestionSource for ApiClient {
    async fn placement_questions(&self) -> Result<Vec<Question>, ClientError> {
        self.fetch_placement_questions().await
    }

    async fn quiz_questions(&self, scope: &QuizScope) -> Result<Vec<Question>, ClientError> {
        self.fetch_quiz_questions(scope).await
    }

    async fn questions_by_level(
        &self,
        module_id: i64,
        quantity: u32,
    ) -> Result<Vec<Question>, ClientError> {
        let user_id = self
            .store
            .load()
            .user()
            .map(|u| u.id)
            .ok_or(ClientError::AuthRequired)?;
        self.fetch_questions_by_level(module_id, user_id, quantity)
            .await
    }
}

#[async_trait]
impl PlacementClassifier for ApiClient {
    async fn classify_placement(
        &self,
        user_id: i64,
        correct: &[CorrectAnswer],
    ) -> Result<PlacementResult, ClientError> {
        self.submit_placement(user_id, correct).await
    }
}

#[async_trait]
impl QuizScorer for ApiClient {
    async fn score_quiz(
        &self,
        answers: &[AnswerRecord],
        scope: &QuizScope,
    ) -> Result<QuizScore, ClientError> {
        self.submit_quiz(answers, scope).await
    }
}
