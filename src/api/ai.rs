// src/api/ai.rs

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::models::question::{Review, WrongAnswer};
use crate::quiz::Explainer;

/// Shown whenever no provider could produce an explanation.
pub const EXPLANATION_FALLBACK: &str = "No explanation could be generated right now.";

/// After the free explainer endpoint rate-limits us, prefer the keyed
/// provider for this long.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Serialize)]
struct ExplainRequest<'a> {
    question: &'a str,
    correct_answer: &'a str,
}

#[derive(Deserialize)]
struct ExplainResponse {
    explanation: String,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct ReviewRequest<'a> {
    questions: &'a [WrongAnswer],
}

#[derive(Deserialize)]
struct ReviewResponse {
    #[serde(default)]
    reviews: Vec<Review>,
}

impl ApiClient {
    /// POST /explainer, the free provider. A 429 is remembered so the
    /// next call can skip straight to the keyed fallback.
    async fn call_explainer(
        &self,
        question: &str,
        correct_answer: &str,
    ) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("explainer")?)
            .json(&ExplainRequest {
                question,
                correct_answer,
            })
            .send()
            .await?;
        if response.status().as_u16() == 429 {
            *self.ai_rate_limited_at.lock().unwrap_or_else(|p| p.into_inner()) =
                Some(Instant::now());
            return Err(ClientError::ApiStatus(429, "rate limit exceeded".to_string()));
        }
        let response = self.check(response).await?;
        let body: ExplainResponse = response.json().await?;
        Ok(body.explanation)
    }

    /// Direct call to the generative-text endpoint with the user-supplied
    /// key from the session store.
    async fn call_gemini(&self, question: &str, correct_answer: &str) -> Result<String, ClientError> {
        let api_key = self
            .store
            .gemini_api_key()
            .ok_or_else(|| ClientError::Validation("No fallback AI key configured.".to_string()))?;

        let prompt = format!(
            "Explain briefly and clearly why this is the correct answer.\n\
             Question: {}\nCorrect answer: {}",
            question, correct_answer
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(GEMINI_URL)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        let response = self.check(response).await?;
        let body: GeminiResponse = response.json().await?;
        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| ClientError::Validation("empty generative response".to_string()))
    }

    fn recently_rate_limited(&self) -> bool {
        self.ai_rate_limited_at
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .map(|at| at.elapsed() < RATE_LIMIT_WINDOW)
            .unwrap_or(false)
    }

    /// POST /review: batch enrichment of wrong-answer records.
    pub async fn review_wrong_answers(
        &self,
        wrong: &[WrongAnswer],
    ) -> Result<Vec<Review>, ClientError> {
        let response = self
            .http
            .post(self.url("review")?)
            .json(&ReviewRequest { questions: wrong })
            .send()
            .await?;
        let response = self.check(response).await?;
        let body: ReviewResponse = response.json().await?;
        Ok(body.reviews)
    }

    /// Best-effort enrichment: pairs each wrong answer with its review.
    /// Any failure leaves the records displayable as they are.
    pub async fn enrich_wrong_answers(&self, wrong: &mut [WrongAnswer]) {
        if wrong.is_empty() {
            return;
        }
        match self.review_wrong_answers(wrong).await {
            Ok(reviews) => {
                for (answer, review) in wrong.iter_mut().zip(reviews) {
                    answer.review = Some(review);
                }
            }
            Err(e) => {
                tracing::warn!("Wrong-answer enrichment failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl Explainer for ApiClient {
    /// Tries the free provider, then the keyed fallback, and finally the
    /// neutral string. Never fails; quiz progression does not depend on
    /// this call.
    async fn explain(&self, question: &str, correct_answer: &str) -> String {
        if self.recently_rate_limited() {
            if let Ok(text) = self.call_gemini(question, correct_answer).await {
                return text;
            }
        }
        match self.call_explainer(question, correct_answer).await {
            Ok(text) => text,
            Err(primary) => {
                tracing::warn!("Explainer endpoint failed: {}", primary);
                match self.call_gemini(question, correct_answer).await {
                    Ok(text) => text,
                    Err(fallback) => {
                        tracing::warn!("Fallback explainer failed: {}", fallback);
                        EXPLANATION_FALLBACK.to_string()
                    }
                }
            }
        }
    }
}
