// src/api/users.rs

use validator::Validate;

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::models::streak::AnswerStats;
use crate::models::user::{ProfileUpdate, UserProfile};

impl ApiClient {
    /// GET /user-answers/stats/:userId, lifetime answer counters.
    pub async fn fetch_answer_stats(&self, user_id: i64) -> Result<AnswerStats, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("user-answers/stats/{}", user_id))?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// GET /user/profile: level, points and completion counters for the
    /// logged-in user.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .get(self.url("user/profile")?)
            .header("Authorization", self.bearer()?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// PATCH /user/profile: renames the account and returns the profile in
    /// the same shape as the GET.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        if let Err(validation_errors) = update.validate() {
            return Err(ClientError::Validation(validation_errors.to_string()));
        }

        let response = self
            .http
            .patch(self.url("user/profile")?)
            .header("Authorization", self.bearer()?)
            .json(update)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }
}
