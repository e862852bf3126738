// src/api/streak.rs

use async_trait::async_trait;

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::models::streak::StreakData;
use crate::quiz::StreakTracker;

impl ApiClient {
    /// GET /streak
    pub async fn fetch_streak(&self) -> Result<StreakData, ClientError> {
        let response = self
            .http
            .get(self.url("streak")?)
            .header("Authorization", self.bearer()?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// POST /streak/update: registers today's activity.
    pub async fn update_streak(&self) -> Result<StreakData, ClientError> {
        let response = self
            .http
            .post(self.url("streak/update")?)
            .header("Authorization", self.bearer()?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StreakTracker for ApiClient {
    async fn record_activity(&self) -> Result<StreakData, ClientError> {
        self.update_streak().await
    }
}
