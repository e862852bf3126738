// src/api/modules.rs

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::models::module::{CategoryProgress, Module, ModuleCategory};

impl ApiClient {
    /// GET /modules: everything the user can study.
    pub async fn fetch_modules(&self) -> Result<Vec<Module>, ClientError> {
        let response = self
            .http
            .get(self.url("modules")?)
            .header("Authorization", self.bearer()?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// GET /modules/:id
    pub async fn fetch_module(&self, module_id: i64) -> Result<Module, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("modules/{}", module_id))?)
            .header("Authorization", self.bearer()?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// GET /modules/:id/categories
    pub async fn fetch_module_categories(
        &self,
        module_id: i64,
    ) -> Result<Vec<ModuleCategory>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("modules/{}/categories", module_id))?)
            .header("Authorization", self.bearer()?)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// Category completion percentage. Degrades to 0 on any failure;
    /// a missing progress number must never break the category listing.
    pub async fn fetch_category_progress(&self, module_id: i64, category_id: i64) -> u32 {
        let result: Result<CategoryProgress, ClientError> = async {
            let response = self
                .http
                .get(self.url(&format!(
                    "modules/{}/categories/{}/progress",
                    module_id, category_id
                ))?)
                .header("Authorization", self.bearer()?)
                .send()
                .await?;
            let response = self.check(response).await?;
            Ok(response.json().await?)
        }
        .await;

        match result {
            Ok(body) => body.progress,
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch progress for category {}/{}: {}",
                    module_id,
                    category_id,
                    e
                );
                0
            }
        }
    }
}
