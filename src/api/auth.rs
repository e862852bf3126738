// src/api/auth.rs

use validator::Validate;

use crate::api::client::ApiClient;
use crate::error::ClientError;
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest};

impl ApiClient {
    /// Registers a new user. Input is validated client-side before it
    /// reaches the wire.
    pub async fn register(&self, payload: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        if let Err(validation_errors) = payload.validate() {
            return Err(ClientError::Validation(validation_errors.to_string()));
        }

        let response = self
            .http
            .post(self.url("auth/register")?)
            .json(payload)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }

    /// Authenticates and returns the token + user payload. The caller
    /// decides how to persist it (see `session::establish`).
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let payload = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        if let Err(validation_errors) = payload.validate() {
            return Err(ClientError::Validation(validation_errors.to_string()));
        }

        let response = self
            .http
            .post(self.url("auth/login")?)
            .json(&payload)
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.json().await?)
    }
}
