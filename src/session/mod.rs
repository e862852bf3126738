// src/session/mod.rs

pub mod gate;
pub mod monitor;
pub mod store;

use crate::error::ClientError;
use crate::models::user::AuthResponse;
use store::{Session, SessionStore};

/// Creates and persists a session from a successful login/registration.
/// The backend sends no expiry, so the client stamps an advisory one of
/// `now + token_ttl_secs` that the expiration monitor polices.
pub fn establish(
    store: &dyn SessionStore,
    auth: &AuthResponse,
    token_ttl_secs: i64,
) -> Result<Session, ClientError> {
    let expiry = chrono::Utc::now().timestamp_millis() + token_ttl_secs * 1000;
    let session = Session::new(auth.token.clone(), Some(expiry), Some(auth.user.clone()));
    store.save(&session)?;
    Ok(session)
}
