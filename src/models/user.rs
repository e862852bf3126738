// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// The user record as returned by the auth endpoints and cached in the
/// session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    pub email: String,

    /// Placement level assigned after the placement quiz. The backend has
    /// historically sent `null`, `""` or `"0"` for users that have not been
    /// placed yet; consumers must go through [`PlacementLevel::normalize`]
    /// rather than inspect this field directly.
    #[serde(default)]
    pub placement_level: Option<String>,
}

/// Normalized placement state. `null`, empty and `"0"` all collapse into
/// `Unplaced`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementLevel {
    Unplaced,
    Placed(String),
}

impl PlacementLevel {
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw {
            None => PlacementLevel::Unplaced,
            Some(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() || trimmed == "0" {
                    PlacementLevel::Unplaced
                } else {
                    PlacementLevel::Placed(trimmed.to_string())
                }
            }
        }
    }

    pub fn is_placed(&self) -> bool {
        matches!(self, PlacementLevel::Placed(_))
    }
}

impl User {
    pub fn placement(&self) -> PlacementLevel {
        PlacementLevel::normalize(self.placement_level.as_deref())
    }
}

/// DTO for registration.
#[derive(Debug, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for login.
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Successful register/login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// The profile payload from GET/PATCH /user/profile. `level` inherits the
/// placement field's inconsistency (string or number on the wire) and is
/// normalized the same way.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
    #[serde(deserialize_with = "crate::models::question::level_as_string")]
    pub level: String,
    #[serde(default)]
    pub points: i64,
    /// ISO-8601 registration timestamp, kept verbatim for display.
    #[serde(rename = "createdAt", default)]
    pub created_at: String,
    #[serde(rename = "completedModules", default)]
    pub completed_modules: u32,
    #[serde(rename = "completedLessons", default)]
    pub completed_lessons: u32,
}

/// PATCH /user/profile body. The backend only honors the name.
#[derive(Debug, Serialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
}
