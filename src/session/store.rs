// src/session/store.rs

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ClientError;
use crate::models::question::Question;
use crate::models::user::{PlacementLevel, User};

/// In-memory view of the persisted session.
///
/// Invariant: if `token` is absent the cached user is treated as absent as
/// well, whatever happens to be on disk. The accessors enforce this.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    token_expiry: Option<i64>,
    user: Option<User>,
}

impl Session {
    pub fn new(token: String, token_expiry: Option<i64>, user: Option<User>) -> Self {
        Self {
            token: Some(token),
            token_expiry,
            user,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Advisory expiry in epoch millis. Client-side only; there is no
    /// cryptographic guarantee behind it.
    pub fn token_expiry(&self) -> Option<i64> {
        self.token_expiry
    }

    pub fn user(&self) -> Option<&User> {
        if self.token.is_none() {
            return None;
        }
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_placed(&self) -> bool {
        self.is_authenticated()
            && self
                .user()
                .map(|u| u.placement().is_placed())
                .unwrap_or(false)
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        matches!(self.token_expiry, Some(expiry) if now_millis > expiry)
    }
}

/// Injectable session persistence. Quiz engines, the access gate's callers
/// and the expiration monitor all go through this interface, which keeps
/// them testable against [`LocalSessionStore::in_memory`].
pub trait SessionStore: Send + Sync {
    /// Reads the persisted session. Never fails: missing fields default to
    /// empty and a malformed cached user is treated as no user.
    fn load(&self) -> Session;

    /// Persists token, expiry and user. Atomic from the caller's
    /// perspective; readers in this process never observe a partial write.
    fn save(&self, session: &Session) -> Result<(), ClientError>;

    /// Removes every persisted field.
    fn clear(&self) -> Result<(), ClientError>;

    /// Partial update applied when the placement quiz completes.
    fn set_placement_level(&self, level: &str) -> Result<(), ClientError>;

    /// Stores a prepared question list for the next adaptive quiz run.
    fn stash_questions(&self, questions: &[Question]) -> Result<(), ClientError>;

    /// Takes the prepared question list. Single-use: the stash is deleted
    /// as part of the read.
    fn take_stashed_questions(&self) -> Option<Vec<Question>>;

    fn gemini_api_key(&self) -> Option<String>;

    fn set_gemini_api_key(&self, key: &str) -> Result<(), ClientError>;

    /// Change notifications. Every mutation broadcasts the new session
    /// snapshot so independent observers can resynchronize without polling.
    fn subscribe(&self) -> watch::Receiver<Session>;

    fn is_authenticated(&self) -> bool {
        self.load().is_authenticated()
    }

    fn is_placed(&self) -> bool {
        self.load().is_placed()
    }
}

/// On-disk layout. Values are kept as strings (the user record
/// JSON-encoded) to match what the original web client persisted, so a
/// session file survives client upgrades.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedFields {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_expiry: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    quiz_questions: Option<String>,
    #[serde(default)]
    gemini_api_key: Option<String>,
}

impl PersistedFields {
    fn decode(&self) -> Session {
        let token = self.token.clone();
        let token_expiry = self.token_expiry.as_deref().and_then(|v| v.parse().ok());
        // Malformed cached user JSON degrades to "no user".
        let user = match (&token, &self.user) {
            (Some(_), Some(raw)) => serde_json::from_str(raw).ok(),
            _ => None,
        };
        Session {
            token,
            token_expiry,
            user,
        }
    }
}

/// File-backed [`SessionStore`] with an in-memory mode for tests and
/// ephemeral runs.
pub struct LocalSessionStore {
    path: Option<PathBuf>,
    fields: Mutex<PersistedFields>,
    tx: watch::Sender<Session>,
}

impl LocalSessionStore {
    /// Opens (or initializes) the session file at `path`. An unreadable or
    /// malformed file is treated as an empty session, never an error.
    pub fn open(path: PathBuf) -> Self {
        let fields = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self::with_fields(Some(path), fields)
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::with_fields(None, PersistedFields::default())
    }

    fn with_fields(path: Option<PathBuf>, fields: PersistedFields) -> Self {
        let (tx, _rx) = watch::channel(fields.decode());
        Self {
            path,
            fields: Mutex::new(fields),
            tx,
        }
    }

    /// Applies a mutation under the lock, persists the result and
    /// broadcasts the new snapshot.
    fn mutate<F>(&self, apply: F) -> Result<(), ClientError>
    where
        F: FnOnce(&mut PersistedFields),
    {
        let mut fields = self
            .fields
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut fields);
        self.persist(&fields)?;
        self.tx.send_replace(fields.decode());
        Ok(())
    }

    fn persist(&self, fields: &PersistedFields) -> Result<(), ClientError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded = serde_json::to_string_pretty(fields)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        // Write-then-rename so a crash never leaves a torn session file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encoded).map_err(|e| ClientError::Storage(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| ClientError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl SessionStore for LocalSessionStore {
    fn load(&self) -> Session {
        self.fields
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .decode()
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        let token = session.token().map(str::to_string);
        let token_expiry = session.token_expiry().map(|v| v.to_string());
        let user = session
            .user()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        let user_id = session.user().map(|u| u.id.to_string());
        self.mutate(|fields| {
            fields.token = token;
            fields.token_expiry = token_expiry;
            fields.user = user;
            fields.user_id = user_id;
        })
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.mutate(|fields| *fields = PersistedFields::default())
    }

    fn set_placement_level(&self, level: &str) -> Result<(), ClientError> {
        let current = self.load();
        let Some(user) = current.user() else {
            return Err(ClientError::AuthRequired);
        };
        let mut user = user.clone();
        user.placement_level = Some(level.to_string());
        let encoded = serde_json::to_string(&user).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.mutate(|fields| fields.user = Some(encoded))
    }

    fn stash_questions(&self, questions: &[Question]) -> Result<(), ClientError> {
        let encoded =
            serde_json::to_string(questions).map_err(|e| ClientError::Storage(e.to_string()))?;
        self.mutate(|fields| fields.quiz_questions = Some(encoded))
    }

    fn take_stashed_questions(&self) -> Option<Vec<Question>> {
        let mut taken = None;
        let result = self.mutate(|fields| taken = fields.quiz_questions.take());
        if let Err(e) = result {
            tracing::warn!("Failed to persist question-stash removal: {}", e);
        }
        taken.and_then(|raw| serde_json::from_str(&raw).ok())
    }

    fn gemini_api_key(&self) -> Option<String> {
        self.fields
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gemini_api_key
            .clone()
    }

    fn set_gemini_api_key(&self, key: &str) -> Result<(), ClientError> {
        let key = key.trim().to_string();
        self.mutate(|fields| fields.gemini_api_key = Some(key))
    }

    fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }
}
