//! `Database` trait — single async interface for profiles, chat log and users.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::profile::{ProfileUpdate, UserProfile};

/// Who authored a chat log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "user" => Self::User,
            _ => Self::Assistant,
        }
    }
}

/// One entry of a user's chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A logged-in user created by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence covering profiles, the chat log and users.
#[async_trait]
pub trait Database: Send + Sync {
    // ── Profiles ────────────────────────────────────────────────────

    /// Load a profile. `None` when the user has never been stored.
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Merge `update` into the stored profile (creating it if absent) and
    /// return the result. Unknown field names are ignored. The
    /// read-modify-write is atomic per call.
    async fn upsert_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, DatabaseError>;

    /// Delete a profile. Returns the number of rows removed (0 or 1).
    async fn delete_profile(&self, user_id: &str) -> Result<u64, DatabaseError>;

    // ── Chat log ────────────────────────────────────────────────────

    async fn append_message(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DatabaseError>;

    /// The `limit` most recent entries, oldest first.
    async fn get_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError>;

    /// Delete a user's whole chat log. Returns the number of entries removed.
    async fn delete_messages(&self, user_id: &str) -> Result<u64, DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    async fn upsert_user(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserRecord, DatabaseError>;

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError>;
}
