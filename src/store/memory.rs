//! In-memory `Database` implementation.
//!
//! Backs anonymous sessions (nothing survives a restart) and unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::profile::{ProfileUpdate, UserProfile};
use crate::store::traits::{ChatLogEntry, Database, MessageRole, UserRecord};

#[derive(Default)]
pub struct MemoryBackend {
    profiles: RwLock<HashMap<String, UserProfile>>,
    messages: RwLock<HashMap<String, Vec<ChatLogEntry>>>,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryBackend {
    // ── Profiles ────────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn upsert_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, DatabaseError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id));
        profile.apply_update(update);
        Ok(profile.clone())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<u64, DatabaseError> {
        Ok(self.profiles.write().await.remove(user_id).map_or(0, |_| 1))
    }

    // ── Chat log ────────────────────────────────────────────────────

    async fn append_message(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DatabaseError> {
        self.messages
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(ChatLogEntry {
                role,
                content: content.to_string(),
                timestamp: Utc::now(),
            });
        Ok(())
    }

    async fn get_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        let messages = self.messages.read().await;
        let Some(log) = messages.get(user_id) else {
            return Ok(Vec::new());
        };
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }

    async fn delete_messages(&self, user_id: &str) -> Result<u64, DatabaseError> {
        Ok(self
            .messages
            .write()
            .await
            .remove(user_id)
            .map_or(0, |log| log.len() as u64))
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn upsert_user(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserRecord, DatabaseError> {
        let mut users = self.users.write().await;
        let record = users.entry(id.to_string()).or_insert_with(|| UserRecord {
            id: id.to_string(),
            name: None,
            email: None,
            created_at: Utc::now(),
        });
        if let Some(name) = name {
            record.name = Some(name.to_string());
        }
        if let Some(email) = email {
            record.email = Some(email.to_string());
        }
        Ok(record.clone())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileField;

    #[tokio::test]
    async fn upsert_merges_fields() {
        let db = MemoryBackend::new();
        db.upsert_profile("anon_1", &ProfileUpdate::new().set(ProfileField::Age, 33))
            .await
            .unwrap();
        let profile = db
            .upsert_profile(
                "anon_1",
                &ProfileUpdate::new().set(ProfileField::RetirementAge, 66),
            )
            .await
            .unwrap();
        assert_eq!(profile.age, Some(33));
        assert_eq!(profile.retirement_age, Some(66));
        assert_eq!(profile.user_id, "anon_1");
    }

    #[tokio::test]
    async fn recent_window_matches_libsql_semantics() {
        let db = MemoryBackend::new();
        for i in 0..7 {
            db.append_message("anon_1", MessageRole::User, &format!("m{i}"))
                .await
                .unwrap();
        }
        let recent = db.get_recent("anon_1", 3).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["m4", "m5", "m6"]);
        assert!(db.get_recent("anon_2", 3).await.unwrap().is_empty());
        assert!(db.get_recent("anon_1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deletes_report_counts() {
        let db = MemoryBackend::new();
        db.upsert_profile("anon_1", &ProfileUpdate::new().set(ProfileField::Age, 33))
            .await
            .unwrap();
        db.append_message("anon_1", MessageRole::User, "hi").await.unwrap();
        db.append_message("anon_1", MessageRole::Assistant, "hello").await.unwrap();

        assert_eq!(db.delete_profile("anon_1").await.unwrap(), 1);
        assert_eq!(db.delete_messages("anon_1").await.unwrap(), 2);
        assert_eq!(db.delete_profile("anon_1").await.unwrap(), 0);
        assert_eq!(db.delete_messages("anon_1").await.unwrap(), 0);
    }
}
