//! Routes anonymous users to an ephemeral store and everyone else to the
//! persistent one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::profile::{ProfileUpdate, UserProfile, is_anonymous};
use crate::store::memory::MemoryBackend;
use crate::store::traits::{ChatLogEntry, Database, MessageRole, UserRecord};

pub struct RoutedStore {
    ephemeral: Arc<dyn Database>,
    persistent: Arc<dyn Database>,
}

impl RoutedStore {
    pub fn new(persistent: Arc<dyn Database>) -> Self {
        Self {
            ephemeral: Arc::new(MemoryBackend::new()),
            persistent,
        }
    }

    fn route(&self, user_id: &str) -> &dyn Database {
        if is_anonymous(user_id) {
            self.ephemeral.as_ref()
        } else {
            self.persistent.as_ref()
        }
    }
}

#[async_trait]
impl Database for RoutedStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        self.route(user_id).get_profile(user_id).await
    }

    async fn upsert_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, DatabaseError> {
        self.route(user_id).upsert_profile(user_id, update).await
    }

    async fn delete_profile(&self, user_id: &str) -> Result<u64, DatabaseError> {
        self.route(user_id).delete_profile(user_id).await
    }

    async fn append_message(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DatabaseError> {
        self.route(user_id).append_message(user_id, role, content).await
    }

    async fn get_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        self.route(user_id).get_recent(user_id, limit).await
    }

    async fn delete_messages(&self, user_id: &str) -> Result<u64, DatabaseError> {
        self.route(user_id).delete_messages(user_id).await
    }

    async fn upsert_user(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserRecord, DatabaseError> {
        self.route(id).upsert_user(id, name, email).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.route(id).get_user(id).await
    }
}
