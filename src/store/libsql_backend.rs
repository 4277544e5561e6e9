//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Profiles are stored as one
//! JSON document per user; the chat log is an autoincrement table so the
//! row id gives a stable insertion order.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::profile::{ProfileUpdate, UserProfile};
use crate::store::migrations;
use crate::store::traits::{ChatLogEntry, Database, MessageRole, UserRecord};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// Profile read-modify-write runs inside a transaction. Writes take
/// `write_lock` so nothing else runs on the connection mid-transaction.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    write_lock: Mutex<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Decode a stored profile document. A corrupt document reads as an empty
/// profile rather than failing the whole turn.
fn decode_profile(user_id: &str, data: &str) -> UserProfile {
    match serde_json::from_str::<UserProfile>(data) {
        Ok(mut profile) => {
            profile.user_id = user_id.to_string();
            profile
        }
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Discarding unreadable profile document");
            UserProfile::new(user_id)
        }
    }
}

async fn read_profile(conn: &Connection, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT data FROM profiles WHERE user_id = ?1",
            params![user_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let data: String = row.get(0).unwrap_or_else(|_| "{}".to_string());
            Ok(Some(decode_profile(user_id, &data)))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
    }
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn row_to_user(row: &libsql::Row) -> UserRecord {
    let created: String = row.get(3).unwrap_or_default();
    UserRecord {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).ok(),
        email: row.get(2).ok(),
        created_at: parse_datetime(&created),
    }
}

#[async_trait]
impl Database for LibSqlBackend {
    // ── Profiles ────────────────────────────────────────────────────

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        read_profile(self.conn(), user_id).await
    }

    async fn upsert_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile: begin: {e}")))?;

        let result = async {
            let mut profile = read_profile(&tx, user_id)
                .await?
                .unwrap_or_else(|| UserProfile::new(user_id));
            profile.apply_update(update);

            let data = serde_json::to_string(&profile)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO profiles (user_id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (user_id) DO UPDATE SET data = ?2, updated_at = ?3",
                params![user_id, data, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_profile: {e}")))?;
            Ok::<_, DatabaseError>(profile)
        }
        .await;

        match result {
            Ok(profile) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(format!("upsert_profile: commit: {e}")))?;
                debug!(user_id, fields = update.len(), "Profile upserted");
                Ok(profile)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(user_id, error = %rollback, "Profile rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn delete_profile(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        self.conn()
            .execute("DELETE FROM profiles WHERE user_id = ?1", params![user_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_profile: {e}")))
    }

    // ── Chat log ────────────────────────────────────────────────────

    async fn append_message(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let _guard = self.write_lock.lock().await;
        self.conn()
            .execute(
                "INSERT INTO chat_messages (user_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, role.as_str(), content, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_message: {e}")))?;
        Ok(())
    }

    async fn get_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatLogEntry>, DatabaseError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut rows = self
            .conn()
            .query(
                "SELECT role, content, created_at FROM chat_messages
                 WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
                params![user_id, i64::try_from(limit).unwrap_or(i64::MAX)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_recent: {e}")))?;

        let mut entries = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let role: String = row.get(0).unwrap_or_default();
            let content: String = row.get(1).unwrap_or_default();
            let created: String = row.get(2).unwrap_or_default();
            entries.push(ChatLogEntry {
                role: MessageRole::parse(&role),
                content,
                timestamp: parse_datetime(&created),
            });
        }
        entries.reverse();
        Ok(entries)
    }

    async fn delete_messages(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let _guard = self.write_lock.lock().await;
        self.conn()
            .execute(
                "DELETE FROM chat_messages WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_messages: {e}")))
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn upsert_user(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserRecord, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let guard = self.write_lock.lock().await;
        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (id) DO UPDATE SET
                    name = COALESCE(?2, users.name),
                    email = COALESCE(?3, users.email)",
                params![id, opt_text(name), opt_text(email), now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_user: {e}")))?;
        drop(guard);

        self.get_user(id)
            .await?
            .ok_or_else(|| DatabaseError::Query(format!("upsert_user: user {id} vanished")))
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, email, created_at FROM users WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_user(&row))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user: {e}"))),
        }
    }
}
