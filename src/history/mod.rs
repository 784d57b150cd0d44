use std::path::PathBuf;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use crate::core::errors::PipelineError;

pub const ROLE_HUMAN: &str = "human";
pub const ROLE_AI: &str = "ai";

#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// SQLite-backed conversation history.
///
/// Sessions are created implicitly on first write. A chat turn without a
/// session id never touches this store.
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(session_id) REFERENCES sessions(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn add_message(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), PipelineError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(role)
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Returns the last `limit` messages of a session in chronological
    /// order. An unknown session yields an empty list.
    pub async fn get_history(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<HistoryMessage>, PipelineError> {
        let rows = sqlx::query(
            "SELECT role, content, created_at FROM \
             (SELECT * FROM messages WHERE session_id = ? ORDER BY id DESC LIMIT ?) \
             ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            messages.push(HistoryMessage {
                role: row.try_get::<String, _>("role").unwrap_or_default(),
                content: row.try_get::<String, _>("content").unwrap_or_default(),
                created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
            });
        }

        Ok(messages)
    }

    /// Number of messages stored for a session.
    pub async fn count_messages(&self, session_id: &str) -> Result<i64, PipelineError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("n").unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let (_dir, store) = test_store().await;

        store.add_message("s1", ROLE_HUMAN, "first question").await.unwrap();
        store.add_message("s1", ROLE_AI, "first answer").await.unwrap();
        store.add_message("s1", ROLE_HUMAN, "second question").await.unwrap();

        let messages = store.get_history("s1", 10).await.unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, ROLE_HUMAN);
        assert_eq!(messages[0].content, "first question");
        assert_eq!(messages[1].role, ROLE_AI);
        assert_eq!(messages[2].content, "second question");
    }

    #[tokio::test]
    async fn window_keeps_only_the_most_recent_messages() {
        let (_dir, store) = test_store().await;

        for i in 0..12 {
            store
                .add_message("s1", ROLE_HUMAN, &format!("message {}", i))
                .await
                .unwrap();
        }

        let messages = store.get_history("s1", 10).await.unwrap();

        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0].content, "message 2");
        assert_eq!(messages[9].content, "message 11");
    }

    #[tokio::test]
    async fn count_is_scoped_to_the_session() {
        let (_dir, store) = test_store().await;

        store.add_message("s1", ROLE_HUMAN, "hi").await.unwrap();
        store.add_message("s1", ROLE_AI, "hello").await.unwrap();
        store.add_message("s2", ROLE_HUMAN, "other").await.unwrap();

        assert_eq!(store.count_messages("s1").await.unwrap(), 2);
        assert_eq!(store.count_messages("s2").await.unwrap(), 1);
        assert_eq!(store.count_messages("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let (_dir, store) = test_store().await;

        let messages = store.get_history("missing", 10).await.unwrap();
        assert!(messages.is_empty());

        store.add_message("other", ROLE_HUMAN, "hello").await.unwrap();
        let messages = store.get_history("missing", 10).await.unwrap();
        assert!(messages.is_empty());
    }
}
