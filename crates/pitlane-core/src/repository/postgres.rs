//! PostgreSQL implementation of the chat repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

use pitlane_types::{Chat, ChatWithMessages, Message, MessageRole, User};

use super::{ChatRepository, RepoResult, RepositoryError};

/// Postgres-backed chat repository.
pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    /// Create repository with an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect to the database and create the repository.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| RepositoryError::Database(err.to_string()))
    }
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => return RepositoryError::NotFound("row not found".to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            return RepositoryError::AlreadyExists(db.message().to_string())
        }
        _ => {}
    }
    RepositoryError::Database(err.to_string())
}

fn chat_from_row(row: &PgRow) -> RepoResult<Chat> {
    Ok(Chat {
        id: row.try_get("id").map_err(map_sqlx_err)?,
        title: row.try_get("title").map_err(map_sqlx_err)?,
        owner: row.try_get("owner").map_err(map_sqlx_err)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(map_sqlx_err)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(map_sqlx_err)?,
    })
}

fn message_from_row(row: &PgRow) -> RepoResult<Message> {
    let role: String = row.try_get("role").map_err(map_sqlx_err)?;
    let role = MessageRole::parse(&role)
        .ok_or_else(|| RepositoryError::Serialization(format!("unknown role {role:?}")))?;
    Ok(Message {
        id: row.try_get("id").map_err(map_sqlx_err)?,
        chat_id: row.try_get("chat_id").map_err(map_sqlx_err)?,
        role,
        content: row.try_get("content").map_err(map_sqlx_err)?,
        tool_results: row.try_get::<Option<Value>, _>("tool_results").map_err(map_sqlx_err)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(map_sqlx_err)?,
    })
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> RepoResult<User> {
        let row = sqlx::query(
            r#"INSERT INTO users (id, email, name, created_at)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (email)
               DO UPDATE SET name = COALESCE(EXCLUDED.name, users.name)
               RETURNING id, email, name, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(User {
            id: row.try_get("id").map_err(map_sqlx_err)?,
            email: row.try_get("email").map_err(map_sqlx_err)?,
            name: row.try_get("name").map_err(map_sqlx_err)?,
            created_at: row.try_get("created_at").map_err(map_sqlx_err)?,
        })
    }

    async fn create_chat(&self, owner: Uuid, title: &str) -> RepoResult<Chat> {
        let row = sqlx::query(
            r#"INSERT INTO chats (id, title, owner, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $4)
               RETURNING id, title, owner, created_at, updated_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(owner)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        chat_from_row(&row)
    }

    async fn list_chats(&self, owner: Uuid) -> RepoResult<Vec<Chat>> {
        let rows = sqlx::query(
            r#"SELECT id, title, owner, created_at, updated_at
               FROM chats WHERE owner = $1
               ORDER BY updated_at DESC"#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter().map(chat_from_row).collect()
    }

    async fn get_chat(&self, owner: Uuid, chat_id: Uuid) -> RepoResult<Chat> {
        let row = sqlx::query(
            r#"SELECT id, title, owner, created_at, updated_at
               FROM chats WHERE id = $1 AND owner = $2"#,
        )
        .bind(chat_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => chat_from_row(&row),
            None => Err(RepositoryError::NotFound(format!("chat {chat_id}"))),
        }
    }

    async fn get_chat_with_messages(
        &self,
        owner: Uuid,
        chat_id: Uuid,
    ) -> RepoResult<ChatWithMessages> {
        let chat = self.get_chat(owner, chat_id).await?;

        let rows = sqlx::query(
            r#"SELECT id, chat_id, role, content, tool_results, created_at
               FROM messages WHERE chat_id = $1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let messages = rows.iter().map(message_from_row).collect::<RepoResult<Vec<_>>>()?;
        Ok(ChatWithMessages { chat, messages })
    }

    async fn delete_chat(&self, owner: Uuid, chat_id: Uuid) -> RepoResult<()> {
        let result = sqlx::query(r#"DELETE FROM chats WHERE id = $1 AND owner = $2"#)
            .bind(chat_id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("chat {chat_id}")));
        }
        Ok(())
    }

    async fn append_message(
        &self,
        owner: Uuid,
        chat_id: Uuid,
        role: MessageRole,
        content: &str,
        tool_results: Option<Value>,
    ) -> RepoResult<Message> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let owned = sqlx::query(r#"SELECT id FROM chats WHERE id = $1 AND owner = $2"#)
            .bind(chat_id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        if owned.is_none() {
            return Err(RepositoryError::NotFound(format!("chat {chat_id}")));
        }

        let now = Utc::now();
        let row = sqlx::query(
            r#"INSERT INTO messages (id, chat_id, role, content, tool_results, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, chat_id, role, content, tool_results, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(role.as_str())
        .bind(content)
        .bind(&tool_results)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(r#"UPDATE chats SET updated_at = $2 WHERE id = $1"#)
            .bind(chat_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;

        message_from_row(&row)
    }

    async fn schema_check(&self) -> RepoResult<Vec<String>> {
        let rows = sqlx::query(
            r#"SELECT table_name::text AS table_name
               FROM information_schema.tables
               WHERE table_schema = 'public'
                 AND table_name IN ('users', 'chats', 'messages')
               ORDER BY table_name"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(map_sqlx_err))
            .collect()
    }
}
