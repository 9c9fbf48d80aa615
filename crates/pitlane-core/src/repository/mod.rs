//! Chat persistence behind a storage trait.
//!
//! The backing store is an implementation detail: the server wires in
//! [`postgres::PostgresChatRepository`], tests use an in-memory
//! implementation of the same trait.

pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use pitlane_types::{AppError, Chat, ChatWithMessages, ErrorKind, Message, MessageRole, User};

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::not_found(what),
            RepositoryError::AlreadyExists(what) => {
                AppError::new(ErrorKind::DuplicateEntry, format!("{what} already exists"))
            }
            RepositoryError::Database(message) => {
                // let the classifier pick up schema complaints etc.
                let classified = AppError::from_unclassified(message);
                if classified.kind == ErrorKind::InternalServerError {
                    AppError::new(ErrorKind::DatabaseError, classified.message)
                } else {
                    classified
                }
            }
            RepositoryError::Serialization(message) => {
                AppError::new(ErrorKind::DatabaseError, message)
            }
        }
    }
}

/// Storage operations for users, chats, and messages.
///
/// Every chat/message read is scoped by the owner: a row that exists but
/// belongs to someone else is indistinguishable from an absent one.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert or refresh a user on OAuth sign-in.
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> RepoResult<User>;

    async fn create_chat(&self, owner: Uuid, title: &str) -> RepoResult<Chat>;

    /// Chats owned by `owner`, most recently updated first.
    async fn list_chats(&self, owner: Uuid) -> RepoResult<Vec<Chat>>;

    async fn get_chat(&self, owner: Uuid, chat_id: Uuid) -> RepoResult<Chat>;

    async fn get_chat_with_messages(
        &self,
        owner: Uuid,
        chat_id: Uuid,
    ) -> RepoResult<ChatWithMessages>;

    /// Delete a chat; messages go with it (FK cascade).
    async fn delete_chat(&self, owner: Uuid, chat_id: Uuid) -> RepoResult<()>;

    /// Append one message and bump the chat's `updated_at`.
    async fn append_message(
        &self,
        owner: Uuid,
        chat_id: Uuid,
        role: MessageRole,
        content: &str,
        tool_results: Option<Value>,
    ) -> RepoResult<Message>;

    /// Relations present in the schema, for the `/api/check-db` probe.
    async fn schema_check(&self) -> RepoResult<Vec<String>>;
}
