//! Test helpers for pitlane-server unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use pitlane_core::repository::{ChatRepository, RepoResult, RepositoryError};
use pitlane_types::models::AppConfig;
use pitlane_types::{Chat, ChatWithMessages, Identity, Message, MessageRole, User};

use crate::state::{AppState, Limiters};

/// In-memory implementation of the chat repository.
///
/// Same contract as the Postgres one, backed by vectors. Ownership
/// scoping and cascade semantics match.
#[derive(Default)]
pub struct InMemoryChatRepository {
    users: Mutex<Vec<User>>,
    chats: Mutex<Vec<Chat>>,
    messages: Mutex<Vec<Message>>,
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> RepoResult<User> {
        let mut users = self.users.lock().expect("users lock");
        if let Some(existing) = users.iter_mut().find(|u| u.email == email) {
            if let Some(name) = name {
                existing.name = Some(name.to_string());
            }
            return Ok(existing.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn create_chat(&self, owner: Uuid, title: &str) -> RepoResult<Chat> {
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            title: title.to_string(),
            owner,
            created_at: now,
            updated_at: now,
        };
        self.chats.lock().expect("chats lock").push(chat.clone());
        Ok(chat)
    }

    async fn list_chats(&self, owner: Uuid) -> RepoResult<Vec<Chat>> {
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .expect("chats lock")
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(chats)
    }

    async fn get_chat(&self, owner: Uuid, chat_id: Uuid) -> RepoResult<Chat> {
        self.chats
            .lock()
            .expect("chats lock")
            .iter()
            .find(|c| c.id == chat_id && c.owner == owner)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("chat {chat_id}")))
    }

    async fn get_chat_with_messages(
        &self,
        owner: Uuid,
        chat_id: Uuid,
    ) -> RepoResult<ChatWithMessages> {
        let chat = self.get_chat(owner, chat_id).await?;
        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .expect("messages lock")
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(ChatWithMessages { chat, messages })
    }

    async fn delete_chat(&self, owner: Uuid, chat_id: Uuid) -> RepoResult<()> {
        let mut chats = self.chats.lock().expect("chats lock");
        let before = chats.len();
        chats.retain(|c| !(c.id == chat_id && c.owner == owner));
        if chats.len() == before {
            return Err(RepositoryError::NotFound(format!("chat {chat_id}")));
        }
        // cascade
        self.messages.lock().expect("messages lock").retain(|m| m.chat_id != chat_id);
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
        self.get_chat(owner, chat_id).await?;
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            role,
            content: content.to_string(),
            tool_results,
            created_at: now,
        };
        self.messages.lock().expect("messages lock").push(message.clone());
        if let Some(chat) =
            self.chats.lock().expect("chats lock").iter_mut().find(|c| c.id == chat_id)
        {
            chat.updated_at = now;
        }
        Ok(message)
    }

    async fn schema_check(&self) -> RepoResult<Vec<String>> {
        Ok(vec!["chats".to_string(), "messages".to_string(), "users".to_string()])
    }
}

/// Create a minimal `AppState` for testing.
pub fn test_app_state() -> AppState {
    test_app_state_with(AppConfig::default(), Limiters::default())
}

pub fn test_app_state_with(config: AppConfig, limiters: Limiters) -> AppState {
    AppState::with_limiters(config, Arc::new(InMemoryChatRepository::default()), limiters)
}

/// Register a user with an active session; returns the identity and the
/// `Cookie` header value to send.
pub async fn signed_in(state: &AppState) -> (Identity, String) {
    let user = state
        .repo()
        .upsert_user("pat@example.com", Some("Pat"))
        .await
        .expect("upsert test user");
    let token = state.sessions().create(user.id, &user.email);
    let identity = Identity { user_id: user.id, email: user.email };
    let cookie = format!("{}={}", state.config().cookie_name, token);
    (identity, cookie)
}
