//! Chat and message models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    /// Unique identifier for the chat
    pub id: Uuid,
    /// Title shown in the chat list
    pub title: String,
    /// Owning user id
    pub owner: Uuid,
    /// Timestamp when the chat was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last appended message
    pub updated_at: DateTime<Utc>,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One message in a chat. Append-only: never mutated after creation,
/// deleted only via its parent chat's cascade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique identifier for the message
    pub id: Uuid,
    /// Parent chat; must be owned by whoever reads this message
    pub chat_id: Uuid,
    /// Author role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Raw output of a tool invocation attached to this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<serde_json::Value>,
    /// Timestamp when the message was created
    pub created_at: DateTime<Utc>,
}

/// A chat together with its messages, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatWithMessages {
    pub chat: Chat,
    pub messages: Vec<Message>,
}
