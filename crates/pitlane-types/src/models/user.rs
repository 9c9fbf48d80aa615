//! User and identity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user, upserted on every OAuth sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Email from the OAuth userinfo endpoint
    pub email: String,
    /// Optional display name
    pub name: Option<String>,
    /// Timestamp of first sign-in
    pub created_at: DateTime<Utc>,
}

/// The resolved caller of one request.
///
/// Produced by session resolution and injected into request extensions;
/// handlers extract it instead of touching cookies themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}
