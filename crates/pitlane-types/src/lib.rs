//! # Pitlane Types
//!
//! Core types, models, and error definitions for the Pitlane chat backend.
//!
//! This crate provides the foundational type system for the Pitlane
//! ecosystem:
//!
//! - **`error`** - Typed error taxonomy with fixed transport-status mapping
//! - **`models`** - Domain models (User, Chat, Message, Config)
//!
//! `pitlane-types` sits at the bottom of the dependency graph; both
//! `pitlane-core` and `pitlane-server` build on it.
//!
//! All types are designed to be:
//! - **Serializable** via serde for API responses
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** where testing needs comparison

pub mod error;
pub mod models;

pub use error::{AppError, ErrorKind, Result};
pub use models::{AppConfig, Chat, ChatWithMessages, Identity, Message, MessageRole, User};
