//! # Pitlane Core
//!
//! Business logic for the Pitlane chat backend:
//!
//! - **`pipeline`** - ordered request stages (method, rate limit, auth) and
//!   the error responder
//! - **`rate_limit`** - fixed-window and sliding-window limiters
//! - **`validate`** - input assertions raising typed errors
//! - **`retry`** - exponential-backoff wrapper for external calls
//! - **`session`** - cookie sessions and the OAuth flow
//! - **`repository`** - chat persistence behind a storage trait
//! - **`llm`** - streaming inference client
//! - **`tools`** - weather / motorsport / stocks data tools

pub mod config;
pub mod llm;
pub mod pipeline;
pub mod rate_limit;
pub mod repository;
pub mod retry;
pub mod session;
pub mod tools;
pub mod validate;

mod util;

pub use pipeline::respond::ApiError;
