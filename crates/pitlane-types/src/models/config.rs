//! Application configuration model.
//!
//! The struct lives here so both core and server can see it; the env
//! loader lives in `pitlane-core::config`.

use serde::{Deserialize, Serialize};

/// OAuth provider endpoints and client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// External host the provider redirects back to, e.g. `https://chat.example.com`
    pub redirect_host: String,
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            redirect_host: "http://127.0.0.1:8080".to_string(),
        }
    }
}

/// Base URLs for the external data tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEndpoints {
    pub weather_url: String,
    pub motorsport_url: String,
    pub stocks_url: String,
}

impl Default for ToolEndpoints {
    fn default() -> Self {
        Self {
            weather_url: "https://api.open-meteo.com/v1".to_string(),
            motorsport_url: "https://api.jolpi.ca/ergast/f1".to_string(),
            stocks_url: "https://query1.finance.yahoo.com/v8/finance".to_string(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the server binds to
    pub port: u16,
    /// Postgres connection string
    pub database_url: String,
    /// Inference endpoint for chat completions
    pub llm_url: String,
    /// Model name passed upstream
    pub llm_model: String,
    /// OAuth provider settings
    #[serde(default)]
    pub oauth: OauthConfig,
    /// External tool endpoints
    #[serde(default)]
    pub tools: ToolEndpoints,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: String::new(),
            llm_url: "http://127.0.0.1:11434/v1".to_string(),
            llm_model: "llama3.1".to_string(),
            oauth: OauthConfig::default(),
            tools: ToolEndpoints::default(),
            cookie_name: "pitlane_session".to_string(),
            session_ttl_secs: 7 * 24 * 3600,
        }
    }
}
