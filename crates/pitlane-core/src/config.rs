//! Environment-based configuration loading.

use pitlane_types::models::{AppConfig, OauthConfig, ToolEndpoints};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Build the runtime config from environment variables, falling back to
/// defaults for everything except `DATABASE_URL` (the caller decides
/// whether an empty value is fatal).
pub fn from_env() -> AppConfig {
    let defaults = AppConfig::default();
    let oauth_defaults = OauthConfig::default();
    let tool_defaults = ToolEndpoints::default();

    AppConfig {
        port: std::env::var("PITLANE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port),
        database_url: env_or("DATABASE_URL", ""),
        llm_url: env_or("PITLANE_LLM_URL", &defaults.llm_url),
        llm_model: env_or("PITLANE_LLM_MODEL", &defaults.llm_model),
        oauth: OauthConfig {
            client_id: env_or("PITLANE_OAUTH_CLIENT_ID", ""),
            client_secret: env_or("PITLANE_OAUTH_CLIENT_SECRET", ""),
            authorize_url: env_or("PITLANE_OAUTH_AUTHORIZE_URL", &oauth_defaults.authorize_url),
            token_url: env_or("PITLANE_OAUTH_TOKEN_URL", &oauth_defaults.token_url),
            userinfo_url: env_or("PITLANE_OAUTH_USERINFO_URL", &oauth_defaults.userinfo_url),
            redirect_host: env_or("PITLANE_PUBLIC_URL", &oauth_defaults.redirect_host),
        },
        tools: ToolEndpoints {
            weather_url: env_or("PITLANE_WEATHER_URL", &tool_defaults.weather_url),
            motorsport_url: env_or("PITLANE_MOTORSPORT_URL", &tool_defaults.motorsport_url),
            stocks_url: env_or("PITLANE_STOCKS_URL", &tool_defaults.stocks_url),
        },
        cookie_name: defaults.cookie_name,
        session_ttl_secs: std::env::var("PITLANE_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.session_ttl_secs),
    }
}
