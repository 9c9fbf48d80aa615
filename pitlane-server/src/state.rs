//! Application State
//!
//! Holds shared state for the server: repository, sessions, upstream
//! clients, and the named rate limiters.

use std::sync::Arc;
use std::time::Duration;

use pitlane_core::llm::LlmClient;
use pitlane_core::rate_limit::RateLimiter;
use pitlane_core::repository::ChatRepository;
use pitlane_core::session::oauth::OauthClient;
use pitlane_core::session::SessionStore;
use pitlane_core::tools::ToolRegistry;
use pitlane_types::models::AppConfig;

/// The four named limiter budgets.
pub struct Limiters {
    /// General API: 100/min per address.
    pub api: Arc<RateLimiter>,
    /// Chat endpoint: 60/min per address.
    pub chat: Arc<RateLimiter>,
    /// Auth attempts: 10/15min per address, successes refunded.
    pub auth: Arc<RateLimiter>,
    /// External tool calls: 100/hour per user.
    pub tools: Arc<RateLimiter>,
}

impl Default for Limiters {
    fn default() -> Self {
        Self {
            api: Arc::new(RateLimiter::api()),
            chat: Arc::new(RateLimiter::chat()),
            auth: Arc::new(RateLimiter::auth()),
            tools: Arc::new(RateLimiter::tools()),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub config: AppConfig,
    pub repo: Arc<dyn ChatRepository>,
    pub sessions: Arc<SessionStore>,
    pub oauth: Arc<OauthClient>,
    pub llm: Arc<LlmClient>,
    pub tools: Arc<ToolRegistry>,
    pub limiters: Limiters,
}

impl AppState {
    pub fn new(config: AppConfig, repo: Arc<dyn ChatRepository>) -> Self {
        Self::with_limiters(config, repo, Limiters::default())
    }

    /// Construct with explicit limiter budgets (tests shrink them).
    pub fn with_limiters(
        config: AppConfig,
        repo: Arc<dyn ChatRepository>,
        limiters: Limiters,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(
            config.cookie_name.clone(),
            Duration::from_secs(config.session_ttl_secs),
        ));
        let oauth = Arc::new(OauthClient::new(config.oauth.clone()));
        let llm = Arc::new(LlmClient::new(&config));
        let tools = Arc::new(ToolRegistry::new(&config.tools));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                repo,
                sessions,
                oauth,
                llm,
                tools,
                limiters,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn repo(&self) -> &Arc<dyn ChatRepository> {
        &self.inner.repo
    }

    pub fn sessions(&self) -> Arc<SessionStore> {
        self.inner.sessions.clone()
    }

    pub fn oauth(&self) -> &OauthClient {
        &self.inner.oauth
    }

    pub fn llm(&self) -> &LlmClient {
        &self.inner.llm
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    pub fn limiters(&self) -> &Limiters {
        &self.inner.limiters
    }
}
