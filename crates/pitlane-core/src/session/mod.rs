//! Cookie-based sessions.
//!
//! Tokens handed to browsers are random 32-char alphanumerics; the store
//! keys entries by the SHA-256 digest of the token so a leaked table dump
//! exposes no usable cookies. Expired entries resolve to `Expired` (the
//! boundary turns that into SessionExpired) and are dropped by the sweep.

pub mod oauth;

use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use pitlane_types::Identity;

use crate::util::generate_token;

/// Lifetime of an issued CSRF state token.
const STATE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct Session {
    user_id: Uuid,
    email: String,
    expires_at: Instant,
}

/// Result of resolving a request's session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No cookie, or a token the store doesn't know.
    Missing,
    /// The cookie referenced a session past its expiry.
    Expired,
    Valid(Identity),
}

pub struct SessionStore {
    cookie_name: String,
    ttl: Duration,
    sessions: DashMap<String, Session>,
    oauth_states: DashMap<String, Instant>,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ttl,
            sessions: DashMap::new(),
            oauth_states: DashMap::new(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn digest(token: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
    }

    /// Create a session and return the raw cookie token.
    pub fn create(&self, user_id: Uuid, email: &str) -> String {
        let token = generate_token();
        self.sessions.insert(
            Self::digest(&token),
            Session { user_id, email: to_owned_lower(email), expires_at: Instant::now() + self.ttl },
        );
        token
    }

    /// Resolve the identity behind a `Cookie` header value.
    pub fn resolve_header(&self, cookie_header: Option<&str>) -> SessionState {
        match cookie_header.and_then(|h| extract_cookie(h, &self.cookie_name)) {
            Some(token) => self.resolve_token(token),
            None => SessionState::Missing,
        }
    }

    pub fn resolve_token(&self, token: &str) -> SessionState {
        let key = Self::digest(token);
        match self.sessions.get(&key) {
            None => SessionState::Missing,
            Some(session) if session.expires_at <= Instant::now() => {
                drop(session);
                self.sessions.remove(&key);
                SessionState::Expired
            }
            Some(session) => SessionState::Valid(Identity {
                user_id: session.user_id,
                email: session.email.clone(),
            }),
        }
    }

    /// Revoke whatever session the `Cookie` header references.
    pub fn revoke_header(&self, cookie_header: Option<&str>) {
        if let Some(token) = cookie_header.and_then(|h| extract_cookie(h, &self.cookie_name)) {
            self.sessions.remove(&Self::digest(token));
        }
    }

    /// Issue a single-use CSRF state token for the OAuth flow.
    pub fn issue_state(&self) -> String {
        let state = generate_token();
        self.oauth_states.insert(state.clone(), Instant::now() + STATE_TTL);
        state
    }

    /// Consume a state token; true only for a known, unexpired token.
    pub fn consume_state(&self, state: &str) -> bool {
        match self.oauth_states.remove(state) {
            Some((_, expires_at)) => expires_at > Instant::now(),
            None => false,
        }
    }

    /// Drop expired sessions and stale state tokens. Returns removed count.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len() + self.oauth_states.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        self.oauth_states.retain(|_, &mut expires_at| expires_at > now);
        before - (self.sessions.len() + self.oauth_states.len())
    }

    /// `Set-Cookie` value installing `token`.
    pub fn cookie_for(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            token,
            self.ttl.as_secs()
        )
    }

    /// `Set-Cookie` value clearing the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.cookie_name)
    }
}

fn to_owned_lower(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Pull one cookie's value out of a `Cookie` header.
fn extract_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').map(str::trim).find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new("pitlane_session", Duration::from_secs(3600))
    }

    #[test]
    fn test_create_and_resolve() {
        let store = store();
        let user_id = Uuid::new_v4();
        let token = store.create(user_id, "Pat@Example.com");

        let header = format!("other=1; pitlane_session={token}");
        match store.resolve_header(Some(header.as_str())) {
            SessionState::Valid(identity) => {
                assert_eq!(identity.user_id, user_id);
                assert_eq!(identity.email, "pat@example.com");
            }
            other => panic!("expected valid session, got {other:?}"),
        }

        assert_eq!(store.resolve_header(None), SessionState::Missing);
        assert_eq!(store.resolve_token("forged-token"), SessionState::Missing);
    }

    #[test]
    fn test_expired_session_resolves_expired_once() {
        let store = SessionStore::new("pitlane_session", Duration::ZERO);
        let token = store.create(Uuid::new_v4(), "a@b.co");

        assert_eq!(store.resolve_token(&token), SessionState::Expired);
        // the expired entry was dropped on first resolution
        assert_eq!(store.resolve_token(&token), SessionState::Missing);
    }

    #[test]
    fn test_revoke() {
        let store = store();
        let token = store.create(Uuid::new_v4(), "a@b.co");
        let header = format!("pitlane_session={token}");
        store.revoke_header(Some(header.as_str()));
        assert_eq!(store.resolve_token(&token), SessionState::Missing);
    }

    #[test]
    fn test_state_tokens_are_single_use() {
        let store = store();
        let state = store.issue_state();
        assert!(store.consume_state(&state));
        assert!(!store.consume_state(&state));
        assert!(!store.consume_state("unknown"));
    }

    #[test]
    fn test_sweep_removes_expired() {
        let expiring = SessionStore::new("pitlane_session", Duration::ZERO);
        expiring.create(Uuid::new_v4(), "a@b.co");
        expiring.create(Uuid::new_v4(), "c@d.co");
        assert_eq!(expiring.sweep(), 2);
    }
}
