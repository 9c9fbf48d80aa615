//! OAuth provider client.
//!
//! The provider is an opaque collaborator: authorize URL out, code in,
//! token + userinfo back. Endpoint URLs and credentials come from
//! [`OauthConfig`]; nothing here is provider-specific beyond the standard
//! authorization-code shapes.

use serde::Deserialize;
use url::Url;

use pitlane_types::models::OauthConfig;
use pitlane_types::{AppError, ErrorKind};

use crate::util::map_http_err;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OauthUserInfo {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct OauthClient {
    http: reqwest::Client,
    config: OauthConfig,
}

impl OauthClient {
    pub fn new(config: OauthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    pub fn redirect_uri(&self) -> String {
        format!("{}/api/auth/callback", self.config.redirect_host.trim_end_matches('/'))
    }

    /// Provider authorize URL carrying our CSRF state token.
    pub fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let mut url = Url::parse(&self.config.authorize_url).map_err(|e| {
            AppError::internal(format!("bad authorize_url in config: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_uri())
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.redirect_uri()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| map_http_err("oauth token exchange", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("OAuth code exchange rejected: {} {}", status, body);
            return Err(AppError::new(
                ErrorKind::Unauthorized,
                "authorization code was rejected by the provider",
            ));
        }

        response.json().await.map_err(|e| map_http_err("oauth token decode", e))
    }

    /// Fetch the signed-in user's profile.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<OauthUserInfo, AppError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| map_http_err("oauth userinfo", e))?
            .error_for_status()
            .map_err(|e| map_http_err("oauth userinfo", e))?;

        response.json().await.map_err(|e| map_http_err("oauth userinfo decode", e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> OauthClient {
        OauthClient::new(OauthConfig {
            client_id: "cid-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_host: "https://chat.example.com/".to_string(),
            ..OauthConfig::default()
        })
    }

    #[test]
    fn test_redirect_uri_strips_trailing_slash() {
        assert_eq!(client().redirect_uri(), "https://chat.example.com/api/auth/callback");
    }

    #[test]
    fn test_authorize_url_carries_state() {
        let url = client().authorize_url("st4te").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> =
            parsed.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert!(pairs.contains(&("client_id".to_string(), "cid-123".to_string())));
        assert!(pairs.contains(&("state".to_string(), "st4te".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
    }
}
