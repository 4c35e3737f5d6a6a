//! Access-token authentication
//!
//! Tokens arrive either as `Authorization: Bearer <token>` or in the
//! `sb-access-token` cookie and are resolved through the auth API.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::AuthUser;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token rejected")]
    InvalidToken,

    #[error("auth backend unavailable: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Pull the access token out of the request headers.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

/// Validates tokens against `GET {url}/auth/v1/user`.
pub struct SupabaseAuthenticator {
    user_url: String,
    anon_key: String,
    http: reqwest::Client,
}

impl SupabaseAuthenticator {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Self {
        Self {
            user_url: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Authenticator for SupabaseAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(&self.user_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            debug!("Auth backend rejected token with {}", status);
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Auth backend returned {}: {}", status, body);
            return Err(AuthError::Upstream(format!("status {status}")));
        }

        response
            .json::<AuthUser>()
            .await
            .map_err(|e| AuthError::Upstream(format!("failed to parse user: {e}")))
    }
}

/// Fixed token table for development mode and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    users: HashMap<String, AuthUser>,
}

impl StaticTokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.users.insert(
            token.into(),
            AuthUser {
                id: user_id.into(),
                email: None,
            },
        );
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        self.users.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token_from_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=tok-1; other=x"),
        );
        assert_eq!(extract_token(&headers), Some("tok-1"));
    }

    #[test]
    fn test_bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=from-cookie"));
        assert_eq!(extract_token(&headers), Some("from-header"));
    }

    #[test]
    fn test_non_bearer_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(extract_token(&headers), None);
    }

    #[tokio::test]
    async fn test_static_authenticator() {
        let auth = StaticTokenAuthenticator::new().with_user("dev-token", "user-1");
        assert_eq!(auth.authenticate("dev-token").await.unwrap().id, "user-1");
        assert!(matches!(
            auth.authenticate("nope").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_supabase_authenticator_resolves_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/v1/user")
            .match_header("apikey", "anon")
            .match_header("authorization", "Bearer user-token")
            .with_status(200)
            .with_body(r#"{"id":"user-1","email":"a@example.com","aud":"authenticated"}"#)
            .create_async()
            .await;

        let auth = SupabaseAuthenticator::new(&server.url(), "anon", Duration::from_secs(5));
        let user = auth.authenticate("user-token").await.unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("a@example.com"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_supabase_authenticator_rejects_bad_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .with_status(401)
            .with_body(r#"{"msg":"invalid JWT"}"#)
            .create_async()
            .await;

        let auth = SupabaseAuthenticator::new(&server.url(), "anon", Duration::from_secs(5));
        assert!(matches!(
            auth.authenticate("expired").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_supabase_authenticator_server_error_is_upstream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .with_status(503)
            .create_async()
            .await;

        let auth = SupabaseAuthenticator::new(&server.url(), "anon", Duration::from_secs(5));
        assert!(matches!(
            auth.authenticate("token").await,
            Err(AuthError::Upstream(_))
        ));
    }
}
