//! OAuth2 access token management for the Google Calendar adapter.
//!
//! Only the refresh-token renewal leg is needed here: the interactive
//! consent flow happens elsewhere and hands us a long-lived refresh token.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gather_domain::{GatherError, Result};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::InfraError;
use crate::http::HttpClient;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh margin: tokens are renewed this long before their expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Provides a valid bearer token, refreshing first when expired.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

struct TokenState {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Refresh-token backed provider.
pub struct OAuthTokenProvider {
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    state: Mutex<TokenState>,
}

impl OAuthTokenProvider {
    pub fn new(
        http: HttpClient,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    ) -> Self {
        Self::with_token_url(http, client_id, client_secret, refresh_token, GOOGLE_TOKEN_URL)
    }

    /// Override the token endpoint (tests).
    pub fn with_token_url(
        http: HttpClient,
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: &str,
    ) -> Self {
        Self {
            http,
            token_url: token_url.to_string(),
            client_id,
            client_secret,
            refresh_token,
            state: Mutex::new(TokenState { access_token: None, expires_at: None }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[async_trait]
impl AccessTokenProvider for OAuthTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let (Some(token), Some(expires_at)) = (&state.access_token, state.expires_at) {
            if expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) {
                return Ok(token.clone());
            }
        }

        debug!("refreshing google access token");
        let request = self.http.post(&self.token_url).form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ]);
        let response = self.http.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            // A rejected refresh token means the account must be reconnected;
            // this is terminal, not transient.
            return Err(GatherError::Auth(format!("token refresh failed ({status}): {body}")));
        }

        let refreshed: TokenRefreshResponse = response.json().await.map_err(InfraError::from)?;
        let expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);
        state.access_token = Some(refreshed.access_token.clone());
        state.expires_at = Some(expires_at);

        Ok(refreshed.access_token)
    }
}

/// Fixed-token provider for pre-authorized contexts and tests.
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
