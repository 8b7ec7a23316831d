//! AAD client-credentials token acquisition for the ADX REST API.

use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::ClientError;

/// Leeway subtracted from the token lifetime so a token is refreshed before
/// it can expire mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Fetches and caches AAD bearer tokens for the configured application.
pub struct TokenProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        http: Client,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        cluster: &str,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: format!("{}/.default", cluster.trim_end_matches('/')),
            cached: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, fetching a fresh one when the cached
    /// token is absent or inside the expiry margin.
    pub async fn token(&self) -> Result<String, ClientError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid() {
                return Ok(token.token.clone());
            }
        }

        debug!(url = %self.token_url, "requesting AAD token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self.http.post(&self.token_url).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url_and_scope() {
        let provider = TokenProvider::new(
            Client::new(),
            "tenant-1",
            "client-1",
            "secret",
            "https://cluster.example.kusto.windows.net/",
        );
        assert_eq!(
            provider.token_url,
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(
            provider.scope,
            "https://cluster.example.kusto.windows.net/.default"
        );
    }

    #[test]
    fn test_cached_token_validity() {
        let valid = CachedToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(60),
        };
        assert!(valid.is_valid());

        let expired = CachedToken {
            token: "t".to_string(),
            expires_at: Instant::now(),
        };
        assert!(!expired.is_valid());
    }
}
