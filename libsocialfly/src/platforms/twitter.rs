//! X/Twitter platform adapter
//!
//! Tweets are created with the v2 `POST /2/tweets` endpoint using the
//! account's OAuth2 bearer token. Media is not supported in the publish path.
//! The OAuth2 PKCE flow (authorize URL, code exchange, token refresh) lives
//! here too, for callers that obtain per-account tokens rather than pasting
//! them in.

use async_trait::async_trait;
use base64::Engine;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::TwitterConfig;
use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome};

use super::PlatformClient;

const CHARACTER_LIMIT: usize = 280;

pub struct TwitterClient {
    config: TwitterConfig,
    http: reqwest::Client,
}

/// Everything the caller must hold on to between the authorize redirect and
/// the code exchange.
#[derive(Debug)]
pub struct AuthorizeRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

impl TwitterClient {
    pub fn new(config: TwitterConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Generate PKCE code verifier and challenge
    fn generate_pkce() -> (String, String) {
        let verifier_bytes: [u8; 32] = rand::thread_rng().gen();
        let code_verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut hasher = Sha256::new();
        hasher.update(code_verifier.as_bytes());
        let hash = hasher.finalize();
        let code_challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash);

        (code_verifier, code_challenge)
    }

    /// Random state for CSRF protection
    fn generate_state() -> String {
        let bytes: [u8; 16] = rand::thread_rng().gen();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    fn oauth_client(&self) -> Result<(&str, &str)> {
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(PlatformError::Config(
                "Twitter client_id/client_secret not configured".to_string(),
            )
            .into()),
        }
    }

    /// Basic auth header for OAuth token requests
    fn basic_auth_header(&self) -> Result<String> {
        let (id, secret) = self.oauth_client()?;
        let credentials = format!("{}:{}", id, secret);
        Ok(format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        ))
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.config.api_base)
    }

    /// Step 1: build the authorization URL, returning the state and verifier
    /// the caller must keep for the exchange.
    pub fn authorize_url(&self, scopes: &[&str]) -> Result<AuthorizeRequest> {
        let (client_id, _) = self.oauth_client()?;
        let redirect_uri = self.config.redirect_uri.as_deref().ok_or_else(|| {
            PlatformError::Config("Twitter redirect_uri not configured".to_string())
        })?;

        let state = Self::generate_state();
        let (code_verifier, code_challenge) = Self::generate_pkce();

        let url = reqwest::Url::parse_with_params(
            "https://x.com/i/oauth2/authorize",
            &[
                ("response_type", "code"),
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("scope", &scopes.join(" ")),
                ("state", &state),
                ("code_challenge", &code_challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| PlatformError::Config(e.to_string()))?;

        Ok(AuthorizeRequest {
            url: url.into(),
            state,
            code_verifier,
        })
    }

    /// Step 2: exchange the authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse> {
        let redirect_uri = self.config.redirect_uri.as_deref().ok_or_else(|| {
            PlatformError::Config("Twitter redirect_uri not configured".to_string())
        })?;

        let params = [
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];

        self.token_request(&params).await
    }

    /// Refresh an access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let params = [
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        self.token_request(&params).await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.token_url())
            .header("Authorization", self.basic_auth_header()?)
            .form(params)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()).into())
    }

    async fn post_tweet(&self, access_token: &str, text: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/tweets", self.config.api_base))
            .header("Authorization", format!("Bearer {}", access_token))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let tweet: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        tweet
            .get("data")
            .and_then(|d| d.get("id"))
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::Network("Twitter response missing tweet id".to_string()).into()
            })
    }
}

#[async_trait]
impl PlatformClient for TwitterClient {
    fn name(&self) -> &str {
        "twitter"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }

    fn validate(&self, _account: &Account, post: &Post) -> Result<()> {
        if !post.media_urls.is_empty() {
            return Err(PlatformError::NotImplemented(
                "Twitter media posting is not supported".to_string(),
            )
            .into());
        }
        super::validate_content(self, post)
    }

    async fn publish(&self, account: &Account, post: &Post) -> Result<PublishOutcome> {
        if !post.media_urls.is_empty() {
            return Err(PlatformError::NotImplemented(
                "Twitter media posting is not supported".to_string(),
            )
            .into());
        }

        let tweet_id = self.post_tweet(&account.access_token, &post.content).await?;
        Ok(PublishOutcome::new(tweet_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_client() -> TwitterClient {
        TwitterClient::new(TwitterConfig {
            client_id: Some("client-id".to_string()),
            client_secret: Some("client-secret".to_string()),
            redirect_uri: Some("http://localhost:3000/callback".to_string()),
            api_base: "https://api.twitter.com/2".to_string(),
        })
    }

    #[test]
    fn test_authorize_url_contains_pkce_challenge() {
        let client = configured_client();
        let request = client.authorize_url(&["tweet.read", "tweet.write"]).unwrap();

        assert!(request.url.starts_with("https://x.com/i/oauth2/authorize?"));
        assert!(request.url.contains("code_challenge_method=S256"));
        assert!(request.url.contains("code_challenge="));
        assert!(request.url.contains(&format!("state={}", request.state)));
        // The verifier never appears in the URL, only its hash
        assert!(!request.url.contains(&request.code_verifier));
    }

    #[test]
    fn test_pkce_challenge_is_sha256_of_verifier() {
        let (verifier, challenge) = TwitterClient::generate_pkce();

        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let expected =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());
        assert_eq!(challenge, expected);
    }

    #[test]
    fn test_authorize_url_requires_oauth_config() {
        let client = TwitterClient::new(TwitterConfig::default());
        assert!(client.authorize_url(&["tweet.write"]).is_err());
    }

    #[test]
    fn test_validate_rejects_media() {
        let client = configured_client();
        let account = Account::new(
            "user-1".to_string(),
            "twitter".to_string(),
            "142".to_string(),
            "bird".to_string(),
            "token".to_string(),
        );
        let post = Post::new(
            "user-1".to_string(),
            account.id.clone(),
            "tweet".to_string(),
            vec!["/uploads/pic.png".to_string()],
            None,
        );

        let err = client.validate(&account, &post).unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
