//! Facebook platform adapter
//!
//! Posts go to a Page feed through the Graph API, authenticated with a page
//! access token passed as a query parameter. The Graph API also accepts a
//! native `scheduled_publish_time`; `publish_at` exposes that, but posts
//! scheduled that way leave the local queue's visibility entirely, so the
//! scheduler never uses it on its own.

use async_trait::async_trait;

use crate::config::FacebookConfig;
use crate::error::{PlatformError, Result};
use crate::types::{Account, Post, PublishOutcome};

use super::PlatformClient;

pub struct FacebookClient {
    config: FacebookConfig,
    http: reqwest::Client,
}

impl FacebookClient {
    pub fn new(config: FacebookConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Page id: the account's platform id, falling back to configuration.
    fn page_id<'a>(&'a self, account: &'a Account) -> &'a str {
        if account.platform_id.is_empty() {
            &self.config.page_id
        } else {
            &account.platform_id
        }
    }

    /// Page token: the account's stored token, falling back to configuration.
    fn page_token<'a>(&'a self, account: &'a Account) -> Result<&'a str> {
        if !account.access_token.is_empty() {
            return Ok(&account.access_token);
        }
        self.config
            .page_access_token
            .as_deref()
            .ok_or_else(|| {
                PlatformError::Config("No Facebook page access token available".to_string()).into()
            })
    }

    /// Query parameters for a feed post. The first http(s) media URL rides
    /// along as the post's `link`; local file paths have no public URL the
    /// Graph API could fetch.
    fn feed_params(
        &self,
        token: &str,
        post: &Post,
        scheduled_publish_time: Option<i64>,
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("access_token".to_string(), token.to_string()),
            ("message".to_string(), post.content.clone()),
        ];

        if let Some(link) = post.media_urls.iter().find(|u| u.starts_with("http")) {
            params.push(("link".to_string(), link.clone()));
        }

        if let Some(ts) = scheduled_publish_time {
            params.push(("scheduled_publish_time".to_string(), ts.to_string()));
            params.push(("published".to_string(), "false".to_string()));
        }

        params
    }

    async fn post_to_feed(
        &self,
        account: &Account,
        post: &Post,
        scheduled_publish_time: Option<i64>,
    ) -> Result<String> {
        let token = self.page_token(account)?;
        let params = self.feed_params(token, post, scheduled_publish_time);

        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}/feed", self.config.api_base, self.page_id(account)),
            &params,
        )
        .map_err(|e| PlatformError::Config(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error")?.get("message")?.as_str().map(String::from))
                .unwrap_or(body);
            return Err(PlatformError::api(status.as_u16(), message).into());
        }

        let created: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        created
            .get("id")
            .and_then(|id| id.as_str())
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::Network("Facebook response missing post id".to_string()).into()
            })
    }

    /// Publish with Facebook's native scheduling: the Graph API holds the
    /// post until `publish_time` and publishes it server-side. Failures after
    /// this call are invisible to the local queue.
    pub async fn publish_at(
        &self,
        account: &Account,
        post: &Post,
        publish_time: i64,
    ) -> Result<PublishOutcome> {
        tracing::info!(
            post_id = %post.id,
            publish_time,
            "handing post to Facebook native scheduling; local queue loses visibility"
        );
        let id = self.post_to_feed(account, post, Some(publish_time)).await?;
        Ok(PublishOutcome::new(id))
    }

    /// List recent posts on the page feed.
    pub async fn list_feed(&self, account: &Account) -> Result<Vec<serde_json::Value>> {
        let token = self.page_token(account)?;
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}/feed", self.config.api_base, self.page_id(account)),
            &[("access_token", token)],
        )
        .map_err(|e| PlatformError::Config(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(PlatformError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body).into());
        }

        let feed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        Ok(feed
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl PlatformClient for FacebookClient {
    fn name(&self) -> &str {
        "facebook"
    }

    async fn publish(&self, account: &Account, post: &Post) -> Result<PublishOutcome> {
        let id = self.post_to_feed(account, post, None).await?;
        Ok(PublishOutcome::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FacebookClient {
        FacebookClient::new(FacebookConfig {
            page_id: "page-1".to_string(),
            page_access_token: Some("config-token".to_string()),
            api_base: "https://graph.facebook.com/v21.0".to_string(),
        })
    }

    fn page_account(token: &str) -> Account {
        Account::new(
            "user-1".to_string(),
            "facebook".to_string(),
            "page-77".to_string(),
            "My Page".to_string(),
            token.to_string(),
        )
    }

    #[test]
    fn test_page_token_prefers_account() {
        let client = client();
        let account = page_account("account-token");
        assert_eq!(client.page_token(&account).unwrap(), "account-token");

        let mut bare = page_account("");
        bare.access_token = String::new();
        assert_eq!(client.page_token(&bare).unwrap(), "config-token");
    }

    #[test]
    fn test_feed_params_plain() {
        let client = client();
        let post = Post::new(
            "user-1".to_string(),
            "acc".to_string(),
            "hello page".to_string(),
            vec![],
            None,
        );

        let params = client.feed_params("tok", &post, None);
        assert!(params.contains(&("access_token".to_string(), "tok".to_string())));
        assert!(params.contains(&("message".to_string(), "hello page".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "scheduled_publish_time"));
    }

    #[test]
    fn test_feed_params_native_schedule() {
        let client = client();
        let post = Post::new(
            "user-1".to_string(),
            "acc".to_string(),
            "later".to_string(),
            vec![],
            None,
        );

        let params = client.feed_params("tok", &post, Some(1_900_000_000));
        assert!(params.contains(&(
            "scheduled_publish_time".to_string(),
            "1900000000".to_string()
        )));
        assert!(params.contains(&("published".to_string(), "false".to_string())));
    }

    #[test]
    fn test_feed_params_link_from_remote_media_only() {
        let client = client();
        let post = Post::new(
            "user-1".to_string(),
            "acc".to_string(),
            "see link".to_string(),
            vec![
                "/uploads/local.png".to_string(),
                "https://example.com/a.png".to_string(),
            ],
            None,
        );

        let params = client.feed_params("tok", &post, None);
        assert!(params.contains(&(
            "link".to_string(),
            "https://example.com/a.png".to_string()
        )));
    }
}
