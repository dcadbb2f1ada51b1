//! HTTP implementation of the social-graph contract.
//!
//! Endpoints, relative to `api_base_url`:
//!
//! | call               | request                                |
//! |--------------------|----------------------------------------|
//! | verify session     | `GET  me`                              |
//! | resolve username   | `GET  users/by-username/{name}`        |
//! | profile            | `GET  users/{id}`                      |
//! | followers          | `GET  users/{id}/followers?amount=N`   |
//! | follow             | `POST users/{id}/follow`               |

use anyhow::{Context, Result};
use async_trait::async_trait;
use follow_core::{
    with_retry, ClientError, FollowerSummary, Profile, RetryConfig, SocialGraphClient, UserId,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::ProxyConfig;

pub struct HttpGraphClient {
    http: Client,
    base: Url,
    token: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    follower_count: u64,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_business: bool,
    #[serde(default, alias = "is_already_following")]
    following: bool,
}

impl From<ProfileResponse> for Profile {
    fn from(p: ProfileResponse) -> Self {
        Profile {
            follower_count: p.follower_count,
            is_private: p.is_private,
            is_business: p.is_business,
            is_already_following: p.following,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FollowerEntry {
    id: serde_json::Value,
    username: String,
}

#[derive(Debug, Deserialize)]
struct FollowersResponse {
    #[serde(default)]
    users: Vec<FollowerEntry>,
}

#[derive(Debug, Deserialize)]
struct FollowResponse {
    #[serde(default)]
    following: bool,
}

impl HttpGraphClient {
    pub fn new(base_url: &str, token: &str, proxy: Option<&ProxyConfig>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_conf) = proxy {
            let mut proxy = reqwest::Proxy::all(&proxy_conf.url)
                .with_context(|| format!("Invalid proxy url {}", proxy_conf.url))?;
            if let (Some(u), Some(p)) = (&proxy_conf.username, &proxy_conf.password) {
                proxy = proxy.basic_auth(u, p);
            }
            builder = builder.proxy(proxy);
        }

        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base: base_url_with_slash(base_url)?,
            token: token.to_string(),
            retry: RetryConfig::new(3, 1000),
        })
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = endpoint(&self.base, segments)?;
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<T, ClientError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, what, &body));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Remote(format!("invalid response for {}: {}", what, e)))
    }

    /// GET with retries on transport errors only.
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, ClientError> {
        with_retry(self.retry, what, ClientError::is_transient, || async {
            let req = self.request(Method::GET, segments)?.query(query);
            self.send_json(req, what).await
        })
        .await
    }
}

#[async_trait]
impl SocialGraphClient for HttpGraphClient {
    async fn verify_session(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self.get_json(&["me"], &[], "session").await?;
        Ok(())
    }

    async fn resolve_user_id(&self, username: &str) -> Result<UserId, ClientError> {
        let segments = ["users", "by-username", username];
        let user: UserRef = self.get_json(&segments, &[], username).await?;
        user_id_from_value(&user.id)
    }

    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ClientError> {
        let segments = ["users", user_id.as_str()];
        let profile: ProfileResponse = self.get_json(&segments, &[], user_id.as_str()).await?;
        Ok(profile.into())
    }

    async fn fetch_followers(
        &self,
        user_id: &UserId,
        amount: usize,
    ) -> Result<Vec<FollowerSummary>, ClientError> {
        let segments = ["users", user_id.as_str(), "followers"];
        let resp: FollowersResponse = self
            .get_json(&segments, &[("amount", amount.to_string())], user_id.as_str())
            .await?;

        let mut followers = Vec::with_capacity(resp.users.len().min(amount));
        for entry in resp.users.into_iter().take(amount) {
            followers.push(FollowerSummary {
                user_id: user_id_from_value(&entry.id)?,
                username: entry.username,
            });
        }
        debug!("Fetched {} followers of {}", followers.len(), user_id);
        Ok(followers)
    }

    async fn issue_follow(&self, user_id: &UserId) -> Result<bool, ClientError> {
        let req = self.request(Method::POST, &["users", user_id.as_str(), "follow"])?;
        let resp: FollowResponse = self.send_json(req, user_id.as_str()).await?;
        Ok(resp.following)
    }
}

fn base_url_with_slash(base_url: &str) -> Result<Url> {
    let mut raw = base_url.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).with_context(|| format!("Invalid api_base_url '{}'", base_url))
}

/// Append `segments` to `base`, percent-encoding each one. Names that would
/// address a different path are refused.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.trim().is_empty() || **s == "." || **s == "..")
    {
        return Err(ClientError::not_found(*bad));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Remote(format!("api_base_url {} cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn user_id_from_value(value: &serde_json::Value) -> Result<UserId, ClientError> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Ok(UserId::new(s.clone())),
        serde_json::Value::Number(n) => Ok(UserId::new(n.to_string())),
        other => Err(ClientError::Remote(format!("unexpected user id {}", other))),
    }
}

fn classify_status(status: StatusCode, what: &str, body: &str) -> ClientError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.chars().take(200).collect::<String>())
    };

    match status {
        StatusCode::NOT_FOUND => ClientError::not_found(what),
        StatusCode::TOO_MANY_REQUESTS => ClientError::rate_limited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(detail),
        s if s.is_server_error() => ClientError::Transport(detail),
        _ => ClientError::Remote(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, "alice", ""),
            ClientError::not_found("alice")
        );
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "x", "wait").is_rate_limited());
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "x", ""),
            ClientError::Auth(_)
        ));
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "x", "").is_transient());
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "x", "nope"),
            ClientError::Remote(_)
        ));
    }

    #[test]
    fn test_user_id_from_value() {
        assert_eq!(
            user_id_from_value(&serde_json::json!(12345)).unwrap(),
            UserId::from(12345u64)
        );
        assert_eq!(
            user_id_from_value(&serde_json::json!("abc")).unwrap(),
            UserId::from("abc")
        );
        assert!(user_id_from_value(&serde_json::json!(null)).is_err());
        assert!(user_id_from_value(&serde_json::json!("")).is_err());
    }

    #[test]
    fn test_profile_response_parsing() {
        let raw = r#"{"follower_count": 321, "is_private": true, "following": true}"#;
        let profile: Profile = serde_json::from_str::<ProfileResponse>(raw).unwrap().into();
        assert_eq!(profile.follower_count, 321);
        assert!(profile.is_private);
        assert!(!profile.is_business);
        assert!(profile.is_already_following);
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let base = base_url_with_slash("https://graph.example.com/api").unwrap();
        assert_eq!(
            endpoint(&base, &["users", "42", "follow"]).unwrap().as_str(),
            "https://graph.example.com/api/users/42/follow"
        );
        assert!(base_url_with_slash("not a url").is_err());
    }

    #[test]
    fn test_endpoint_escapes_hostile_names() {
        let base = base_url_with_slash("https://graph.example.com/api/").unwrap();
        let lookup = |name: &str| endpoint(&base, &["users", "by-username", name]);

        let url = lookup("alice#x").unwrap();
        assert_eq!(url.path(), "/api/users/by-username/alice%23x");
        assert!(url.fragment().is_none());

        let url = lookup("alice?admin=1").unwrap();
        assert_eq!(url.path(), "/api/users/by-username/alice%3Fadmin=1");
        assert!(url.query().is_none());

        let url = lookup("../me").unwrap();
        assert_eq!(url.path(), "/api/users/by-username/..%2Fme");

        assert_eq!(lookup("..").unwrap_err(), ClientError::not_found(".."));
        assert!(lookup(".").is_err());
        assert!(lookup("").is_err());
    }

    #[test]
    fn test_client_builds_with_proxy() {
        let proxy = ProxyConfig {
            url: "http://127.0.0.1:3128".to_string(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        };
        assert!(HttpGraphClient::new("http://localhost:8080", "token", Some(&proxy)).is_ok());
    }
}
