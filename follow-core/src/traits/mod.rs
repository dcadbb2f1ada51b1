use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of a remote account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Profile attributes needed by the eligibility policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub follower_count: u64,
    pub is_private: bool,
    pub is_business: bool,
    /// Whether the authenticated account already follows this user.
    pub is_already_following: bool,
}

/// Lightweight entry of a follower listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerSummary {
    pub user_id: UserId,
    pub username: String,
}

#[async_trait]
pub trait SocialGraphClient: Send + Sync {
    /// Check that the current session is authenticated
    async fn verify_session(&self) -> Result<(), ClientError>;

    /// Resolve a username to its id. Fails with `NotFound` for unknown names.
    async fn resolve_user_id(&self, username: &str) -> Result<UserId, ClientError>;

    /// Fetch the attributes used for eligibility checks
    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ClientError>;

    /// Fetch at most `amount` followers, in the order the service lists them
    async fn fetch_followers(
        &self,
        user_id: &UserId,
        amount: usize,
    ) -> Result<Vec<FollowerSummary>, ClientError>;

    /// Issue a follow. `Ok(false)` means the service refused without an error.
    async fn issue_follow(&self, user_id: &UserId) -> Result<bool, ClientError>;
}
