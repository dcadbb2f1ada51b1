#![allow(dead_code)]

use async_trait::async_trait;
use follow_core::{ClientError, FollowerSummary, Profile, SocialGraphClient, UserId};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

/// In-memory social graph with scripted follow responses.
#[derive(Default)]
pub struct ScriptedClient {
    usernames: HashMap<String, UserId>,
    profiles: HashMap<UserId, Profile>,
    profile_errors: HashMap<UserId, ClientError>,
    followers: HashMap<UserId, Vec<FollowerSummary>>,
    follow_script: Mutex<VecDeque<Result<bool, ClientError>>>,
    pub follow_calls: Mutex<Vec<(UserId, Instant)>>,
    pub profile_calls: Mutex<Vec<UserId>>,
    pub follower_requests: Mutex<Vec<(UserId, usize)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the given follower count and default flags.
    pub fn user(mut self, id: u64, username: &str, follower_count: u64) -> Self {
        self.usernames.insert(username.to_string(), id.into());
        self.profiles.insert(
            id.into(),
            Profile {
                follower_count,
                ..Default::default()
            },
        );
        self
    }

    pub fn profile(mut self, id: u64, username: &str, profile: Profile) -> Self {
        self.usernames.insert(username.to_string(), id.into());
        self.profiles.insert(id.into(), profile);
        self
    }

    pub fn failing_profile(mut self, id: u64, username: &str, err: ClientError) -> Self {
        self.usernames.insert(username.to_string(), id.into());
        self.profile_errors.insert(id.into(), err);
        self
    }

    /// Make `ids` the follower list of `target`, registering each with
    /// `follower_count` followers.
    pub fn target(
        mut self,
        target_id: u64,
        target: &str,
        ids: &[u64],
        follower_count: u64,
    ) -> Self {
        self.usernames.insert(target.to_string(), target_id.into());
        let mut list = Vec::new();
        for &id in ids {
            let name = format!("user{}", id);
            if !self.profiles.contains_key(&UserId::from(id))
                && !self.profile_errors.contains_key(&UserId::from(id))
            {
                self = self.user(id, &name, follower_count);
            }
            list.push(FollowerSummary {
                user_id: id.into(),
                username: name,
            });
        }
        self.followers.insert(target_id.into(), list);
        self
    }

    /// Queue responses for successive `issue_follow` calls. Once drained,
    /// follows succeed.
    pub fn follow_responses(self, responses: Vec<Result<bool, ClientError>>) -> Self {
        *self.follow_script.lock().unwrap() = responses.into();
        self
    }

    pub fn follow_count(&self) -> usize {
        self.follow_calls.lock().unwrap().len()
    }

    pub fn followed_ids(&self) -> Vec<UserId> {
        self.follow_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn follow_times(&self) -> Vec<Instant> {
        self.follow_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn profile_call_count(&self) -> usize {
        self.profile_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SocialGraphClient for ScriptedClient {
    async fn verify_session(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn resolve_user_id(&self, username: &str) -> Result<UserId, ClientError> {
        self.usernames
            .get(username)
            .cloned()
            .ok_or_else(|| ClientError::not_found(username))
    }

    async fn fetch_profile(&self, user_id: &UserId) -> Result<Profile, ClientError> {
        self.profile_calls.lock().unwrap().push(user_id.clone());
        if let Some(err) = self.profile_errors.get(user_id) {
            return Err(err.clone());
        }
        self.profiles
            .get(user_id)
            .copied()
            .ok_or_else(|| ClientError::not_found(user_id.to_string()))
    }

    async fn fetch_followers(
        &self,
        user_id: &UserId,
        amount: usize,
    ) -> Result<Vec<FollowerSummary>, ClientError> {
        self.follower_requests
            .lock()
            .unwrap()
            .push((user_id.clone(), amount));
        let list = self.followers.get(user_id).cloned().unwrap_or_default();
        Ok(list.into_iter().take(amount).collect())
    }

    async fn issue_follow(&self, user_id: &UserId) -> Result<bool, ClientError> {
        self.follow_calls
            .lock()
            .unwrap()
            .push((user_id.clone(), Instant::now()));
        self.follow_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(true))
    }
}
