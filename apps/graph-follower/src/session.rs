//! Session token discovery and persistence.
//!
//! Order: `GRAPH_SESSION_TOKEN`, then the saved session file, then an
//! interactive prompt. The first token the service accepts is saved back to
//! the session file.

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Password};
use follow_core::{ClientError, SocialGraphClient};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::client::HttpGraphClient;
use crate::config::FollowerConfig;

pub const TOKEN_ENV: &str = "GRAPH_SESSION_TOKEN";

#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    token: String,
    #[serde(default)]
    username: Option<String>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<SavedSession>(&raw) {
            Ok(saved) if !saved.token.is_empty() => Some(saved.token),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, token: &str, username: Option<&str>) -> Result<()> {
        let saved = SavedSession {
            token: token.to_string(),
            username: username.map(str::to_string),
        };
        let body = serde_json::to_string_pretty(&saved)?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))
    }

    pub fn clear(&self) {
        if Path::new(&self.path).exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!("Could not remove stale session file: {}", e);
            }
        }
    }
}

/// `Ok(None)` only when the service rejects the credentials. Any other
/// failure is an error and says nothing about the token.
async fn verify<C: SocialGraphClient>(client: C) -> Result<Option<C>> {
    match client.verify_session().await {
        Ok(()) => Ok(Some(client)),
        Err(ClientError::Auth(msg)) => {
            warn!("Session rejected: {}", msg);
            Ok(None)
        }
        Err(e) => Err(e).context("Could not verify session"),
    }
}

async fn try_token(config: &FollowerConfig, token: &str) -> Result<Option<HttpGraphClient>> {
    let client = HttpGraphClient::new(&config.api_base_url, token, config.proxy.as_ref())?;
    verify(client).await
}

/// Reuse the saved session. The session file is removed only when the
/// service rejects it.
async fn resume_saved<C: SocialGraphClient>(store: &SessionStore, client: C) -> Result<Option<C>> {
    info!("Loading existing session...");
    match verify(client).await? {
        Some(client) => {
            info!("Session loaded successfully!");
            Ok(Some(client))
        }
        None => {
            info!("Session expired, logging in fresh...");
            store.clear();
            Ok(None)
        }
    }
}

/// Produce a client with a verified session. Any failure here is fatal to
/// the run.
pub async fn authenticate(config: &FollowerConfig) -> Result<HttpGraphClient> {
    let store = SessionStore::new(&config.campaign.settings.session_file);
    let username = config.username.as_deref();

    if let Ok(token) = env::var(TOKEN_ENV) {
        info!("Using session token from {}", TOKEN_ENV);
        if let Some(client) = try_token(config, &token).await? {
            store.save(&token, username)?;
            return Ok(client);
        }
    }

    if let Some(token) = store.load() {
        let client = HttpGraphClient::new(&config.api_base_url, &token, config.proxy.as_ref())?;
        if let Some(client) = resume_saved(&store, client).await? {
            return Ok(client);
        }
    }

    let prompt = match username {
        Some(name) => format!("Session token for {}", name),
        None => "Session token".to_string(),
    };
    let token = match Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
    {
        Ok(input) => input,
        Err(_) => {
            error!("Cannot prompt for a session token (not a terminal).");
            error!("Please set the {} environment variable.", TOKEN_ENV);
            bail!("no session token available");
        }
    };

    match try_token(config, &token).await? {
        Some(client) => {
            store.save(&token, username)?;
            info!("Login successful! Session saved.");
            Ok(client)
        }
        None => bail!("login failed: session token rejected"),
    }
}
