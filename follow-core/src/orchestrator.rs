//! # Follow Orchestrator
//!
//! Walks candidate sources one at a time: explicit usernames first, then the
//! followers of each target account. Every candidate goes through the same
//! pipeline:
//!
//! 1. ledger lookup (settled users cost no network call)
//! 2. profile fetch
//! 3. eligibility verdict, recorded unless it is `Accept`
//! 4. follow attempt, recorded with its outcome, then a pacing sleep
//!
//! Errors never escape a candidate. Rate limiting blocks the whole run for the
//! configured cooldown before the next candidate is looked at.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{CampaignConfig, CampaignSettings};
use crate::error::ClientError;
use crate::ledger::{AttemptLedger, EntryStatus, LedgerStats};
use crate::policy::{Candidate, EligibilityPolicy, Verdict};
use crate::traits::{SocialGraphClient, UserId};
use crate::utils::logger::RESULT_TARGET;
use crate::utils::PacingConfig;

/// Source tag recorded for users from the explicit account list.
pub const SPECIFIC_SOURCE: &str = "specific";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    Failed,
    RateLimited,
}

/// Per-source counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: String,
    /// Candidates pulled from the source
    pub examined: usize,
    /// Already settled in the ledger, no profile fetch
    pub already_processed: usize,
    /// Verdict other than Accept
    pub rejected: usize,
    pub followed: usize,
    pub failed: usize,
    /// Lookup or profile-fetch failures, left unrecorded
    pub errors: usize,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub total_followed: usize,
    pub sources: Vec<SourceReport>,
    pub ledger_stats: LedgerStats,
}

impl CampaignSummary {
    fn log(&self) {
        let stats = &self.ledger_stats;
        info!(target: RESULT_TARGET, "{}", "=".repeat(50));
        info!(target: RESULT_TARGET, "Session: Followed {} users", self.total_followed);
        info!(target: RESULT_TARGET, "Total ledger: {} users", stats.total);
        info!(target: RESULT_TARGET, "  - Followed: {}", stats.followed);
        info!(target: RESULT_TARGET, "  - Skipped: {}", stats.skipped);
        info!(target: RESULT_TARGET, "  - Failed: {}", stats.failed);
        info!(target: RESULT_TARGET, "  - Already following: {}", stats.already_following);
        info!(target: RESULT_TARGET, "{}", "=".repeat(50));
    }
}

/// Owns the client session and the ledger for the duration of a campaign.
pub struct FollowOrchestrator<C> {
    client: C,
    ledger: AttemptLedger,
    policy: EligibilityPolicy,
    pacing: PacingConfig,
    fetch_multiplier: usize,
}

impl<C: SocialGraphClient> FollowOrchestrator<C> {
    pub fn new(client: C, ledger: AttemptLedger, settings: &CampaignSettings) -> Self {
        Self {
            client,
            ledger,
            policy: EligibilityPolicy::from(settings),
            pacing: PacingConfig::from(settings),
            fetch_multiplier: settings.follower_fetch_multiplier.max(2),
        }
    }

    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_fetch_multiplier(mut self, multiplier: usize) -> Self {
        self.fetch_multiplier = multiplier.max(2);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    pub fn into_ledger(self) -> AttemptLedger {
        self.ledger
    }

    /// Explicit accounts in list order, then every target account in order.
    pub async fn run_campaign(&mut self, config: &CampaignConfig) -> CampaignSummary {
        let mut sources = Vec::new();

        if !config.specific_accounts.is_empty() {
            info!(
                "Following {} specific accounts...",
                config.specific_accounts.len()
            );
            let report = self.process_explicit_list(&config.specific_accounts).await;
            info!("Followed {} specific accounts", report.followed);
            sources.push(report);
        }

        for target in &config.target_accounts {
            info!("Processing target account: {}", target);
            let report = self
                .process_followers_of(target, config.settings.max_followers_to_follow)
                .await;
            info!(
                "Followed {} users from {}'s followers",
                report.followed, target
            );
            sources.push(report);
        }

        let summary = CampaignSummary {
            total_followed: sources.iter().map(|r| r.followed).sum(),
            sources,
            ledger_stats: self.ledger.stats(),
        };
        summary.log();
        summary
    }

    /// Follow each username in order. Settled users are skipped before any
    /// profile fetch.
    pub async fn process_explicit_list(&mut self, usernames: &[String]) -> SourceReport {
        let mut report = SourceReport::new(SPECIFIC_SOURCE);

        for username in usernames {
            info!("Looking up user: {}", username);
            let user_id = match self.client.resolve_user_id(username).await {
                Ok(id) => id,
                Err(ClientError::NotFound { .. }) => {
                    warn!("User not found: {}", username);
                    report.errors += 1;
                    continue;
                }
                Err(e) => {
                    error!("Error processing {}: {}", username, e);
                    report.errors += 1;
                    if e.is_rate_limited() {
                        self.cooldown().await;
                    }
                    continue;
                }
            };

            self.process_candidate(user_id, username, SPECIFIC_SOURCE, &mut report)
                .await;
        }

        report
    }

    /// Follow up to `max_to_follow` followers of `target`. The follower batch
    /// is over-fetched to make up for filtered and settled candidates.
    pub async fn process_followers_of(
        &mut self,
        target: &str,
        max_to_follow: usize,
    ) -> SourceReport {
        let mut report = SourceReport::new(target);
        if max_to_follow == 0 {
            info!("Follow cap for {} is 0, nothing to do", target);
            return report;
        }

        info!("Getting followers of: {}", target);
        let target_id = match self.client.resolve_user_id(target).await {
            Ok(id) => id,
            Err(ClientError::NotFound { .. }) => {
                error!("Target account not found: {}", target);
                return report;
            }
            Err(e) => {
                error!("Error getting followers of {}: {}", target, e);
                if e.is_rate_limited() {
                    self.cooldown().await;
                }
                return report;
            }
        };

        let amount = max_to_follow.saturating_mul(self.fetch_multiplier);
        let followers = match self.client.fetch_followers(&target_id, amount).await {
            Ok(followers) => followers,
            Err(e) => {
                error!("Error getting followers of {}: {}", target, e);
                if e.is_rate_limited() {
                    self.cooldown().await;
                }
                return report;
            }
        };
        info!("Found {} followers", followers.len());

        for follower in followers {
            if report.followed >= max_to_follow {
                info!("Reached maximum follow limit: {}", max_to_follow);
                break;
            }
            self.process_candidate(follower.user_id, &follower.username, target, &mut report)
                .await;
        }

        info!(
            "Processed {} users, followed {}",
            report.examined - report.already_processed,
            report.followed
        );
        report
    }

    /// Issue the follow and record the outcome. Sleeps for the pacing delay
    /// after a success and for the cooldown after a rate-limit signal.
    pub async fn attempt_follow(
        &mut self,
        user_id: &UserId,
        username: &str,
        source: &str,
    ) -> FollowOutcome {
        match self.client.issue_follow(user_id).await {
            Ok(true) => {
                self.ledger.record(user_id, username, EntryStatus::Followed, source);
                info!(target: RESULT_TARGET, "Followed {} [{}] SUCCESS", username, source);
                self.pace().await;
                FollowOutcome::Followed
            }
            Ok(false) => {
                self.ledger.record(user_id, username, EntryStatus::Failed, source);
                warn!(
                    target: RESULT_TARGET,
                    "Follow {} [{}] FAILED: rejected by service", username, source
                );
                FollowOutcome::Failed
            }
            Err(ClientError::RateLimited { message }) => {
                self.ledger.record(user_id, username, EntryStatus::Failed, source);
                warn!(
                    target: RESULT_TARGET,
                    "Follow {} [{}] FAILED: rate limited ({})", username, source, message
                );
                self.cooldown().await;
                FollowOutcome::RateLimited
            }
            Err(e) => {
                self.ledger.record(user_id, username, EntryStatus::Failed, source);
                error!(target: RESULT_TARGET, "Follow {} [{}] FAILED: {}", username, source, e);
                FollowOutcome::Failed
            }
        }
    }

    async fn process_candidate(
        &mut self,
        user_id: UserId,
        username: &str,
        source: &str,
        report: &mut SourceReport,
    ) {
        report.examined += 1;

        if let Some(entry) = self.ledger.get(&user_id) {
            debug!(
                "Skipping {}: already processed (status: {})",
                username, entry.status
            );
            report.already_processed += 1;
            return;
        }

        let profile = match self.client.fetch_profile(&user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                // Not recorded: the user stays eligible for a later run
                error!("Error processing {}: {}", username, e);
                report.errors += 1;
                if e.is_rate_limited() {
                    self.cooldown().await;
                }
                return;
            }
        };

        let candidate = Candidate {
            user_id,
            username: username.to_string(),
            profile,
        };

        let verdict = self.policy.evaluate(&candidate, &self.ledger);
        if verdict == Verdict::Accept {
            match self.attempt_follow(&candidate.user_id, username, source).await {
                FollowOutcome::Followed => report.followed += 1,
                FollowOutcome::Failed | FollowOutcome::RateLimited => report.failed += 1,
            }
            return;
        }

        if let Some(status) = verdict.ledger_status() {
            self.ledger.record(&candidate.user_id, username, status, source);
        }
        report.rejected += 1;
        debug!(target: RESULT_TARGET, "Skipping {}: {} SKIPPED", username, verdict.reason());

        if self.pacing.pace_rejections {
            self.pace().await;
        }
    }

    async fn pace(&self) {
        let delay = self.pacing.next_delay();
        if delay.is_zero() {
            return;
        }
        info!("Waiting {:.1} seconds...", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }

    async fn cooldown(&self) {
        let cooldown: Duration = self.pacing.cooldown;
        warn!("Rate limited! Waiting {} seconds...", cooldown.as_secs());
        tokio::time::sleep(cooldown).await;
    }
}
