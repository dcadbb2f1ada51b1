//! # Follow Core - Follow-Attempt Tracking and Dispatch
//!
//! This crate holds the part of the follower automation that has real
//! invariants: the durable attempt ledger, the eligibility policy and the
//! orchestrator that walks candidate sources against a remote social graph.
//!
//! ## Modules
//!
//! - [`config`] - Campaign configuration and validation
//! - [`error`] - Typed error handling with thiserror
//! - [`ledger`] - Durable, idempotent record of every evaluated user
//! - [`orchestrator`] - Candidate pipeline, pacing and cooldown handling
//! - [`policy`] - Pure eligibility decision function
//! - [`traits`] - Contract for the remote social-graph client
//! - [`utils`] - Utility modules (logging, retry, pacing)

pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod policy;
pub mod traits;
pub(crate) mod utils;

pub use config::{CampaignConfig, CampaignSettings, MAX_DELAY_SECS};
pub use error::{ClientError, ConfigError, CoreError, LedgerError};
pub use ledger::{AttemptLedger, EntryStatus, LedgerEntry, LedgerStats};
pub use orchestrator::{CampaignSummary, FollowOrchestrator, FollowOutcome, SourceReport};
pub use policy::{Candidate, EligibilityPolicy, Verdict};
pub use traits::{FollowerSummary, Profile, SocialGraphClient, UserId};

pub use utils::{setup_logger, PacingConfig};

// Export retry utilities for the HTTP client and tests
pub use utils::retry::{with_retry, RetryConfig};
