use crate::config::CampaignSettings;
use crate::ledger::{AttemptLedger, EntryStatus};
use crate::traits::{Profile, UserId};

/// A user under evaluation in the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub user_id: UserId,
    pub username: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    RejectAlreadyProcessed,
    RejectAlreadyFollowing,
    RejectTooFewFollowers,
    RejectTooManyFollowers,
    RejectPrivate,
    RejectBusiness,
}

impl Verdict {
    /// Status the caller must record for this verdict, if any.
    ///
    /// `Accept` is recorded after the follow attempt; `RejectAlreadyProcessed`
    /// already has an entry.
    pub fn ledger_status(&self) -> Option<EntryStatus> {
        match self {
            Verdict::Accept | Verdict::RejectAlreadyProcessed => None,
            Verdict::RejectAlreadyFollowing => Some(EntryStatus::AlreadyFollowing),
            Verdict::RejectTooFewFollowers
            | Verdict::RejectTooManyFollowers
            | Verdict::RejectPrivate
            | Verdict::RejectBusiness => Some(EntryStatus::Skipped),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Verdict::Accept => "eligible",
            Verdict::RejectAlreadyProcessed => "already processed",
            Verdict::RejectAlreadyFollowing => "already following",
            Verdict::RejectTooFewFollowers => "too few followers",
            Verdict::RejectTooManyFollowers => "too many followers",
            Verdict::RejectPrivate => "private account",
            Verdict::RejectBusiness => "business account",
        }
    }
}

/// Pure eligibility filter. Holds thresholds only; never touches the ledger
/// beyond a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityPolicy {
    pub min_followers: u64,
    pub max_followers: u64,
    pub skip_private: bool,
    pub skip_business: bool,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            min_followers: 0,
            max_followers: u64::MAX,
            skip_private: false,
            skip_business: false,
        }
    }
}

impl From<&CampaignSettings> for EligibilityPolicy {
    fn from(settings: &CampaignSettings) -> Self {
        Self {
            min_followers: settings.min_followers,
            max_followers: settings.max_followers,
            skip_private: settings.skip_private_accounts,
            skip_business: settings.skip_business_accounts,
        }
    }
}

impl EligibilityPolicy {
    /// First matching rule wins. Both follower bounds are inclusive.
    pub fn evaluate(&self, candidate: &Candidate, ledger: &AttemptLedger) -> Verdict {
        let profile = &candidate.profile;

        if ledger.is_processed(&candidate.user_id) {
            Verdict::RejectAlreadyProcessed
        } else if profile.is_already_following {
            Verdict::RejectAlreadyFollowing
        } else if profile.follower_count < self.min_followers {
            Verdict::RejectTooFewFollowers
        } else if profile.follower_count > self.max_followers {
            Verdict::RejectTooManyFollowers
        } else if self.skip_private && profile.is_private {
            Verdict::RejectPrivate
        } else if self.skip_business && profile.is_business {
            Verdict::RejectBusiness
        } else {
            Verdict::Accept
        }
    }
}
