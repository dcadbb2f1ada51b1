use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::LedgerError;
use crate::traits::UserId;

/// Terminal classification of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Followed,
    Failed,
    Skipped,
    AlreadyFollowing,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Followed => "followed",
            EntryStatus::Failed => "failed",
            EntryStatus::Skipped => "skipped",
            EntryStatus::AlreadyFollowing => "already_following",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record per user ever evaluated.
///
/// Serialized without the id, which is the key of the snapshot map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(skip)]
    pub user_id: UserId,
    pub username: String,
    pub status: EntryStatus,
    pub source: String,
    #[serde(rename = "timestamp", deserialize_with = "lenient_timestamp")]
    pub last_attempt_at: DateTime<Utc>,
    #[serde(rename = "attempts")]
    pub attempt_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub followed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub already_following: usize,
}

impl fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total processed: {}", self.total)?;
        writeln!(f, "  Followed: {}", self.followed)?;
        writeln!(f, "  Skipped: {}", self.skipped)?;
        writeln!(f, "  Failed: {}", self.failed)?;
        write!(f, "  Already following: {}", self.already_following)
    }
}

/// Durable record of every evaluated user.
///
/// The in-memory map is authoritative for the life of the process. Every
/// mutation rewrites the whole snapshot; a failed write is logged and counted
/// but never rolls back the in-memory change.
#[derive(Debug)]
pub struct AttemptLedger {
    entries: HashMap<UserId, LedgerEntry>,
    path: Option<PathBuf>,
    persist_failures: u64,
}

impl AttemptLedger {
    /// Open the ledger stored at `path`. A missing or unreadable snapshot
    /// yields an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_snapshot(&path) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error loading ledger: {}", e);
                quarantine(&path);
                HashMap::new()
            }
        };

        Self {
            entries,
            path: Some(path),
            persist_failures: 0,
        }
    }

    /// Load the snapshot at `path` for inspection. Nothing is ever written
    /// back, and an unreadable snapshot is left where it is.
    pub fn open_read_only(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let entries = match load_snapshot(path) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error loading ledger: {}", e);
                HashMap::new()
            }
        };

        Self {
            entries,
            path: None,
            persist_failures: 0,
        }
    }

    /// A ledger that is never written to disk.
    pub fn ephemeral() -> Self {
        Self {
            entries: HashMap::new(),
            path: None,
            persist_failures: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_processed(&self, user_id: &UserId) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&LedgerEntry> {
        self.entries.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of snapshot writes that failed since this ledger was opened.
    pub fn persist_failures(&self) -> u64 {
        self.persist_failures
    }

    /// Upsert the entry for `user_id` and persist the full snapshot.
    pub fn record(&mut self, user_id: &UserId, username: &str, status: EntryStatus, source: &str) {
        let attempt_count = self
            .entries
            .get(user_id)
            .map_or(1, |prev| prev.attempt_count.saturating_add(1));

        self.entries.insert(
            user_id.clone(),
            LedgerEntry {
                user_id: user_id.clone(),
                username: username.to_string(),
                status,
                source: source.to_string(),
                last_attempt_at: Utc::now(),
                attempt_count,
            },
        );

        self.persist_or_log();
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            match entry.status {
                EntryStatus::Followed => stats.followed += 1,
                EntryStatus::Failed => stats.failed += 1,
                EntryStatus::Skipped => stats.skipped += 1,
                EntryStatus::AlreadyFollowing => stats.already_following += 1,
            }
        }
        stats
    }

    /// Drop every `Failed` entry so those users are evaluated again next run.
    pub fn purge_failed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.status != EntryStatus::Failed);
        let removed = before - self.entries.len();

        self.persist_or_log();
        info!("Cleared {} failed entries from ledger", removed);
        removed
    }

    fn persist_or_log(&mut self) {
        if let Err(e) = self.persist() {
            self.persist_failures += 1;
            error!("Error saving ledger: {}", e);
        }
    }

    fn persist(&self) -> Result<(), LedgerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let sorted: BTreeMap<&UserId, &LedgerEntry> = self.entries.iter().collect();
        let body = serde_json::to_vec_pretty(&sorted)
            .map_err(|e| LedgerError::Serialize { msg: e.to_string() })?;

        let io_err = |e: std::io::Error| LedgerError::Io {
            path: path.display().to_string(),
            msg: e.to_string(),
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

/// Accepts RFC 3339 as well as ISO-8601 without an offset, which is read as
/// UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

/// Read the snapshot at `path`. A missing file is an empty ledger. A file
/// that is not a JSON object is an error; a single malformed record is
/// dropped with a warning and the rest are kept.
fn load_snapshot(path: &Path) -> Result<HashMap<UserId, LedgerEntry>, LedgerError> {
    if !path.exists() {
        debug!("No ledger at {}, starting empty", path.display());
        return Ok(HashMap::new());
    }

    let raw = fs::read(path).map_err(|e| LedgerError::Io {
        path: path.display().to_string(),
        msg: e.to_string(),
    })?;
    let parsed: HashMap<UserId, serde_json::Value> = serde_json::from_slice(&raw)
        .map_err(|e| LedgerError::Serialize { msg: e.to_string() })?;

    let mut entries = HashMap::with_capacity(parsed.len());
    let mut dropped = 0usize;
    for (id, value) in parsed {
        match serde_json::from_value::<LedgerEntry>(value) {
            Ok(mut entry) => {
                entry.user_id = id.clone();
                entries.insert(id, entry);
            }
            Err(e) => {
                dropped += 1;
                warn!("Dropping unreadable ledger record for {}: {}", id, e);
            }
        }
    }

    if dropped > 0 {
        warn!("Dropped {} unreadable records from {}", dropped, path.display());
    }
    info!("Loaded {} users from {}", entries.len(), path.display());
    Ok(entries)
}

/// Move an unreadable snapshot aside so the next write does not clobber it.
/// Each quarantine gets its own timestamped name.
fn quarantine(path: &Path) {
    if !path.exists() {
        return;
    }
    let aside = quarantine_path(path, Utc::now());
    match fs::rename(path, &aside) {
        Ok(()) => warn!("Moved unreadable ledger to {}", aside.display()),
        Err(e) => warn!("Could not move unreadable ledger aside: {}", e),
    }
}

fn quarantine_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let mut aside = path.as_os_str().to_owned();
    aside.push(format!(".corrupt-{}", at.format("%Y%m%dT%H%M%S%.3fZ")));
    PathBuf::from(aside)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_upsert() {
        let mut ledger = AttemptLedger::ephemeral();
        let id = UserId::from(7u64);

        ledger.record(&id, "old_name", EntryStatus::Failed, "specific");
        ledger.record(&id, "new_name", EntryStatus::Followed, "rustlang");

        assert_eq!(ledger.len(), 1);
        let entry = ledger.get(&id).unwrap();
        assert_eq!(entry.attempt_count, 2);
        assert_eq!(entry.username, "new_name");
        assert_eq!(entry.status, EntryStatus::Followed);
        assert_eq!(entry.source, "rustlang");
    }

    #[test]
    fn test_stats_counts_each_status() {
        let mut ledger = AttemptLedger::ephemeral();
        ledger.record(&1u64.into(), "a", EntryStatus::Followed, "s");
        ledger.record(&2u64.into(), "b", EntryStatus::Failed, "s");
        ledger.record(&3u64.into(), "c", EntryStatus::Skipped, "s");
        ledger.record(&4u64.into(), "d", EntryStatus::Skipped, "s");
        ledger.record(&5u64.into(), "e", EntryStatus::AlreadyFollowing, "s");

        let stats = ledger.stats();
        assert_eq!(
            stats,
            LedgerStats {
                total: 5,
                followed: 1,
                failed: 1,
                skipped: 2,
                already_following: 1,
            }
        );
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&EntryStatus::AlreadyFollowing).unwrap();
        assert_eq!(json, "\"already_following\"");
        assert_eq!(EntryStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_parse_timestamp_accepts_naive_and_offset_forms() {
        let utc = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let shifted = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(shifted, utc);

        let naive = parse_timestamp("2024-05-01T10:00:00.123456").unwrap();
        assert_eq!(naive.timestamp(), utc.timestamp());

        assert!(parse_timestamp("2024-05-01T10:00:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_quarantine_path_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let aside = quarantine_path(Path::new("data/ledger.json"), at);
        assert_eq!(
            aside,
            PathBuf::from("data/ledger.json.corrupt-20240501T100000.000Z")
        );
    }

    #[test]
    fn test_ephemeral_has_no_path() {
        let mut ledger = AttemptLedger::ephemeral();
        ledger.record(&"x".into(), "x", EntryStatus::Skipped, "s");
        assert!(ledger.path().is_none());
        assert_eq!(ledger.persist_failures(), 0);
    }
}
