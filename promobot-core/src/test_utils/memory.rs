// File: promobot-core/src/test_utils/memory.rs
//
// In-memory repository implementations backed by DashMap, for exercising
// the services without a live Postgres. The claim path goes through a
// per-key exclusive guard so the one-winner property holds under
// concurrent tasks, same as the conditional UPDATE does in SQL.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::code::{Code, WinnerCode};
use promobot_common::models::prize::{Prize, PrizeTier};
use promobot_common::models::usage::UsageLogEntry;
use promobot_common::models::user::User;
use promobot_common::traits::repository_traits::{
    CodeRepository, PrizeRepository, SettingsRepository, UsageLogRepository, UserRepository,
    WinnerCodeRepository,
};

#[derive(Default)]
pub struct MemoryCodeRepository {
    rows: DashMap<Uuid, Code>,
    canonical_lookups: AtomicU64,
}

impl MemoryCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many canonical-key lookups the engine has issued.
    pub fn canonical_lookups(&self) -> u64 {
        self.canonical_lookups.load(Ordering::SeqCst)
    }

    pub fn insert_row(&self, code: Code) {
        self.rows.insert(code.code_id, code);
    }
}

#[async_trait]
impl CodeRepository for MemoryCodeRepository {
    async fn insert_batch(&self, codes: &[Code]) -> Result<u64, Error> {
        let mut live: std::collections::HashSet<String> = self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.canonical_value.clone())
            .collect();
        let mut inserted = 0;
        for code in codes {
            if live.insert(code.canonical_value.clone()) {
                self.rows.insert(code.code_id, code.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<Code>, Error> {
        self.canonical_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .iter()
            .find(|r| r.deleted_at.is_none() && r.canonical_value == canonical_value)
            .map(|r| r.value().clone()))
    }

    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<Code>, Error> {
        Ok(self.rows.get(&code_id).map(|r| r.value().clone()))
    }

    async fn claim(&self, code_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, Error> {
        if let Some(mut row) = self.rows.get_mut(&code_id) {
            if !row.claimed && row.deleted_at.is_none() {
                row.claimed = true;
                row.claimed_at = Some(at);
                row.claimed_by = Some(user_id);
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn count_claimed_by(&self, user_id: Uuid) -> Result<i64, Error> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.claimed && r.claimed_by == Some(user_id))
            .count() as i64)
    }

    async fn list_active_values(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.canonical_value.clone())
            .collect())
    }

    async fn max_seq(&self) -> Result<i64, Error> {
        Ok(self.rows.iter().map(|r| r.seq).max().unwrap_or(0))
    }

    async fn count_active(&self) -> Result<i64, Error> {
        Ok(self.rows.iter().filter(|r| r.deleted_at.is_none()).count() as i64)
    }

    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0;
        for mut row in self.rows.iter_mut() {
            if row.deleted_at.is_none() {
                row.deleted_at = Some(at);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[derive(Default)]
pub struct MemoryWinnerCodeRepository {
    rows: DashMap<Uuid, WinnerCode>,
    canonical_lookups: AtomicU64,
}

impl MemoryWinnerCodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical_lookups(&self) -> u64 {
        self.canonical_lookups.load(Ordering::SeqCst)
    }

    pub fn insert_row(&self, code: WinnerCode) {
        self.rows.insert(code.code_id, code);
    }
}

#[async_trait]
impl WinnerCodeRepository for MemoryWinnerCodeRepository {
    async fn insert_batch(&self, codes: &[WinnerCode]) -> Result<u64, Error> {
        let mut live: std::collections::HashSet<String> = self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.canonical_value.clone())
            .collect();
        let mut inserted = 0;
        for code in codes {
            if live.insert(code.canonical_value.clone()) {
                self.rows.insert(code.code_id, code.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<WinnerCode>, Error> {
        self.canonical_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .iter()
            .find(|r| r.deleted_at.is_none() && r.canonical_value == canonical_value)
            .map(|r| r.value().clone()))
    }

    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<WinnerCode>, Error> {
        Ok(self.rows.get(&code_id).map(|r| r.value().clone()))
    }

    async fn claim(&self, code_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, Error> {
        if let Some(mut row) = self.rows.get_mut(&code_id) {
            if !row.claimed && row.deleted_at.is_none() {
                row.claimed = true;
                row.claimed_at = Some(at);
                row.claimed_by = Some(user_id);
                return Ok(1);
            }
        }
        Ok(0)
    }

    async fn count_claimed_by(&self, user_id: Uuid) -> Result<i64, Error> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none() && r.claimed && r.claimed_by == Some(user_id))
            .count() as i64)
    }

    async fn list_active_values(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.canonical_value.clone())
            .collect())
    }

    async fn max_seq(&self) -> Result<i64, Error> {
        Ok(self.rows.iter().map(|r| r.seq).max().unwrap_or(0))
    }

    async fn count_active(&self) -> Result<i64, Error> {
        Ok(self.rows.iter().filter(|r| r.deleted_at.is_none()).count() as i64)
    }

    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error> {
        let mut removed = 0;
        for mut row in self.rows.iter_mut() {
            if row.deleted_at.is_none() {
                row.deleted_at = Some(at);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[derive(Default)]
pub struct MemoryPrizeRepository {
    rows: DashMap<Uuid, Prize>,
}

impl MemoryPrizeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrizeRepository for MemoryPrizeRepository {
    async fn create(&self, prize: &Prize) -> Result<(), Error> {
        let exists = self
            .rows
            .iter()
            .any(|r| r.deleted_at.is_none() && r.tier == prize.tier);
        if exists {
            return Err(Error::Parse(format!(
                "prize tier '{}' already exists",
                prize.tier
            )));
        }
        self.rows.insert(prize.prize_id, prize.clone());
        Ok(())
    }

    async fn get_by_id(&self, prize_id: Uuid) -> Result<Option<Prize>, Error> {
        Ok(self
            .rows
            .get(&prize_id)
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.value().clone()))
    }

    async fn get_by_tier(&self, tier: PrizeTier) -> Result<Option<Prize>, Error> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.deleted_at.is_none() && r.tier == tier)
            .map(|r| r.value().clone()))
    }

    async fn list_active(&self) -> Result<Vec<Prize>, Error> {
        let mut out: Vec<Prize> = self
            .rows
            .iter()
            .filter(|r| r.deleted_at.is_none())
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|p| p.seq);
        Ok(out)
    }

    async fn increment_claimed(&self, prize_id: Uuid) -> Result<(), Error> {
        if let Some(mut row) = self.rows.get_mut(&prize_id) {
            row.total_claimed += 1;
        }
        Ok(())
    }

    async fn add_issued(&self, prize_id: Uuid, n: i64) -> Result<(), Error> {
        if let Some(mut row) = self.rows.get_mut(&prize_id) {
            row.total_issued += n;
        }
        Ok(())
    }

    async fn max_seq(&self) -> Result<i64, Error> {
        Ok(self.rows.iter().map(|r| r.seq).max().unwrap_or(0))
    }
}

#[derive(Default)]
pub struct MemoryUsageLogRepository {
    entries: Mutex<Vec<UsageLogEntry>>,
    /// Flip on to make every write fail, for exercising the best-effort
    /// ledger path.
    pub fail_writes: AtomicBool,
}

impl MemoryUsageLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<UsageLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageLogRepository for MemoryUsageLogRepository {
    async fn insert(&self, entry: &UsageLogEntry) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Parse("usage log unavailable".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, Error> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .count() as i64)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<UsageLogEntry>, Error> {
        let mut list: Vec<UsageLogEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit as usize);
        Ok(list)
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    rows: DashMap<Uuid, User>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: &User) -> Result<(), Error> {
        self.rows.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.rows.get(&user_id).map(|r| r.value().clone()))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .rows
            .iter()
            .find(|r| {
                r.global_username
                    .as_deref()
                    .map(|u| u.eq_ignore_ascii_case(username))
                    .unwrap_or(false)
            })
            .map(|r| r.value().clone()))
    }

    async fn touch_last_seen(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), Error> {
        if let Some(mut row) = self.rows.get_mut(&user_id) {
            row.last_seen = at;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettingsRepository {
    values: DashMap<String, String>,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn set_value(&self, config_key: &str, config_value: &str) -> Result<(), Error> {
        self.values
            .insert(config_key.to_string(), config_value.to_string());
        Ok(())
    }

    async fn get_value(&self, config_key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.get(config_key).map(|v| v.value().clone()))
    }

    async fn list_all(&self) -> Result<Vec<(String, String)>, Error> {
        let mut out: Vec<(String, String)> = self
            .values
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort();
        Ok(out)
    }
}
