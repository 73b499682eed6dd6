use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::error::Error;
use crate::models::{Code, Prize, PrizeTier, UsageLogEntry, User, WinnerCode};

/// Store of plain campaign codes. All read paths exclude soft-deleted rows.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Insert a pre-staged batch. Rows whose canonical value already exists
    /// among non-deleted rows are skipped, not errors. Returns how many rows
    /// actually landed.
    async fn insert_batch(&self, codes: &[Code]) -> Result<u64, Error>;

    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<Code>, Error>;
    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<Code>, Error>;

    /// Conditional claim: flips `claimed` to true only if it is still false
    /// at write time. Returns the number of rows modified (0 or 1). This is
    /// the single race-prevention point of the whole system.
    async fn claim(&self, code_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, Error>;

    /// Successful claims attributed to one user, for the per-user cap.
    async fn count_claimed_by(&self, user_id: Uuid) -> Result<i64, Error>;

    /// Canonical values of every non-deleted row, for ingestion dedup.
    async fn list_active_values(&self) -> Result<Vec<String>, Error>;

    /// Highest `seq` ever assigned, soft-deleted rows included, so freed
    /// values are never handed out again. 0 on an empty store.
    async fn max_seq(&self) -> Result<i64, Error>;

    async fn count_active(&self) -> Result<i64, Error>;

    /// Administrative bulk soft-delete of every live row.
    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error>;
}

/// Store of designated winning codes. Same contract as [`CodeRepository`]
/// over the separate winner population.
#[async_trait]
pub trait WinnerCodeRepository: Send + Sync {
    async fn insert_batch(&self, codes: &[WinnerCode]) -> Result<u64, Error>;
    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<WinnerCode>, Error>;
    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<WinnerCode>, Error>;
    async fn claim(&self, code_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, Error>;
    async fn count_claimed_by(&self, user_id: Uuid) -> Result<i64, Error>;
    async fn list_active_values(&self) -> Result<Vec<String>, Error>;
    async fn max_seq(&self) -> Result<i64, Error>;
    async fn count_active(&self) -> Result<i64, Error>;
    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error>;
}

#[async_trait]
pub trait PrizeRepository: Send + Sync {
    async fn create(&self, prize: &Prize) -> Result<(), Error>;
    async fn get_by_id(&self, prize_id: Uuid) -> Result<Option<Prize>, Error>;
    async fn get_by_tier(&self, tier: PrizeTier) -> Result<Option<Prize>, Error>;
    async fn list_active(&self) -> Result<Vec<Prize>, Error>;

    /// Atomic `total_claimed + 1`. Never decrements.
    async fn increment_claimed(&self, prize_id: Uuid) -> Result<(), Error>;

    /// Atomic `total_issued + n`, bumped by ingestion when winner rows land.
    async fn add_issued(&self, prize_id: Uuid, n: i64) -> Result<(), Error>;

    async fn max_seq(&self) -> Result<i64, Error>;
}

#[async_trait]
pub trait UsageLogRepository: Send + Sync {
    async fn insert(&self, entry: &UsageLogEntry) -> Result<(), Error>;
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, Error>;
    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<UsageLogEntry>, Error>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), Error>;
    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error>;
    async fn touch_last_seen(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), Error>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn set_value(&self, config_key: &str, config_value: &str) -> Result<(), Error>;
    async fn get_value(&self, config_key: &str) -> Result<Option<String>, Error>;
    async fn list_all(&self) -> Result<Vec<(String, String)>, Error>;

    /// Per-user successful-claim cap. `None` (unset or non-positive) means
    /// the cap is disabled.
    async fn code_limit_per_user(&self) -> Result<Option<i64>, Error> {
        let raw = self.get_value("code_limit_per_user").await?;
        Ok(raw
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0))
    }
}
