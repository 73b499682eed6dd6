// File: promobot-common/src/models/code.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::prize::PrizeTier;

/// A plain campaign code. The business key is `canonical_value`
/// (uppercase alphanumerics, separators stripped); uniqueness is enforced
/// among non-deleted rows only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Code {
    pub code_id: Uuid,
    /// Dense per-store id, increasing across the lifetime of the store.
    /// Gaps after soft-deletes are fine; values are never reused.
    pub seq: i64,
    pub canonical_value: String,
    pub display_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_id: Option<Uuid>,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<Uuid>,
    pub month: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A designated winning code. Lives in its own table; the redemption path
/// checks this population before plain codes and treats a hit as
/// authoritative. `tier` and `prize_id` are mandatory here.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WinnerCode {
    pub code_id: Uuid,
    pub seq: i64,
    pub canonical_value: String,
    pub display_value: String,
    pub tier: PrizeTier,
    pub prize_id: Uuid,
    pub claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claimed_by: Option<Uuid>,
    pub month: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
