// File: promobot-common/src/models/usage.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per submission attempt, successful or not. Append-only; writes
/// are best-effort and never block a redemption.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageLogEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    /// The raw text as the participant typed it, before normalization.
    pub submitted_text: String,
    pub matched_code_id: Option<Uuid>,
    /// True when `matched_code_id` points into the winner store.
    pub matched_winner: bool,
    pub created_at: DateTime<Utc>,
}

impl UsageLogEntry {
    pub fn new(user_id: Uuid, submitted_text: &str, matched_code_id: Option<Uuid>, matched_winner: bool) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            user_id,
            submitted_text: submitted_text.to_string(),
            matched_code_id,
            matched_winner,
            created_at: Utc::now(),
        }
    }
}
