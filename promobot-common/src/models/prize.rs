// File: promobot-common/src/models/prize.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Add sqlx::Type so that SQLx knows how to decode this enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "lowercase")]
pub enum PrizeTier {
    Premium,
    Standard,
    Economy,
    Symbolic,
}

impl PrizeTier {
    pub const ALL: [PrizeTier; 4] = [
        PrizeTier::Premium,
        PrizeTier::Standard,
        PrizeTier::Economy,
        PrizeTier::Symbolic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeTier::Premium => "premium",
            PrizeTier::Standard => "standard",
            PrizeTier::Economy => "economy",
            PrizeTier::Symbolic => "symbolic",
        }
    }
}

impl fmt::Display for PrizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PrizeTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "premium" => Ok(PrizeTier::Premium),
            "standard" => Ok(PrizeTier::Standard),
            "economy" => Ok(PrizeTier::Economy),
            "symbolic" => Ok(PrizeTier::Symbolic),
            _ => Err(format!("Unknown prize tier: {}", s)),
        }
    }
}

/// One catalog entry per tier among non-deleted rows. Created lazily with a
/// placeholder image the first time a tier is needed, by whichever of the
/// ingestion or redemption paths gets there first.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prize {
    pub prize_id: Uuid,
    pub seq: i64,
    pub tier: PrizeTier,
    pub display_name: String,
    /// Locale -> asset path map, e.g. `{"uz": "...", "ru": "..."}`.
    pub image_refs: Value,
    pub total_issued: i64,
    pub total_claimed: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
