// File: promobot-core/src/services/prize_service.rs

use std::sync::Arc;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::prize::{Prize, PrizeTier};
use promobot_common::traits::repository_traits::PrizeRepository;

/// The prize catalog. One entry per tier among live rows; entries are
/// created lazily with a placeholder image by whichever path (ingestion or
/// redemption) needs the tier first.
pub struct PrizeService {
    prize_repo: Arc<dyn PrizeRepository + Send + Sync>,
}

impl PrizeService {
    pub fn new(prize_repo: Arc<dyn PrizeRepository + Send + Sync>) -> Self {
        debug!("Initializing PrizeService");
        Self { prize_repo }
    }

    /// Idempotent lookup-or-create for a tier's catalog entry.
    pub async fn get_or_create(&self, tier: PrizeTier) -> Result<Prize, Error> {
        if let Some(existing) = self.prize_repo.get_by_tier(tier).await? {
            return Ok(existing);
        }

        let placeholder = format!("/files/prize-images/placeholder_{}.jpg", tier.as_str());
        let prize = Prize {
            prize_id: Uuid::new_v4(),
            seq: self.prize_repo.max_seq().await? + 1,
            tier,
            display_name: default_display_name(tier),
            image_refs: json!({ "uz": placeholder, "ru": placeholder }),
            total_issued: 0,
            total_claimed: 0,
            created_at: Utc::now(),
            deleted_at: None,
        };

        match self.prize_repo.create(&prize).await {
            Ok(()) => {
                info!("Created prize catalog entry for tier '{}'", tier);
                Ok(prize)
            }
            Err(e) => {
                // A concurrent caller may have created the entry between our
                // read and write; the partial unique index on tier rejects
                // the second insert. Re-read before giving up.
                if let Some(existing) = self.prize_repo.get_by_tier(tier).await? {
                    Ok(existing)
                } else {
                    Err(e)
                }
            }
        }
    }

    pub async fn get(&self, prize_id: Uuid) -> Result<Option<Prize>, Error> {
        self.prize_repo.get_by_id(prize_id).await
    }

    pub async fn list(&self) -> Result<Vec<Prize>, Error> {
        self.prize_repo.list_active().await
    }

    /// Bump `total_claimed` by one. The single increment path for both code
    /// populations.
    pub async fn record_claim(&self, prize_id: Uuid) -> Result<(), Error> {
        self.prize_repo.increment_claimed(prize_id).await
    }

    /// Bump `total_issued` after an ingestion run lands winner rows.
    pub async fn add_issued(&self, prize_id: Uuid, n: i64) -> Result<(), Error> {
        self.prize_repo.add_issued(prize_id, n).await
    }
}

fn default_display_name(tier: PrizeTier) -> String {
    match tier {
        PrizeTier::Premium => "Premium prize".to_string(),
        PrizeTier::Standard => "Standard prize".to_string(),
        PrizeTier::Economy => "Economy prize".to_string(),
        PrizeTier::Symbolic => "Symbolic prize".to_string(),
    }
}
