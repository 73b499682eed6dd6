// File: promobot-core/src/services/redemption_service.rs

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::code::WinnerCode;
use promobot_common::models::prize::{Prize, PrizeTier};
use promobot_common::models::usage::UsageLogEntry;
use promobot_common::traits::repository_traits::{
    CodeRepository, SettingsRepository, UsageLogRepository, UserRepository, WinnerCodeRepository,
};
use crate::services::prize_service::PrizeService;
use crate::utils::codes;

/// What a submission resolved to. Expected terminal states are values here,
/// not errors; only storage failures and broken invariants surface as `Err`.
#[derive(Debug, Clone)]
pub enum RedemptionOutcome {
    /// Not the 6-letters + 4-digits shape; nothing was looked up or logged.
    InvalidFormat,
    /// The submitting user is at their successful-claim cap.
    LimitReached,
    /// Well-formed but present in neither code population.
    NotFound,
    /// One-time use, globally: the original claimant gets this too.
    AlreadyClaimed,
    /// Claim recorded; no prize attached (or prize bookkeeping failed).
    PlainSuccess,
    /// Claim recorded and the tier's prize resolved.
    PrizeSuccess { tier: PrizeTier, prize: Prize },
}

pub struct RedemptionService {
    code_repo: Arc<dyn CodeRepository + Send + Sync>,
    winner_repo: Arc<dyn WinnerCodeRepository + Send + Sync>,
    usage_repo: Arc<dyn UsageLogRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    settings_repo: Arc<dyn SettingsRepository + Send + Sync>,
    prize_service: Arc<PrizeService>,
}

impl RedemptionService {
    pub fn new(
        code_repo: Arc<dyn CodeRepository + Send + Sync>,
        winner_repo: Arc<dyn WinnerCodeRepository + Send + Sync>,
        usage_repo: Arc<dyn UsageLogRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        settings_repo: Arc<dyn SettingsRepository + Send + Sync>,
        prize_service: Arc<PrizeService>,
    ) -> Self {
        debug!("Initializing RedemptionService");
        Self {
            code_repo,
            winner_repo,
            usage_repo,
            user_repo,
            settings_repo,
            prize_service,
        }
    }

    /// Resolve one submission. Codes move `Unclaimed -> Claimed` exactly
    /// once; the conditional update in the repository is the only place that
    /// transition happens, so concurrent submissions of the same code leave
    /// one winner and the rest see [`RedemptionOutcome::AlreadyClaimed`].
    pub async fn redeem(&self, raw_text: &str, user_id: Uuid) -> Result<RedemptionOutcome, Error> {
        debug!("redeem() received submission: '{}'", raw_text);

        // 1) Shape check first; malformed input never reaches storage.
        if !codes::is_well_formed(raw_text) {
            return Ok(RedemptionOutcome::InvalidFormat);
        }

        // 2) Per-user cap, checked before any code lookup. Claims across
        //    both populations count toward the cap.
        if let Some(limit) = self.settings_repo.code_limit_per_user().await? {
            let used = self.code_repo.count_claimed_by(user_id).await?
                + self.winner_repo.count_claimed_by(user_id).await?;
            if used >= limit {
                debug!("User {} is at the claim cap ({})", user_id, limit);
                return Ok(RedemptionOutcome::LimitReached);
            }
        }

        let canonical = codes::normalize(raw_text);

        // 3) Winner store first; a hit there is authoritative even if the
        //    same value also exists as a plain code.
        if let Some(winner) = self.winner_repo.get_by_canonical(&canonical).await? {
            self.log_usage(user_id, raw_text, Some(winner.code_id), true).await;

            if winner.claimed {
                return Ok(RedemptionOutcome::AlreadyClaimed);
            }

            let updated = self
                .winner_repo
                .claim(winner.code_id, user_id, Utc::now())
                .await?;
            if updated == 0 {
                // Lost the race. One re-read decides; there is nothing to retry.
                return match self.winner_repo.get_by_id(winner.code_id).await? {
                    Some(w) if w.claimed => Ok(RedemptionOutcome::AlreadyClaimed),
                    _ => Err(Error::Consistency(format!(
                        "winner code {} claim updated 0 rows but row is not claimed",
                        winner.code_id
                    ))),
                };
            }

            return Ok(self.resolve_winner_prize(&winner).await);
        }

        // 4) Plain store, same single-key lookup.
        let code = match self.code_repo.get_by_canonical(&canonical).await? {
            Some(c) => c,
            None => {
                // 5) Unknown code. Log the attempt and stop; rows are never
                //    created on the redemption path.
                self.log_usage(user_id, raw_text, None, false).await;
                return Ok(RedemptionOutcome::NotFound);
            }
        };

        // 6) Log the matched attempt before deciding the outcome.
        self.log_usage(user_id, raw_text, Some(code.code_id), false).await;

        // 7) One-time use is global, not per-user.
        if code.claimed {
            return Ok(RedemptionOutcome::AlreadyClaimed);
        }

        // 8) The atomic claim.
        let updated = self.code_repo.claim(code.code_id, user_id, Utc::now()).await?;
        if updated == 0 {
            // 9) Zero rows modified means another submission won; the row
            //    must read claimed now. Anything else is a broken guarantee.
            return match self.code_repo.get_by_id(code.code_id).await? {
                Some(c) if c.claimed => Ok(RedemptionOutcome::AlreadyClaimed),
                _ => Err(Error::Consistency(format!(
                    "code {} claim updated 0 rows but row is not claimed",
                    code.code_id
                ))),
            };
        }

        // 10) Resolve the prize, if the row carries one. The claim stands
        //     regardless of how prize bookkeeping goes.
        match code.prize_id {
            Some(prize_id) => Ok(self.resolve_plain_prize(prize_id).await),
            None => Ok(RedemptionOutcome::PlainSuccess),
        }
    }

    /// Best-effort bookkeeping around a submission: usage-log append and a
    /// `last_seen` touch. Failures are logged and swallowed; neither may
    /// block or fail a redemption.
    async fn log_usage(
        &self,
        user_id: Uuid,
        submitted_text: &str,
        matched_code_id: Option<Uuid>,
        matched_winner: bool,
    ) {
        let entry = UsageLogEntry::new(user_id, submitted_text, matched_code_id, matched_winner);
        if let Err(e) = self.usage_repo.insert(&entry).await {
            warn!("usage log write failed (ignored): {:?}", e);
        }
        if let Err(e) = self.user_repo.touch_last_seen(user_id, Utc::now()).await {
            warn!("last_seen touch failed (ignored): {:?}", e);
        }
    }

    async fn resolve_winner_prize(&self, winner: &WinnerCode) -> RedemptionOutcome {
        match self.prize_service.get_or_create(winner.tier).await {
            Ok(prize) => {
                if let Err(e) = self.prize_service.record_claim(prize.prize_id).await {
                    warn!("total_claimed bump failed for prize {}: {:?}", prize.prize_id, e);
                }
                RedemptionOutcome::PrizeSuccess {
                    tier: winner.tier,
                    prize,
                }
            }
            Err(e) => {
                warn!(
                    "prize resolution failed for tier '{}', degrading to plain success: {:?}",
                    winner.tier, e
                );
                RedemptionOutcome::PlainSuccess
            }
        }
    }

    async fn resolve_plain_prize(&self, prize_id: Uuid) -> RedemptionOutcome {
        match self.prize_service.get(prize_id).await {
            Ok(Some(prize)) => {
                if let Err(e) = self.prize_service.record_claim(prize.prize_id).await {
                    warn!("total_claimed bump failed for prize {}: {:?}", prize.prize_id, e);
                }
                RedemptionOutcome::PrizeSuccess {
                    tier: prize.tier,
                    prize,
                }
            }
            Ok(None) => {
                warn!("code referenced missing prize {}, degrading to plain success", prize_id);
                RedemptionOutcome::PlainSuccess
            }
            Err(e) => {
                warn!(
                    "prize lookup failed for {}, degrading to plain success: {:?}",
                    prize_id, e
                );
                RedemptionOutcome::PlainSuccess
            }
        }
    }
}
