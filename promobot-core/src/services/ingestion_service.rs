// File: promobot-core/src/services/ingestion_service.rs

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::code::{Code, WinnerCode};
use promobot_common::models::prize::PrizeTier;
use promobot_common::traits::repository_traits::{CodeRepository, WinnerCodeRepository};
use crate::services::prize_service::PrizeService;
use crate::utils::codes;

/// Rows per bulk insert. Batches fail independently; a bad batch is logged
/// and skipped without rolling back earlier ones.
pub const BATCH_SIZE: usize = 5000;

/// Raw cells shorter than this are noise, not codes.
const MIN_RAW_LEN: usize = 6;
/// Canonical keys shorter than this are never treated as codes.
const MIN_CANONICAL_LEN: usize = 8;

/// Header-row heuristic for spreadsheet exports ("code", "kod", "id", ...).
static HEADER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(kod|code|id|raqam|№|#)").unwrap()
});

/// Which store an upload lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestTarget {
    /// Plain codes; `prize_id` attaches an optional prize to every row.
    Codes { prize_id: Option<Uuid> },
    /// Winner codes for one tier. The tier's catalog entry is created
    /// before any row is inserted.
    Winners { tier: PrizeTier },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionSummary {
    pub accepted: u64,
    pub duplicates: u64,
    /// Live rows in the target store after the run.
    pub total_after: i64,
}

/// Turn uploaded cells into canonical candidate keys: trim, drop short and
/// header-looking tokens, normalize, keep keys of at least
/// `MIN_CANONICAL_LEN` chars, and collapse duplicates keeping first-seen
/// order.
pub fn extract_candidates<I>(cells: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for cell in cells {
        let val = cell.trim();
        if val.len() < MIN_RAW_LEN {
            continue;
        }
        if HEADER_TOKEN.is_match(val) {
            continue;
        }
        let key = codes::normalize(val);
        if key.len() < MIN_CANONICAL_LEN {
            continue;
        }
        if seen.insert(key.clone()) {
            out.push(key);
        }
    }
    out
}

/// Bulk loader for both code populations. The only place code rows are ever
/// created.
pub struct IngestionService {
    code_repo: Arc<dyn CodeRepository + Send + Sync>,
    winner_repo: Arc<dyn WinnerCodeRepository + Send + Sync>,
    prize_service: Arc<PrizeService>,
}

impl IngestionService {
    pub fn new(
        code_repo: Arc<dyn CodeRepository + Send + Sync>,
        winner_repo: Arc<dyn WinnerCodeRepository + Send + Sync>,
        prize_service: Arc<PrizeService>,
    ) -> Self {
        debug!("Initializing IngestionService");
        Self {
            code_repo,
            winner_repo,
            prize_service,
        }
    }

    /// Ingest a batch of raw cells into `target`. Duplicates against the
    /// store (and within the upload) are dropped, surviving candidates get
    /// the next dense sequential ids, and inserts run in fixed-size batches.
    pub async fn ingest<I>(
        &self,
        cells: I,
        target: IngestTarget,
        month: Option<&str>,
    ) -> Result<IngestionSummary, Error>
    where
        I: IntoIterator<Item = String>,
    {
        let candidates = extract_candidates(cells);
        info!("Ingestion run: {} candidate codes after extraction", candidates.len());

        match target {
            IngestTarget::Codes { prize_id } => {
                self.ingest_codes(candidates, prize_id, month).await
            }
            IngestTarget::Winners { tier } => self.ingest_winners(candidates, tier, month).await,
        }
    }

    /// Read a `.txt`/`.csv` style file (one code per line or separated
    /// cells) and ingest its contents. Spreadsheet binary formats are the
    /// transport layer's problem; by the time we are called the upload is a
    /// plain file on disk.
    pub async fn ingest_file(
        &self,
        path: &Path,
        target: IngestTarget,
        month: Option<&str>,
    ) -> Result<IngestionSummary, Error> {
        let content = tokio::fs::read_to_string(path).await?;
        let cells = content
            .lines()
            .flat_map(|line| line.split([',', ';', '\t']))
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        self.ingest(cells, target, month).await
    }

    /// Administrative bulk soft-delete of every live plain code. Freed
    /// values become ingestable again; their seq values are not reused.
    pub async fn clear_codes(&self) -> Result<u64, Error> {
        let removed = self.code_repo.soft_delete_all(Utc::now()).await?;
        info!("Soft-deleted {} plain codes", removed);
        Ok(removed)
    }

    /// Administrative bulk soft-delete of every live winner code.
    pub async fn clear_winners(&self) -> Result<u64, Error> {
        let removed = self.winner_repo.soft_delete_all(Utc::now()).await?;
        info!("Soft-deleted {} winner codes", removed);
        Ok(removed)
    }

    async fn ingest_codes(
        &self,
        candidates: Vec<String>,
        prize_id: Option<Uuid>,
        month: Option<&str>,
    ) -> Result<IngestionSummary, Error> {
        let total = candidates.len() as u64;
        let existing: HashSet<String> =
            self.code_repo.list_active_values().await?.into_iter().collect();
        let fresh: Vec<String> = candidates
            .into_iter()
            .filter(|key| !existing.contains(key))
            .collect();

        let mut next_seq = self.code_repo.max_seq().await?;
        let now = Utc::now();
        let mut accepted: u64 = 0;

        for chunk in fresh.chunks(BATCH_SIZE) {
            let batch: Vec<Code> = chunk
                .iter()
                .map(|key| {
                    next_seq += 1;
                    Code {
                        code_id: Uuid::new_v4(),
                        seq: next_seq,
                        canonical_value: key.clone(),
                        display_value: codes::prettify(key),
                        prize_id,
                        claimed: false,
                        claimed_at: None,
                        claimed_by: None,
                        month: month.map(String::from),
                        created_at: now,
                        deleted_at: None,
                    }
                })
                .collect();

            match self.code_repo.insert_batch(&batch).await {
                Ok(n) => {
                    accepted += n;
                    info!("Code batch written: {} staged, {} inserted", batch.len(), n);
                }
                Err(e) => {
                    error!("Code batch insert failed, continuing: {:?}", e);
                }
            }
        }

        let total_after = self.code_repo.count_active().await?;
        Ok(IngestionSummary {
            accepted,
            duplicates: total - accepted,
            total_after,
        })
    }

    async fn ingest_winners(
        &self,
        candidates: Vec<String>,
        tier: PrizeTier,
        month: Option<&str>,
    ) -> Result<IngestionSummary, Error> {
        // The tier's catalog entry must exist before any winner row points
        // at it.
        let prize = self.prize_service.get_or_create(tier).await?;

        let total = candidates.len() as u64;
        let existing: HashSet<String> =
            self.winner_repo.list_active_values().await?.into_iter().collect();
        let fresh: Vec<String> = candidates
            .into_iter()
            .filter(|key| !existing.contains(key))
            .collect();

        let mut next_seq = self.winner_repo.max_seq().await?;
        let now = Utc::now();
        let mut accepted: u64 = 0;

        for chunk in fresh.chunks(BATCH_SIZE) {
            let batch: Vec<WinnerCode> = chunk
                .iter()
                .map(|key| {
                    next_seq += 1;
                    WinnerCode {
                        code_id: Uuid::new_v4(),
                        seq: next_seq,
                        canonical_value: key.clone(),
                        display_value: codes::prettify(key),
                        tier,
                        prize_id: prize.prize_id,
                        claimed: false,
                        claimed_at: None,
                        claimed_by: None,
                        month: month.map(String::from),
                        created_at: now,
                        deleted_at: None,
                    }
                })
                .collect();

            match self.winner_repo.insert_batch(&batch).await {
                Ok(n) => {
                    accepted += n;
                    info!(
                        "Winner batch written for tier '{}': {} staged, {} inserted",
                        tier,
                        batch.len(),
                        n
                    );
                }
                Err(e) => {
                    error!("Winner batch insert failed, continuing: {:?}", e);
                }
            }
        }

        if accepted > 0 {
            self.prize_service.add_issued(prize.prize_id, accepted as i64).await?;
        }

        let total_after = self.winner_repo.count_active().await?;
        Ok(IngestionSummary {
            accepted,
            duplicates: total - accepted,
            total_after,
        })
    }
}
