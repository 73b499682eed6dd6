// tests/redemption_service_tests.rs
//
// Redemption engine behavior against in-memory repositories.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use uuid::Uuid;

use promobot_common::models::code::{Code, WinnerCode};
use promobot_common::models::prize::{Prize, PrizeTier};
use promobot_common::traits::repository_traits::{
    CodeRepository, PrizeRepository, WinnerCodeRepository,
};
use promobot_core::Error;
use promobot_core::services::{
    IngestTarget, IngestionService, PrizeService, RedemptionOutcome, RedemptionService,
};
use promobot_core::test_utils::memory::{
    MemoryCodeRepository, MemoryPrizeRepository, MemorySettingsRepository,
    MemoryUsageLogRepository, MemoryUserRepository, MemoryWinnerCodeRepository,
};
use promobot_common::traits::repository_traits::SettingsRepository;

struct Harness {
    code_repo: Arc<MemoryCodeRepository>,
    winner_repo: Arc<MemoryWinnerCodeRepository>,
    usage_repo: Arc<MemoryUsageLogRepository>,
    prize_repo: Arc<MemoryPrizeRepository>,
    settings_repo: Arc<MemorySettingsRepository>,
    prize_service: Arc<PrizeService>,
    redemption: Arc<RedemptionService>,
    ingestion: IngestionService,
}

fn harness() -> Harness {
    let code_repo = Arc::new(MemoryCodeRepository::new());
    let winner_repo = Arc::new(MemoryWinnerCodeRepository::new());
    let usage_repo = Arc::new(MemoryUsageLogRepository::new());
    let user_repo = Arc::new(MemoryUserRepository::new());
    let prize_repo = Arc::new(MemoryPrizeRepository::new());
    let settings_repo = Arc::new(MemorySettingsRepository::new());
    let prize_service = Arc::new(PrizeService::new(prize_repo.clone()));

    let redemption = Arc::new(RedemptionService::new(
        code_repo.clone(),
        winner_repo.clone(),
        usage_repo.clone(),
        user_repo.clone(),
        settings_repo.clone(),
        prize_service.clone(),
    ));
    let ingestion = IngestionService::new(
        code_repo.clone(),
        winner_repo.clone(),
        prize_service.clone(),
    );

    Harness {
        code_repo,
        winner_repo,
        usage_repo,
        prize_repo,
        settings_repo,
        prize_service,
        redemption,
        ingestion,
    }
}

fn plain_code(key: &str, seq: i64) -> Code {
    let now = Utc::now();
    Code {
        code_id: Uuid::new_v4(),
        seq,
        canonical_value: key.to_string(),
        display_value: format!("{}-{}", &key[..6], &key[6..]),
        prize_id: None,
        claimed: false,
        claimed_at: None,
        claimed_by: None,
        month: None,
        created_at: now,
        deleted_at: None,
    }
}

#[tokio::test]
async fn invalid_format_touches_nothing() -> Result<(), Error> {
    let h = harness();

    for bad in ["HELLO", "12345678901234", "ABCDEF--1234", ""] {
        let outcome = h.redemption.redeem(bad, Uuid::new_v4()).await?;
        assert!(matches!(outcome, RedemptionOutcome::InvalidFormat), "input: {:?}", bad);
    }

    assert!(h.usage_repo.entries().is_empty());
    assert_eq!(h.code_repo.canonical_lookups(), 0);
    assert_eq!(h.winner_repo.canonical_lookups(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_code_is_logged_and_not_found() -> Result<(), Error> {
    let h = harness();
    let user = Uuid::new_v4();

    let outcome = h.redemption.redeem("ABCDEF-1234", user).await?;
    assert!(matches!(outcome, RedemptionOutcome::NotFound));

    let entries = h.usage_repo.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, user);
    assert_eq!(entries[0].submitted_text, "ABCDEF-1234");
    assert!(entries[0].matched_code_id.is_none());
    Ok(())
}

#[tokio::test]
async fn plain_code_end_to_end() -> Result<(), Error> {
    let h = harness();

    let summary = h
        .ingestion
        .ingest(
            vec!["ABCDEF1234".to_string()],
            IngestTarget::Codes { prize_id: None },
            None,
        )
        .await?;
    assert_eq!(summary.accepted, 1);

    // separator and case do not matter on the way back in
    let first = h.redemption.redeem("abcdef-1234", Uuid::new_v4()).await?;
    assert!(matches!(first, RedemptionOutcome::PlainSuccess));

    // one-time use is global: any user, including the claimant, sees
    // AlreadyClaimed from now on
    let second = h.redemption.redeem("ABCDEF1234", Uuid::new_v4()).await?;
    assert!(matches!(second, RedemptionOutcome::AlreadyClaimed));

    let entries = h.usage_repo.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.matched_code_id.is_some()));
    Ok(())
}

#[tokio::test]
async fn claimant_resubmission_is_already_claimed() -> Result<(), Error> {
    let h = harness();
    let user = Uuid::new_v4();
    h.code_repo.insert_row(plain_code("ABCDEF1234", 1));

    let first = h.redemption.redeem("ABCDEF1234", user).await?;
    assert!(matches!(first, RedemptionOutcome::PlainSuccess));

    let again = h.redemption.redeem("ABCDEF1234", user).await?;
    assert!(matches!(again, RedemptionOutcome::AlreadyClaimed));
    Ok(())
}

#[tokio::test]
async fn winner_store_wins_over_plain_store() -> Result<(), Error> {
    let h = harness();

    h.ingestion
        .ingest(
            vec!["GHIJKL5678".to_string()],
            IngestTarget::Winners {
                tier: PrizeTier::Premium,
            },
            None,
        )
        .await?;
    // the same value as a plain code is irrelevant; winners are checked first
    h.ingestion
        .ingest(
            vec!["GHIJKL5678".to_string()],
            IngestTarget::Codes { prize_id: None },
            None,
        )
        .await?;

    let outcome = h.redemption.redeem("ghijkl-5678", Uuid::new_v4()).await?;
    match outcome {
        RedemptionOutcome::PrizeSuccess { tier, prize } => {
            assert_eq!(tier, PrizeTier::Premium);
            assert_eq!(prize.tier, PrizeTier::Premium);
        }
        other => panic!("expected PrizeSuccess, got {:?}", other),
    }

    let prize = h
        .prize_service
        .get_or_create(PrizeTier::Premium)
        .await?;
    assert_eq!(prize.total_claimed, 1);
    assert_eq!(prize.total_issued, 1);

    // the plain copy of the value is untouched
    let plain = h.code_repo.get_by_canonical("GHIJKL5678").await?.unwrap();
    assert!(!plain.claimed);
    Ok(())
}

#[tokio::test]
async fn plain_code_with_prize_resolves_it() -> Result<(), Error> {
    let h = harness();

    let prize = h.prize_service.get_or_create(PrizeTier::Economy).await?;
    let mut code = plain_code("ABCDEF1234", 1);
    code.prize_id = Some(prize.prize_id);
    h.code_repo.insert_row(code);

    let outcome = h.redemption.redeem("ABCDEF1234", Uuid::new_v4()).await?;
    match outcome {
        RedemptionOutcome::PrizeSuccess { tier, .. } => assert_eq!(tier, PrizeTier::Economy),
        other => panic!("expected PrizeSuccess, got {:?}", other),
    }

    let reloaded = h.prize_repo.get_by_id(prize.prize_id).await?.unwrap();
    assert_eq!(reloaded.total_claimed, 1);
    Ok(())
}

#[tokio::test]
async fn limit_reached_before_any_code_lookup() -> Result<(), Error> {
    let h = harness();
    let user = Uuid::new_v4();

    h.settings_repo.set_value("code_limit_per_user", "2").await?;

    // two codes already claimed by this user
    for (i, key) in ["AAAAAA1111", "BBBBBB2222"].iter().enumerate() {
        let mut code = plain_code(key, i as i64 + 1);
        code.claimed = true;
        code.claimed_at = Some(Utc::now());
        code.claimed_by = Some(user);
        h.code_repo.insert_row(code);
    }
    let lookups_before = h.code_repo.canonical_lookups() + h.winner_repo.canonical_lookups();
    assert_eq!(lookups_before, 0);

    let outcome = h.redemption.redeem("CCCCCC3333", user).await?;
    assert!(matches!(outcome, RedemptionOutcome::LimitReached));

    // the cap fired before either store was consulted
    assert_eq!(h.code_repo.canonical_lookups(), 0);
    assert_eq!(h.winner_repo.canonical_lookups(), 0);
    assert!(h.usage_repo.entries().is_empty());

    // a different user is unaffected
    let other = h.redemption.redeem("CCCCCC3333", Uuid::new_v4()).await?;
    assert!(matches!(other, RedemptionOutcome::NotFound));
    Ok(())
}

#[tokio::test]
async fn winner_claims_count_toward_the_cap() -> Result<(), Error> {
    let h = harness();
    let user = Uuid::new_v4();
    h.settings_repo.set_value("code_limit_per_user", "1").await?;

    h.ingestion
        .ingest(
            vec!["GHIJKL5678".to_string()],
            IngestTarget::Winners {
                tier: PrizeTier::Standard,
            },
            None,
        )
        .await?;

    let first = h.redemption.redeem("GHIJKL5678", user).await?;
    assert!(matches!(first, RedemptionOutcome::PrizeSuccess { .. }));

    let capped = h.redemption.redeem("ZZZZZZ9999", user).await?;
    assert!(matches!(capped, RedemptionOutcome::LimitReached));
    Ok(())
}

#[tokio::test]
async fn ledger_failure_never_blocks_redemption() -> Result<(), Error> {
    let h = harness();
    h.code_repo.insert_row(plain_code("ABCDEF1234", 1));
    h.usage_repo.fail_writes.store(true, Ordering::SeqCst);

    let outcome = h.redemption.redeem("ABCDEF1234", Uuid::new_v4()).await?;
    assert!(matches!(outcome, RedemptionOutcome::PlainSuccess));
    assert!(h.usage_repo.entries().is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_submissions_yield_one_winner() -> Result<(), Error> {
    let h = harness();
    h.code_repo.insert_row(plain_code("ABCDEF1234", 1));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let svc = h.redemption.clone();
            tokio::spawn(async move { svc.redeem("ABCDEF1234", Uuid::new_v4()).await })
        })
        .collect();

    let mut successes = 0;
    let mut already = 0;
    for res in join_all(tasks).await {
        match res.expect("task panicked")? {
            RedemptionOutcome::PlainSuccess => successes += 1,
            RedemptionOutcome::AlreadyClaimed => already += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(already, 7);
    Ok(())
}

// ---------------------------------------------------------------
// Failure-path doubles
// ---------------------------------------------------------------

/// A code store whose conditional update always reports zero rows while the
/// row stays unclaimed.
struct BrokenClaimRepository {
    inner: MemoryCodeRepository,
}

#[async_trait]
impl CodeRepository for BrokenClaimRepository {
    async fn insert_batch(&self, codes: &[Code]) -> Result<u64, Error> {
        self.inner.insert_batch(codes).await
    }
    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<Code>, Error> {
        self.inner.get_by_canonical(canonical_value).await
    }
    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<Code>, Error> {
        self.inner.get_by_id(code_id).await
    }
    async fn claim(&self, _code_id: Uuid, _user_id: Uuid, _at: DateTime<Utc>) -> Result<u64, Error> {
        Ok(0)
    }
    async fn count_claimed_by(&self, user_id: Uuid) -> Result<i64, Error> {
        self.inner.count_claimed_by(user_id).await
    }
    async fn list_active_values(&self) -> Result<Vec<String>, Error> {
        self.inner.list_active_values().await
    }
    async fn max_seq(&self) -> Result<i64, Error> {
        self.inner.max_seq().await
    }
    async fn count_active(&self) -> Result<i64, Error> {
        self.inner.count_active().await
    }
    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error> {
        self.inner.soft_delete_all(at).await
    }
}

#[tokio::test]
async fn zero_row_claim_with_unclaimed_reread_is_fatal() {
    let broken = Arc::new(BrokenClaimRepository {
        inner: MemoryCodeRepository::new(),
    });
    broken.inner.insert_row(plain_code("ABCDEF1234", 1));

    let prize_service = Arc::new(PrizeService::new(Arc::new(MemoryPrizeRepository::new())));
    let svc = RedemptionService::new(
        broken,
        Arc::new(MemoryWinnerCodeRepository::new()),
        Arc::new(MemoryUsageLogRepository::new()),
        Arc::new(MemoryUserRepository::new()),
        Arc::new(MemorySettingsRepository::new()),
        prize_service,
    );

    let res = svc.redeem("ABCDEF1234", Uuid::new_v4()).await;
    match res {
        Err(Error::Consistency(_)) => {}
        other => panic!("expected consistency violation, got {:?}", other),
    }
}

/// A prize catalog that is down entirely.
struct UnavailablePrizeRepository;

#[async_trait]
impl PrizeRepository for UnavailablePrizeRepository {
    async fn create(&self, _prize: &Prize) -> Result<(), Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
    async fn get_by_id(&self, _prize_id: Uuid) -> Result<Option<Prize>, Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
    async fn get_by_tier(&self, _tier: PrizeTier) -> Result<Option<Prize>, Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
    async fn list_active(&self) -> Result<Vec<Prize>, Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
    async fn increment_claimed(&self, _prize_id: Uuid) -> Result<(), Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
    async fn add_issued(&self, _prize_id: Uuid, _n: i64) -> Result<(), Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
    async fn max_seq(&self) -> Result<i64, Error> {
        Err(Error::Parse("prize catalog unavailable".to_string()))
    }
}

#[tokio::test]
async fn prize_resolution_failure_degrades_to_plain_success() -> Result<(), Error> {
    let winner_repo = Arc::new(MemoryWinnerCodeRepository::new());
    let now = Utc::now();
    winner_repo.insert_row(WinnerCode {
        code_id: Uuid::new_v4(),
        seq: 1,
        canonical_value: "GHIJKL5678".to_string(),
        display_value: "GHIJKL-5678".to_string(),
        tier: PrizeTier::Premium,
        prize_id: Uuid::new_v4(),
        claimed: false,
        claimed_at: None,
        claimed_by: None,
        month: None,
        created_at: now,
        deleted_at: None,
    });

    let prize_service = Arc::new(PrizeService::new(Arc::new(UnavailablePrizeRepository)));
    let winner_repo_for_check = winner_repo.clone();
    let svc = RedemptionService::new(
        Arc::new(MemoryCodeRepository::new()),
        winner_repo,
        Arc::new(MemoryUsageLogRepository::new()),
        Arc::new(MemoryUserRepository::new()),
        Arc::new(MemorySettingsRepository::new()),
        prize_service,
    );

    let outcome = svc.redeem("GHIJKL5678", Uuid::new_v4()).await?;
    assert!(matches!(outcome, RedemptionOutcome::PlainSuccess));

    // the claim itself stands even though the prize could not be resolved
    let row = winner_repo_for_check
        .get_by_canonical("GHIJKL5678")
        .await?
        .unwrap();
    assert!(row.claimed);
    Ok(())
}
