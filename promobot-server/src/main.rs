use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use promobot_common::models::prize::PrizeTier;
use promobot_common::models::user::User;
use promobot_common::traits::repository_traits::{
    CodeRepository, SettingsRepository, UserRepository, WinnerCodeRepository,
};
use promobot_core::repositories::postgres::{
    PostgresCodeRepository, PostgresPrizeRepository, PostgresSettingsRepository,
    PostgresUsageLogRepository, PostgresUserRepository, PostgresWinnerCodeRepository,
};
use promobot_core::services::{
    IngestTarget, IngestionService, PrizeService, RedemptionOutcome, RedemptionService,
};
use promobot_core::{Database, Error};

#[derive(Parser, Debug, Clone)]
#[command(name = "promobot")]
#[command(author, version, about = "Promobot - promo-code redemption campaign service")]
struct Args {
    /// Postgres connection URL. Falls back to DATABASE_URL, then a local
    /// default.
    #[arg(long)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Bulk-load codes from a text/CSV file into a store.
    Ingest {
        /// Path to the uploaded file (one code per line, or separated cells).
        file: PathBuf,

        /// Load into the winner store under this tier
        /// (premium|standard|economy|symbolic) instead of plain codes.
        #[arg(long)]
        tier: Option<String>,

        /// Campaign month tag stamped on every new row, e.g. "2026-06".
        #[arg(long)]
        month: Option<String>,
    },

    /// Submit one code on behalf of a participant.
    Redeem {
        /// Participant username; registered on first use.
        #[arg(long)]
        user: String,

        /// The code text exactly as submitted.
        code: String,
    },

    /// Soft-delete every live code in a store ("codes" or "winners").
    Clear { store: String },

    /// Show store and prize-catalog counters.
    Stats,

    /// Set a runtime setting, e.g. `set code_limit_per_user 3`.
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let db_url = args
        .db_url
        .clone()
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "postgres://promo@localhost:5432/promobot".to_string());

    let db = Database::new(&db_url).await?;
    db.migrate().await?;

    let code_repo = Arc::new(PostgresCodeRepository::new(db.pool().clone()));
    let winner_repo = Arc::new(PostgresWinnerCodeRepository::new(db.pool().clone()));
    let prize_repo = Arc::new(PostgresPrizeRepository::new(db.pool().clone()));
    let usage_repo = Arc::new(PostgresUsageLogRepository::new(db.pool().clone()));
    let user_repo = Arc::new(PostgresUserRepository::new(db.pool().clone()));
    let settings_repo = Arc::new(PostgresSettingsRepository::new(db.pool().clone()));

    let prize_service = Arc::new(PrizeService::new(prize_repo.clone()));
    let redemption_service = RedemptionService::new(
        code_repo.clone(),
        winner_repo.clone(),
        usage_repo.clone(),
        user_repo.clone(),
        settings_repo.clone(),
        prize_service.clone(),
    );
    let ingestion_service = IngestionService::new(
        code_repo.clone(),
        winner_repo.clone(),
        prize_service.clone(),
    );

    match args.command {
        Command::Ingest { file, tier, month } => {
            let target = match tier.as_deref() {
                Some(t) => IngestTarget::Winners {
                    tier: PrizeTier::from_str(t).map_err(Error::Parse)?,
                },
                None => IngestTarget::Codes { prize_id: None },
            };
            let summary = ingestion_service
                .ingest_file(&file, target, month.as_deref())
                .await?;
            println!(
                "Loaded: {}\nDuplicates: {}\nTotal in store: {}",
                summary.accepted, summary.duplicates, summary.total_after
            );
        }

        Command::Redeem { user, code } => {
            let participant = resolve_user(user_repo.as_ref(), &user).await?;
            let outcome = redemption_service.redeem(&code, participant.user_id).await?;
            match outcome {
                RedemptionOutcome::InvalidFormat => println!("Invalid code format."),
                RedemptionOutcome::LimitReached => println!("Code usage limit reached."),
                RedemptionOutcome::NotFound => println!("Code not recognized."),
                RedemptionOutcome::AlreadyClaimed => println!("Code already used."),
                RedemptionOutcome::PlainSuccess => println!("Code accepted."),
                RedemptionOutcome::PrizeSuccess { tier, prize } => {
                    println!("Code accepted - '{}' ({} tier)", prize.display_name, tier)
                }
            }
        }

        Command::Clear { store } => {
            let removed = match store.as_str() {
                "codes" => ingestion_service.clear_codes().await?,
                "winners" => ingestion_service.clear_winners().await?,
                other => {
                    return Err(Error::Parse(format!(
                        "unknown store '{}', expected 'codes' or 'winners'",
                        other
                    )));
                }
            };
            println!("Soft-deleted {} rows from {}.", removed, store);
        }

        Command::Stats => {
            let codes_active = code_repo.count_active().await?;
            let winners_active = winner_repo.count_active().await?;
            println!("Plain codes (live):  {}", codes_active);
            println!("Winner codes (live): {}", winners_active);
            for prize in prize_service.list().await? {
                println!(
                    "Prize '{}' [{}]: issued {}, claimed {}",
                    prize.display_name, prize.tier, prize.total_issued, prize.total_claimed
                );
            }
        }

        Command::Set { key, value } => {
            settings_repo.set_value(&key, &value).await?;
            println!("{} = {}", key, value);
        }
    }

    Ok(())
}

/// Look the participant up by username, registering them on first contact.
async fn resolve_user(user_repo: &dyn UserRepository, username: &str) -> Result<User, Error> {
    if let Some(existing) = user_repo.get_by_username(username).await? {
        return Ok(existing);
    }
    let now = Utc::now();
    let user = User {
        user_id: Uuid::new_v4(),
        global_username: Some(username.to_string()),
        created_at: now,
        last_seen: now,
        is_active: true,
    };
    user_repo.create(&user).await?;
    info!("Registered new participant '{}'", username);
    Ok(user)
}
