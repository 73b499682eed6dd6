// File: promobot-core/src/repositories/postgres/usage_log.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::usage::UsageLogEntry;
use promobot_common::traits::repository_traits::UsageLogRepository;

pub struct PostgresUsageLogRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresUsageLogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_entry(r: &PgRow) -> Result<UsageLogEntry, Error> {
        Ok(UsageLogEntry {
            entry_id: r.try_get("entry_id")?,
            user_id: r.try_get("user_id")?,
            submitted_text: r.try_get("submitted_text")?,
            matched_code_id: r.try_get("matched_code_id")?,
            matched_winner: r.try_get("matched_winner")?,
            created_at: r.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl UsageLogRepository for PostgresUsageLogRepository {
    async fn insert(&self, entry: &UsageLogEntry) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO usage_log (
                entry_id,
                user_id,
                submitted_text,
                matched_code_id,
                matched_winner,
                created_at
            )
            VALUES ($1,$2,$3,$4,$5,$6)
            "#,
        )
            .bind(entry.entry_id)
            .bind(entry.user_id)
            .bind(&entry.submitted_text)
            .bind(entry.matched_code_id)
            .bind(entry.matched_winner)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM usage_log WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<UsageLogEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                entry_id,
                user_id,
                submitted_text,
                matched_code_id,
                matched_winner,
                created_at
            FROM usage_log
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut list = Vec::new();
        for r in rows {
            list.push(Self::row_to_entry(&r)?);
        }
        Ok(list)
    }
}
