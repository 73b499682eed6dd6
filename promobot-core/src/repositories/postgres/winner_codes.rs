// File: promobot-core/src/repositories/postgres/winner_codes.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::code::WinnerCode;
use promobot_common::traits::repository_traits::WinnerCodeRepository;

pub struct PostgresWinnerCodeRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresWinnerCodeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_winner(r: &PgRow) -> Result<WinnerCode, Error> {
        Ok(WinnerCode {
            code_id: r.try_get("code_id")?,
            seq: r.try_get("seq")?,
            canonical_value: r.try_get("canonical_value")?,
            display_value: r.try_get("display_value")?,
            tier: r.try_get("tier")?,
            prize_id: r.try_get("prize_id")?,
            claimed: r.try_get("claimed")?,
            claimed_at: r.try_get("claimed_at")?,
            claimed_by: r.try_get("claimed_by")?,
            month: r.try_get("month")?,
            created_at: r.try_get("created_at")?,
            deleted_at: r.try_get("deleted_at")?,
        })
    }
}

#[async_trait]
impl WinnerCodeRepository for PostgresWinnerCodeRepository {
    async fn insert_batch(&self, codes: &[WinnerCode]) -> Result<u64, Error> {
        if codes.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO winner_codes (
                code_id,
                seq,
                canonical_value,
                display_value,
                tier,
                prize_id,
                claimed,
                claimed_at,
                claimed_by,
                month,
                created_at,
                deleted_at
            )
            "#,
        );
        qb.push_values(codes, |mut b, c| {
            b.push_bind(c.code_id)
                .push_bind(c.seq)
                .push_bind(&c.canonical_value)
                .push_bind(&c.display_value)
                .push_bind(c.tier)
                .push_bind(c.prize_id)
                .push_bind(c.claimed)
                .push_bind(c.claimed_at)
                .push_bind(c.claimed_by)
                .push_bind(&c.month)
                .push_bind(c.created_at)
                .push_bind(c.deleted_at);
        });
        qb.push(" ON CONFLICT (canonical_value) WHERE deleted_at IS NULL DO NOTHING");

        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<WinnerCode>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                code_id,
                seq,
                canonical_value,
                display_value,
                tier,
                prize_id,
                claimed,
                claimed_at,
                claimed_by,
                month,
                created_at,
                deleted_at
            FROM winner_codes
            WHERE canonical_value = $1
              AND deleted_at IS NULL
            "#,
        )
            .bind(canonical_value)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_winner(&r)).transpose()
    }

    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<WinnerCode>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                code_id,
                seq,
                canonical_value,
                display_value,
                tier,
                prize_id,
                claimed,
                claimed_at,
                claimed_by,
                month,
                created_at,
                deleted_at
            FROM winner_codes
            WHERE code_id = $1
            "#,
        )
            .bind(code_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_winner(&r)).transpose()
    }

    async fn claim(&self, code_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, Error> {
        let res = sqlx::query(
            r#"
            UPDATE winner_codes
            SET claimed = TRUE,
                claimed_at = $2,
                claimed_by = $3
            WHERE code_id = $1
              AND claimed = FALSE
              AND deleted_at IS NULL
            "#,
        )
            .bind(code_id)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected())
    }

    async fn count_claimed_by(&self, user_id: Uuid) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM winner_codes
            WHERE claimed_by = $1
              AND claimed = TRUE
              AND deleted_at IS NULL
            "#,
        )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_active_values(&self) -> Result<Vec<String>, Error> {
        let values: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT canonical_value
            FROM winner_codes
            WHERE deleted_at IS NULL
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(values)
    }

    async fn max_seq(&self) -> Result<i64, Error> {
        let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM winner_codes")
            .fetch_one(&self.pool)
            .await?;

        Ok(max)
    }

    async fn count_active(&self) -> Result<i64, Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM winner_codes WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error> {
        let res = sqlx::query(
            r#"
            UPDATE winner_codes
            SET deleted_at = $1
            WHERE deleted_at IS NULL
            "#,
        )
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected())
    }
}
