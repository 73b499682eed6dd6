// File: promobot-core/src/repositories/postgres/codes.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::code::Code;
use promobot_common::traits::repository_traits::CodeRepository;

pub struct PostgresCodeRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresCodeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_code(r: &PgRow) -> Result<Code, Error> {
        Ok(Code {
            code_id: r.try_get("code_id")?,
            seq: r.try_get("seq")?,
            canonical_value: r.try_get("canonical_value")?,
            display_value: r.try_get("display_value")?,
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
impl CodeRepository for PostgresCodeRepository {
    async fn insert_batch(&self, codes: &[Code]) -> Result<u64, Error> {
        if codes.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO codes (
                code_id,
                seq,
                canonical_value,
                display_value,
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
                .push_bind(c.prize_id)
                .push_bind(c.claimed)
                .push_bind(c.claimed_at)
                .push_bind(c.claimed_by)
                .push_bind(&c.month)
                .push_bind(c.created_at)
                .push_bind(c.deleted_at);
        });
        // The conflict target is the partial unique index on live rows, so a
        // value that only exists soft-deleted can be ingested again.
        qb.push(" ON CONFLICT (canonical_value) WHERE deleted_at IS NULL DO NOTHING");

        let res = qb.build().execute(&self.pool).await?;
        Ok(res.rows_affected())
    }

    async fn get_by_canonical(&self, canonical_value: &str) -> Result<Option<Code>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                code_id,
                seq,
                canonical_value,
                display_value,
                prize_id,
                claimed,
                claimed_at,
                claimed_by,
                month,
                created_at,
                deleted_at
            FROM codes
            WHERE canonical_value = $1
              AND deleted_at IS NULL
            "#,
        )
            .bind(canonical_value)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_code(&r)).transpose()
    }

    async fn get_by_id(&self, code_id: Uuid) -> Result<Option<Code>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                code_id,
                seq,
                canonical_value,
                display_value,
                prize_id,
                claimed,
                claimed_at,
                claimed_by,
                month,
                created_at,
                deleted_at
            FROM codes
            WHERE code_id = $1
            "#,
        )
            .bind(code_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_code(&r)).transpose()
    }

    async fn claim(&self, code_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, Error> {
        // Single conditional update; under concurrent submission of the same
        // code exactly one caller sees rows_affected == 1.
        let res = sqlx::query(
            r#"
            UPDATE codes
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
            FROM codes
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
            FROM codes
            WHERE deleted_at IS NULL
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        Ok(values)
    }

    async fn max_seq(&self) -> Result<i64, Error> {
        // Deliberately includes soft-deleted rows: seq values are never reused.
        let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM codes")
            .fetch_one(&self.pool)
            .await?;

        Ok(max)
    }

    async fn count_active(&self) -> Result<i64, Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM codes WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn soft_delete_all(&self, at: DateTime<Utc>) -> Result<u64, Error> {
        let res = sqlx::query(
            r#"
            UPDATE codes
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
