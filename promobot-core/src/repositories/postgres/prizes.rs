// File: promobot-core/src/repositories/postgres/prizes.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::prize::{Prize, PrizeTier};
use promobot_common::traits::repository_traits::PrizeRepository;

pub struct PostgresPrizeRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresPrizeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_prize(r: &PgRow) -> Result<Prize, Error> {
        Ok(Prize {
            prize_id: r.try_get("prize_id")?,
            seq: r.try_get("seq")?,
            tier: r.try_get("tier")?,
            display_name: r.try_get("display_name")?,
            image_refs: r.try_get("image_refs")?,
            total_issued: r.try_get("total_issued")?,
            total_claimed: r.try_get("total_claimed")?,
            created_at: r.try_get("created_at")?,
            deleted_at: r.try_get("deleted_at")?,
        })
    }
}

#[async_trait]
impl PrizeRepository for PostgresPrizeRepository {
    async fn create(&self, prize: &Prize) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO prizes (
                prize_id,
                seq,
                tier,
                display_name,
                image_refs,
                total_issued,
                total_claimed,
                created_at,
                deleted_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            "#,
        )
            .bind(prize.prize_id)
            .bind(prize.seq)
            .bind(prize.tier)
            .bind(&prize.display_name)
            .bind(&prize.image_refs)
            .bind(prize.total_issued)
            .bind(prize.total_claimed)
            .bind(prize.created_at)
            .bind(prize.deleted_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_by_id(&self, prize_id: Uuid) -> Result<Option<Prize>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                prize_id,
                seq,
                tier,
                display_name,
                image_refs,
                total_issued,
                total_claimed,
                created_at,
                deleted_at
            FROM prizes
            WHERE prize_id = $1
              AND deleted_at IS NULL
            "#,
        )
            .bind(prize_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_prize(&r)).transpose()
    }

    async fn get_by_tier(&self, tier: PrizeTier) -> Result<Option<Prize>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT
                prize_id,
                seq,
                tier,
                display_name,
                image_refs,
                total_issued,
                total_claimed,
                created_at,
                deleted_at
            FROM prizes
            WHERE tier = $1
              AND deleted_at IS NULL
            "#,
        )
            .bind(tier)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_prize(&r)).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Prize>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT
                prize_id,
                seq,
                tier,
                display_name,
                image_refs,
                total_issued,
                total_claimed,
                created_at,
                deleted_at
            FROM prizes
            WHERE deleted_at IS NULL
            ORDER BY seq ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        let mut list = Vec::new();
        for r in rows {
            list.push(Self::row_to_prize(&r)?);
        }
        Ok(list)
    }

    async fn increment_claimed(&self, prize_id: Uuid) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE prizes
            SET total_claimed = total_claimed + 1
            WHERE prize_id = $1
            "#,
        )
            .bind(prize_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn add_issued(&self, prize_id: Uuid, n: i64) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE prizes
            SET total_issued = total_issued + $2
            WHERE prize_id = $1
            "#,
        )
            .bind(prize_id)
            .bind(n)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn max_seq(&self) -> Result<i64, Error> {
        let max: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM prizes")
            .fetch_one(&self.pool)
            .await?;

        Ok(max)
    }
}
