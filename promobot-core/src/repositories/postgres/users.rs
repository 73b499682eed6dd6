// File: promobot-core/src/repositories/postgres/users.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use promobot_common::error::Error;
use promobot_common::models::user::User;
use promobot_common::traits::repository_traits::UserRepository;

pub struct PostgresUserRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_user(r: &PgRow) -> Result<User, Error> {
        Ok(User {
            user_id: r.try_get("user_id")?,
            global_username: r.try_get("global_username")?,
            created_at: r.try_get("created_at")?,
            last_seen: r.try_get("last_seen")?,
            is_active: r.try_get("is_active")?,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: &User) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, global_username, created_at, last_seen, is_active)
            VALUES ($1,$2,$3,$4,$5)
            "#,
        )
            .bind(user.user_id)
            .bind(&user.global_username)
            .bind(user.created_at)
            .bind(user.last_seen)
            .bind(user.is_active)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT user_id, global_username, created_at, last_seen, is_active
            FROM users
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_user(&r)).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT user_id, global_username, created_at, last_seen, is_active
            FROM users
            WHERE LOWER(global_username) = LOWER($1)
            "#,
        )
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.map(|r| Self::row_to_user(&r)).transpose()
    }

    async fn touch_last_seen(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_seen = $2
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
