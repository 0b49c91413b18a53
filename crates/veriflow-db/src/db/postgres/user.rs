use async_trait::async_trait;
use chrono::Utc;
use sqlx::Postgres;
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::User;

use crate::db::traits::{NewUser, UserStore};

use super::PostgresStore;

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, email, first_name, last_name, created_at, updated_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, email, first_name, last_name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            SELECT id, email, first_name, last_name, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
