use async_trait::async_trait;
use chrono::Utc;
use sqlx::Postgres;
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::ActivityLog;

use crate::db::traits::{ActivityLogStore, NewActivity};

use super::PostgresStore;

#[async_trait]
impl ActivityLogStore for PostgresStore {
    async fn record_activity(&self, new: NewActivity) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (user_id, organization_id, team_id, action, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(new.user_id)
        .bind(new.organization_id)
        .bind(new.team_id)
        .bind(&new.action)
        .bind(&new.details)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_activity(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let entries = sqlx::query_as::<Postgres, ActivityLog>(
            r#"
            SELECT id, user_id, organization_id, team_id, action, details, created_at
            FROM activity_log
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
