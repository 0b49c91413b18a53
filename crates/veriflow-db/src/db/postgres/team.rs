use async_trait::async_trait;
use chrono::Utc;
use sqlx::Postgres;
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::Team;

use crate::db::traits::{NewTeam, TeamStore};

use super::PostgresStore;

#[async_trait]
impl TeamStore for PostgresStore {
    async fn create_team(&self, new: NewTeam) -> Result<Team, AppError> {
        let now = Utc::now();
        let team = sqlx::query_as::<Postgres, Team>(
            r#"
            INSERT INTO teams (organization_id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, organization_id, name, description, created_at, updated_at
            "#,
        )
        .bind(new.organization_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, AppError> {
        let team = sqlx::query_as::<Postgres, Team>(
            r#"
            SELECT id, organization_id, name, description, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(team)
    }

    async fn list_teams_for_org(&self, organization_id: Uuid) -> Result<Vec<Team>, AppError> {
        let teams = sqlx::query_as::<Postgres, Team>(
            r#"
            SELECT id, organization_id, name, description, created_at, updated_at
            FROM teams
            WHERE organization_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    async fn update_team(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> Result<Team, AppError> {
        let team = sqlx::query_as::<Postgres, Team>(
            r#"
            UPDATE teams
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, organization_id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        team.ok_or_else(|| AppError::NotFound("team not found".to_string()))
    }

    async fn delete_team(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Dependents first; workflows survive without the team attachment
        // and activity entries keep only the user reference.
        sqlx::query("UPDATE workflows SET team_id = NULL WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM workflow_permissions WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM invitations WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE activity_log SET team_id = NULL WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM team_members WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("team not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }
}
