use async_trait::async_trait;
use chrono::Utc;
use sqlx::Postgres;
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{OrgRole, Organization};

use crate::db::traits::{NewOrganization, OrganizationStore};

use super::PostgresStore;

#[async_trait]
impl OrganizationStore for PostgresStore {
    async fn create_organization(
        &self,
        new: NewOrganization,
        creator: Uuid,
    ) -> Result<Organization, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            INSERT INTO organizations (name, description, domain, plan, created_at, updated_at)
            VALUES ($1, $2, $3, 'free', $4, $4)
            RETURNING id, name, description, domain, plan, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.domain)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(org.id)
        .bind(creator)
        .bind(OrgRole::Admin)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(org)
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            SELECT id, name, description, domain, plan, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(org)
    }

    async fn update_organization(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
        domain: &str,
    ) -> Result<Organization, AppError> {
        let org = sqlx::query_as::<Postgres, Organization>(
            r#"
            UPDATE organizations
            SET name = $2, description = $3, domain = $4, updated_at = $5
            WHERE id = $1
            RETURNING id, name, description, domain, plan, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(domain)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        org.ok_or_else(|| AppError::NotFound("organization not found".to_string()))
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Team-scoped dependents first: the org's teams drag their own
        // memberships, invitations, and grants along. Workflows keep their
        // rows but lose the team attachment; activity entries keep only
        // the user reference.
        sqlx::query(
            r#"
            UPDATE workflows SET team_id = NULL
            WHERE team_id IN (SELECT id FROM teams WHERE organization_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            DELETE FROM workflow_permissions
            WHERE organization_id = $1
               OR team_id IN (SELECT id FROM teams WHERE organization_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            DELETE FROM invitations
            WHERE organization_id = $1
               OR team_id IN (SELECT id FROM teams WHERE organization_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE activity_log SET team_id = NULL
            WHERE team_id IN (SELECT id FROM teams WHERE organization_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE activity_log SET organization_id = NULL WHERE organization_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            DELETE FROM team_members
            WHERE team_id IN (SELECT id FROM teams WHERE organization_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM teams WHERE organization_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM organization_members WHERE organization_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("organization not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }
}
