use async_trait::async_trait;
use chrono::Utc;
use sqlx::Postgres;
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{
    OrgRole, Organization, OrganizationMembership, Team, TeamMembership, TeamRole,
};

use crate::db::traits::MembershipStore;

use super::PostgresStore;

#[async_trait]
impl MembershipStore for PostgresStore {
    async fn add_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> Result<OrganizationMembership, AppError> {
        // Unique (organization_id, user_id) violation surfaces as Conflict
        // through the AppError conversion.
        let membership = sqlx::query_as::<Postgres, OrganizationMembership>(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, user_id, role, joined_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn remove_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "organization membership not found".to_string(),
            ));
        }
        Ok(())
    }

    async fn org_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, AppError> {
        let role = sqlx::query_scalar::<Postgres, OrgRole>(
            r#"
            SELECT role FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn list_org_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMembership>, AppError> {
        let members = sqlx::query_as::<Postgres, OrganizationMembership>(
            r#"
            SELECT id, organization_id, user_id, role, joined_at
            FROM organization_members
            WHERE organization_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn add_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<TeamMembership, AppError> {
        let membership = sqlx::query_as::<Postgres, TeamMembership>(
            r#"
            INSERT INTO team_members (team_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, team_id, user_id, role, joined_at
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM team_members
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("team membership not found".to_string()));
        }
        Ok(())
    }

    async fn team_role(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamRole>, AppError> {
        let role = sqlx::query_scalar::<Postgres, TeamRole>(
            r#"
            SELECT role FROM team_members
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn organizations_of(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        let orgs = sqlx::query_as::<Postgres, Organization>(
            r#"
            SELECT o.id, o.name, o.description, o.domain, o.plan, o.created_at, o.updated_at
            FROM organizations o
            JOIN organization_members om ON om.organization_id = o.id
            WHERE om.user_id = $1
            ORDER BY om.joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orgs)
    }

    async fn teams_of(&self, user_id: Uuid) -> Result<Vec<Team>, AppError> {
        let teams = sqlx::query_as::<Postgres, Team>(
            r#"
            SELECT t.id, t.organization_id, t.name, t.description, t.created_at, t.updated_at
            FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.user_id = $1
            ORDER BY tm.joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(teams)
    }

    async fn team_memberships_of(&self, user_id: Uuid) -> Result<Vec<TeamMembership>, AppError> {
        let memberships = sqlx::query_as::<Postgres, TeamMembership>(
            r#"
            SELECT id, team_id, user_id, role, joined_at
            FROM team_members
            WHERE user_id = $1
            ORDER BY joined_at ASC, team_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(memberships)
    }
}
