use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{
    Invitation, InvitationStatus, InviteTarget, OrganizationMembership, TeamMembership,
};

use crate::db::traits::{InvitationStore, MembershipRecord, NewInvitation, NewMembership};

use super::PostgresStore;

/// Raw invitation row: the target is stored as two nullable columns and
/// decoded into the `InviteTarget` union here, at the store boundary.
#[derive(FromRow)]
struct InvitationRow {
    id: Uuid,
    organization_id: Option<Uuid>,
    team_id: Option<Uuid>,
    email: String,
    role: String,
    token: String,
    invited_by: Uuid,
    status: InvitationStatus,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = AppError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        let target = match (row.organization_id, row.team_id) {
            (Some(org), None) => InviteTarget::Organization(org),
            (None, Some(team)) => InviteTarget::Team(team),
            _ => {
                return Err(AppError::InvalidTarget(format!(
                    "invitation {} does not reference exactly one of organization or team",
                    row.id
                )))
            }
        };
        Ok(Invitation {
            id: row.id,
            target,
            email: row.email,
            role: row.role,
            token: row.token,
            invited_by: row.invited_by,
            status: row.status,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

const INVITATION_COLUMNS: &str =
    "id, organization_id, team_id, email, role, token, invited_by, status, expires_at, created_at";

#[async_trait]
impl InvitationStore for PostgresStore {
    async fn create_invitation(&self, new: NewInvitation) -> Result<Invitation, AppError> {
        let row = sqlx::query_as::<Postgres, InvitationRow>(&format!(
            r#"
            INSERT INTO invitations
                (organization_id, team_id, email, role, token, invited_by, status, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING {INVITATION_COLUMNS}
            "#,
        ))
        .bind(new.target.organization_id())
        .bind(new.target.team_id())
        .bind(&new.email)
        .bind(&new.role)
        .bind(&new.token)
        .bind(new.invited_by)
        .bind(new.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        let row = sqlx::query_as::<Postgres, InvitationRow>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = $1",
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Invitation::try_from).transpose()
    }

    async fn mark_invitation_expired(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'expired' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("pending invitation not found".to_string()));
        }
        Ok(())
    }

    async fn accept_invitation(
        &self,
        id: Uuid,
        membership: NewMembership,
    ) -> Result<MembershipRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        // Guard on pending so a concurrent respond cannot double-resolve.
        let updated = sqlx::query(
            "UPDATE invitations SET status = 'accepted' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::AlreadyResolved(
                "invitation is no longer pending".to_string(),
            ));
        }

        let now = Utc::now();
        let record = match membership {
            NewMembership::Organization {
                organization_id,
                user_id,
                role,
            } => {
                let m = sqlx::query_as::<Postgres, OrganizationMembership>(
                    r#"
                    INSERT INTO organization_members (organization_id, user_id, role, joined_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, organization_id, user_id, role, joined_at
                    "#,
                )
                .bind(organization_id)
                .bind(user_id)
                .bind(role)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;
                MembershipRecord::Organization(m)
            }
            NewMembership::Team {
                team_id,
                user_id,
                role,
            } => {
                let m = sqlx::query_as::<Postgres, TeamMembership>(
                    r#"
                    INSERT INTO team_members (team_id, user_id, role, joined_at)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, team_id, user_id, role, joined_at
                    "#,
                )
                .bind(team_id)
                .bind(user_id)
                .bind(role)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;
                MembershipRecord::Team(m)
            }
        };

        tx.commit().await?;
        Ok(record)
    }

    async fn decline_invitation(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'declined' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::AlreadyResolved(
                "invitation is no longer pending".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_pending_invitations(
        &self,
        target: InviteTarget,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, AppError> {
        // Lazily-expired rows (stored status still pending, expires_at in
        // the past) are filtered out here rather than swept.
        let rows = sqlx::query_as::<Postgres, InvitationRow>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS} FROM invitations
            WHERE status = 'pending'
              AND expires_at > $1
              AND (organization_id = $2 OR team_id = $3)
            ORDER BY created_at DESC
            "#,
        ))
        .bind(now)
        .bind(target.organization_id())
        .bind(target.team_id())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Invitation::try_from).collect()
    }
}
