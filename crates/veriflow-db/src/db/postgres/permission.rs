use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{
    PermissionLevel, ShareTarget, ShareTargetInput, WorkflowPermission,
};

use crate::db::traits::{NewGrant, PermissionStore};

use super::PostgresStore;

/// Raw grant row: the tri-nullable target columns decode into the
/// `ShareTarget` union here, through the same fallible conversion the
/// services use for caller input.
#[derive(FromRow)]
struct PermissionRow {
    id: Uuid,
    workflow_id: Uuid,
    organization_id: Option<Uuid>,
    team_id: Option<Uuid>,
    user_id: Option<Uuid>,
    permission_level: PermissionLevel,
    granted_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<PermissionRow> for WorkflowPermission {
    type Error = AppError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        let target: ShareTarget = ShareTargetInput {
            organization_id: row.organization_id,
            team_id: row.team_id,
            user_id: row.user_id,
        }
        .try_into()?;
        Ok(WorkflowPermission {
            id: row.id,
            workflow_id: row.workflow_id,
            target,
            permission_level: row.permission_level,
            granted_by: row.granted_by,
            created_at: row.created_at,
        })
    }
}

const PERMISSION_COLUMNS: &str = "id, workflow_id, organization_id, team_id, user_id, \
     permission_level, granted_by, created_at";

#[async_trait]
impl PermissionStore for PostgresStore {
    async fn insert_grant(&self, new: NewGrant) -> Result<WorkflowPermission, AppError> {
        let row = sqlx::query_as::<Postgres, PermissionRow>(&format!(
            r#"
            INSERT INTO workflow_permissions
                (workflow_id, organization_id, team_id, user_id, permission_level, granted_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PERMISSION_COLUMNS}
            "#,
        ))
        .bind(new.workflow_id)
        .bind(new.target.organization_id())
        .bind(new.target.team_id())
        .bind(new.target.user_id())
        .bind(new.permission_level)
        .bind(new.granted_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_grant(&self, id: Uuid) -> Result<Option<WorkflowPermission>, AppError> {
        let row = sqlx::query_as::<Postgres, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM workflow_permissions WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(WorkflowPermission::try_from).transpose()
    }

    async fn revoke_grant(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM workflow_permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("grant not found".to_string()));
        }
        Ok(())
    }

    async fn grants_for_workflow(
        &self,
        workflow_id: Uuid,
    ) -> Result<Vec<WorkflowPermission>, AppError> {
        let rows = sqlx::query_as::<Postgres, PermissionRow>(&format!(
            r#"
            SELECT {PERMISSION_COLUMNS} FROM workflow_permissions
            WHERE workflow_id = $1
            ORDER BY created_at ASC
            "#,
        ))
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(WorkflowPermission::try_from).collect()
    }
}
