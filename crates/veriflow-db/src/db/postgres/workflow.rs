use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::Workflow;

use crate::db::traits::{NewWorkflow, WorkflowStore};

use super::PostgresStore;

const WORKFLOW_COLUMNS: &str = "id, user_id, team_id, name, description, status, results, \
     blockchain_tx_hash, ipfs_hash, blockchain_committed_at, created_at, updated_at";

#[async_trait]
impl WorkflowStore for PostgresStore {
    async fn create_workflow(&self, new: NewWorkflow) -> Result<Workflow, AppError> {
        let now = Utc::now();
        let workflow = sqlx::query_as::<Postgres, Workflow>(&format!(
            r#"
            INSERT INTO workflows (user_id, team_id, name, description, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {WORKFLOW_COLUMNS}
            "#,
        ))
        .bind(new.user_id)
        .bind(new.team_id)
        .bind(&new.name)
        .bind(new.description.as_deref())
        .bind(Workflow::INITIAL_STATUS)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(workflow)
    }

    async fn find_workflow(&self, id: Uuid) -> Result<Option<Workflow>, AppError> {
        let workflow = sqlx::query_as::<Postgres, Workflow>(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(workflow)
    }

    async fn list_workflows_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, AppError> {
        let workflows = sqlx::query_as::<Postgres, Workflow>(&format!(
            r#"
            SELECT {WORKFLOW_COLUMNS} FROM workflows
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(workflows)
    }

    async fn update_workflow_details(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workflow, AppError> {
        let workflow = sqlx::query_as::<Postgres, Workflow>(&format!(
            r#"
            UPDATE workflows
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            RETURNING {WORKFLOW_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        workflow.ok_or_else(|| AppError::NotFound("workflow not found".to_string()))
    }

    async fn update_workflow_status(
        &self,
        id: Uuid,
        status: &str,
        results: Option<serde_json::Value>,
    ) -> Result<Workflow, AppError> {
        let workflow = sqlx::query_as::<Postgres, Workflow>(&format!(
            r#"
            UPDATE workflows
            SET status = $2, results = COALESCE($3, results), updated_at = $4
            WHERE id = $1
            RETURNING {WORKFLOW_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .bind(results)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        workflow.ok_or_else(|| AppError::NotFound("workflow not found".to_string()))
    }

    async fn set_workflow_anchor(
        &self,
        id: Uuid,
        tx_hash: &str,
        ipfs_hash: &str,
        committed_at: DateTime<Utc>,
    ) -> Result<Workflow, AppError> {
        // Anchor fields are write-once: the conditional update loses the
        // race cleanly if a commit already landed.
        let workflow = sqlx::query_as::<Postgres, Workflow>(&format!(
            r#"
            UPDATE workflows
            SET blockchain_tx_hash = $2, ipfs_hash = $3, blockchain_committed_at = $4,
                updated_at = $5
            WHERE id = $1 AND blockchain_committed_at IS NULL
            RETURNING {WORKFLOW_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(tx_hash)
        .bind(ipfs_hash)
        .bind(committed_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match workflow {
            Some(w) => Ok(w),
            None => match self.find_workflow(id).await? {
                Some(_) => Err(AppError::Conflict(
                    "workflow already has a blockchain commit recorded".to_string(),
                )),
                None => Err(AppError::NotFound("workflow not found".to_string())),
            },
        }
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Grants first, then the workflow row, so no dangling references
        // survive a partial failure.
        sqlx::query("DELETE FROM workflow_permissions WHERE workflow_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM workflows WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("workflow not found".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }
}
