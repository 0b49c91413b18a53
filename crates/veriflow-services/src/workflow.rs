//! Workflow lifecycle: create, read, advance status, anchor, delete.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{TeamRole, Workflow};
use veriflow_core::policy::AccessAction;
use veriflow_db::{NewActivity, NewWorkflow, Store};

use crate::access::AccessService;

const MAX_NAME_LENGTH: usize = 255;

#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn Store>,
    access: AccessService,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn Store>, access: AccessService) -> Self {
        Self { store, access }
    }

    /// Create a workflow owned by `user_id`.
    ///
    /// The workflow is attached to the user's default team: the first team
    /// membership (ordered by join time, then team id) where the user is
    /// an owner. A user with no owned team gets a personal, team-less
    /// workflow.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workflow, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "workflow name cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "workflow name exceeds {MAX_NAME_LENGTH} characters"
            )));
        }

        let team_id = self
            .store
            .team_memberships_of(user_id)
            .await?
            .into_iter()
            .find(|m| m.role == TeamRole::Owner)
            .map(|m| m.team_id);

        let workflow = self
            .store
            .create_workflow(NewWorkflow {
                user_id,
                team_id,
                name: name.to_string(),
                description: description.map(str::to_string),
            })
            .await?;

        tracing::info!(workflow_id = %workflow.id, user_id = %user_id, "workflow created");
        self.store
            .record_activity(NewActivity {
                user_id,
                organization_id: None,
                team_id,
                action: "workflow.created".to_string(),
                details: format!("created workflow {}", workflow.name),
            })
            .await?;
        Ok(workflow)
    }

    /// Fetch a workflow the acting user may read.
    pub async fn get(&self, workflow_id: Uuid, acting: Uuid) -> Result<Workflow, AppError> {
        self.access
            .require(acting, workflow_id, AccessAction::Read)
            .await?;
        self.store
            .find_workflow(workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound("workflow not found".to_string()))
    }

    /// Workflows owned by the user. Shared-with-me listings go through the
    /// sharing registry instead.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, AppError> {
        self.store.list_workflows_for_user(user_id).await
    }

    /// Rename and re-describe a workflow. Same write gate as status
    /// changes; the description is overwritten with whatever is supplied.
    pub async fn update_details(
        &self,
        workflow_id: Uuid,
        name: &str,
        description: Option<&str>,
        acting: Uuid,
    ) -> Result<Workflow, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "workflow name cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "workflow name exceeds {MAX_NAME_LENGTH} characters"
            )));
        }
        self.access
            .require(acting, workflow_id, AccessAction::Write)
            .await?;

        let workflow = self
            .store
            .update_workflow_details(workflow_id, name, description)
            .await?;
        tracing::info!(workflow_id = %workflow_id, name = %name, "workflow details updated");
        Ok(workflow)
    }

    /// Advance the processing status, optionally replacing stored results.
    pub async fn update_status(
        &self,
        workflow_id: Uuid,
        status: &str,
        results: Option<serde_json::Value>,
        acting: Uuid,
    ) -> Result<Workflow, AppError> {
        if status.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "workflow status cannot be empty".to_string(),
            ));
        }
        self.access
            .require(acting, workflow_id, AccessAction::Write)
            .await?;

        let workflow = self
            .store
            .update_workflow_status(workflow_id, status, results)
            .await?;
        tracing::info!(workflow_id = %workflow_id, status = %status, "workflow status updated");
        Ok(workflow)
    }

    /// Record the blockchain anchor for a workflow. Write-once: a second
    /// commit fails with `Conflict` and leaves the first intact.
    pub async fn commit_anchor(
        &self,
        workflow_id: Uuid,
        tx_hash: &str,
        ipfs_hash: &str,
        committed_at: DateTime<Utc>,
        acting: Uuid,
    ) -> Result<Workflow, AppError> {
        if tx_hash.trim().is_empty() || ipfs_hash.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "anchor hashes cannot be empty".to_string(),
            ));
        }
        self.access
            .require(acting, workflow_id, AccessAction::Write)
            .await?;

        let workflow = self
            .store
            .set_workflow_anchor(workflow_id, tx_hash, ipfs_hash, committed_at)
            .await?;

        tracing::info!(workflow_id = %workflow_id, tx_hash = %tx_hash, "workflow anchored");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: None,
                team_id: workflow.team_id,
                action: "workflow.anchored".to_string(),
                details: format!("anchored workflow {} at {}", workflow_id, committed_at),
            })
            .await?;
        Ok(workflow)
    }

    /// Delete a workflow and every grant on it.
    pub async fn delete(&self, workflow_id: Uuid, acting: Uuid) -> Result<(), AppError> {
        self.access
            .require(acting, workflow_id, AccessAction::Administer)
            .await?;

        self.store.delete_workflow(workflow_id).await?;
        tracing::info!(workflow_id = %workflow_id, "workflow deleted");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: None,
                team_id: None,
                action: "workflow.deleted".to_string(),
                details: format!("deleted workflow {}", workflow_id),
            })
            .await?;
        Ok(())
    }
}
