//! Sharing registry: grant, revoke, and list workflow permissions.

use std::sync::Arc;

use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{PermissionLevel, ShareTarget, ShareTargetInput, WorkflowPermission};
use veriflow_core::policy::AccessAction;
use veriflow_db::{NewActivity, NewGrant, Store};

use crate::access::AccessService;

#[derive(Clone)]
pub struct SharingService {
    store: Arc<dyn Store>,
    access: AccessService,
}

impl SharingService {
    pub fn new(store: Arc<dyn Store>, access: AccessService) -> Self {
        Self { store, access }
    }

    /// Grant a permission level on a workflow to exactly one target.
    ///
    /// The acting user needs administer rights on the workflow (the owner
    /// always has them). The input must name exactly one of an
    /// organization, team, or user, and that entity must exist. Repeated
    /// grants to the same target are kept as separate rows; the decision
    /// engine takes the maximum.
    pub async fn grant(
        &self,
        workflow_id: Uuid,
        target: ShareTargetInput,
        level: PermissionLevel,
        acting: Uuid,
    ) -> Result<WorkflowPermission, AppError> {
        self.access
            .require(acting, workflow_id, AccessAction::Administer)
            .await?;

        let target: ShareTarget = target.try_into()?;
        self.check_target_exists(target).await?;

        let grant = self
            .store
            .insert_grant(NewGrant {
                workflow_id,
                target,
                permission_level: level,
                granted_by: acting,
            })
            .await?;

        tracing::info!(
            workflow_id = %workflow_id,
            grant_id = %grant.id,
            level = ?level,
            "workflow shared"
        );
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: target.organization_id(),
                team_id: target.team_id(),
                action: "workflow.shared".to_string(),
                details: format!("granted {:?} on workflow {}", level, workflow_id),
            })
            .await?;
        Ok(grant)
    }

    /// Revoke a grant by id. Takes effect on the next access check; there
    /// is no notification to the former holder.
    pub async fn revoke(&self, permission_id: Uuid, acting: Uuid) -> Result<(), AppError> {
        let grant = self
            .store
            .find_grant(permission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("grant not found".to_string()))?;

        self.access
            .require(acting, grant.workflow_id, AccessAction::Administer)
            .await?;

        self.store.revoke_grant(permission_id).await?;

        tracing::info!(
            workflow_id = %grant.workflow_id,
            grant_id = %permission_id,
            "workflow grant revoked"
        );
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: grant.target.organization_id(),
                team_id: grant.target.team_id(),
                action: "workflow.unshared".to_string(),
                details: format!("revoked grant {} on workflow {}", permission_id, grant.workflow_id),
            })
            .await?;
        Ok(())
    }

    /// List the grants on a workflow. Anyone who can read the workflow may
    /// see who else it is shared with.
    pub async fn list_grants(
        &self,
        workflow_id: Uuid,
        acting: Uuid,
    ) -> Result<Vec<WorkflowPermission>, AppError> {
        self.access
            .require(acting, workflow_id, AccessAction::Read)
            .await?;
        self.store.grants_for_workflow(workflow_id).await
    }

    async fn check_target_exists(&self, target: ShareTarget) -> Result<(), AppError> {
        match target {
            ShareTarget::Organization(id) => {
                self.store
                    .find_organization(id)
                    .await?
                    .map(|_| ())
                    .ok_or_else(|| AppError::NotFound("organization not found".to_string()))
            }
            ShareTarget::Team(id) => self
                .store
                .find_team(id)
                .await?
                .map(|_| ())
                .ok_or_else(|| AppError::NotFound("team not found".to_string())),
            ShareTarget::User(id) => self
                .store
                .find_user(id)
                .await?
                .map(|_| ())
                .ok_or_else(|| AppError::NotFound("user not found".to_string())),
        }
    }
}
