//! Access decision engine.
//!
//! The single gate every workflow read/write/administer path must pass.
//! Stateless: each verdict is recomputed from current membership and
//! grant rows, so a revoke takes effect on the next check.

use std::sync::Arc;

use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{PermissionLevel, ShareTarget, Workflow};
use veriflow_core::policy::{AccessAction, AccessPolicy};
use veriflow_db::Store;

#[derive(Clone)]
pub struct AccessService {
    store: Arc<dyn Store>,
    policy: AccessPolicy,
}

impl AccessService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            policy: AccessPolicy::default(),
        }
    }

    pub fn with_policy(store: Arc<dyn Store>, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    /// Highest permission level the user holds on the workflow through
    /// grants, or `None` if no applicable grant exists. Ownership is
    /// handled by the callers' short-circuit, not here.
    pub async fn effective_level(
        &self,
        user_id: Uuid,
        workflow: &Workflow,
    ) -> Result<Option<PermissionLevel>, AppError> {
        let grants = self.store.grants_for_workflow(workflow.id).await?;

        let mut effective: Option<PermissionLevel> = None;
        for grant in grants {
            let applies = match grant.target {
                ShareTarget::User(id) => id == user_id,
                ShareTarget::Team(team_id) => {
                    self.store.team_role(team_id, user_id).await?.is_some()
                }
                ShareTarget::Organization(org_id) => {
                    self.store.org_role(org_id, user_id).await?.is_some()
                }
            };
            if applies {
                effective = Some(match effective {
                    Some(level) => level.max(grant.permission_level),
                    None => grant.permission_level,
                });
            }
        }
        Ok(effective)
    }

    /// Decide whether `user_id` may perform `action` on the workflow.
    ///
    /// 1. The owner is allowed unconditionally.
    /// 2. Otherwise the maximum level across user-, team-, and
    ///    organization-scoped grants is compared against the policy
    ///    minimum for the action; an empty grant set denies.
    pub async fn can_access(
        &self,
        user_id: Uuid,
        workflow_id: Uuid,
        action: AccessAction,
    ) -> Result<bool, AppError> {
        let workflow = self
            .store
            .find_workflow(workflow_id)
            .await?
            .ok_or_else(|| AppError::NotFound("workflow not found".to_string()))?;

        if workflow.user_id == user_id {
            return Ok(true);
        }

        let required = self.policy.required_level(action);
        let allowed = self
            .effective_level(user_id, &workflow)
            .await?
            .is_some_and(|level| level >= required);

        if !allowed {
            tracing::debug!(
                user_id = %user_id,
                workflow_id = %workflow_id,
                action = ?action,
                "access denied"
            );
        }
        Ok(allowed)
    }

    /// Gate-style variant: `Forbidden` instead of `false`.
    pub async fn require(
        &self,
        user_id: Uuid,
        workflow_id: Uuid,
        action: AccessAction,
    ) -> Result<(), AppError> {
        if self.can_access(user_id, workflow_id, action).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "user is not allowed to {} this workflow",
                match action {
                    AccessAction::Read => "read",
                    AccessAction::Write => "write",
                    AccessAction::Administer => "administer",
                }
            )))
        }
    }
}
