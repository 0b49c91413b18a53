//! Workflow sharing grants and permission levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Permission level granted on a workflow. Higher implies lower: the `Ord`
/// derive follows declaration order, so `View < Edit < Admin`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "permission_level", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    View,
    Edit,
    Admin,
}

/// Who a grant applies to: exactly one of an organization, a team, or an
/// individual user. The store keeps three nullable columns; decoding goes
/// through [`ShareTargetInput`] so "zero or multiple set" is a conversion
/// error, never a representable grant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum ShareTarget {
    Organization(Uuid),
    Team(Uuid),
    User(Uuid),
}

impl ShareTarget {
    pub fn organization_id(&self) -> Option<Uuid> {
        match self {
            ShareTarget::Organization(id) => Some(*id),
            _ => None,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            ShareTarget::Team(id) => Some(*id),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            ShareTarget::User(id) => Some(*id),
            _ => None,
        }
    }
}

/// Raw share-target input as a front end supplies it: three independently
/// optional references. Converting to [`ShareTarget`] rejects anything but
/// exactly one set reference.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShareTargetInput {
    pub organization_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl TryFrom<ShareTargetInput> for ShareTarget {
    type Error = AppError;

    fn try_from(input: ShareTargetInput) -> Result<Self, Self::Error> {
        match (input.organization_id, input.team_id, input.user_id) {
            (Some(org), None, None) => Ok(ShareTarget::Organization(org)),
            (None, Some(team), None) => Ok(ShareTarget::Team(team)),
            (None, None, Some(user)) => Ok(ShareTarget::User(user)),
            (None, None, None) => Err(AppError::InvalidTarget(
                "share target must reference an organization, team, or user".to_string(),
            )),
            _ => Err(AppError::InvalidTarget(
                "share target must reference exactly one of organization, team, or user"
                    .to_string(),
            )),
        }
    }
}

/// A grant binding a permission level to one sharing target on one
/// workflow. Multiple grants may exist for the same workflow and target;
/// the effective level is the maximum across all applicable grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowPermission {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub target: ShareTarget,
    pub permission_level: PermissionLevel,
    pub granted_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(PermissionLevel::View < PermissionLevel::Edit);
        assert!(PermissionLevel::Edit < PermissionLevel::Admin);
        assert_eq!(
            [PermissionLevel::View, PermissionLevel::Admin, PermissionLevel::Edit]
                .into_iter()
                .max(),
            Some(PermissionLevel::Admin)
        );
    }

    #[test]
    fn test_target_input_requires_exactly_one() {
        let ok: Result<ShareTarget, _> = ShareTargetInput {
            team_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
        .try_into();
        assert!(matches!(ok, Ok(ShareTarget::Team(_))));

        let none: Result<ShareTarget, _> = ShareTargetInput::default().try_into();
        assert!(matches!(none, Err(AppError::InvalidTarget(_))));

        let both: Result<ShareTarget, _> = ShareTargetInput {
            organization_id: Some(Uuid::new_v4()),
            user_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
        .try_into();
        assert!(matches!(both, Err(AppError::InvalidTarget(_))));
    }
}
