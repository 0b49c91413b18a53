//! Access policy: the action-to-minimum-level mapping consulted by the
//! access decision engine.

use serde::{Deserialize, Serialize};

use crate::models::PermissionLevel;

/// Action a caller wants to perform on a workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    /// Read workflow data and results
    Read,
    /// Mutate status/results, trigger processing stages
    Write,
    /// Share, revoke shares, delete
    Administer,
}

/// Maps each action to the minimum permission level that allows it.
/// Ownership bypasses the policy entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub read: PermissionLevel,
    pub write: PermissionLevel,
    pub administer: PermissionLevel,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            read: PermissionLevel::View,
            write: PermissionLevel::Edit,
            administer: PermissionLevel::Admin,
        }
    }
}

impl AccessPolicy {
    /// Minimum level required for an action under this policy.
    pub fn required_level(&self, action: AccessAction) -> PermissionLevel {
        match action {
            AccessAction::Read => self.read,
            AccessAction::Write => self.write,
            AccessAction::Administer => self.administer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_thresholds() {
        let policy = AccessPolicy::default();
        assert_eq!(policy.required_level(AccessAction::Read), PermissionLevel::View);
        assert_eq!(policy.required_level(AccessAction::Write), PermissionLevel::Edit);
        assert_eq!(
            policy.required_level(AccessAction::Administer),
            PermissionLevel::Admin
        );
    }

    #[test]
    fn test_higher_level_satisfies_lower_requirement() {
        let policy = AccessPolicy::default();
        assert!(PermissionLevel::Edit >= policy.required_level(AccessAction::Read));
        assert!(PermissionLevel::Admin >= policy.required_level(AccessAction::Write));
        assert!(PermissionLevel::View < policy.required_level(AccessAction::Write));
    }
}
