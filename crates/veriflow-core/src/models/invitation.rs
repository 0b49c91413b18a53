//! Invitation entities for extending membership by e-mail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an invitation grants membership to. The store keeps two nullable
/// columns; rows are decoded into this union at the store boundary so
/// "neither or both set" is unrepresentable past that point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum InviteTarget {
    Organization(Uuid),
    Team(Uuid),
}

impl InviteTarget {
    pub fn organization_id(&self) -> Option<Uuid> {
        match self {
            InviteTarget::Organization(id) => Some(*id),
            InviteTarget::Team(_) => None,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            InviteTarget::Organization(_) => None,
            InviteTarget::Team(id) => Some(*id),
        }
    }
}

/// Invitation lifecycle status. Terminal statuses (accepted, declined,
/// expired) are never mutated again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "invitation_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    /// Accepted, declined, and expired are terminal; only pending may move.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

/// A time-bounded invitation to join an organization or team.
///
/// The token is a 128-bit random credential, unique across all invitations
/// (store constraint). Expiry is lazy: stored status may still read
/// `pending` past `expires_at`, and is only corrected when the row is next
/// touched by a respond call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub target: InviteTarget,
    pub email: String,
    pub role: String,
    pub token: String,
    pub invited_by: Uuid,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    /// True once `now` is past `expires_at`, regardless of stored status.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_is_clock_based_not_status_based() {
        let inv = Invitation {
            id: Uuid::new_v4(),
            target: InviteTarget::Organization(Uuid::new_v4()),
            email: "b@example.com".to_string(),
            role: "member".to_string(),
            token: "deadbeef".to_string(),
            invited_by: Uuid::new_v4(),
            status: InvitationStatus::Pending,
            expires_at: Utc::now() - Duration::hours(1),
            created_at: Utc::now() - Duration::days(8),
        };
        assert!(inv.is_expired(Utc::now()));
        assert!(!inv.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!InvitationStatus::Pending.is_terminal());
        assert!(InvitationStatus::Accepted.is_terminal());
        assert!(InvitationStatus::Declined.is_terminal());
        assert!(InvitationStatus::Expired.is_terminal());
    }

    #[test]
    fn test_invite_target_accessors() {
        let org = Uuid::new_v4();
        let team = Uuid::new_v4();
        assert_eq!(InviteTarget::Organization(org).organization_id(), Some(org));
        assert_eq!(InviteTarget::Organization(org).team_id(), None);
        assert_eq!(InviteTarget::Team(team).team_id(), Some(team));
        assert_eq!(InviteTarget::Team(team).organization_id(), None);
    }
}
