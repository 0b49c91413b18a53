//! Store traits: the record-store contract the services depend on.
//!
//! Every operation needs only per-row atomicity from the backing store,
//! with two exceptions that must span rows in one transaction:
//! invitation accept (status flip + membership insert) and workflow
//! deletion (grants first, then the workflow row).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{
    ActivityLog, Invitation, InviteTarget, OrgRole, Organization, OrganizationMembership,
    PermissionLevel, ShareTarget, Team, TeamMembership, TeamRole, User, Workflow,
    WorkflowPermission,
};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub description: String,
    pub domain: String,
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub organization_id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub target: InviteTarget,
    pub email: String,
    pub role: String,
    pub token: String,
    pub invited_by: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWorkflow {
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewGrant {
    pub workflow_id: Uuid,
    pub target: ShareTarget,
    pub permission_level: PermissionLevel,
    pub granted_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub action: String,
    pub details: String,
}

/// Membership to create when an invitation is accepted.
#[derive(Debug, Clone)]
pub enum NewMembership {
    Organization {
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    },
    Team {
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    },
}

/// Membership row created by accepting an invitation.
#[derive(Debug, Clone)]
pub enum MembershipRecord {
    Organization(OrganizationMembership),
    Team(TeamMembership),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Creates the organization and inserts the creator as `admin` in the
    /// same transaction.
    async fn create_organization(
        &self,
        new: NewOrganization,
        creator: Uuid,
    ) -> Result<Organization, AppError>;
    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError>;

    /// Fails with `NotFound` if the organization is absent.
    async fn update_organization(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
        domain: &str,
    ) -> Result<Organization, AppError>;

    /// Deletes the organization together with its teams, memberships,
    /// invitations, and grants in one transaction. Workflows attached to
    /// its teams become team-less; activity entries keep only their user
    /// reference. Fails with `NotFound` if the organization is absent.
    async fn delete_organization(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn create_team(&self, new: NewTeam) -> Result<Team, AppError>;
    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, AppError>;
    async fn list_teams_for_org(&self, organization_id: Uuid) -> Result<Vec<Team>, AppError>;

    /// Fails with `NotFound` if the team is absent.
    async fn update_team(&self, id: Uuid, name: &str, description: &str)
        -> Result<Team, AppError>;

    /// Deletes the team together with its memberships, invitations, and
    /// grants in one transaction; workflows attached to it become
    /// team-less. Fails with `NotFound` if the team is absent.
    async fn delete_team(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Fails with `Conflict` if the (organization, user) pair already exists.
    async fn add_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> Result<OrganizationMembership, AppError>;

    /// Fails with `NotFound` if no such membership. Does not cascade to
    /// team memberships or grants; access is recomputed live.
    async fn remove_org_member(&self, organization_id: Uuid, user_id: Uuid)
        -> Result<(), AppError>;

    async fn org_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, AppError>;

    /// Current roster of an organization.
    async fn list_org_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMembership>, AppError>;

    /// Fails with `Conflict` if the (team, user) pair already exists.
    async fn add_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<TeamMembership, AppError>;

    /// Fails with `NotFound` if no such membership.
    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), AppError>;

    async fn team_role(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamRole>, AppError>;

    /// Organizations the user currently belongs to.
    async fn organizations_of(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError>;

    /// Teams the user currently belongs to.
    async fn teams_of(&self, user_id: Uuid) -> Result<Vec<Team>, AppError>;

    /// The user's team memberships, ordered by joined_at then team id so
    /// first-match resolution is deterministic within one snapshot.
    async fn team_memberships_of(&self, user_id: Uuid) -> Result<Vec<TeamMembership>, AppError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Token uniqueness is a store constraint; a collision surfaces as
    /// `Conflict` and is never retried here.
    async fn create_invitation(&self, new: NewInvitation) -> Result<Invitation, AppError>;

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError>;

    /// Lazy expiry correction: force status to `expired`.
    async fn mark_invitation_expired(&self, id: Uuid) -> Result<(), AppError>;

    /// Atomically marks the invitation accepted and creates the membership
    /// row. On any failure neither side is applied.
    async fn accept_invitation(
        &self,
        id: Uuid,
        membership: NewMembership,
    ) -> Result<MembershipRecord, AppError>;

    async fn decline_invitation(&self, id: Uuid) -> Result<(), AppError>;

    /// Pending invitations for a target, excluding rows past `now` even
    /// when their stored status still reads pending.
    async fn list_pending_invitations(
        &self,
        target: InviteTarget,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, AppError>;
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn create_workflow(&self, new: NewWorkflow) -> Result<Workflow, AppError>;
    async fn find_workflow(&self, id: Uuid) -> Result<Option<Workflow>, AppError>;
    async fn list_workflows_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, AppError>;

    /// Rename and re-describe. Fails with `NotFound` if the workflow is
    /// absent.
    async fn update_workflow_details(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workflow, AppError>;

    /// Fails with `NotFound` if the workflow is absent.
    async fn update_workflow_status(
        &self,
        id: Uuid,
        status: &str,
        results: Option<serde_json::Value>,
    ) -> Result<Workflow, AppError>;

    /// Write-once anchor fields. Fails with `Conflict` if a commit was
    /// already recorded, `NotFound` if the workflow is absent.
    async fn set_workflow_anchor(
        &self,
        id: Uuid,
        tx_hash: &str,
        ipfs_hash: &str,
        committed_at: DateTime<Utc>,
    ) -> Result<Workflow, AppError>;

    /// Deletes dependent grants and then the workflow row in a single
    /// transaction. Fails with `NotFound` if the workflow is absent.
    async fn delete_workflow(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// No dedup: repeated grants to the same target add rows.
    async fn insert_grant(&self, new: NewGrant) -> Result<WorkflowPermission, AppError>;

    async fn find_grant(&self, id: Uuid) -> Result<Option<WorkflowPermission>, AppError>;

    /// Fails with `NotFound` if the grant is absent.
    async fn revoke_grant(&self, id: Uuid) -> Result<(), AppError>;

    async fn grants_for_workflow(
        &self,
        workflow_id: Uuid,
    ) -> Result<Vec<WorkflowPermission>, AppError>;
}

#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn record_activity(&self, new: NewActivity) -> Result<(), AppError>;
    async fn recent_activity(&self, user_id: Uuid, limit: i64)
        -> Result<Vec<ActivityLog>, AppError>;
}

/// Everything the services need from one backing store.
pub trait Store:
    UserStore
    + OrganizationStore
    + TeamStore
    + MembershipStore
    + InvitationStore
    + WorkflowStore
    + PermissionStore
    + ActivityLogStore
{
}

impl<T> Store for T where
    T: UserStore
        + OrganizationStore
        + TeamStore
        + MembershipStore
        + InvitationStore
        + WorkflowStore
        + PermissionStore
        + ActivityLogStore
{
}
