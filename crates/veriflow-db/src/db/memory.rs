//! In-memory store implementing every store trait.
//!
//! Backed by a single mutex-guarded table set, which makes the two
//! multi-row operations (invitation accept, workflow delete) trivially
//! atomic. Used by the service tests and by embedders that want the full
//! sharing model without Postgres.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{
    ActivityLog, Invitation, InvitationStatus, InviteTarget, OrgRole, Organization,
    OrganizationMembership, PlanTier, Team, TeamMembership, TeamRole, User, Workflow,
    WorkflowPermission,
};

use crate::db::traits::{
    ActivityLogStore, InvitationStore, MembershipRecord, MembershipStore, NewActivity, NewGrant,
    NewInvitation, NewMembership, NewOrganization, NewTeam, NewUser, NewWorkflow,
    OrganizationStore, PermissionStore, TeamStore, UserStore, WorkflowStore,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
    teams: HashMap<Uuid, Team>,
    org_members: Vec<OrganizationMembership>,
    team_members: Vec<TeamMembership>,
    invitations: HashMap<Uuid, Invitation>,
    workflows: HashMap<Uuid, Workflow>,
    permissions: Vec<WorkflowPermission>,
    activity: Vec<ActivityLog>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut tables = self.lock();
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(AppError::Conflict(format!(
                "user with email {} already exists",
                new.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn create_organization(
        &self,
        new: NewOrganization,
        creator: Uuid,
    ) -> Result<Organization, AppError> {
        let mut tables = self.lock();
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            domain: new.domain,
            plan: PlanTier::Free,
            created_at: now,
            updated_at: now,
        };
        tables.organizations.insert(org.id, org.clone());
        tables.org_members.push(OrganizationMembership {
            id: Uuid::new_v4(),
            organization_id: org.id,
            user_id: creator,
            role: OrgRole::Admin,
            joined_at: now,
        });
        Ok(org)
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        Ok(self.lock().organizations.get(&id).cloned())
    }

    async fn update_organization(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
        domain: &str,
    ) -> Result<Organization, AppError> {
        let mut tables = self.lock();
        let org = tables
            .organizations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("organization not found".to_string()))?;
        org.name = name.to_string();
        org.description = description.to_string();
        org.domain = domain.to_string();
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn delete_organization(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        if !tables.organizations.contains_key(&id) {
            return Err(AppError::NotFound("organization not found".to_string()));
        }

        let team_ids: Vec<Uuid> = tables
            .teams
            .values()
            .filter(|t| t.organization_id == id)
            .map(|t| t.id)
            .collect();
        for team_id in &team_ids {
            delete_team_dependents(&mut tables, *team_id);
            tables.teams.remove(team_id);
        }

        tables
            .permissions
            .retain(|p| p.target.organization_id() != Some(id));
        tables
            .invitations
            .retain(|_, i| i.target.organization_id() != Some(id));
        for entry in tables.activity.iter_mut() {
            if entry.organization_id == Some(id) {
                entry.organization_id = None;
            }
        }
        tables.org_members.retain(|m| m.organization_id != id);
        tables.organizations.remove(&id);
        Ok(())
    }
}

/// Clears everything referencing a team except the team row itself:
/// memberships, invitations, grants, workflow attachments, activity
/// references.
fn delete_team_dependents(tables: &mut Tables, team_id: Uuid) {
    tables.team_members.retain(|m| m.team_id != team_id);
    tables
        .invitations
        .retain(|_, i| i.target.team_id() != Some(team_id));
    tables
        .permissions
        .retain(|p| p.target.team_id() != Some(team_id));
    for workflow in tables.workflows.values_mut() {
        if workflow.team_id == Some(team_id) {
            workflow.team_id = None;
        }
    }
    for entry in tables.activity.iter_mut() {
        if entry.team_id == Some(team_id) {
            entry.team_id = None;
        }
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn create_team(&self, new: NewTeam) -> Result<Team, AppError> {
        let mut tables = self.lock();
        if !tables.organizations.contains_key(&new.organization_id) {
            return Err(AppError::NotFound("organization not found".to_string()));
        }
        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            name: new.name,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        tables.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, AppError> {
        Ok(self.lock().teams.get(&id).cloned())
    }

    async fn list_teams_for_org(&self, organization_id: Uuid) -> Result<Vec<Team>, AppError> {
        let mut teams: Vec<Team> = self
            .lock()
            .teams
            .values()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.created_at);
        Ok(teams)
    }

    async fn update_team(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
    ) -> Result<Team, AppError> {
        let mut tables = self.lock();
        let team = tables
            .teams
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("team not found".to_string()))?;
        team.name = name.to_string();
        team.description = description.to_string();
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn delete_team(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        if tables.teams.remove(&id).is_none() {
            return Err(AppError::NotFound("team not found".to_string()));
        }
        delete_team_dependents(&mut tables, id);
        Ok(())
    }
}

fn insert_org_membership(
    tables: &mut Tables,
    organization_id: Uuid,
    user_id: Uuid,
    role: OrgRole,
) -> Result<OrganizationMembership, AppError> {
    if tables
        .org_members
        .iter()
        .any(|m| m.organization_id == organization_id && m.user_id == user_id)
    {
        return Err(AppError::Conflict(
            "user is already a member of this organization".to_string(),
        ));
    }
    let membership = OrganizationMembership {
        id: Uuid::new_v4(),
        organization_id,
        user_id,
        role,
        joined_at: Utc::now(),
    };
    tables.org_members.push(membership.clone());
    Ok(membership)
}

fn insert_team_membership(
    tables: &mut Tables,
    team_id: Uuid,
    user_id: Uuid,
    role: TeamRole,
) -> Result<TeamMembership, AppError> {
    if tables
        .team_members
        .iter()
        .any(|m| m.team_id == team_id && m.user_id == user_id)
    {
        return Err(AppError::Conflict(
            "user is already a member of this team".to_string(),
        ));
    }
    let membership = TeamMembership {
        id: Uuid::new_v4(),
        team_id,
        user_id,
        role,
        joined_at: Utc::now(),
    };
    tables.team_members.push(membership.clone());
    Ok(membership)
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn add_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> Result<OrganizationMembership, AppError> {
        let mut tables = self.lock();
        insert_org_membership(&mut tables, organization_id, user_id, role)
    }

    async fn remove_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tables = self.lock();
        let before = tables.org_members.len();
        tables
            .org_members
            .retain(|m| !(m.organization_id == organization_id && m.user_id == user_id));
        if tables.org_members.len() == before {
            return Err(AppError::NotFound(
                "organization membership not found".to_string(),
            ));
        }
        Ok(())
    }

    async fn org_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, AppError> {
        Ok(self
            .lock()
            .org_members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .map(|m| m.role))
    }

    async fn list_org_members(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<OrganizationMembership>, AppError> {
        let mut members: Vec<OrganizationMembership> = self
            .lock()
            .org_members
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn add_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
    ) -> Result<TeamMembership, AppError> {
        let mut tables = self.lock();
        insert_team_membership(&mut tables, team_id, user_id, role)
    }

    async fn remove_team_member(&self, team_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        let before = tables.team_members.len();
        tables
            .team_members
            .retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        if tables.team_members.len() == before {
            return Err(AppError::NotFound("team membership not found".to_string()));
        }
        Ok(())
    }

    async fn team_role(&self, team_id: Uuid, user_id: Uuid) -> Result<Option<TeamRole>, AppError> {
        Ok(self
            .lock()
            .team_members
            .iter()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .map(|m| m.role))
    }

    async fn organizations_of(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        let tables = self.lock();
        let mut memberships: Vec<&OrganizationMembership> = tables
            .org_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .collect();
        memberships.sort_by_key(|m| m.joined_at);
        Ok(memberships
            .iter()
            .filter_map(|m| tables.organizations.get(&m.organization_id).cloned())
            .collect())
    }

    async fn teams_of(&self, user_id: Uuid) -> Result<Vec<Team>, AppError> {
        let tables = self.lock();
        let mut memberships: Vec<&TeamMembership> = tables
            .team_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .collect();
        memberships.sort_by_key(|m| m.joined_at);
        Ok(memberships
            .iter()
            .filter_map(|m| tables.teams.get(&m.team_id).cloned())
            .collect())
    }

    async fn team_memberships_of(&self, user_id: Uuid) -> Result<Vec<TeamMembership>, AppError> {
        let mut memberships: Vec<TeamMembership> = self
            .lock()
            .team_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.team_id.cmp(&b.team_id)));
        Ok(memberships)
    }
}

#[async_trait]
impl InvitationStore for MemoryStore {
    async fn create_invitation(&self, new: NewInvitation) -> Result<Invitation, AppError> {
        let mut tables = self.lock();
        if tables.invitations.values().any(|i| i.token == new.token) {
            return Err(AppError::Conflict("invitation token collision".to_string()));
        }
        let invitation = Invitation {
            id: Uuid::new_v4(),
            target: new.target,
            email: new.email,
            role: new.role,
            token: new.token,
            invited_by: new.invited_by,
            status: InvitationStatus::Pending,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        Ok(self
            .lock()
            .invitations
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn mark_invitation_expired(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        match tables.invitations.get_mut(&id) {
            Some(inv) if inv.status == InvitationStatus::Pending => {
                inv.status = InvitationStatus::Expired;
                Ok(())
            }
            _ => Err(AppError::NotFound("pending invitation not found".to_string())),
        }
    }

    async fn accept_invitation(
        &self,
        id: Uuid,
        membership: NewMembership,
    ) -> Result<MembershipRecord, AppError> {
        // Single lock covers both the status flip and the membership
        // insert; on the Conflict path below nothing has mutated yet.
        let mut tables = self.lock();
        match tables.invitations.get(&id) {
            Some(inv) if inv.status == InvitationStatus::Pending => {}
            Some(_) => {
                return Err(AppError::AlreadyResolved(
                    "invitation is no longer pending".to_string(),
                ))
            }
            None => return Err(AppError::NotFound("invitation not found".to_string())),
        }

        let record = match membership {
            NewMembership::Organization {
                organization_id,
                user_id,
                role,
            } => MembershipRecord::Organization(insert_org_membership(
                &mut tables,
                organization_id,
                user_id,
                role,
            )?),
            NewMembership::Team {
                team_id,
                user_id,
                role,
            } => MembershipRecord::Team(insert_team_membership(
                &mut tables,
                team_id,
                user_id,
                role,
            )?),
        };

        if let Some(inv) = tables.invitations.get_mut(&id) {
            inv.status = InvitationStatus::Accepted;
        }
        Ok(record)
    }

    async fn decline_invitation(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        match tables.invitations.get_mut(&id) {
            Some(inv) if inv.status == InvitationStatus::Pending => {
                inv.status = InvitationStatus::Declined;
                Ok(())
            }
            Some(_) => Err(AppError::AlreadyResolved(
                "invitation is no longer pending".to_string(),
            )),
            None => Err(AppError::NotFound("invitation not found".to_string())),
        }
    }

    async fn list_pending_invitations(
        &self,
        target: InviteTarget,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, AppError> {
        let mut pending: Vec<Invitation> = self
            .lock()
            .invitations
            .values()
            .filter(|i| {
                i.target == target && i.status == InvitationStatus::Pending && i.expires_at > now
            })
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn create_workflow(&self, new: NewWorkflow) -> Result<Workflow, AppError> {
        let mut tables = self.lock();
        let now = Utc::now();
        let workflow = Workflow {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            team_id: new.team_id,
            name: new.name,
            description: new.description,
            status: Workflow::INITIAL_STATUS.to_string(),
            results: None,
            blockchain_tx_hash: None,
            ipfs_hash: None,
            blockchain_committed_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.workflows.insert(workflow.id, workflow.clone());
        Ok(workflow)
    }

    async fn find_workflow(&self, id: Uuid) -> Result<Option<Workflow>, AppError> {
        Ok(self.lock().workflows.get(&id).cloned())
    }

    async fn list_workflows_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, AppError> {
        let mut workflows: Vec<Workflow> = self
            .lock()
            .workflows
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(workflows)
    }

    async fn update_workflow_details(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Workflow, AppError> {
        let mut tables = self.lock();
        let workflow = tables
            .workflows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("workflow not found".to_string()))?;
        workflow.name = name.to_string();
        workflow.description = description.map(str::to_string);
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    async fn update_workflow_status(
        &self,
        id: Uuid,
        status: &str,
        results: Option<serde_json::Value>,
    ) -> Result<Workflow, AppError> {
        let mut tables = self.lock();
        let workflow = tables
            .workflows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("workflow not found".to_string()))?;
        workflow.status = status.to_string();
        if let Some(results) = results {
            workflow.results = Some(results);
        }
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    async fn set_workflow_anchor(
        &self,
        id: Uuid,
        tx_hash: &str,
        ipfs_hash: &str,
        committed_at: DateTime<Utc>,
    ) -> Result<Workflow, AppError> {
        let mut tables = self.lock();
        let workflow = tables
            .workflows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("workflow not found".to_string()))?;
        if workflow.blockchain_committed_at.is_some() {
            return Err(AppError::Conflict(
                "workflow already has a blockchain commit recorded".to_string(),
            ));
        }
        workflow.blockchain_tx_hash = Some(tx_hash.to_string());
        workflow.ipfs_hash = Some(ipfs_hash.to_string());
        workflow.blockchain_committed_at = Some(committed_at);
        workflow.updated_at = Utc::now();
        Ok(workflow.clone())
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        if tables.workflows.remove(&id).is_none() {
            return Err(AppError::NotFound("workflow not found".to_string()));
        }
        tables.permissions.retain(|p| p.workflow_id != id);
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn insert_grant(&self, new: NewGrant) -> Result<WorkflowPermission, AppError> {
        let mut tables = self.lock();
        let grant = WorkflowPermission {
            id: Uuid::new_v4(),
            workflow_id: new.workflow_id,
            target: new.target,
            permission_level: new.permission_level,
            granted_by: new.granted_by,
            created_at: Utc::now(),
        };
        tables.permissions.push(grant.clone());
        Ok(grant)
    }

    async fn find_grant(&self, id: Uuid) -> Result<Option<WorkflowPermission>, AppError> {
        Ok(self
            .lock()
            .permissions
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn revoke_grant(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        let before = tables.permissions.len();
        tables.permissions.retain(|p| p.id != id);
        if tables.permissions.len() == before {
            return Err(AppError::NotFound("grant not found".to_string()));
        }
        Ok(())
    }

    async fn grants_for_workflow(
        &self,
        workflow_id: Uuid,
    ) -> Result<Vec<WorkflowPermission>, AppError> {
        Ok(self
            .lock()
            .permissions
            .iter()
            .filter(|p| p.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActivityLogStore for MemoryStore {
    async fn record_activity(&self, new: NewActivity) -> Result<(), AppError> {
        let mut tables = self.lock();
        let entry = ActivityLog {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            organization_id: new.organization_id,
            team_id: new.team_id,
            action: new.action,
            details: new.details,
            created_at: Utc::now(),
        };
        tables.activity.push(entry);
        Ok(())
    }

    async fn recent_activity(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityLog>, AppError> {
        let mut entries: Vec<ActivityLog> = self
            .lock()
            .activity
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
