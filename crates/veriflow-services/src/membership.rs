//! Membership registry: organizations, teams, and their rosters.

use std::sync::Arc;

use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{
    ActivityLog, OrgRole, Organization, OrganizationMembership, Team, TeamMembership, TeamRole,
    User,
};
use veriflow_db::{NewActivity, NewOrganization, NewTeam, Store};

#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn Store>,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Identity lookup: resolve a user id or fail with `NotFound`.
    pub async fn lookup_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_string()))
    }

    /// Create an organization; the creator becomes its first `admin`
    /// member in the same transaction.
    pub async fn create_organization(
        &self,
        name: &str,
        description: &str,
        domain: &str,
        creator: Uuid,
    ) -> Result<Organization, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "organization name cannot be empty".to_string(),
            ));
        }
        self.lookup_user(creator).await?;

        let org = self
            .store
            .create_organization(
                NewOrganization {
                    name: name.to_string(),
                    description: description.to_string(),
                    domain: domain.to_string(),
                },
                creator,
            )
            .await?;

        tracing::info!(organization_id = %org.id, user_id = %creator, "organization created");
        self.store
            .record_activity(NewActivity {
                user_id: creator,
                organization_id: Some(org.id),
                team_id: None,
                action: "organization.created".to_string(),
                details: format!("created organization {}", org.name),
            })
            .await?;
        Ok(org)
    }

    /// Update an organization's name, description, and domain. The acting
    /// user must hold `admin` in that organization.
    pub async fn update_organization(
        &self,
        organization_id: Uuid,
        name: &str,
        description: &str,
        domain: &str,
        acting: Uuid,
    ) -> Result<Organization, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "organization name cannot be empty".to_string(),
            ));
        }
        self.require_org_admin(organization_id, acting).await?;

        let org = self
            .store
            .update_organization(organization_id, name, description, domain)
            .await?;

        tracing::info!(organization_id = %organization_id, "organization updated");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(organization_id),
                team_id: None,
                action: "organization.updated".to_string(),
                details: format!("renamed organization to {}", org.name),
            })
            .await?;
        Ok(org)
    }

    /// Delete an organization together with its teams, memberships,
    /// invitations, and grants. Workflows of its teams survive as
    /// team-less. Admin only.
    pub async fn delete_organization(
        &self,
        organization_id: Uuid,
        acting: Uuid,
    ) -> Result<(), AppError> {
        self.require_org_admin(organization_id, acting).await?;

        self.store.delete_organization(organization_id).await?;

        tracing::warn!(organization_id = %organization_id, "organization deleted");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: None,
                team_id: None,
                action: "organization.deleted".to_string(),
                details: format!("deleted organization {}", organization_id),
            })
            .await?;
        Ok(())
    }

    /// Add a member to an organization. The acting user must hold `admin`
    /// in that organization. Fails with `Conflict` if the user is already
    /// a member.
    pub async fn add_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
        acting: Uuid,
    ) -> Result<OrganizationMembership, AppError> {
        self.require_org_admin(organization_id, acting).await?;
        self.lookup_user(user_id).await?;

        let membership = self
            .store
            .add_org_member(organization_id, user_id, role)
            .await?;

        tracing::info!(
            organization_id = %organization_id,
            user_id = %user_id,
            role = role.as_str(),
            "organization member added"
        );
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(organization_id),
                team_id: None,
                action: "organization.member_added".to_string(),
                details: format!("added user {} as {}", user_id, role.as_str()),
            })
            .await?;
        Ok(membership)
    }

    /// Remove a member from an organization. Does not cascade to team
    /// memberships or workflow grants; derived access simply stops
    /// applying on the next decision because membership is recomputed
    /// live. Removing the last admin is allowed (the source system does
    /// not enforce a floor) but logged.
    pub async fn remove_org_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        acting: Uuid,
    ) -> Result<(), AppError> {
        self.require_org_admin(organization_id, acting).await?;

        self.store
            .remove_org_member(organization_id, user_id)
            .await?;

        let remaining = self.store.list_org_members(organization_id).await?;
        if !remaining.iter().any(|m| m.role == OrgRole::Admin) {
            tracing::warn!(
                organization_id = %organization_id,
                "organization has no admin left after removal"
            );
        }

        tracing::info!(
            organization_id = %organization_id,
            user_id = %user_id,
            "organization member removed"
        );
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(organization_id),
                team_id: None,
                action: "organization.member_removed".to_string(),
                details: format!("removed user {}", user_id),
            })
            .await?;
        Ok(())
    }

    /// Create a team in an organization. The acting user must be an org
    /// admin and becomes the team's `owner`.
    pub async fn create_team(
        &self,
        organization_id: Uuid,
        name: &str,
        description: &str,
        acting: Uuid,
    ) -> Result<Team, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "team name cannot be empty".to_string(),
            ));
        }
        self.require_org_admin(organization_id, acting).await?;

        let team = self
            .store
            .create_team(NewTeam {
                organization_id,
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;
        self.store
            .add_team_member(team.id, acting, TeamRole::Owner)
            .await?;

        tracing::info!(team_id = %team.id, organization_id = %organization_id, "team created");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(organization_id),
                team_id: Some(team.id),
                action: "team.created".to_string(),
                details: format!("created team {}", team.name),
            })
            .await?;
        Ok(team)
    }

    /// Update a team's name and description. The acting user must be the
    /// team's owner or an admin of the owning organization.
    pub async fn update_team(
        &self,
        team_id: Uuid,
        name: &str,
        description: &str,
        acting: Uuid,
    ) -> Result<Team, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "team name cannot be empty".to_string(),
            ));
        }
        let current = self.require_team_admin(team_id, acting).await?;

        let team = self.store.update_team(team_id, name, description).await?;

        tracing::info!(team_id = %team_id, "team updated");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(current.organization_id),
                team_id: Some(team_id),
                action: "team.updated".to_string(),
                details: format!("renamed team to {}", team.name),
            })
            .await?;
        Ok(team)
    }

    /// Delete a team together with its memberships, invitations, and
    /// grants; workflows attached to it survive as team-less. Same
    /// authorization as other team mutations.
    pub async fn delete_team(&self, team_id: Uuid, acting: Uuid) -> Result<(), AppError> {
        let team = self.require_team_admin(team_id, acting).await?;

        self.store.delete_team(team_id).await?;

        tracing::warn!(team_id = %team_id, "team deleted");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(team.organization_id),
                team_id: None,
                action: "team.deleted".to_string(),
                details: format!("deleted team {}", team.name),
            })
            .await?;
        Ok(())
    }

    /// Add a member to a team. The acting user must be the team's owner
    /// or an admin of the owning organization.
    pub async fn add_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        role: TeamRole,
        acting: Uuid,
    ) -> Result<TeamMembership, AppError> {
        let team = self.require_team_admin(team_id, acting).await?;
        self.lookup_user(user_id).await?;

        let membership = self.store.add_team_member(team_id, user_id, role).await?;

        tracing::info!(
            team_id = %team_id,
            user_id = %user_id,
            role = role.as_str(),
            "team member added"
        );
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(team.organization_id),
                team_id: Some(team_id),
                action: "team.member_added".to_string(),
                details: format!("added user {} as {}", user_id, role.as_str()),
            })
            .await?;
        Ok(membership)
    }

    /// Remove a member from a team; same authorization as adding.
    pub async fn remove_team_member(
        &self,
        team_id: Uuid,
        user_id: Uuid,
        acting: Uuid,
    ) -> Result<(), AppError> {
        let team = self.require_team_admin(team_id, acting).await?;

        self.store.remove_team_member(team_id, user_id).await?;

        tracing::info!(team_id = %team_id, user_id = %user_id, "team member removed");
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: Some(team.organization_id),
                team_id: Some(team_id),
                action: "team.member_removed".to_string(),
                details: format!("removed user {}", user_id),
            })
            .await?;
        Ok(())
    }

    pub async fn org_role(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, AppError> {
        self.store.org_role(organization_id, user_id).await
    }

    pub async fn team_role(
        &self,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TeamRole>, AppError> {
        self.store.team_role(team_id, user_id).await
    }

    pub async fn organizations_of(&self, user_id: Uuid) -> Result<Vec<Organization>, AppError> {
        self.store.organizations_of(user_id).await
    }

    pub async fn teams_of(&self, user_id: Uuid) -> Result<Vec<Team>, AppError> {
        self.store.teams_of(user_id).await
    }

    pub async fn list_org_members(
        &self,
        organization_id: Uuid,
        acting: Uuid,
    ) -> Result<Vec<OrganizationMembership>, AppError> {
        if self.store.org_role(organization_id, acting).await?.is_none() {
            return Err(AppError::Forbidden(
                "only members may list the organization roster".to_string(),
            ));
        }
        self.store.list_org_members(organization_id).await
    }

    pub async fn recent_activity(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityLog>, AppError> {
        self.store.recent_activity(user_id, limit).await
    }

    async fn require_org_admin(&self, organization_id: Uuid, acting: Uuid) -> Result<(), AppError> {
        self.store
            .find_organization(organization_id)
            .await?
            .ok_or_else(|| AppError::NotFound("organization not found".to_string()))?;
        match self.store.org_role(organization_id, acting).await? {
            Some(OrgRole::Admin) => Ok(()),
            _ => Err(AppError::Forbidden(
                "organization admin role required".to_string(),
            )),
        }
    }

    async fn require_team_admin(&self, team_id: Uuid, acting: Uuid) -> Result<Team, AppError> {
        let team = self
            .store
            .find_team(team_id)
            .await?
            .ok_or_else(|| AppError::NotFound("team not found".to_string()))?;

        let is_owner = matches!(
            self.store.team_role(team_id, acting).await?,
            Some(TeamRole::Owner)
        );
        let is_org_admin = matches!(
            self.store.org_role(team.organization_id, acting).await?,
            Some(OrgRole::Admin)
        );
        if is_owner || is_org_admin {
            Ok(team)
        } else {
            Err(AppError::Forbidden(
                "team owner or organization admin role required".to_string(),
            ))
        }
    }
}
