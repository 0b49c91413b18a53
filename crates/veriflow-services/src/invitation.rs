//! Invitation lifecycle: issue, respond, list.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use veriflow_core::error::AppError;
use veriflow_core::models::{Invitation, InviteTarget, OrgRole, TeamRole};
use veriflow_core::token::generate_invitation_token;
use veriflow_db::{MembershipRecord, NewActivity, NewInvitation, NewMembership, Store};

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn Store>,
    ttl_days: i64,
}

impl InvitationService {
    pub fn new(store: Arc<dyn Store>, ttl_days: i64) -> Self {
        Self { store, ttl_days }
    }

    /// Issue an invitation to join an organization or team.
    ///
    /// The acting user must be an admin of the target organization, or for
    /// a team target either the team's owner or an admin of its owning
    /// organization. `role` must name a role valid for the target kind.
    pub async fn invite(
        &self,
        target: InviteTarget,
        email: &str,
        role: &str,
        acting: Uuid,
    ) -> Result<Invitation, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::InvalidInput(
                "a valid e-mail address is required".to_string(),
            ));
        }
        self.validate_role(target, role)?;
        self.authorize_target(target, acting).await?;

        let invitation = self
            .store
            .create_invitation(NewInvitation {
                target,
                email: email.clone(),
                role: role.to_string(),
                token: generate_invitation_token(),
                invited_by: acting,
                expires_at: Utc::now() + Duration::days(self.ttl_days),
            })
            .await?;

        tracing::info!(
            invitation_id = %invitation.id,
            email = %email,
            role = %role,
            "invitation issued"
        );
        self.store
            .record_activity(NewActivity {
                user_id: acting,
                organization_id: target.organization_id(),
                team_id: target.team_id(),
                action: "invitation.issued".to_string(),
                details: format!("invited {} as {}", email, role),
            })
            .await?;
        Ok(invitation)
    }

    /// Respond to an invitation by token.
    ///
    /// Returns the membership row on accept, `None` on decline. A token the
    /// store does not know is `NotFound`; a resolved invitation is
    /// `AlreadyResolved`; a pending row past its expiry is marked expired
    /// (lazy correction) and the call fails with `Expired`. Accepting
    /// requires a registered user with the invited e-mail address.
    pub async fn respond(
        &self,
        token: &str,
        accept: bool,
    ) -> Result<Option<MembershipRecord>, AppError> {
        let invitation = self
            .store
            .find_invitation_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("invitation not found".to_string()))?;

        if invitation.status.is_terminal() {
            return Err(AppError::AlreadyResolved(format!(
                "invitation {} was already resolved",
                invitation.id
            )));
        }
        if invitation.is_expired(Utc::now()) {
            self.store.mark_invitation_expired(invitation.id).await?;
            tracing::debug!(invitation_id = %invitation.id, "invitation lapsed before response");
            return Err(AppError::Expired(format!(
                "invitation {} expired at {}",
                invitation.id, invitation.expires_at
            )));
        }

        if !accept {
            self.store.decline_invitation(invitation.id).await?;
            tracing::info!(invitation_id = %invitation.id, "invitation declined");
            return Ok(None);
        }

        let user = self
            .store
            .find_user_by_email(&invitation.email)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("no registered user for {}", invitation.email))
            })?;

        let membership = match invitation.target {
            InviteTarget::Organization(organization_id) => NewMembership::Organization {
                organization_id,
                user_id: user.id,
                role: OrgRole::parse(&invitation.role).ok_or_else(|| {
                    AppError::InvalidInput(format!("unknown organization role {}", invitation.role))
                })?,
            },
            InviteTarget::Team(team_id) => NewMembership::Team {
                team_id,
                user_id: user.id,
                role: TeamRole::parse(&invitation.role).ok_or_else(|| {
                    AppError::InvalidInput(format!("unknown team role {}", invitation.role))
                })?,
            },
        };

        let record = self
            .store
            .accept_invitation(invitation.id, membership)
            .await?;

        tracing::info!(invitation_id = %invitation.id, user_id = %user.id, "invitation accepted");
        self.store
            .record_activity(NewActivity {
                user_id: user.id,
                organization_id: invitation.target.organization_id(),
                team_id: invitation.target.team_id(),
                action: "invitation.accepted".to_string(),
                details: format!("joined as {}", invitation.role),
            })
            .await?;
        Ok(Some(record))
    }

    /// List pending, unexpired invitations for a target. Same authorization
    /// as issuing.
    pub async fn list_pending(
        &self,
        target: InviteTarget,
        acting: Uuid,
    ) -> Result<Vec<Invitation>, AppError> {
        self.authorize_target(target, acting).await?;
        self.store.list_pending_invitations(target, Utc::now()).await
    }

    fn validate_role(&self, target: InviteTarget, role: &str) -> Result<(), AppError> {
        let known = match target {
            InviteTarget::Organization(_) => OrgRole::parse(role).is_some(),
            InviteTarget::Team(_) => TeamRole::parse(role).is_some(),
        };
        if known {
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!(
                "role {role} is not valid for this target"
            )))
        }
    }

    async fn authorize_target(&self, target: InviteTarget, acting: Uuid) -> Result<(), AppError> {
        match target {
            InviteTarget::Organization(organization_id) => {
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
            InviteTarget::Team(team_id) => {
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
                    Ok(())
                } else {
                    Err(AppError::Forbidden(
                        "team owner or organization admin role required".to_string(),
                    ))
                }
            }
        }
    }
}
