mod helpers;

use helpers::{create_test_org, register_test_user, setup_test_app};

use veriflow_core::error::AppError;
use veriflow_core::models::{InviteTarget, OrgRole, PermissionLevel, ShareTargetInput, TeamRole};
use veriflow_core::policy::AccessAction;

#[tokio::test]
async fn test_creator_becomes_org_admin() {
    let app = setup_test_app();
    let creator = register_test_user(&app, "founder@example.com").await;

    let org = create_test_org(&app, "Founding Lab", creator.id).await;

    assert_eq!(
        app.memberships.org_role(org.id, creator.id).await.unwrap(),
        Some(OrgRole::Admin)
    );
    let orgs = app.memberships.organizations_of(creator.id).await.unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id, org.id);
}

#[tokio::test]
async fn test_duplicate_membership_is_a_conflict() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;

    app.memberships
        .add_org_member(org.id, member.id, OrgRole::Member, admin.id)
        .await
        .unwrap();
    let err = app
        .memberships
        .add_org_member(org.id, member.id, OrgRole::Admin, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The original role survives the failed re-add.
    assert_eq!(
        app.memberships.org_role(org.id, member.id).await.unwrap(),
        Some(OrgRole::Member)
    );
}

#[tokio::test]
async fn test_non_admin_cannot_manage_roster() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let outsider = register_test_user(&app, "outsider@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;
    app.memberships
        .add_org_member(org.id, member.id, OrgRole::Member, admin.id)
        .await
        .unwrap();

    let err = app
        .memberships
        .add_org_member(org.id, outsider.id, OrgRole::Member, member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .memberships
        .remove_org_member(org.id, admin.id, member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_removing_last_admin_is_allowed() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;

    // Self-removal of the only admin succeeds; the warn log is the only
    // guard rail.
    app.memberships
        .remove_org_member(org.id, admin.id, admin.id)
        .await
        .unwrap();
    assert!(app
        .memberships
        .org_role(org.id, admin.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_remove_missing_member_is_not_found() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let stranger = register_test_user(&app, "stranger@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;

    let err = app
        .memberships
        .remove_org_member(org.id, stranger.id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_team_creator_becomes_owner() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;

    let team = app
        .memberships
        .create_team(org.id, "Bench", "wet lab", admin.id)
        .await
        .unwrap();

    assert_eq!(
        app.memberships.team_role(team.id, admin.id).await.unwrap(),
        Some(TeamRole::Owner)
    );
    assert_eq!(team.organization_id, org.id);
}

#[tokio::test]
async fn test_org_admin_can_manage_team_without_team_membership() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let lead = register_test_user(&app, "lead@example.com").await;
    let newcomer = register_test_user(&app, "newcomer@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;
    app.memberships
        .add_org_member(org.id, lead.id, OrgRole::Member, admin.id)
        .await
        .unwrap();

    let team = app
        .memberships
        .create_team(org.id, "Bench", "wet lab", admin.id)
        .await
        .unwrap();
    app.memberships
        .remove_team_member(team.id, admin.id, admin.id)
        .await
        .unwrap();
    app.memberships
        .add_team_member(team.id, lead.id, TeamRole::Owner, admin.id)
        .await
        .unwrap();

    // admin holds no team membership now but is still an org admin.
    assert!(app
        .memberships
        .team_role(team.id, admin.id)
        .await
        .unwrap()
        .is_none());
    app.memberships
        .add_team_member(team.id, newcomer.id, TeamRole::Member, admin.id)
        .await
        .unwrap();
    app.memberships
        .add_org_member(org.id, newcomer.id, OrgRole::Member, admin.id)
        .await
        .unwrap();
    assert_eq!(
        app.memberships.team_role(team.id, newcomer.id).await.unwrap(),
        Some(TeamRole::Member)
    );
}

#[tokio::test]
async fn test_team_member_cannot_manage_roster() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let outsider = register_test_user(&app, "outsider@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;
    let team = app
        .memberships
        .create_team(org.id, "Bench", "wet lab", admin.id)
        .await
        .unwrap();
    app.memberships
        .add_team_member(team.id, member.id, TeamRole::Member, admin.id)
        .await
        .unwrap();

    let err = app
        .memberships
        .add_team_member(team.id, outsider.id, TeamRole::Member, member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_update_organization_is_admin_gated() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let org = create_test_org(&app, "Old Name", admin.id).await;
    app.memberships
        .add_org_member(org.id, member.id, OrgRole::Member, admin.id)
        .await
        .unwrap();

    let err = app
        .memberships
        .update_organization(org.id, "Hijacked", "", "", member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = app
        .memberships
        .update_organization(org.id, "New Name", "renamed", "new.example.com", admin.id)
        .await
        .unwrap();
    assert_eq!(updated.name, "New Name");
    assert_eq!(updated.domain, "new.example.com");
}

#[tokio::test]
async fn test_update_team_is_owner_or_admin_gated() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;
    let team = app
        .memberships
        .create_team(org.id, "Old Bench", "", admin.id)
        .await
        .unwrap();
    app.memberships
        .add_team_member(team.id, member.id, TeamRole::Member, admin.id)
        .await
        .unwrap();

    let err = app
        .memberships
        .update_team(team.id, "Hijacked", "", member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = app
        .memberships
        .update_team(team.id, "New Bench", "dry lab", admin.id)
        .await
        .unwrap();
    assert_eq!(updated.name, "New Bench");
}

#[tokio::test]
async fn test_delete_team_clears_dependents_but_keeps_workflows() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    register_test_user(&app, "pending@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;
    let team = app
        .memberships
        .create_team(org.id, "Bench", "", admin.id)
        .await
        .unwrap();
    app.memberships
        .add_team_member(team.id, member.id, TeamRole::Member, admin.id)
        .await
        .unwrap();

    // admin owns the team, so the workflow attaches to it.
    let workflow = app.workflows.create(admin.id, "attached", None).await.unwrap();
    assert_eq!(workflow.team_id, Some(team.id));
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                team_id: Some(team.id),
                ..Default::default()
            },
            PermissionLevel::Edit,
            admin.id,
        )
        .await
        .unwrap();
    let invitation = app
        .invitations
        .invite(
            InviteTarget::Team(team.id),
            "pending@example.com",
            "member",
            admin.id,
        )
        .await
        .unwrap();

    app.memberships.delete_team(team.id, admin.id).await.unwrap();

    // Roster, grants, and pending invitations are gone; the workflow
    // survives without the team attachment.
    assert!(app
        .memberships
        .team_role(team.id, member.id)
        .await
        .unwrap()
        .is_none());
    assert!(!app
        .access
        .can_access(member.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());
    let err = app
        .invitations
        .respond(&invitation.token, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let kept = app.workflows.get(workflow.id, admin.id).await.unwrap();
    assert!(kept.team_id.is_none());
}

#[tokio::test]
async fn test_delete_organization_removes_teams_and_memberships() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let org = create_test_org(&app, "Doomed Lab", admin.id).await;
    app.memberships
        .add_org_member(org.id, member.id, OrgRole::Member, admin.id)
        .await
        .unwrap();
    let team = app
        .memberships
        .create_team(org.id, "Bench", "", admin.id)
        .await
        .unwrap();

    let workflow = app.workflows.create(admin.id, "kept", None).await.unwrap();
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                organization_id: Some(org.id),
                ..Default::default()
            },
            PermissionLevel::View,
            admin.id,
        )
        .await
        .unwrap();

    app.memberships
        .delete_organization(org.id, admin.id)
        .await
        .unwrap();

    assert!(app.memberships.organizations_of(admin.id).await.unwrap().is_empty());
    assert!(app
        .memberships
        .team_role(team.id, admin.id)
        .await
        .unwrap()
        .is_none());
    // The org-scoped grant went with the organization.
    assert!(!app
        .access
        .can_access(member.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());
    // Owned workflows survive; a repeated delete reports the gap.
    app.workflows.get(workflow.id, admin.id).await.unwrap();
    let err = app
        .memberships
        .delete_organization(org.id, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_roster_listing_requires_membership() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
    let outsider = register_test_user(&app, "outsider@example.com").await;
    let org = create_test_org(&app, "Lab", admin.id).await;
    app.memberships
        .add_org_member(org.id, member.id, OrgRole::Member, admin.id)
        .await
        .unwrap();

    let roster = app
        .memberships
        .list_org_members(org.id, member.id)
        .await
        .unwrap();
    assert_eq!(roster.len(), 2);

    let err = app
        .memberships
        .list_org_members(org.id, outsider.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
