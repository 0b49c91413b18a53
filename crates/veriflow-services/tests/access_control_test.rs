mod helpers;

use helpers::{create_test_org, register_test_user, setup_test_app};

use uuid::Uuid;
use veriflow_core::error::AppError;
use veriflow_core::models::{OrgRole, PermissionLevel, ShareTargetInput};
use veriflow_core::policy::AccessAction;

#[tokio::test]
async fn test_owner_always_allowed() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;

    let workflow = app
        .workflows
        .create(owner.id, "protein fold", None)
        .await
        .unwrap();

    for action in [
        AccessAction::Read,
        AccessAction::Write,
        AccessAction::Administer,
    ] {
        assert!(app
            .access
            .can_access(owner.id, workflow.id, action)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn test_no_grant_denies_everything() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let stranger = register_test_user(&app, "stranger@example.com").await;

    let workflow = app.workflows.create(owner.id, "draft", None).await.unwrap();

    for action in [
        AccessAction::Read,
        AccessAction::Write,
        AccessAction::Administer,
    ] {
        assert!(!app
            .access
            .can_access(stranger.id, workflow.id, action)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn test_edit_grant_implies_view_but_not_admin() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let editor = register_test_user(&app, "editor@example.com").await;

    let workflow = app.workflows.create(owner.id, "shared", None).await.unwrap();
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                user_id: Some(editor.id),
                ..Default::default()
            },
            PermissionLevel::Edit,
            owner.id,
        )
        .await
        .unwrap();

    assert!(app
        .access
        .can_access(editor.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());
    assert!(app
        .access
        .can_access(editor.id, workflow.id, AccessAction::Write)
        .await
        .unwrap());
    assert!(!app
        .access
        .can_access(editor.id, workflow.id, AccessAction::Administer)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_org_grant_reaches_members_of_that_org_only() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let member_a = register_test_user(&app, "a@example.com").await;
    let member_b = register_test_user(&app, "b@example.com").await;

    let org_a = create_test_org(&app, "Org A", owner.id).await;
    let org_b = create_test_org(&app, "Org B", owner.id).await;
    app.memberships
        .add_org_member(org_a.id, member_a.id, OrgRole::Member, owner.id)
        .await
        .unwrap();
    app.memberships
        .add_org_member(org_b.id, member_b.id, OrgRole::Member, owner.id)
        .await
        .unwrap();

    let workflow = app.workflows.create(owner.id, "org-wide", None).await.unwrap();
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                organization_id: Some(org_a.id),
                ..Default::default()
            },
            PermissionLevel::View,
            owner.id,
        )
        .await
        .unwrap();

    assert!(app
        .access
        .can_access(member_a.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());
    assert!(!app
        .access
        .can_access(member_b.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_revoke_takes_effect_on_next_check() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let viewer = register_test_user(&app, "viewer@example.com").await;

    let workflow = app.workflows.create(owner.id, "temp", None).await.unwrap();
    let grant = app
        .sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                user_id: Some(viewer.id),
                ..Default::default()
            },
            PermissionLevel::View,
            owner.id,
        )
        .await
        .unwrap();

    assert!(app
        .access
        .can_access(viewer.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());

    app.sharing.revoke(grant.id, owner.id).await.unwrap();

    assert!(!app
        .access
        .can_access(viewer.id, workflow.id, AccessAction::Read)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_user_grant_survives_org_membership_removal() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let colleague = register_test_user(&app, "colleague@example.com").await;

    let org = create_test_org(&app, "Shared Org", owner.id).await;
    app.memberships
        .add_org_member(org.id, colleague.id, OrgRole::Member, owner.id)
        .await
        .unwrap();

    let workflow = app.workflows.create(owner.id, "direct", None).await.unwrap();
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                user_id: Some(colleague.id),
                ..Default::default()
            },
            PermissionLevel::Edit,
            owner.id,
        )
        .await
        .unwrap();

    app.memberships
        .remove_org_member(org.id, colleague.id, owner.id)
        .await
        .unwrap();

    // Direct user grants are not tied to any membership.
    assert!(app
        .access
        .can_access(colleague.id, workflow.id, AccessAction::Write)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_highest_applicable_grant_wins() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;

    let org = create_test_org(&app, "Org", owner.id).await;
    app.memberships
        .add_org_member(org.id, member.id, OrgRole::Member, owner.id)
        .await
        .unwrap();

    let workflow = app.workflows.create(owner.id, "layered", None).await.unwrap();
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                organization_id: Some(org.id),
                ..Default::default()
            },
            PermissionLevel::View,
            owner.id,
        )
        .await
        .unwrap();
    app.sharing
        .grant(
            workflow.id,
            ShareTargetInput {
                user_id: Some(member.id),
                ..Default::default()
            },
            PermissionLevel::Admin,
            owner.id,
        )
        .await
        .unwrap();

    assert!(app
        .access
        .can_access(member.id, workflow.id, AccessAction::Administer)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_missing_workflow_is_not_found() {
    let app = setup_test_app();
    let user = register_test_user(&app, "user@example.com").await;

    let err = app
        .access
        .can_access(user.id, Uuid::new_v4(), AccessAction::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
