mod helpers;

use helpers::{create_test_org, register_test_user, setup_test_app};

use chrono::Utc;
use serde_json::json;
use veriflow_core::error::AppError;
use veriflow_core::models::{PermissionLevel, ShareTargetInput, TeamRole, Workflow};
use veriflow_db::PermissionStore;

#[tokio::test]
async fn test_new_workflow_starts_in_draft() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;

    let workflow = app
        .workflows
        .create(owner.id, "  fold job  ", Some("alpha run"))
        .await
        .unwrap();

    assert_eq!(workflow.status, Workflow::INITIAL_STATUS);
    assert_eq!(workflow.name, "fold job");
    assert!(workflow.team_id.is_none());
    assert!(!workflow.is_anchored());
}

#[tokio::test]
async fn test_default_team_is_first_owned_team() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let org = create_test_org(&app, "Lab", owner.id).await;
    let first = app
        .memberships
        .create_team(org.id, "First", "", owner.id)
        .await
        .unwrap();
    app.memberships
        .create_team(org.id, "Second", "", owner.id)
        .await
        .unwrap();

    let workflow = app.workflows.create(owner.id, "teamed", None).await.unwrap();
    assert_eq!(workflow.team_id, Some(first.id));
}

#[tokio::test]
async fn test_plain_membership_does_not_set_default_team() {
    let app = setup_test_app();
    let admin = register_test_user(&app, "admin@example.com").await;
    let member = register_test_user(&app, "member@example.com").await;
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

    // Only an owned team is picked up at creation time.
    let workflow = app.workflows.create(member.id, "solo", None).await.unwrap();
    assert!(workflow.team_id.is_none());
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;

    let err = app.workflows.create(owner.id, "   ", None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_update_details_renames_and_redescribes() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;

    let workflow = app
        .workflows
        .create(owner.id, "first name", Some("first description"))
        .await
        .unwrap();
    let updated = app
        .workflows
        .update_details(workflow.id, "second name", Some("second description"), owner.id)
        .await
        .unwrap();

    assert_eq!(updated.name, "second name");
    assert_eq!(updated.description.as_deref(), Some("second description"));
    // Lifecycle fields are untouched by a rename.
    assert_eq!(updated.status, workflow.status);

    let cleared = app
        .workflows
        .update_details(workflow.id, "second name", None, owner.id)
        .await
        .unwrap();
    assert!(cleared.description.is_none());
}

#[tokio::test]
async fn test_update_details_requires_write_access() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let viewer = register_test_user(&app, "viewer@example.com").await;

    let workflow = app.workflows.create(owner.id, "named", None).await.unwrap();
    app.sharing
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

    let err = app
        .workflows
        .update_details(workflow.id, "renamed", None, viewer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .workflows
        .update_details(workflow.id, "   ", None, owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_status_update_requires_write_access() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let viewer = register_test_user(&app, "viewer@example.com").await;

    let workflow = app.workflows.create(owner.id, "staged", None).await.unwrap();
    app.sharing
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

    let err = app
        .workflows
        .update_status(workflow.id, "registered", None, viewer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let updated = app
        .workflows
        .update_status(
            workflow.id,
            "structure_processed",
            Some(json!({"rmsd": 0.42})),
            owner.id,
        )
        .await
        .unwrap();
    assert_eq!(updated.status, "structure_processed");
    assert_eq!(updated.results, Some(json!({"rmsd": 0.42})));
}

#[tokio::test]
async fn test_status_update_keeps_results_when_none_supplied() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;

    let workflow = app.workflows.create(owner.id, "kept", None).await.unwrap();
    app.workflows
        .update_status(workflow.id, "registered", Some(json!({"step": 1})), owner.id)
        .await
        .unwrap();
    let updated = app
        .workflows
        .update_status(workflow.id, "completed", None, owner.id)
        .await
        .unwrap();
    assert_eq!(updated.results, Some(json!({"step": 1})));
}

#[tokio::test]
async fn test_anchor_is_write_once() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;

    let workflow = app.workflows.create(owner.id, "anchored", None).await.unwrap();
    let committed_at = Utc::now();
    let anchored = app
        .workflows
        .commit_anchor(workflow.id, "0xabc", "QmFirst", committed_at, owner.id)
        .await
        .unwrap();
    assert!(anchored.is_anchored());
    assert_eq!(anchored.blockchain_tx_hash.as_deref(), Some("0xabc"));

    let err = app
        .workflows
        .commit_anchor(workflow.id, "0xdef", "QmSecond", Utc::now(), owner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The first commit is untouched.
    let current = app.workflows.get(workflow.id, owner.id).await.unwrap();
    assert_eq!(current.blockchain_tx_hash.as_deref(), Some("0xabc"));
    assert_eq!(current.ipfs_hash.as_deref(), Some("QmFirst"));
}

#[tokio::test]
async fn test_delete_requires_administer_and_clears_grants() {
    let app = setup_test_app();
    let owner = register_test_user(&app, "owner@example.com").await;
    let editor = register_test_user(&app, "editor@example.com").await;

    let workflow = app.workflows.create(owner.id, "doomed", None).await.unwrap();
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

    let err = app.workflows.delete(workflow.id, editor.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    app.workflows.delete(workflow.id, owner.id).await.unwrap();

    let err = app.workflows.get(workflow.id, owner.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let grants = app.store.grants_for_workflow(workflow.id).await.unwrap();
    assert!(grants.is_empty());
}

#[tokio::test]
async fn test_list_for_user_returns_only_owned_workflows() {
    let app = setup_test_app();
    let alice = register_test_user(&app, "alice@example.com").await;
    let bob = register_test_user(&app, "bob@example.com").await;

    app.workflows.create(alice.id, "a1", None).await.unwrap();
    app.workflows.create(alice.id, "a2", None).await.unwrap();
    let shared = app.workflows.create(bob.id, "b1", None).await.unwrap();
    app.sharing
        .grant(
            shared.id,
            ShareTargetInput {
                user_id: Some(alice.id),
                ..Default::default()
            },
            PermissionLevel::View,
            bob.id,
        )
        .await
        .unwrap();

    let mine = app.workflows.list_for_user(alice.id).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|w| w.user_id == alice.id));
}
