//! Shared fixtures for service integration tests.

use std::sync::Arc;

use uuid::Uuid;

use veriflow_core::models::{Organization, User};
use veriflow_db::{MemoryStore, NewUser, Store, UserStore};
use veriflow_services::{
    AccessService, InvitationService, MembershipService, SharingService, WorkflowService,
};

pub const TEST_INVITATION_TTL_DAYS: i64 = 7;

/// The full service stack wired over one in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub memberships: MembershipService,
    pub invitations: InvitationService,
    pub sharing: SharingService,
    pub access: AccessService,
    pub workflows: WorkflowService,
}

pub fn setup_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    let access = AccessService::new(dyn_store.clone());
    TestApp {
        store: store.clone(),
        memberships: MembershipService::new(dyn_store.clone()),
        invitations: InvitationService::new(dyn_store.clone(), TEST_INVITATION_TTL_DAYS),
        sharing: SharingService::new(dyn_store.clone(), access.clone()),
        workflows: WorkflowService::new(dyn_store, access.clone()),
        access,
    }
}

pub async fn register_test_user(app: &TestApp, email: &str) -> User {
    app.store
        .create_user(NewUser {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        })
        .await
        .unwrap()
}

/// Creates an organization whose creator is its admin.
pub async fn create_test_org(app: &TestApp, name: &str, creator: Uuid) -> Organization {
    app.memberships
        .create_organization(name, "test org", "example.com", creator)
        .await
        .unwrap()
}
