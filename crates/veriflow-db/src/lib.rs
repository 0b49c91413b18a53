//! Veriflow record store
//!
//! Store traits plus two implementations: `PostgresStore` (sqlx) for
//! production and `MemoryStore` for tests and embedding. Services depend
//! only on the traits in [`db::traits`].

pub mod db;

pub use db::memory::MemoryStore;
pub use db::postgres::{connect, PostgresStore};
pub use db::traits::{
    ActivityLogStore, InvitationStore, MembershipRecord, MembershipStore, NewActivity, NewGrant,
    NewInvitation, NewMembership, NewOrganization, NewTeam, NewUser, NewWorkflow,
    OrganizationStore, PermissionStore, Store, TeamStore, UserStore, WorkflowStore,
};
