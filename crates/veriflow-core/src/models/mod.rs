//! Domain models shared across Veriflow components

pub mod activity;
pub mod invitation;
pub mod membership;
pub mod organization;
pub mod permission;
pub mod team;
pub mod user;
pub mod workflow;

pub use activity::ActivityLog;
pub use invitation::{Invitation, InvitationStatus, InviteTarget};
pub use membership::{OrgRole, OrganizationMembership, TeamMembership, TeamRole};
pub use organization::{Organization, PlanTier};
pub use permission::{PermissionLevel, ShareTarget, ShareTargetInput, WorkflowPermission};
pub use team::Team;
pub use user::User;
pub use workflow::Workflow;
