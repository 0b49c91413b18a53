//! Veriflow services
//!
//! The method-level contract a front end calls: membership registry,
//! invitation ledger, sharing registry, access decision engine, and the
//! workflow lifecycle. Every operation takes the acting user as an
//! explicit parameter; there is no ambient request identity.
//!
//! Access decisions are read-only and unsynchronized with concurrent
//! membership/grant mutations: a verdict may be stale by one operation
//! (read-committed semantics). No stronger isolation is guaranteed, and
//! decisions are recomputed on every check rather than cached.

pub mod access;
pub mod invitation;
pub mod membership;
pub mod sharing;
pub mod workflow;

pub use access::AccessService;
pub use invitation::InvitationService;
pub use membership::MembershipService;
pub use sharing::SharingService;
pub use workflow::WorkflowService;
