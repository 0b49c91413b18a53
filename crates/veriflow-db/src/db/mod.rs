//! Record store implementations
//!
//! The traits in `traits` are the contract the services consume. The
//! `postgres` module holds the sqlx-backed implementation; `memory` holds
//! an in-process implementation over the same traits.

pub mod memory;
pub mod postgres;
pub mod traits;
