//! Postgres-backed store implementation.
//!
//! One `PostgresStore` over a `PgPool` implements every store trait; the
//! trait impls are split across the submodules by entity.

mod activity;
mod connect;
mod invitation;
mod membership;
mod organization;
mod permission;
mod team;
mod user;
mod workflow;

pub use connect::connect;

use sqlx::PgPool;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
