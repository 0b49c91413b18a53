//! Workflow entity: a user-owned unit of work that can be shared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A workflow is exclusively owned by its creating user; ownership never
/// transfers. `status` is a free-text lifecycle label driven by external
/// processing stages (draft, registered, structure_processed, ...,
/// completed), not a closed enum. The blockchain anchor fields are
/// write-once: set on the first commit and never overwritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Workflow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub results: Option<serde_json::Value>,
    pub blockchain_tx_hash: Option<String>,
    pub ipfs_hash: Option<String>,
    pub blockchain_committed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Status a newly created workflow starts in.
    pub const INITIAL_STATUS: &'static str = "draft";

    pub fn is_anchored(&self) -> bool {
        self.blockchain_committed_at.is_some()
    }
}
