use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity log entry recorded for membership and sharing mutations.
/// Display only; never consulted by the access decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub action: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}
