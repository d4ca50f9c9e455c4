use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Countdown that keeps a class closed after its prerequisite is done.
/// One row per (user, class); re-arming overwrites the expiry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ClassTimer {
    pub user_id: i32,
    pub class_id: i32,
    pub timer_active: bool,
    pub timer_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
