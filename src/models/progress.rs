use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VideoProgress {
    pub id: i32,
    pub user_id: i32,
    pub video_id: i32,
    pub watched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VideoProgress {
    pub fn is_watched(&self) -> bool {
        self.watched_at.is_some()
    }
}
