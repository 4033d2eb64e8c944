use serde::{Deserialize, Serialize};

use super::catalog::Show;

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i32,
    pub video_id: i32,
    pub user_id: i32,
    pub username: String,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistEntry {
    pub id: i32,
    pub video_id: i32,
    pub added_at: String,
    pub video: Option<Show>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i32,
    pub video_id: i32,
    pub episode_id: Option<i32>,
    pub progress: i32,
    pub completed: bool,
    pub updated_at: String,
    pub video: Option<Show>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub video_id: i32,
    pub episode_id: Option<i32>,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub completed: bool,
}
