use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::catalog::ShowKind;

/// Where an admin is in a bot conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotState {
    #[default]
    Idle,
    SelectingShow,
    WaitingVideo,
    WaitingSeasonNumber,
}

impl BotState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SelectingShow => "selecting_show",
            Self::WaitingVideo => "waiting_video",
            Self::WaitingSeasonNumber => "waiting_season_number",
        }
    }
}

impl FromStr for BotState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "selecting_show" => Ok(Self::SelectingShow),
            "waiting_video" => Ok(Self::WaitingVideo),
            "waiting_season_number" => Ok(Self::WaitingSeasonNumber),
            other => Err(format!("Unknown bot state: {other}")),
        }
    }
}

/// A TMDB search hit offered to the admin as an inline button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbPick {
    pub tmdb_id: i32,
    pub kind: ShowKind,
    pub title: String,
    pub year: Option<String>,
}

/// A Telegram upload waiting for `/done` to push it to Filemoon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpload {
    pub task_id: i32,
    pub episode_id: i32,
    pub file_id: String,
    pub title: String,
}

/// What the admin wanted to do when the bot asked them to pick a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowAction {
    AddEpisode,
    CreateSeason,
    View,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub search_results: Vec<TmdbPick>,
    #[serde(default)]
    pub pending_uploads: Vec<PendingUpload>,
    #[serde(default)]
    pub pending_action: Option<ShowAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotSession {
    pub admin_id: i64,
    pub current_show_id: Option<i32>,
    pub current_season_id: Option<i32>,
    pub current_episode_id: Option<i32>,
    pub state: BotState,
    pub data: SessionData,
    pub last_activity: DateTime<Utc>,
}

impl BotSession {
    #[must_use]
    pub fn new(admin_id: i64) -> Self {
        Self {
            admin_id,
            current_show_id: None,
            current_season_id: None,
            current_episode_id: None,
            state: BotState::Idle,
            data: SessionData::default(),
            last_activity: Utc::now(),
        }
    }

    /// Back to idle, keeping nothing from the previous conversation.
    pub fn reset(&mut self) {
        *self = Self::new(self.admin_id);
    }

    /// Selects a show and its working season, dropping any stale episode.
    pub fn select(&mut self, show_id: i32, season_id: Option<i32>) {
        self.current_show_id = Some(show_id);
        self.current_season_id = season_id;
        self.current_episode_id = None;
    }
}
