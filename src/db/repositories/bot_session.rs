use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{bot_sessions, prelude::*};
use crate::models::{BotSession, BotState};

pub struct BotSessionRepository {
    conn: DatabaseConnection,
}

impl BotSessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: bot_sessions::Model) -> BotSession {
        BotSession {
            admin_id: model.admin_id,
            current_show_id: model.current_show_id,
            current_season_id: model.current_season_id,
            current_episode_id: model.current_episode_id,
            state: model.state.parse().unwrap_or(BotState::Idle),
            data: model
                .temp_data
                .and_then(|d| serde_json::from_str(&d).ok())
                .unwrap_or_default(),
            last_activity: DateTime::parse_from_rfc3339(&model.last_activity)
                .map_or_else(|_| Utc::now(), |t| t.with_timezone(&Utc)),
        }
    }

    pub async fn get(&self, admin_id: i64) -> anyhow::Result<Option<BotSession>> {
        let model = BotSessions::find_by_id(admin_id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn save(&self, session: &BotSession) -> anyhow::Result<()> {
        let active = bot_sessions::ActiveModel {
            admin_id: Set(session.admin_id),
            current_show_id: Set(session.current_show_id),
            current_season_id: Set(session.current_season_id),
            current_episode_id: Set(session.current_episode_id),
            state: Set(session.state.as_str().to_string()),
            temp_data: Set(serde_json::to_string(&session.data).ok()),
            last_activity: Set(session.last_activity.to_rfc3339()),
        };

        BotSessions::insert(active)
            .on_conflict(
                OnConflict::column(bot_sessions::Column::AdminId)
                    .update_columns([
                        bot_sessions::Column::CurrentShowId,
                        bot_sessions::Column::CurrentSeasonId,
                        bot_sessions::Column::CurrentEpisodeId,
                        bot_sessions::Column::State,
                        bot_sessions::Column::TempData,
                        bot_sessions::Column::LastActivity,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, admin_id: i64) -> anyhow::Result<bool> {
        let result = BotSessions::delete_by_id(admin_id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Drops sessions idle since before `cutoff`.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = BotSessions::delete_many()
            .filter(bot_sessions::Column::LastActivity.lt(cutoff.to_rfc3339()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
