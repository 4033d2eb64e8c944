use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bot_sessions")]
pub struct Model {
    /// Telegram user id of the admin.
    #[sea_orm(primary_key, auto_increment = false)]
    pub admin_id: i64,
    pub current_show_id: Option<i32>,
    pub current_season_id: Option<i32>,
    pub current_episode_id: Option<i32>,
    pub state: String,
    /// JSON blob for transient conversation data.
    #[sea_orm(column_type = "Text", nullable)]
    pub temp_data: Option<String>,
    pub last_activity: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
