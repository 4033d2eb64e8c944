use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "episodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub season_id: i32,
    pub episode_number: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub overview: Option<String>,
    pub thumbnail: Option<String>,
    pub air_date: Option<String>,
    pub runtime: Option<i32>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seasons::Entity",
        from = "Column::SeasonId",
        to = "super::seasons::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Seasons,
    #[sea_orm(has_many = "super::video_sources::Entity")]
    VideoSources,
}

impl Related<super::seasons::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seasons.def()
    }
}

impl Related<super::video_sources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VideoSources.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
