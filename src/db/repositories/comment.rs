use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::now;
use crate::entities::{comments, prelude::*};
use crate::models::Comment;

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        user_id: i32,
        username: &str,
        video_id: i32,
        text: &str,
    ) -> anyhow::Result<Comment> {
        let active = comments::ActiveModel {
            user_id: Set(user_id),
            video_id: Set(video_id),
            text: Set(text.to_string()),
            created_at: Set(now()),
            ..Default::default()
        };
        let model = active.insert(&self.conn).await?;

        Ok(Comment {
            id: model.id,
            video_id: model.video_id,
            user_id: model.user_id,
            username: username.to_string(),
            text: model.text,
            created_at: model.created_at,
        })
    }

    /// Newest first. The second value is the total for the show.
    pub async fn list(
        &self,
        video_id: i32,
        offset: u64,
        limit: u64,
    ) -> anyhow::Result<(Vec<Comment>, u64)> {
        let total = Comments::find()
            .filter(comments::Column::VideoId.eq(video_id))
            .count(&self.conn)
            .await?;

        let rows = Comments::find()
            .filter(comments::Column::VideoId.eq(video_id))
            .order_by_desc(comments::Column::CreatedAt)
            .order_by_desc(comments::Column::Id)
            .offset(offset)
            .limit(limit)
            .find_also_related(Users)
            .all(&self.conn)
            .await?;

        let items = rows
            .into_iter()
            .map(|(c, user)| Comment {
                id: c.id,
                video_id: c.video_id,
                user_id: c.user_id,
                username: user.map_or_else(|| "anonymous".to_string(), |u| u.username),
                text: c.text,
                created_at: c.created_at,
            })
            .collect();

        Ok((items, total))
    }

    /// Author of the comment, if it exists.
    pub async fn author(&self, id: i32) -> anyhow::Result<Option<i32>> {
        let model = Comments::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(|c| c.user_id))
    }

    pub async fn delete(&self, id: i32) -> anyhow::Result<bool> {
        let result = Comments::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
