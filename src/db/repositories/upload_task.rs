use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::now;
use crate::entities::{prelude::*, upload_tasks};
use crate::models::{UploadStatus, UploadTask, UploadTaskUpdate};

pub struct UploadTaskRepository {
    conn: DatabaseConnection,
}

impl UploadTaskRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: upload_tasks::Model) -> UploadTask {
        UploadTask {
            id: model.id,
            episode_id: model.episode_id,
            file_id: model.file_id,
            title: model.title,
            status: model.status.parse().unwrap_or(UploadStatus::Pending),
            progress: model.progress,
            filemoon_code: model.filemoon_code,
            error_message: model.error_message,
            created_at: model.created_at,
            completed_at: model.completed_at,
        }
    }

    pub async fn create(
        &self,
        episode_id: i32,
        file_id: &str,
        title: &str,
    ) -> anyhow::Result<UploadTask> {
        let active = upload_tasks::ActiveModel {
            episode_id: Set(episode_id),
            file_id: Set(file_id.to_string()),
            title: Set(title.to_string()),
            status: Set(UploadStatus::Pending.as_str().to_string()),
            progress: Set(0),
            created_at: Set(now()),
            ..Default::default()
        };
        let model = active.insert(&self.conn).await?;
        Ok(Self::map_model(model))
    }

    pub async fn get(&self, id: i32) -> anyhow::Result<Option<UploadTask>> {
        let model = UploadTasks::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    /// Applies the given fields. Entering a terminal status stamps `completed_at`.
    pub async fn update(
        &self,
        id: i32,
        update: &UploadTaskUpdate,
    ) -> anyhow::Result<Option<UploadTask>> {
        let Some(model) = UploadTasks::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: upload_tasks::ActiveModel = model.into();
        if let Some(status) = update.status {
            active.status = Set(status.as_str().to_string());
            active.completed_at = Set(status.is_terminal().then(now));
            if status == UploadStatus::Pending {
                active.error_message = Set(None);
            }
        }
        if let Some(progress) = update.progress {
            active.progress = Set(progress.clamp(0, 100));
        }
        if let Some(code) = &update.filemoon_code {
            active.filemoon_code = Set(Some(code.clone()));
        }
        if let Some(error) = &update.error_message {
            active.error_message = Set(Some(error.clone()));
        }

        let model = active.update(&self.conn).await?;
        Ok(Some(Self::map_model(model)))
    }

    /// Moves the task to `uploading` only if its status is one of `from`.
    /// Returns whether this caller won the claim.
    pub async fn claim(&self, id: i32, from: &[UploadStatus]) -> anyhow::Result<bool> {
        let result = UploadTasks::update_many()
            .col_expr(
                upload_tasks::Column::Status,
                Expr::value(UploadStatus::Uploading.as_str()),
            )
            .col_expr(upload_tasks::Column::Progress, Expr::value(0))
            .col_expr(
                upload_tasks::Column::ErrorMessage,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                upload_tasks::Column::CompletedAt,
                Expr::value(Option::<String>::None),
            )
            .filter(upload_tasks::Column::Id.eq(id))
            .filter(upload_tasks::Column::Status.is_in(from.iter().map(|s| s.as_str())))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Newest first.
    pub async fn list(
        &self,
        status: Option<UploadStatus>,
        limit: u64,
    ) -> anyhow::Result<Vec<UploadTask>> {
        let mut query = UploadTasks::find();
        if let Some(status) = status {
            query = query.filter(upload_tasks::Column::Status.eq(status.as_str()));
        }
        let rows = query
            .order_by_desc(upload_tasks::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Pending tasks created before `cutoff` (RFC 3339), oldest first.
    pub async fn list_stale_pending(&self, cutoff: &str) -> anyhow::Result<Vec<UploadTask>> {
        let rows = UploadTasks::find()
            .filter(upload_tasks::Column::Status.eq(UploadStatus::Pending.as_str()))
            .filter(upload_tasks::Column::CreatedAt.lt(cutoff))
            .order_by_asc(upload_tasks::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn count_by_status(&self, status: UploadStatus) -> anyhow::Result<u64> {
        Ok(UploadTasks::find()
            .filter(upload_tasks::Column::Status.eq(status.as_str()))
            .count(&self.conn)
            .await?)
    }
}
