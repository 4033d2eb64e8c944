//! Upload pipeline: Telegram file -> Filemoon remote upload -> video source.
//!
//! A task moves `pending -> uploading -> processing -> completed`, or ends in
//! `failed` with the upstream error recorded. Every transition is published on
//! the event bus so the admin dashboard can follow along.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};

use crate::clients::filemoon::FilemoonClient;
use crate::clients::telegram::TelegramFileClient;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::models::{NewVideoSource, ServerName, UploadStatus, UploadTask, UploadTaskUpdate};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload task {0} not found")]
    NotFound(i32),

    #[error("Upload task {id} is already {status}")]
    InvalidState { id: i32, status: UploadStatus },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Filemoon error: {0}")]
    Filemoon(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for UploadError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Clone)]
pub struct UploadService {
    store: Store,
    filemoon: Arc<FilemoonClient>,
    telegram: Arc<TelegramFileClient>,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl UploadService {
    #[must_use]
    pub const fn new(
        store: Store,
        filemoon: Arc<FilemoonClient>,
        telegram: Arc<TelegramFileClient>,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            store,
            filemoon,
            telegram,
            event_bus,
        }
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers is fine.
        let _ = self.event_bus.send(event);
    }

    /// Records a pending task for a Telegram file attached to `episode_id`.
    pub async fn queue(
        &self,
        episode_id: i32,
        file_id: &str,
        title: &str,
    ) -> Result<UploadTask, UploadError> {
        let task = self
            .store
            .create_upload_task(episode_id, file_id, title)
            .await?;

        metrics::counter!("upload_tasks_total", "status" => "queued").increment(1);
        self.publish(NotificationEvent::UploadQueued {
            task_id: task.id,
            title: task.title.clone(),
        });
        info!(task_id = task.id, episode_id, "Upload queued");
        Ok(task)
    }

    async fn set(&self, id: i32, update: UploadTaskUpdate) -> Result<UploadTask, UploadError> {
        self.store
            .update_upload_task(id, &update)
            .await?
            .ok_or(UploadError::NotFound(id))
    }

    async fn advance(
        &self,
        id: i32,
        status: UploadStatus,
        progress: i32,
    ) -> Result<UploadTask, UploadError> {
        let task = self
            .set(
                id,
                UploadTaskUpdate {
                    status: Some(status),
                    progress: Some(progress),
                    ..Default::default()
                },
            )
            .await?;
        self.publish(NotificationEvent::UploadProgress {
            task_id: id,
            progress: task.progress,
        });
        Ok(task)
    }

    /// Runs one `pending` task to a terminal state.
    ///
    /// On failure the task is marked `failed` with the error message before
    /// the error is returned. A task some other caller already picked up
    /// yields [`UploadError::InvalidState`] and is left alone.
    #[instrument(skip(self), fields(task_id = id))]
    pub async fn process_task(&self, id: i32) -> Result<UploadTask, UploadError> {
        let task = self.claim(id, &[UploadStatus::Pending]).await?;
        self.execute(&task).await
    }

    /// Runs a `pending` or `failed` task again. Tasks in flight or already
    /// completed are refused.
    #[instrument(skip(self), fields(task_id = id))]
    pub async fn retry(&self, id: i32) -> Result<UploadTask, UploadError> {
        let task = self
            .claim(id, &[UploadStatus::Pending, UploadStatus::Failed])
            .await?;
        self.execute(&task).await
    }

    async fn claim(&self, id: i32, from: &[UploadStatus]) -> Result<UploadTask, UploadError> {
        let claimed = self.store.claim_upload_task(id, from).await?;
        let task = self
            .store
            .get_upload_task(id)
            .await?
            .ok_or(UploadError::NotFound(id))?;
        if !claimed {
            warn!(status = %task.status, "Upload task not claimable");
            return Err(UploadError::InvalidState {
                id,
                status: task.status,
            });
        }
        Ok(task)
    }

    async fn execute(&self, task: &UploadTask) -> Result<UploadTask, UploadError> {
        let id = task.id;
        match self.run(task).await {
            Ok(done) => Ok(done),
            Err(err) => {
                if matches!(err, UploadError::NotFound(_)) {
                    return Err(err);
                }
                let message = err.to_string();
                error!(error = %message, "Upload failed");
                metrics::counter!("upload_tasks_total", "status" => "failed").increment(1);
                self.set(
                    id,
                    UploadTaskUpdate {
                        status: Some(UploadStatus::Failed),
                        error_message: Some(message.clone()),
                        ..Default::default()
                    },
                )
                .await?;
                self.publish(NotificationEvent::UploadFailed {
                    task_id: id,
                    error: message,
                });
                Err(err)
            }
        }
    }

    async fn run(&self, task: &UploadTask) -> Result<UploadTask, UploadError> {
        if !self.telegram.is_configured() {
            return Err(UploadError::NotConfigured("Telegram bot token"));
        }
        if !self.filemoon.is_configured() {
            return Err(UploadError::NotConfigured("Filemoon API key"));
        }

        self.advance(task.id, UploadStatus::Uploading, 10).await?;

        let file = self
            .telegram
            .get_file(&task.file_id)
            .await
            .map_err(|e| UploadError::Telegram(e.to_string()))?
            .ok_or_else(|| UploadError::Telegram(format!("file {} not found", task.file_id)))?;
        let path = file
            .file_path
            .ok_or_else(|| UploadError::Telegram("file has no download path".to_string()))?;

        let upload = self
            .filemoon
            .remote_upload(&self.telegram.download_url(&path), Some(&task.title))
            .await
            .map_err(|e| UploadError::Filemoon(e.to_string()))?;

        self.advance(task.id, UploadStatus::Processing, 60).await?;
        let duration = self.settle_remote_file(&upload.file_code, &task.title).await;

        let source = NewVideoSource {
            server_name: ServerName::Filemoon,
            link: upload.player_url.clone(),
            file_id: Some(task.file_id.clone()),
            filemoon_code: Some(upload.file_code.clone()),
            quality: None,
            language: None,
            file_size: file.file_size.and_then(|s| i64::try_from(s).ok()),
            duration,
            mime_type: None,
        };
        self.store.create_source(task.episode_id, &source).await?;

        let done = self
            .set(
                task.id,
                UploadTaskUpdate {
                    status: Some(UploadStatus::Completed),
                    progress: Some(100),
                    filemoon_code: Some(upload.file_code.clone()),
                    ..Default::default()
                },
            )
            .await?;

        metrics::counter!("upload_tasks_total", "status" => "completed").increment(1);
        self.publish(NotificationEvent::UploadCompleted {
            task_id: task.id,
            filemoon_code: upload.file_code.clone(),
        });
        info!(filemoon_code = %upload.file_code, "Upload completed");
        Ok(done)
    }

    /// Remote uploads are named after the Telegram file path; give the file
    /// the episode title and read back its duration. Failures only warn, the
    /// file is already on Filemoon at this point.
    async fn settle_remote_file(&self, file_code: &str, title: &str) -> Option<i32> {
        let info = match self.filemoon.file_info(file_code).await {
            Ok(info) => info?,
            Err(e) => {
                warn!(file_code, error = %e, "Filemoon file_info failed");
                return None;
            }
        };

        if info.name.as_deref() != Some(title)
            && let Err(e) = self.filemoon.rename(file_code, title).await
        {
            warn!(file_code, error = %e, "Filemoon rename failed");
        }
        if !info.is_active() {
            info!(file_code, "Filemoon is still encoding the file");
        }

        info.duration.as_ref().and_then(json_to_i32)
    }
}

/// Filemoon sends numbers either as JSON numbers or as strings.
#[allow(clippy::cast_possible_truncation)]
fn json_to_i32(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|n| i32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http::RetryPolicy;
    use crate::config::{FilemoonConfig, TelegramConfig};
    use crate::models::{NewEpisode, NewSeason, NewShow, ShowKind};

    async fn setup() -> (UploadService, Store, i32, broadcast::Receiver<NotificationEvent>) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let show = store
            .create_show(&NewShow {
                tmdb_id: 42,
                title: "Test".to_string(),
                kind: ShowKind::Movie,
                overview: None,
                poster_path: None,
                backdrop_path: None,
                release_date: None,
                genres: Vec::new(),
                runtime: None,
                rating: None,
                language: None,
            })
            .await
            .unwrap()
            .unwrap();
        let season = store
            .create_season(show.id, &NewSeason::numbered(0))
            .await
            .unwrap()
            .unwrap();
        let episode = store
            .create_episode(season.id, &NewEpisode::numbered(1))
            .await
            .unwrap()
            .unwrap();

        let client = reqwest::Client::new();
        let filemoon = FilemoonClient::with_shared_client(
            client.clone(),
            FilemoonConfig::default(),
            RetryPolicy::default(),
        );
        let telegram = TelegramFileClient::with_shared_client(
            client,
            &TelegramConfig::default(),
            RetryPolicy::default(),
        );
        let (tx, rx) = broadcast::channel(16);
        let service = UploadService::new(store.clone(), Arc::new(filemoon), Arc::new(telegram), tx);
        (service, store, episode.id, rx)
    }

    #[tokio::test]
    async fn queue_publishes_event() {
        let (service, _, episode_id, mut rx) = setup().await;
        let task = service.queue(episode_id, "BAAC-1", "Film").await.unwrap();
        assert_eq!(task.status, UploadStatus::Pending);

        match rx.recv().await.unwrap() {
            NotificationEvent::UploadQueued { task_id, title } => {
                assert_eq!(task_id, task.id);
                assert_eq!(title, "Film");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn unconfigured_clients_fail_the_task() {
        let (service, store, episode_id, _rx) = setup().await;
        let task = service.queue(episode_id, "BAAC-1", "Film").await.unwrap();

        let err = service.process_task(task.id).await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured(_)));

        let stored = store.get_upload_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, UploadStatus::Failed);
        assert!(stored.error_message.unwrap().contains("not configured"));
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let (service, _, _, _rx) = setup().await;
        assert!(matches!(
            service.process_task(999).await,
            Err(UploadError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn finished_tasks_are_not_processed_again() {
        let (service, store, episode_id, _rx) = setup().await;
        let task = service.queue(episode_id, "BAAC-1", "Film").await.unwrap();
        store
            .update_upload_task(
                task.id,
                &UploadTaskUpdate {
                    status: Some(UploadStatus::Completed),
                    progress: Some(100),
                    filemoon_code: Some("abc".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for result in [
            service.process_task(task.id).await,
            service.retry(task.id).await,
        ] {
            assert!(matches!(
                result,
                Err(UploadError::InvalidState {
                    status: UploadStatus::Completed,
                    ..
                })
            ));
        }

        let stored = store.get_upload_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, UploadStatus::Completed);
        assert_eq!(stored.filemoon_code.as_deref(), Some("abc"));
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn failed_tasks_can_be_retried_but_not_reprocessed() {
        let (service, store, episode_id, _rx) = setup().await;
        let task = service.queue(episode_id, "BAAC-1", "Film").await.unwrap();
        assert!(service.process_task(task.id).await.is_err());

        assert!(matches!(
            service.process_task(task.id).await,
            Err(UploadError::InvalidState {
                status: UploadStatus::Failed,
                ..
            })
        ));
        // Retry claims the task, then fails again on the missing token.
        assert!(matches!(
            service.retry(task.id).await,
            Err(UploadError::NotConfigured(_))
        ));
        assert!(!store
            .claim_upload_task(task.id, &[UploadStatus::Pending])
            .await
            .unwrap());
    }

    #[test]
    fn filemoon_numbers_parse_from_either_form() {
        assert_eq!(json_to_i32(&serde_json::json!(1432)), Some(1432));
        assert_eq!(json_to_i32(&serde_json::json!("1432.6")), Some(1432));
        assert_eq!(json_to_i32(&serde_json::json!(null)), None);
    }
}
