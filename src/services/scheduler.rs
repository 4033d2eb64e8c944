use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::db::Store;
use crate::services::upload::UploadService;

/// Background maintenance: expired bot sessions and stuck uploads.
pub struct Scheduler {
    store: Store,
    uploads: UploadService,
    config: SchedulerConfig,
    session_ttl_seconds: u64,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        store: Store,
        uploads: UploadService,
        config: SchedulerConfig,
        session_ttl_seconds: u64,
    ) -> Self {
        Self {
            store,
            uploads,
            config,
            session_ttl_seconds,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let running = Arc::clone(&self.running);
        let ttl = self.session_ttl_seconds;
        let session_job = Job::new_async(self.config.session_cleanup_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let start = Instant::now();
                match purge_expired_sessions(&store, ttl).await {
                    Ok(purged) => info!(
                        event = "job_finished",
                        job_name = "purge_bot_sessions",
                        purged,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Expired bot sessions purged"
                    ),
                    Err(e) => error!(event = "job_failed", job_name = "purge_bot_sessions", error = %e, "Session cleanup failed"),
                }
            })
        })?;

        let store = self.store.clone();
        let uploads = self.uploads.clone();
        let running = Arc::clone(&self.running);
        let grace = self.config.upload_grace_minutes;
        let upload_job = Job::new_async(self.config.upload_retry_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let uploads = uploads.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let start = Instant::now();
                info!(event = "job_started", job_name = "retry_uploads", "Retrying stale uploads");
                match retry_stale_uploads(&store, &uploads, grace).await {
                    Ok(retried) => info!(
                        event = "job_finished",
                        job_name = "retry_uploads",
                        retried,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Stale uploads retried"
                    ),
                    Err(e) => error!(event = "job_failed", job_name = "retry_uploads", error = %e, "Upload retry failed"),
                }
            })
        })?;

        sched.add(session_job).await?;
        sched.add(upload_job).await?;
        sched.start().await?;

        info!("Session cleanup scheduled: {}", self.config.session_cleanup_cron);
        info!("Upload retry scheduled: {}", self.config.upload_retry_cron);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }
}

/// Drops persisted bot sessions idle for longer than `ttl_seconds`.
pub async fn purge_expired_sessions(store: &Store, ttl_seconds: u64) -> Result<u64> {
    let ttl = chrono::Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX / 1000));
    store.purge_bot_sessions(Utc::now() - ttl).await
}

/// Pushes pending uploads older than `grace_minutes` through the pipeline.
///
/// Failures are recorded on the task itself; the sweep keeps going.
pub async fn retry_stale_uploads(
    store: &Store,
    uploads: &UploadService,
    grace_minutes: i64,
) -> Result<usize> {
    let cutoff = Utc::now() - chrono::Duration::minutes(grace_minutes.max(0));
    let stale = store.list_stale_upload_tasks(cutoff).await?;
    let mut processed = 0;

    for task in stale {
        processed += 1;
        if let Err(e) = uploads.process_task(task.id).await {
            warn!(task_id = task.id, error = %e, "Stale upload failed again");
        }
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BotSession;

    #[tokio::test]
    async fn purge_keeps_fresh_sessions() {
        let store = Store::new("sqlite::memory:").await.unwrap();

        let mut stale = BotSession::new(1);
        stale.last_activity = Utc::now() - chrono::Duration::hours(3);
        store.save_bot_session(&stale).await.unwrap();
        store.save_bot_session(&BotSession::new(2)).await.unwrap();

        let purged = purge_expired_sessions(&store, 3600).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get_bot_session(1).await.unwrap().is_none());
        assert!(store.get_bot_session(2).await.unwrap().is_some());
    }
}
