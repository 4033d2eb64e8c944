//! Events published on the in-process bus and streamed to admin clients over SSE.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    ShowCreated {
        show_id: i32,
        title: String,
    },
    EpisodeAdded {
        show_id: i32,
        season_number: i32,
        episode_number: i32,
    },

    UploadQueued {
        task_id: i32,
        title: String,
    },
    UploadProgress {
        task_id: i32,
        progress: i32,
    },
    UploadCompleted {
        task_id: i32,
        filemoon_code: String,
    },
    UploadFailed {
        task_id: i32,
        error: String,
    },
}

impl NotificationEvent {
    /// SSE event name, so browsers can `addEventListener` per kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ShowCreated { .. } => "show_created",
            Self::EpisodeAdded { .. } => "episode_added",
            Self::UploadQueued { .. } => "upload_queued",
            Self::UploadProgress { .. } => "upload_progress",
            Self::UploadCompleted { .. } => "upload_completed",
            Self::UploadFailed { .. } => "upload_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacently_tagged() {
        let json = serde_json::to_value(NotificationEvent::UploadProgress {
            task_id: 3,
            progress: 40,
        })
        .unwrap();
        assert_eq!(json["type"], "UploadProgress");
        assert_eq!(json["payload"]["progress"], 40);
    }

    #[test]
    fn kind_names() {
        let event = NotificationEvent::UploadFailed {
            task_id: 1,
            error: "boom".to_string(),
        };
        assert_eq!(event.kind(), "upload_failed");
    }
}
