pub use super::bot_sessions::Entity as BotSessions;
pub use super::comments::Entity as Comments;
pub use super::episodes::Entity as Episodes;
pub use super::seasons::Entity as Seasons;
pub use super::shows::Entity as Shows;
pub use super::upload_tasks::Entity as UploadTasks;
pub use super::users::Entity as Users;
pub use super::video_sources::Entity as VideoSources;
pub use super::watch_history::Entity as WatchHistory;
pub use super::watchlist::Entity as Watchlist;
