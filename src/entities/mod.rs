pub mod prelude;

pub mod bot_sessions;
pub mod comments;
pub mod episodes;
pub mod seasons;
pub mod shows;
pub mod upload_tasks;
pub mod users;
pub mod video_sources;
pub mod watch_history;
pub mod watchlist;
