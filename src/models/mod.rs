pub mod catalog;
pub mod engagement;
pub mod session;
pub mod upload;

pub use catalog::{
    CatalogStats, Episode, EpisodeUpdate, NewEpisode, NewSeason, NewShow, NewVideoSource, Season,
    SeasonUpdate, ServerName, Show, ShowFilter, ShowKind, ShowSort, ShowUpdate, SortOrder,
    SourceUpdate, VideoSource,
};
pub use engagement::{Comment, HistoryEntry, ProgressUpdate, WatchlistEntry};
pub use session::{BotSession, BotState, PendingUpload, SessionData, ShowAction, TmdbPick};
pub use upload::{UploadStatus, UploadTask, UploadTaskUpdate};
