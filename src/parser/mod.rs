pub mod caption;
pub mod query;

pub use caption::{SeasonEpisode, clean_title, parse_season_episode};
pub use query::{AdvancedQuery, NumericRange, SearchFilters, parse_advanced_query};
