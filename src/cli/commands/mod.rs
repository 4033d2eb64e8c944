mod account;
mod import;
mod search;
mod stats;

pub use account::cmd_reset_password;
pub use import::cmd_import;
pub use search::cmd_search;
pub use stats::cmd_stats;
