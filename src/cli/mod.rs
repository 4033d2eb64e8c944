//! Command-line interface, parsed with clap.

pub mod commands;

use clap::{Parser, Subcommand};

use crate::models::ShowKind;

/// ZeeXClub - streaming catalog backend
/// REST API, Telegram admin bot and upload worker in one binary
#[derive(Parser)]
#[command(name = "zeexclub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the API, the admin bot and the scheduler
    #[command(alias = "daemon")]
    Serve,

    /// Run the REST API only
    Api,

    /// Run the Telegram admin bot only
    Bot,

    /// Print catalog statistics
    Stats,

    /// Search the local catalog
    #[command(alias = "s")]
    Search {
        /// Search query, advanced syntax allowed
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Import a title from TMDB
    Import {
        /// TMDB id
        tmdb_id: i32,
        /// movie or series
        #[arg(long, default_value = "movie", value_parser = parse_kind)]
        kind: ShowKind,
    },

    /// Set a new password for an account and rotate its API key
    ResetPassword {
        username: String,
        /// The new password
        password: String,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

fn parse_kind(raw: &str) -> Result<ShowKind, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_kind() {
        let cli = Cli::try_parse_from(["zeexclub", "import", "1396", "--kind", "tv"]).unwrap();
        match cli.command {
            Some(Commands::Import { tmdb_id, kind }) => {
                assert_eq!(tmdb_id, 1396);
                assert_eq!(kind, ShowKind::Series);
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn parses_reset_password() {
        let cli =
            Cli::try_parse_from(["zeexclub", "reset-password", "admin", "nouveau-secret"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::ResetPassword { ref username, ref password })
                if username == "admin" && password == "nouveau-secret"
        ));
    }

    #[test]
    fn no_command_is_allowed() {
        let cli = Cli::try_parse_from(["zeexclub"]).unwrap();
        assert!(cli.command.is_none());
    }
}
