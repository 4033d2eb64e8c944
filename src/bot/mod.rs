//! Admin Telegram bot: catalog management from a private chat.
//!
//! Only user ids listed in `telegram.admin_user_ids` get answers. Everything
//! else is refused (commands) or ignored (media, callbacks).

pub mod callbacks;
pub mod commands;
pub mod format;
pub mod sessions;
pub mod views;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::utils::command::{BotCommands, ParseError};
use tracing::{info, warn};

use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{CatalogService, UploadService};
use sessions::SessionManager;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commandes disponibles :")]
pub enum Command {
    #[command(description = "Démarrer le bot")]
    Start,
    #[command(description = "Aide détaillée")]
    Help,
    #[command(description = "Annuler l'opération en cours")]
    Cancel,
    #[command(description = "Créer un nouveau show", parse_with = rest_of_line)]
    Create(String),
    #[command(description = "Ajouter un épisode")]
    Add,
    #[command(description = "Créer une saison")]
    Addf,
    #[command(description = "Voir un show", parse_with = rest_of_line)]
    View(String),
    #[command(description = "Lister les shows", parse_with = rest_of_line)]
    Docs(String),
    #[command(description = "Finaliser l'upload Filemoon")]
    Done,
}

/// Optional free-text argument; an empty one is allowed.
#[allow(clippy::unnecessary_wraps)]
fn rest_of_line(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Everything a handler needs, injected by the dispatcher.
#[derive(Clone)]
pub struct BotContext {
    pub store: Store,
    pub catalog: Arc<dyn CatalogService>,
    pub tmdb: Arc<TmdbClient>,
    pub uploads: UploadService,
    pub sessions: Arc<SessionManager>,
    pub admins: Arc<HashSet<u64>>,
    pub docs_page_size: u64,
    pub upload_delay: Duration,
    pub frontend_url: Arc<str>,
    pub username: Arc<str>,
}

impl BotContext {
    #[must_use]
    pub fn new(
        config: &Config,
        store: Store,
        catalog: Arc<dyn CatalogService>,
        tmdb: Arc<TmdbClient>,
        uploads: UploadService,
    ) -> Self {
        let sessions = SessionManager::with_cleanup_interval(
            store.clone(),
            config.bot.session_ttl_seconds,
            Duration::from_secs(config.bot.session_cleanup_interval_seconds.max(1)),
        );
        Self {
            store,
            catalog,
            tmdb,
            uploads,
            sessions: Arc::new(sessions),
            admins: Arc::new(config.telegram.admin_user_ids.iter().copied().collect()),
            docs_page_size: config.bot.docs_page_size.max(1),
            upload_delay: Duration::from_millis(config.bot.upload_delay_ms),
            frontend_url: Arc::from(config.server.frontend_url.trim_end_matches('/')),
            username: Arc::from(""),
        }
    }

    #[must_use]
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id.0)
    }
}

/// Telegram user ids fit in `i64`; sessions are keyed by it.
#[must_use]
pub fn admin_key(user_id: UserId) -> i64 {
    i64::try_from(user_id.0).unwrap_or(i64::MAX)
}

/// Sends a new HTML message, optionally with an inline keyboard.
pub async fn send_html(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
    let message = match keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };
    Ok(message)
}

/// Replaces the text (and keyboard) of a message the bot sent earlier.
pub async fn edit_html(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let request = bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Html);
    match keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };
    Ok(())
}

/// Runs the long-polling dispatcher until Ctrl-C.
pub async fn run(mut ctx: BotContext, token: &str, api_base_url: &str) -> Result<()> {
    let mut bot = Bot::new(token);
    if !api_base_url.is_empty() {
        bot = bot.set_api_url(url::Url::parse(api_base_url)?);
    }

    let me = bot.get_me().await?;
    ctx.username = Arc::from(me.username());
    info!(username = %me.username(), admins = ctx.admins.len(), "Telegram bot connected");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(commands::handle_message))
        .branch(Update::filter_callback_query().endpoint(callbacks::handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .default_handler(|_| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram bot stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            Command::parse("/create Le Bureau des Légendes", "zeexbot").unwrap(),
            Command::Create("Le Bureau des Légendes".to_string())
        );
        assert_eq!(Command::parse("/addf", "zeexbot").unwrap(), Command::Addf);
        assert_eq!(
            Command::parse("/docs 2", "zeexbot").unwrap(),
            Command::Docs("2".to_string())
        );
        assert_eq!(
            Command::parse("/view", "zeexbot").unwrap(),
            Command::View(String::new())
        );
        assert!(Command::parse("/unknown", "zeexbot").is_err());
    }

    #[test]
    fn admin_key_saturates() {
        assert_eq!(admin_key(UserId(42)), 42);
        assert_eq!(admin_key(UserId(u64::MAX)), i64::MAX);
    }
}
