//! Inline keyboard callbacks.

use std::str::FromStr;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tracing::{error, info};

use super::commands::create_season_for_session;
use super::format::escape;
use super::views::{self, Screen};
use super::{BotContext, admin_key, edit_html};
use crate::models::{BotState, ShowAction};
use crate::services::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CreateSelect(usize),
    CreateCancel,
    SelectShow(i32),
    SeasonCreate(i32),
    SeasonCustom,
    SeasonCancel,
    DocsPage(u64),
}

impl FromStr for CallbackAction {
    type Err = String;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            "create_cancel" => return Ok(Self::CreateCancel),
            "season_custom" => return Ok(Self::SeasonCustom),
            "season_cancel" => return Ok(Self::SeasonCancel),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("create_select_") {
            return suffix_number(data, rest).map(Self::CreateSelect);
        }
        if let Some(rest) = data.strip_prefix("select_show_") {
            return suffix_number(data, rest).map(Self::SelectShow);
        }
        if let Some(rest) = data.strip_prefix("season_create_") {
            return suffix_number(data, rest).map(Self::SeasonCreate);
        }
        if let Some(rest) = data.strip_prefix("docs_page_") {
            return suffix_number(data, rest).map(Self::DocsPage);
        }
        Err(format!("Unknown callback: {data}"))
    }
}

fn suffix_number<T: FromStr>(data: &str, rest: &str) -> Result<T, String> {
    rest.parse()
        .map_err(|_| format!("Unknown callback: {data}"))
}

pub async fn handle_callback(bot: Bot, q: CallbackQuery, ctx: BotContext) -> Result<()> {
    if !ctx.is_admin(q.from.id) {
        bot.answer_callback_query(q.id.clone())
            .text("⛔ Non autorisé")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let action = q.data.as_deref().and_then(|d| d.parse::<CallbackAction>().ok());
    let Some(action) = action else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let admin_id = admin_key(q.from.id);
    info!(admin_id, ?action, "Bot callback");

    match apply(&bot, message.chat.id, message.id, &ctx, admin_id, action).await {
        Ok(()) => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
        Err(e) => {
            error!(admin_id, error = %e, "Callback failed");
            bot.answer_callback_query(q.id.clone())
                .text("❌ Erreur")
                .show_alert(true)
                .await?;
        }
    }
    Ok(())
}

async fn apply(
    bot: &Bot,
    chat: ChatId,
    message_id: MessageId,
    ctx: &BotContext,
    admin_id: i64,
    action: CallbackAction,
) -> Result<()> {
    let screen = match action {
        CallbackAction::CreateSelect(idx) => select_tmdb_result(bot, chat, message_id, ctx, admin_id, idx).await?,
        CallbackAction::CreateCancel => {
            ctx.sessions.reset(admin_id).await?;
            Screen::text("❌ Création annulée.")
        }
        CallbackAction::SelectShow(show_id) => select_show(ctx, admin_id, show_id).await?,
        CallbackAction::SeasonCreate(number) => {
            let session = ctx.sessions.get(admin_id).await?;
            Screen::text(create_season_for_session(ctx, session, number).await?)
        }
        CallbackAction::SeasonCustom => {
            let mut session = ctx.sessions.get(admin_id).await?;
            session.state = BotState::WaitingSeasonNumber;
            ctx.sessions.save(session).await?;
            Screen::text("Envoyez le numéro de saison souhaité:\nExemple: <code>3</code> pour la saison 3")
        }
        CallbackAction::SeasonCancel => Screen::text("❌ Opération annulée."),
        CallbackAction::DocsPage(page) => views::docs_page(ctx, page).await?,
    };

    edit_html(bot, chat, message_id, screen.text, screen.keyboard).await
}

async fn select_tmdb_result(
    bot: &Bot,
    chat: ChatId,
    message_id: MessageId,
    ctx: &BotContext,
    admin_id: i64,
    idx: usize,
) -> Result<Screen> {
    let mut session = ctx.sessions.get(admin_id).await?;
    let Some(pick) = session.data.search_results.get(idx).cloned() else {
        return Ok(Screen::text("❌ Résultat invalide."));
    };

    edit_html(bot, chat, message_id, "⏳ Récupération des détails TMDB...", None).await?;

    match ctx.catalog.import_from_tmdb(pick.tmdb_id, pick.kind).await {
        Ok(imported) => {
            session.select(imported.show.id, Some(imported.season.id));
            session.state = BotState::Idle;
            session.data.search_results.clear();
            ctx.sessions.save(session).await?;
            Ok(views::imported(&imported))
        }
        Err(CatalogError::Duplicate(_)) => {
            // Already imported: select it instead.
            let existing = ctx.store.get_show_by_tmdb_id(pick.tmdb_id).await?;
            let Some(show) = existing else {
                return Ok(Screen::text("❌ Ce show existe déjà."));
            };
            session.select(show.id, None);
            session.state = BotState::Idle;
            session.data.search_results.clear();
            ctx.sessions.save(session).await?;
            Ok(Screen::text(format!(
                "ℹ️ <b>{}</b> existe déjà (ID <code>{}</code>). Il est maintenant sélectionné.",
                escape(&show.title),
                show.id
            )))
        }
        Err(e) => Ok(Screen::text(format!("❌ Erreur: {}", escape(&e.to_string())))),
    }
}

async fn select_show(ctx: &BotContext, admin_id: i64, show_id: i32) -> Result<Screen> {
    let Some(show) = ctx.store.get_show(show_id).await? else {
        return Ok(Screen::text("❌ Show non trouvé."));
    };

    let mut session = ctx.sessions.get(admin_id).await?;
    let latest_season = ctx.store.list_seasons(show.id).await?.last().map(|s| s.id);
    session.select(show.id, latest_season);
    let action = session.data.pending_action.take();
    ctx.sessions.save(session).await?;

    let title = escape(&show.title);
    Ok(match action {
        Some(ShowAction::AddEpisode) => Screen::text(format!(
            "✅ Show sélectionné: <b>{title}</b>\n\nUtilisez maintenant /add pour envoyer des épisodes."
        )),
        Some(ShowAction::CreateSeason) => Screen::text(format!(
            "✅ Show sélectionné: <b>{title}</b>\n\nUtilisez /addf pour créer une saison."
        )),
        Some(ShowAction::View) | None => views::show_details(ctx, show.id).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_callback_data() {
        assert_eq!("create_select_2".parse(), Ok(CallbackAction::CreateSelect(2)));
        assert_eq!("create_cancel".parse(), Ok(CallbackAction::CreateCancel));
        assert_eq!("select_show_17".parse(), Ok(CallbackAction::SelectShow(17)));
        assert_eq!("season_create_3".parse(), Ok(CallbackAction::SeasonCreate(3)));
        assert_eq!("season_custom".parse(), Ok(CallbackAction::SeasonCustom));
        assert_eq!("season_cancel".parse(), Ok(CallbackAction::SeasonCancel));
        assert_eq!("docs_page_4".parse(), Ok(CallbackAction::DocsPage(4)));
    }

    #[test]
    fn rejects_malformed_callback_data() {
        assert!("create_select_x".parse::<CallbackAction>().is_err());
        assert!("docs_page_-1".parse::<CallbackAction>().is_err());
        assert!("something_else".parse::<CallbackAction>().is_err());
    }
}
