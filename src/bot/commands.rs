//! Command, text and media handlers.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use super::format::{self, escape};
use super::views::{self, MAX_TMDB_PICKS};
use super::{BotContext, Command, admin_key, edit_html, send_html};
use crate::models::{
    BotSession, BotState, NewEpisode, NewSeason, NewVideoSource, PendingUpload, ServerName,
    ShowAction, ShowKind, TmdbPick,
};
use crate::parser::{SeasonEpisode, clean_title, parse_season_episode};
use crate::services::CatalogError;

const NOT_ADMIN: &str = "⛔ Vous n'êtes pas autorisé à utiliser ce bot.";
const UNKNOWN: &str =
    "❓ Commande non reconnue.\nUtilisez /help pour voir les commandes disponibles.";
const VIDEO_HINT: &str = "⚠️ Vous avez envoyé une vidéo sans utiliser /add d'abord.\n\n\
Pour ajouter un épisode:\n\
1. Utilisez /create pour créer un show\n\
2. Puis /add pour ajouter des épisodes\n\
3. Envoyez la vidéo avec caption S01E01";
const NO_EPISODE: &str = "❌ Impossible de détecter le numéro d'épisode.\n\
Veuillez inclure dans la caption:\n\
• <code>S01E05</code> pour Saison 1 Épisode 5\n\
• <code>Épisode 3</code> pour l'épisode 3 de la saison en cours";

/// Telegram media reduced to what the catalog stores.
struct IncomingFile {
    file_id: String,
    file_size: Option<u64>,
    duration: Option<u32>,
    mime_type: Option<String>,
}

impl IncomingFile {
    fn from_message(msg: &Message) -> Option<Self> {
        if let Some(video) = msg.video() {
            return Some(Self {
                file_id: video.file.id.clone(),
                file_size: Some(u64::from(video.file.size)),
                duration: Some(video.duration),
                mime_type: video.mime_type.as_ref().map(ToString::to_string),
            });
        }
        msg.document().map(|doc| Self {
            file_id: doc.file.id.clone(),
            file_size: Some(u64::from(doc.file.size)),
            duration: None,
            mime_type: doc.mime_type.as_ref().map(ToString::to_string),
        })
    }
}

/// Entry point for every private message.
pub async fn handle_message(bot: Bot, msg: Message, ctx: BotContext) -> Result<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id;
    let first_name = user.first_name.clone();

    if !ctx.is_admin(user_id) {
        if msg.text().is_some_and(|t| t.starts_with('/')) {
            send_html(&bot, msg.chat.id, NOT_ADMIN, None).await?;
        }
        return Ok(());
    }

    let admin_id = admin_key(user_id);
    let outcome = if let Some(text) = msg.text() {
        match Command::parse(text, &ctx.username) {
            Ok(command) => {
                handle_command(&bot, &msg, &ctx, admin_id, &first_name, command).await
            }
            Err(_) => handle_text(&bot, msg.chat.id, &ctx, admin_id, text).await,
        }
    } else if let Some(file) = IncomingFile::from_message(&msg) {
        handle_video(&bot, &msg, &ctx, admin_id, file).await
    } else {
        Ok(())
    };

    if let Err(e) = outcome {
        error!(admin_id, error = %e, "Bot handler failed");
        send_html(
            &bot,
            msg.chat.id,
            format!("❌ Erreur: {}", escape(&e.to_string())),
            None,
        )
        .await?;
    }
    Ok(())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    admin_id: i64,
    first_name: &str,
    command: Command,
) -> Result<()> {
    let chat = msg.chat.id;
    info!(admin_id, ?command, "Bot command");

    match command {
        Command::Start => {
            ctx.sessions.reset(admin_id).await?;
            send_html(bot, chat, views::welcome(first_name), None).await?;
        }
        Command::Help => {
            send_html(bot, chat, views::HELP, None).await?;
        }
        Command::Cancel => {
            ctx.sessions.reset(admin_id).await?;
            send_html(bot, chat, "❌ Opération annulée. Vous pouvez recommencer.", None).await?;
        }
        Command::Create(query) => create(bot, chat, ctx, admin_id, &query).await?,
        Command::Add => add(bot, chat, ctx, admin_id).await?,
        Command::Addf => addf(bot, chat, ctx, admin_id).await?,
        Command::View(arg) => {
            let arg = arg.trim();
            let screen = if arg.is_empty() {
                remember_action(ctx, admin_id, ShowAction::View).await?;
                views::show_picker(ctx).await?
            } else if let Ok(show_id) = arg.parse::<i32>() {
                views::show_details(ctx, show_id).await?
            } else {
                views::Screen::text("❌ ID invalide. Usage: <code>/view 12</code>")
            };
            send_html(bot, chat, screen.text, screen.keyboard).await?;
        }
        Command::Docs(arg) => {
            let page = arg.trim().parse::<u64>().unwrap_or(1);
            let screen = views::docs_page(ctx, page).await?;
            send_html(bot, chat, screen.text, screen.keyboard).await?;
        }
        Command::Done => done(bot, chat, ctx, admin_id).await?,
    }
    Ok(())
}

async fn remember_action(ctx: &BotContext, admin_id: i64, action: ShowAction) -> Result<()> {
    let mut session = ctx.sessions.get(admin_id).await?;
    session.data.pending_action = Some(action);
    ctx.sessions.save(session).await?;
    Ok(())
}

async fn create(bot: &Bot, chat: ChatId, ctx: &BotContext, admin_id: i64, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        send_html(
            bot,
            chat,
            "❌ Usage: <code>/create Nom du film ou série</code>\nExemple: <code>/create Avengers Endgame</code>",
            None,
        )
        .await?;
        return Ok(());
    }

    send_html(
        bot,
        chat,
        format!("🔍 Recherche de <b>{}</b> sur TMDB...", escape(query)),
        None,
    )
    .await?;

    let mut picks = Vec::new();
    for kind in [ShowKind::Movie, ShowKind::Series] {
        match ctx.tmdb.search(query, kind).await {
            Ok(results) => picks.extend(results.into_iter().take(5).map(|r| TmdbPick {
                tmdb_id: r.tmdb_id,
                kind,
                year: r.year().map(ToString::to_string),
                title: r.title,
            })),
            Err(e) => warn!(error = %e, kind = %kind, "TMDB search failed"),
        }
    }
    picks.truncate(MAX_TMDB_PICKS);

    if picks.is_empty() {
        send_html(bot, chat, "❌ Aucun résultat trouvé sur TMDB.", None).await?;
        return Ok(());
    }

    let screen = views::tmdb_picks(&picks);
    let mut session = ctx.sessions.get(admin_id).await?;
    session.state = BotState::SelectingShow;
    session.data.search_results = picks;
    ctx.sessions.save(session).await?;

    send_html(bot, chat, screen.text, screen.keyboard).await?;
    Ok(())
}

async fn add(bot: &Bot, chat: ChatId, ctx: &BotContext, admin_id: i64) -> Result<()> {
    let mut session = ctx.sessions.get(admin_id).await?;
    let show = match session.current_show_id {
        Some(id) => ctx.store.get_show(id).await?,
        None => None,
    };

    let Some(show) = show else {
        remember_action(ctx, admin_id, ShowAction::AddEpisode).await?;
        let screen = views::show_picker(ctx).await?;
        send_html(bot, chat, screen.text, screen.keyboard).await?;
        return Ok(());
    };

    session.state = BotState::WaitingVideo;
    ctx.sessions.save(session).await?;

    send_html(
        bot,
        chat,
        format!(
            "📤 Envoi d'épisode pour: <b>{}</b>\n\n{}\n\n<i>Le fichier sera stocké sur Telegram en attendant l'upload Filemoon.</i>",
            escape(&show.title),
            views::kind_hint(show.kind)
        ),
        None,
    )
    .await?;
    Ok(())
}

async fn addf(bot: &Bot, chat: ChatId, ctx: &BotContext, admin_id: i64) -> Result<()> {
    let session = ctx.sessions.get(admin_id).await?;
    let show = match session.current_show_id {
        Some(id) => ctx.store.get_show(id).await?,
        None => None,
    };

    let Some(show) = show else {
        remember_action(ctx, admin_id, ShowAction::CreateSeason).await?;
        let screen = views::show_picker(ctx).await?;
        send_html(bot, chat, screen.text, screen.keyboard).await?;
        return Ok(());
    };

    if show.kind == ShowKind::Movie {
        send_html(bot, chat, "❌ Les films n'ont pas de saisons!", None).await?;
        return Ok(());
    }

    let seasons = ctx.store.list_seasons(show.id).await?;
    let screen = views::season_menu(&show, &seasons);
    send_html(bot, chat, screen.text, screen.keyboard).await?;
    Ok(())
}

/// Creates season `number` for the session's show and makes it current.
/// Returns the confirmation or error text to show the admin.
pub async fn create_season_for_session(
    ctx: &BotContext,
    mut session: BotSession,
    number: i32,
) -> Result<String> {
    let Some(show_id) = session.current_show_id else {
        return Ok("❌ Erreur: Aucun show sélectionné.".to_string());
    };

    match ctx
        .catalog
        .create_season(show_id, &NewSeason::numbered(number))
        .await
    {
        Ok(season) => {
            session.current_season_id = Some(season.id);
            session.state = BotState::Idle;
            ctx.sessions.save(session).await?;
            Ok(format!(
                "✅ <b>Saison {number} créée!</b>\n\nVous pouvez maintenant ajouter des épisodes avec /add"
            ))
        }
        Err(CatalogError::Duplicate(_)) => Ok(format!("❌ La saison {number} existe déjà!")),
        Err(e) => Err(e.into()),
    }
}

async fn handle_text(
    bot: &Bot,
    chat: ChatId,
    ctx: &BotContext,
    admin_id: i64,
    text: &str,
) -> Result<()> {
    let session = ctx.sessions.get(admin_id).await?;
    if session.state != BotState::WaitingSeasonNumber {
        send_html(bot, chat, UNKNOWN, None).await?;
        return Ok(());
    }

    let text = text.trim();
    let number = if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse::<i32>().ok()
    } else {
        None
    };
    let Some(number) = number else {
        send_html(bot, chat, "❌ Veuillez entrer un numéro valide (ex: 3)", None).await?;
        return Ok(());
    };

    let reply = create_season_for_session(ctx, session, number).await?;
    send_html(bot, chat, reply, None).await?;
    Ok(())
}

async fn handle_video(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    admin_id: i64,
    file: IncomingFile,
) -> Result<()> {
    let chat = msg.chat.id;
    let mut session = ctx.sessions.get(admin_id).await?;
    if session.state != BotState::WaitingVideo {
        send_html(bot, chat, VIDEO_HINT, None).await?;
        return Ok(());
    }

    let show = match session.current_show_id {
        Some(id) => ctx.store.get_show(id).await?,
        None => None,
    };
    let Some(show) = show else {
        send_html(
            bot,
            chat,
            "❌ Erreur: Aucun show sélectionné. Utilisez /create d'abord.",
            None,
        )
        .await?;
        return Ok(());
    };

    let caption = msg.caption().unwrap_or_default().trim();
    let current_season = match session.current_season_id {
        Some(id) => ctx.store.get_season(id).await?,
        None => None,
    };

    let parsed = parse_season_episode(caption).or(match show.kind {
        // A movie is a single video; the caption may say nothing.
        ShowKind::Movie => Some(SeasonEpisode {
            season: None,
            episode: 1,
        }),
        ShowKind::Series => None,
    });
    let Some(parsed) = parsed else {
        send_html(bot, chat, NO_EPISODE, None).await?;
        return Ok(());
    };

    let fallback_season = match show.kind {
        ShowKind::Movie => 0,
        ShowKind::Series => 1,
    };
    let season_number = parsed
        .season
        .or_else(|| current_season.as_ref().map(|s| s.season_number))
        .unwrap_or(fallback_season);
    let episode_number = parsed.episode;

    let season = match ctx.store.get_season_by_number(show.id, season_number).await? {
        Some(season) => season,
        None => {
            let season = ctx
                .catalog
                .create_season(show.id, &NewSeason::numbered(season_number))
                .await?;
            send_html(
                bot,
                chat,
                format!("📁 Saison {season_number} créée automatiquement."),
                None,
            )
            .await?;
            season
        }
    };

    let episode = match ctx
        .store
        .get_episode_by_number(season.id, episode_number)
        .await?
    {
        Some(existing) => existing,
        None => {
            let mut new_episode = NewEpisode::numbered(episode_number);
            if !caption.is_empty() {
                new_episode.title = Some(clean_title(caption));
            }
            new_episode.runtime = file
                .duration
                .and_then(|d| i32::try_from(d / 60).ok())
                .filter(|m| *m > 0);
            ctx.catalog.create_episode(season.id, &new_episode).await?
        }
    };

    let source = NewVideoSource {
        server_name: ServerName::Telegram,
        link: format!("/api/stream/telegram/{}", file.file_id),
        file_id: Some(file.file_id.clone()),
        filemoon_code: None,
        quality: None,
        language: None,
        file_size: file.file_size.and_then(|s| i64::try_from(s).ok()),
        duration: file.duration.and_then(|d| i32::try_from(d).ok()),
        mime_type: file.mime_type.clone(),
    };
    ctx.catalog.create_source(episode.id, &source).await?;

    let title = format::upload_title(&show.title, season_number, episode_number);
    let task = ctx
        .uploads
        .queue(episode.id, &file.file_id, &title)
        .await?;

    session.current_season_id = Some(season.id);
    session.current_episode_id = Some(episode.id);
    session.data.pending_uploads.push(PendingUpload {
        task_id: task.id,
        episode_id: episode.id,
        file_id: file.file_id.clone(),
        title,
    });
    let queued = session.data.pending_uploads.len();
    ctx.sessions.save(session).await?;

    send_html(
        bot,
        chat,
        format!(
            "✅ Épisode ajouté!\n\n📺 <b>{}</b>\n📁 Saison {season_number}\n🎬 Épisode {episode_number}\n💾 {} | ⏱ {}\n🆔 <code>{}</code>\n\n{queued} fichier(s) en attente. Envoyez d'autres épisodes ou tapez /done pour uploader vers Filemoon.",
            escape(&show.title),
            format::file_size(file.file_size),
            format::duration(file.duration),
            escape(&file.file_id),
        ),
        None,
    )
    .await?;
    Ok(())
}

async fn done(bot: &Bot, chat: ChatId, ctx: &BotContext, admin_id: i64) -> Result<()> {
    let mut session = ctx.sessions.get(admin_id).await?;
    let pending = std::mem::take(&mut session.data.pending_uploads);
    if pending.is_empty() {
        send_html(
            bot,
            chat,
            "❌ Aucun upload en attente.\nUtilisez d'abord /add pour ajouter des épisodes.",
            None,
        )
        .await?;
        return Ok(());
    }

    let total = pending.len();
    send_html(
        bot,
        chat,
        format!("🚀 Démarrage de l'upload Filemoon pour {total} fichier(s)..."),
        None,
    )
    .await?;

    let mut succeeded = 0;
    for (idx, upload) in pending.iter().enumerate() {
        let position = idx + 1;
        let progress = send_html(
            bot,
            chat,
            format!(
                "⏳ Upload {position}/{total}: Envoi à Filemoon...\n{}",
                format::progress_bar(idx, total, 10)
            ),
            None,
        )
        .await?;

        let text = match ctx.uploads.process_task(upload.task_id).await {
            Ok(task) => {
                succeeded += 1;
                format!(
                    "✅ Upload terminé: <b>{}</b>\nCode: <code>{}</code>\n{}",
                    escape(&upload.title),
                    escape(task.filemoon_code.as_deref().unwrap_or_default()),
                    format::progress_bar(position, total, 10)
                )
            }
            Err(e) => format!(
                "❌ Échec pour <b>{}</b>: {}",
                escape(&upload.title),
                escape(&e.to_string())
            ),
        };
        edit_html(bot, chat, progress.id, text, None).await?;

        if position < total {
            tokio::time::sleep(ctx.upload_delay).await;
        }
    }

    ctx.sessions.save(session).await?;
    send_html(
        bot,
        chat,
        format!("✅ Tous les uploads sont terminés! ({succeeded}/{total} réussis)"),
        None,
    )
    .await?;
    Ok(())
}
