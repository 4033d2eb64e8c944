//! Screens the bot either sends fresh (commands) or edits in place (callbacks).

use anyhow::Result;
use std::fmt::Write as _;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::BotContext;
use super::format::{escape, kind_emoji, kind_label, show_line, truncate};
use crate::api::validation::MAX_PAGE;
use crate::models::{Season, Show, ShowFilter, ShowKind, TmdbPick};
use crate::services::ImportedShow;

/// Buttons offered after `/create`.
pub const MAX_TMDB_PICKS: usize = 6;
/// Shows listed by the picker behind `/add`, `/addf` and `/view`.
pub const PICKER_LIMIT: u64 = 20;

pub struct Screen {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Screen {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        if !rows.is_empty() {
            self.keyboard = Some(InlineKeyboardMarkup::new(rows));
        }
        self
    }
}

#[must_use]
pub fn welcome(first_name: &str) -> String {
    format!(
        "🎬 <b>Bienvenue sur ZeeXClub Admin Bot</b>, {}\n\n\
         Commandes disponibles:\n\
         /create &lt;nom&gt; - Créer un nouveau film/série\n\
         /add - Ajouter un épisode (envoyer vidéo avec caption S01E01)\n\
         /addf - Créer une saison\n\
         /view &lt;id&gt; - Voir l'état d'un show\n\
         /docs - Lister tous les shows\n\
         /done - Finaliser l'upload vers Filemoon\n\
         /help - Aide détaillée",
        escape(first_name)
    )
}

pub const HELP: &str = "📚 <b>Guide d'utilisation ZeeXClub Bot</b>\n\n\
<b>Création de contenu:</b>\n\n\
1️⃣ <b>Créer un film/série</b>\n   <code>/create Nom du film</code>\n   Le bot recherche sur TMDB et propose les résultats.\n\n\
2️⃣ <b>Créer une saison</b> (séries uniquement)\n   <code>/addf</code>\n\n\
3️⃣ <b>Ajouter un épisode</b>\n   <code>/add</code>\n   Envoyez la vidéo avec caption: <code>S01E01</code> ou <code>Épisode 1</code>\n\n\
4️⃣ <b>Finaliser l'upload</b>\n   <code>/done</code>\n   Upload vers Filemoon et génération des liens.\n\n\
<b>Gestion:</b>\n\
• <code>/view [ID]</code> - Voir les détails d'un show\n\
• <code>/docs [page]</code> - Lister tous les shows\n\
• <code>/cancel</code> - Annuler l'opération en cours\n\n\
<b>Format des captions:</b>\n\
• <code>S01E01</code> ou <code>s1e1</code> → Saison 1, Épisode 1\n\
• <code>Épisode 5</code> → Saison en cours, Épisode 5\n\
• <code>2x15</code> → Saison 2, Épisode 15";

#[must_use]
pub fn tmdb_picks(picks: &[TmdbPick]) -> Screen {
    let mut text = String::from("Plusieurs résultats trouvés. Choisissez:\n\n");
    let mut rows = Vec::new();

    for (idx, pick) in picks.iter().enumerate() {
        let year = pick.year.as_deref().unwrap_or("N/A");
        let _ = writeln!(
            text,
            "{}. {} <b>{}</b> ({year})",
            idx + 1,
            kind_emoji(pick.kind),
            escape(&pick.title)
        );
        rows.push(vec![InlineKeyboardButton::callback(
            format!("{} {} ({year})", kind_emoji(pick.kind), pick.title),
            format!("create_select_{idx}"),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "❌ Annuler",
        "create_cancel",
    )]);

    Screen::text(text).with_keyboard(rows)
}

#[must_use]
pub fn imported(imported: &ImportedShow) -> Screen {
    let show = &imported.show;
    let genres: Vec<&str> = show.genres.iter().take(3).map(String::as_str).collect();
    let overview = show.overview.as_deref().unwrap_or("Pas de synopsis");

    Screen::text(format!(
        "✅ <b>Show créé avec succès!</b>\n\n\
         {} <b>{}</b>\n\
         📅 {}\n\
         ⭐ {}/10\n\
         🎭 {}\n\
         📝 <i>{}</i>\n\n\
         📁 {} créée\n\
         ID: <code>{}</code>\n\n\
         Prochaines étapes:\n\
         • /add - Ajouter des épisodes\n\
         • /addf - Gérer les saisons\n\
         • /view - Voir les détails",
        kind_emoji(show.kind),
        escape(&show.title),
        show.release_date.as_deref().unwrap_or("N/A"),
        show.rating.map_or_else(|| "N/A".to_string(), |r| format!("{r:.1}")),
        escape(&genres.join(", ")),
        escape(&truncate(overview, 200)),
        escape(&imported.season.name),
        show.id
    ))
}

/// Inline list of recent shows; the chosen id comes back as `select_show_{id}`.
pub async fn show_picker(ctx: &BotContext) -> Result<Screen> {
    let filter = ShowFilter {
        include_inactive: true,
        limit: PICKER_LIMIT,
        ..Default::default()
    };
    let (shows, _) = ctx.store.list_shows(&filter).await?;
    if shows.is_empty() {
        return Ok(Screen::text(
            "❌ Aucun show trouvé. Créez-en un avec /create",
        ));
    }

    let rows = shows
        .iter()
        .map(|show| {
            vec![InlineKeyboardButton::callback(
                format!("{} {}", kind_emoji(show.kind), show.title),
                format!("select_show_{}", show.id),
            )]
        })
        .collect();
    Ok(Screen::text("📋 Sélectionnez un show:").with_keyboard(rows))
}

pub async fn show_details(ctx: &BotContext, show_id: i32) -> Result<Screen> {
    let Some(show) = ctx.store.get_show(show_id).await? else {
        return Ok(Screen::text("❌ Show non trouvé."));
    };

    let seasons = ctx.store.list_seasons(show_id).await?;
    let mut total_episodes = 0;
    let mut lines = Vec::with_capacity(seasons.len());
    for season in &seasons {
        let count = ctx.store.count_episodes_for_season(season.id).await?;
        total_episodes += count;
        lines.push(format!("{}: {count} ép.", escape(&season.name)));
    }

    let mut text = format!(
        "📊 <b>{}</b>\n{}\n⭐ {}/10\n📅 {}\n👁 {} vues\n\n📝 <i>{}</i>\n\n📁 <b>Saisons:</b> {}\n🎬 <b>Épisodes:</b> {total_episodes}\n",
        escape(&show.title),
        kind_label(show.kind),
        show.rating.map_or_else(|| "N/A".to_string(), |r| format!("{r:.1}")),
        show.release_date.as_deref().unwrap_or("N/A"),
        show.views,
        escape(&truncate(show.overview.as_deref().unwrap_or("Pas de synopsis"), 300)),
        seasons.len(),
    );
    if !lines.is_empty() {
        text.push('\n');
        text.push_str(&lines.join("\n"));
    }
    let _ = write!(text, "\n\n🆔 <code>{}</code>", show.id);
    if !ctx.frontend_url.is_empty() {
        let _ = write!(text, "\n🔗 {}/show/{}", ctx.frontend_url, show.id);
    }

    Ok(Screen::text(text))
}

pub async fn docs_page(ctx: &BotContext, page: u64) -> Result<Screen> {
    let page = page.clamp(1, MAX_PAGE);
    let limit = ctx.docs_page_size;
    let offset = page.saturating_sub(1).saturating_mul(limit);
    let filter = ShowFilter {
        include_inactive: true,
        offset,
        limit,
        ..Default::default()
    };
    let (shows, total) = ctx.store.list_shows(&filter).await?;
    if shows.is_empty() {
        return Ok(Screen::text("📭 Aucun show trouvé."));
    }

    let total_pages = total.div_ceil(limit).max(1);
    let mut text = format!("📋 <b>Liste des shows</b> (Page {page}/{total_pages})\n\n");
    for (position, show) in (offset + 1..).zip(&shows) {
        text.push_str(&show_line(position, show));
        text.push_str("\n\n");
    }

    let mut nav = Vec::new();
    if page > 1 {
        nav.push(InlineKeyboardButton::callback(
            "⬅️ Précédent",
            format!("docs_page_{}", page - 1),
        ));
    }
    if page < total_pages {
        nav.push(InlineKeyboardButton::callback(
            "Suivant ➡️",
            format!("docs_page_{}", page + 1),
        ));
    }
    let rows = if nav.is_empty() { Vec::new() } else { vec![nav] };

    Ok(Screen::text(text).with_keyboard(rows))
}

/// `/addf` menu: create the next season, pick a number, or cancel.
#[must_use]
pub fn season_menu(show: &Show, seasons: &[Season]) -> Screen {
    let next = next_season_number(seasons);
    let rows = vec![
        vec![InlineKeyboardButton::callback(
            format!("Créer Saison {next}"),
            format!("season_create_{next}"),
        )],
        vec![InlineKeyboardButton::callback(
            "Autre numéro...",
            "season_custom",
        )],
        vec![InlineKeyboardButton::callback("❌ Annuler", "season_cancel")],
    ];

    Screen::text(format!(
        "📁 Gestion des saisons pour <b>{}</b>\n\nSaisons existantes: {}\nQuelle action souhaitez-vous?",
        escape(&show.title),
        seasons.len()
    ))
    .with_keyboard(rows)
}

/// One past the highest numbered season, never below 1.
#[must_use]
pub fn next_season_number(seasons: &[Season]) -> i32 {
    seasons
        .iter()
        .map(|s| s.season_number)
        .max()
        .map_or(1, |n| (n + 1).max(1))
}

#[must_use]
pub const fn kind_hint(kind: ShowKind) -> &'static str {
    match kind {
        ShowKind::Movie => "Envoyez la vidéo du film (caption optionnelle).",
        ShowKind::Series => {
            "Envoyez la vidéo avec caption indiquant la saison et l'épisode:\n\
             • <code>S01E01</code> ou <code>s1e1</code>\n\
             • <code>Épisode 5</code>\n\
             • <code>2x15</code> (saison 2, ép 15)"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn season(number: i32) -> Season {
        Season {
            id: number + 100,
            show_id: 1,
            season_number: number,
            name: format!("Saison {number}"),
            poster_path: None,
            overview: None,
            air_date: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_next_season_number() {
        assert_eq!(next_season_number(&[]), 1);
        assert_eq!(next_season_number(&[season(0)]), 1);
        assert_eq!(next_season_number(&[season(1), season(3)]), 4);
    }

    #[test]
    fn picks_end_with_cancel_button() {
        let picks = vec![TmdbPick {
            tmdb_id: 1,
            kind: ShowKind::Movie,
            title: "Amélie <3".to_string(),
            year: Some("2001".to_string()),
        }];
        let screen = tmdb_picks(&picks);
        assert!(screen.text.contains("Amélie &lt;3"));
        let keyboard = screen.keyboard.unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[1][0].text, "❌ Annuler");
    }
}
