use regex::Regex;
use std::sync::OnceLock;

/// Season/episode numbers read from a Telegram caption. `season` stays
/// `None` when the caption only names an episode; callers fall back to the
/// session's current season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonEpisode {
    pub season: Option<i32>,
    pub episode: i32,
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn number(caps: &regex::Captures<'_>, name: &str) -> Option<i32> {
    caps.name(name)?.as_str().parse().ok()
}

/// Tried in order; the first match wins.
fn with_season(caption: &str) -> Option<SeasonEpisode> {
    static SXXEXX: OnceLock<Regex> = OnceLock::new();
    static NXNN: OnceLock<Regex> = OnceLock::new();
    static SEASON_EPISODE: OnceLock<Regex> = OnceLock::new();
    static SAISON_EPISODE: OnceLock<Regex> = OnceLock::new();

    let patterns = [
        get_regex(&SXXEXX, r"(?i)\bS(?P<season>\d{1,3})\s*E(?P<episode>\d{1,4})"),
        get_regex(&NXNN, r"\b(?P<season>\d{1,2})[xX](?P<episode>\d{1,4})\b"),
        get_regex(
            &SEASON_EPISODE,
            r"(?i)\bseason\s*(?P<season>\d{1,3}).*?\bepisode\s*(?P<episode>\d{1,4})",
        ),
        get_regex(
            &SAISON_EPISODE,
            r"(?i)\bsaison\s*(?P<season>\d{1,3}).*?(?:[ée]pisode|ep\.?)\s*(?P<episode>\d{1,4})",
        ),
    ];

    patterns.iter().find_map(|re| {
        let caps = re.captures(caption)?;
        Some(SeasonEpisode {
            season: Some(number(&caps, "season")?),
            episode: number(&caps, "episode")?,
        })
    })
}

fn episode_only(caption: &str) -> Option<SeasonEpisode> {
    static EPISODE_WORD: OnceLock<Regex> = OnceLock::new();
    static EP: OnceLock<Regex> = OnceLock::new();
    static BARE: OnceLock<Regex> = OnceLock::new();

    let patterns = [
        get_regex(&EPISODE_WORD, r"(?i)[ée]pisode\s*(?P<episode>\d{1,4})"),
        get_regex(&EP, r"(?i)\bep\.?\s*(?P<episode>\d{1,4})\b"),
        get_regex(&BARE, r"(?:^|[\s#\-_.\[(])(?P<episode>\d{1,3})(?:$|[\s\-_.\])])"),
    ];

    patterns.iter().find_map(|re| {
        let caps = re.captures(caption)?;
        Some(SeasonEpisode {
            season: None,
            episode: number(&caps, "episode")?,
        })
    })
}

#[must_use]
pub fn parse_season_episode(caption: &str) -> Option<SeasonEpisode> {
    let caption = caption.trim();
    if caption.is_empty() {
        return None;
    }

    with_season(caption)
        .or_else(|| episode_only(caption))
        .filter(|se| se.episode > 0 && se.season.is_none_or(|s| s >= 0))
}

/// Strips season/episode codes and separators from a caption. Falls back to a
/// generated title when nothing readable remains.
#[must_use]
pub fn clean_title(caption: &str) -> String {
    static CODES: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    let codes = get_regex(
        &CODES,
        r"(?i)\bS\d{1,3}\s*E\d{1,4}\b|\b\d{1,2}x\d{1,4}\b|\b(?:season|saison)\s*\d{1,3}\b|[ée]pisode\s*\d{1,4}\b|\bep\.?\s*\d{1,4}\b|\bE\d{1,4}\b|\bS\d{1,3}\b|#\d{1,4}\b",
    );
    let spaces = get_regex(&SPACES, r"\s+");

    let stripped = codes.replace_all(caption, " ");
    let collapsed = spaces.replace_all(&stripped, " ");
    let title = collapsed
        .trim()
        .trim_matches(|c: char| c == '-' || c == '–' || c == '—' || c == '|' || c.is_whitespace());

    if !title.is_empty() {
        return title.to_string();
    }

    match parse_season_episode(caption) {
        Some(SeasonEpisode {
            season: Some(season),
            episode,
        }) => format!("Saison {season} Épisode {episode}"),
        Some(SeasonEpisode { episode, .. }) => format!("Épisode {episode}"),
        None => "Vidéo sans titre".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(caption: &str) -> (Option<i32>, i32) {
        let se = parse_season_episode(caption).unwrap();
        (se.season, se.episode)
    }

    #[test]
    fn test_sxxexx() {
        assert_eq!(parsed("Breaking Bad S01E05"), (Some(1), 5));
        assert_eq!(parsed("show.s02e10.1080p"), (Some(2), 10));
    }

    #[test]
    fn test_cross_format() {
        assert_eq!(parsed("Lost 3x12"), (Some(3), 12));
    }

    #[test]
    fn test_spelled_out() {
        assert_eq!(parsed("Season 2 Episode 7"), (Some(2), 7));
        assert_eq!(parsed("Saison 4 Épisode 11"), (Some(4), 11));
        assert_eq!(parsed("saison 1 episode 3 VF"), (Some(1), 3));
    }

    #[test]
    fn test_episode_only() {
        assert_eq!(parsed("Épisode 5"), (None, 5));
        assert_eq!(parsed("Episode 12 HD"), (None, 12));
        assert_eq!(parsed("Ep 8"), (None, 8));
        assert_eq!(parsed("Ep.9"), (None, 9));
    }

    #[test]
    fn test_bare_number() {
        assert_eq!(parsed("One Piece - 42"), (None, 42));
        assert_eq!(parsed("7"), (None, 7));
    }

    #[test]
    fn test_no_match() {
        assert!(parse_season_episode("").is_none());
        assert!(parse_season_episode("Trailer officiel").is_none());
        assert!(parse_season_episode("Film 1080p 2023").is_none());
        assert!(parse_season_episode("Episode 0").is_none());
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Breaking Bad S01E05"), "Breaking Bad");
        assert_eq!(clean_title("Dark - Saison 2 Épisode 3"), "Dark");
        assert_eq!(clean_title("S01E02"), "Saison 1 Épisode 2");
        assert_eq!(clean_title("Episode 4"), "Épisode 4");
        assert_eq!(clean_title("   "), "Vidéo sans titre");
    }
}
