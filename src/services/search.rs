//! In-memory relevance ranking over catalog rows.
//!
//! The store narrows candidates with a cheap `LIKE`/filter query; this engine
//! scores what comes back so typos and partial titles still rank sensibly.

use std::collections::HashMap;
use std::fmt::Write as _;

use regex::RegexBuilder;
use serde::Serialize;

use crate::models::Show;
use crate::parser::{AdvancedQuery, SearchFilters};

pub const DEFAULT_MIN_SCORE: f64 = 0.3;
const TITLE_WEIGHT: f64 = 1.5;
const MULTI_FIELD_BONUS: f64 = 1.1;
const FUZZY_THRESHOLD: f64 = 0.6;
const WORD_MATCH_THRESHOLD: f64 = 0.8;
const SUGGEST_CUTOFF: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Overview,
    Genres,
}

impl SearchField {
    const fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Overview => "overview",
            Self::Genres => "genres",
        }
    }

    fn value(self, show: &Show) -> String {
        match self {
            Self::Title => show.title.clone(),
            Self::Overview => show.overview.clone().unwrap_or_default(),
            Self::Genres => show.genres.join(", "),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub show: Show,
    pub score: f64,
    pub matched_fields: Vec<String>,
    /// HTML-escaped title with matches wrapped in `<mark>`.
    pub highlighted_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact,
    Start,
    Contains,
    Words,
    Fuzzy,
}

impl MatchKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Start => "start",
            Self::Contains => "contains",
            Self::Words => "words",
            Self::Fuzzy => "fuzzy",
        }
    }
}

struct Scored {
    score: f64,
    raw: f64,
    matched: Vec<String>,
    title_match: Option<MatchKind>,
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    min_score: f64,
    fields: Vec<SearchField>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            fields: vec![SearchField::Title, SearchField::Overview],
        }
    }
}

impl SearchEngine {
    #[must_use]
    pub fn new(min_score: f64, fields: Vec<SearchField>) -> Self {
        Self { min_score, fields }
    }

    /// Ranks `items` against `query`, best first, at most `limit` hits.
    #[must_use]
    pub fn search(
        &self,
        query: &str,
        items: Vec<Show>,
        filters: &SearchFilters,
        limit: usize,
    ) -> Vec<SearchHit> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || items.is_empty() {
            return Vec::new();
        }
        let words: Vec<&str> = query.split_whitespace().collect();

        let mut ranked: Vec<(SearchHit, f64)> = items
            .into_iter()
            .filter(|show| matches_filters(show, filters))
            .filter_map(|show| {
                let scored = self.score(&show, &query, &words);
                (scored.score >= self.min_score).then(|| {
                    let hit = SearchHit {
                        highlighted_title: highlight_title(
                            &show.title,
                            &query,
                            &words,
                            scored.title_match,
                        ),
                        show,
                        score: scored.score,
                        matched_fields: scored.matched,
                    };
                    (hit, scored.raw)
                })
            })
            .collect();

        // Capped scores tie easily; the uncapped value keeps exact title
        // matches ahead of partial ones.
        ranked.sort_by(|a, b| b.0.score.total_cmp(&a.0.score).then(b.1.total_cmp(&a.1)));
        ranked.into_iter().take(limit).map(|(hit, _)| hit).collect()
    }

    /// Runs a parsed advanced query. An empty free-text part only filters.
    #[must_use]
    pub fn advanced_search(
        &self,
        query: &AdvancedQuery,
        items: Vec<Show>,
        limit: usize,
    ) -> Vec<SearchHit> {
        if !query.text.trim().is_empty() {
            return self.search(&query.text, items, &query.filters, limit);
        }

        items
            .into_iter()
            .filter(|show| matches_filters(show, &query.filters))
            .take(limit)
            .map(|show| SearchHit {
                highlighted_title: html_escape::encode_text(&show.title).into_owned(),
                show,
                score: 1.0,
                matched_fields: Vec::new(),
            })
            .collect()
    }

    fn score(&self, show: &Show, query: &str, words: &[&str]) -> Scored {
        let mut best: f64 = 0.0;
        let mut matched = Vec::new();
        let mut title_match = None;

        for &field in &self.fields {
            let value = field.value(show).to_lowercase();
            if value.is_empty() {
                continue;
            }

            let (mut field_score, kind) = score_field(&value, query, words);
            if let Some(kind) = kind {
                matched.push(format!("{}:{}", field.name(), kind.as_str()));
                if field == SearchField::Title {
                    title_match = Some(kind);
                }
            }
            if field == SearchField::Title {
                field_score *= TITLE_WEIGHT;
            }
            best = best.max(field_score);
        }

        if matched.len() > 1 {
            best *= MULTI_FIELD_BONUS;
        }
        Scored {
            score: best.min(1.0),
            raw: best,
            matched,
            title_match,
        }
    }

    /// Autocomplete: titles starting with `partial` first, then close matches.
    #[must_use]
    pub fn suggest<'a, I>(&self, partial: &str, titles: I, limit: usize) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let partial = partial.trim().to_lowercase();
        if partial.chars().count() < 2 {
            return Vec::new();
        }

        let mut unique: Vec<&str> = Vec::new();
        for title in titles {
            if !title.is_empty() && !unique.contains(&title) {
                unique.push(title);
            }
        }

        let mut out: Vec<String> = unique
            .iter()
            .filter(|t| t.to_lowercase().starts_with(&partial))
            .map(|t| (*t).to_string())
            .collect();

        let lowered: Vec<String> = unique.iter().map(|t| t.to_lowercase()).collect();
        for idx in close_matches(&partial, &lowered, limit, SUGGEST_CUTOFF) {
            let title = unique[idx];
            if !out.iter().any(|t| t == title) {
                out.push(title.to_string());
            }
        }

        out.truncate(limit);
        out
    }
}

fn score_field(value: &str, query: &str, words: &[&str]) -> (f64, Option<MatchKind>) {
    if value == query {
        (1.0, Some(MatchKind::Exact))
    } else if value.starts_with(query) {
        (0.9, Some(MatchKind::Start))
    } else if value.contains(query) {
        (0.8, Some(MatchKind::Contains))
    } else if words.iter().all(|w| value.contains(w)) {
        (0.6, Some(MatchKind::Words))
    } else {
        let fuzzy = fuzzy_score(query, value);
        if fuzzy > FUZZY_THRESHOLD {
            (fuzzy * 0.5, Some(MatchKind::Fuzzy))
        } else {
            (0.0, None)
        }
    }
}

fn matches_filters(show: &Show, filters: &SearchFilters) -> bool {
    if let Some(kind) = filters.kind
        && show.kind != kind
    {
        return false;
    }
    if !filters.year.contains(show.year().map(f64::from))
        || !filters.rating.contains(show.rating)
        || !filters.duration.contains(show.runtime.map(f64::from))
    {
        return false;
    }
    if !filters.genres.is_empty()
        && !filters
            .genres
            .iter()
            .any(|g| show.genres.iter().any(|sg| sg.to_lowercase() == g.to_lowercase()))
    {
        return false;
    }
    filters.exact.iter().all(|(field, value)| {
        let actual = match field.as_str() {
            "title" => Some(show.title.as_str()),
            "language" | "lang" => Some(show.language.as_str()),
            "status" => Some(show.status.as_str()),
            "overview" => show.overview.as_deref(),
            _ => None,
        };
        actual.is_some_and(|a| a.to_lowercase() == value.to_lowercase())
    })
}

/// Sequence ratio plus a bonus of 0.3 × the share of query words that closely
/// match some word of `text`.
#[must_use]
pub fn fuzzy_score(query: &str, text: &str) -> f64 {
    let ratio = similarity(query, text);

    let words: Vec<&str> = query.split_whitespace().collect();
    let bonus = if words.is_empty() {
        0.0
    } else {
        let text_words: Vec<&str> = text.split_whitespace().collect();
        let hits = words
            .iter()
            .filter(|w| {
                text_words
                    .iter()
                    .any(|tw| similarity(w, tw) > WORD_MATCH_THRESHOLD)
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        let share = hits as f64 / words.len() as f64;
        share * 0.3
    };

    (ratio + bonus).min(1.0)
}

/// Ratcliff/Obershelp similarity: `2·M / (|a| + |b|)` where `M` counts the
/// characters in recursively found longest common blocks.
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = Matcher::new(&a, &b).matching_chars();
    #[allow(clippy::cast_precision_loss)]
    let ratio = 2.0 * matched as f64 / total as f64;
    ratio
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        // Long sequences ignore very frequent characters when seeding matches.
        if b.len() >= 200 {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next;
        }

        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    fn matching_chars(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }
}

/// Indices of the `n` candidates most similar to `word` with a ratio of at
/// least `cutoff`, best first.
fn close_matches(word: &str, candidates: &[String], n: usize, cutoff: f64) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, similarity(candidate, word)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().take(n).map(|(idx, _)| idx).collect()
}

fn highlight_title(title: &str, query: &str, words: &[&str], kind: Option<MatchKind>) -> String {
    let needles: Vec<&str> = match kind {
        Some(MatchKind::Exact | MatchKind::Start | MatchKind::Contains) => vec![query],
        Some(MatchKind::Words) => {
            let mut sorted = words.to_vec();
            sorted.sort_by_key(|w| std::cmp::Reverse(w.len()));
            sorted
        }
        _ => Vec::new(),
    };
    highlight(title, &needles)
}

/// Wraps case-insensitive occurrences of `needles` in `<mark>` and escapes the
/// rest of `text` for HTML.
#[must_use]
pub fn highlight(text: &str, needles: &[&str]) -> String {
    let pattern = needles
        .iter()
        .filter(|n| !n.is_empty())
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    if pattern.is_empty() {
        return html_escape::encode_text(text).into_owned();
    }
    let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
        return html_escape::encode_text(text).into_owned();
    };

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&html_escape::encode_text(&text[last..m.start()]));
        let _ = write!(out, "<mark>{}</mark>", html_escape::encode_text(m.as_str()));
        last = m.end();
    }
    out.push_str(&html_escape::encode_text(&text[last..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShowKind;
    use crate::parser::{NumericRange, parse_advanced_query};

    fn show(id: i32, title: &str, overview: &str) -> Show {
        Show {
            id,
            tmdb_id: id,
            title: title.to_string(),
            kind: ShowKind::Series,
            overview: Some(overview.to_string()),
            poster_path: None,
            backdrop_path: None,
            release_date: Some("2019-05-01".to_string()),
            genres: vec!["Drame".to_string()],
            runtime: Some(50),
            rating: Some(8.2),
            language: "fr".to_string(),
            views: 0,
            status: "active".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_similarity_matches_reference_values() {
        assert!((similarity("abcd", "bcde") - 0.75).abs() < 1e-9);
        assert!((similarity("", "") - 1.0).abs() < 1e-9);
        assert!(similarity("abc", "xyz").abs() < 1e-9);
        assert!((similarity("dark", "dark") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_title_ranks_first() {
        let engine = SearchEngine::default();
        let items = vec![
            show(1, "The Dark Knight", "batman"),
            show(2, "Dark", "time travel in Winden"),
            show(3, "Darkness Falls", "horror"),
        ];
        let hits = engine.search("dark", items, &SearchFilters::default(), 10);
        assert_eq!(hits[0].show.id, 2);
        assert!((hits[0].score - 1.0).abs() < 1e-9);
        assert_eq!(hits[0].highlighted_title, "<mark>Dark</mark>");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_words_match_and_highlight() {
        let engine = SearchEngine::default();
        let hits = engine.search(
            "papel casa",
            vec![show(1, "La Casa de Papel", "braquage")],
            &SearchFilters::default(),
            10,
        );
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 0.9).abs() < 1e-9);
        assert_eq!(
            hits[0].highlighted_title,
            "La <mark>Casa</mark> de <mark>Papel</mark>"
        );
    }

    #[test]
    fn test_fuzzy_typo_still_matches() {
        let engine = SearchEngine::default();
        let hits = engine.search(
            "breking bad",
            vec![show(1, "Breaking Bad", "chimie")],
            &SearchFilters::default(),
            10,
        );
        assert_eq!(hits.len(), 1);
        assert!(hits[0].matched_fields.contains(&"title:fuzzy".to_string()));
    }

    #[test]
    fn test_unrelated_rows_dropped() {
        let engine = SearchEngine::default();
        let hits = engine.search(
            "zzz",
            vec![show(1, "Friends", "sitcom")],
            &SearchFilters::default(),
            10,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn test_multi_field_bonus_is_capped() {
        let engine = SearchEngine::default();
        let hits = engine.search(
            "winden",
            vec![show(1, "Winden", "Winden est une petite ville")],
            &SearchFilters::default(),
            10,
        );
        assert_eq!(hits[0].matched_fields.len(), 2);
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_filters_applied() {
        let engine = SearchEngine::default();
        let mut movie = show(2, "Dark Waters", "film");
        movie.kind = ShowKind::Movie;
        let filters = SearchFilters {
            kind: Some(ShowKind::Movie),
            rating: NumericRange {
                min: Some(8.0),
                max: None,
            },
            ..SearchFilters::default()
        };
        let hits = engine.search("dark", vec![show(1, "Dark", "x"), movie], &filters, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].show.id, 2);
    }

    #[test]
    fn test_advanced_search_filters_only() {
        let engine = SearchEngine::default();
        let query = parse_advanced_query("year:2019 genre:drame");
        let hits = engine.advanced_search(&query, vec![show(1, "Dark", "x")], 10);
        assert_eq!(hits.len(), 1);

        let query = parse_advanced_query("year:<2000");
        assert!(engine.advanced_search(&query, vec![show(1, "Dark", "x")], 10).is_empty());
    }

    #[test]
    fn test_suggest_prefix_first() {
        let engine = SearchEngine::default();
        let titles = ["Narcos", "Naruto", "Arcane", "Narcos", "Nakita"];
        let suggestions = engine.suggest("nar", titles, 5);
        assert_eq!(&suggestions[..2], &["Narcos".to_string(), "Naruto".to_string()]);
        assert_eq!(suggestions.iter().filter(|s| *s == "Narcos").count(), 1);
        assert!(engine.suggest("n", titles, 5).is_empty());
    }

    #[test]
    fn test_highlight_escapes_html() {
        assert_eq!(
            highlight("Tom & Jerry", &["jerry"]),
            "Tom &amp; <mark>Jerry</mark>"
        );
    }
}
