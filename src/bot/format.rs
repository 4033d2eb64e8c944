//! Message formatting for the admin bot. Messages use Telegram's HTML parse
//! mode, so every user-controlled string goes through [`escape`].

use std::borrow::Cow;

use crate::models::{Show, ShowKind};

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[must_use]
pub fn escape(text: &str) -> Cow<'_, str> {
    html_escape::encode_text(text)
}

/// `1536` -> `"1.50 KB"`. Bytes are shown without decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn file_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes.filter(|b| *b > 0) else {
        return "0 B".to_string();
    };

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", SIZE_UNITS[unit])
    }
}

/// `5430` -> `"1h 30min 30s"`.
#[must_use]
pub fn duration(seconds: Option<u32>) -> String {
    let Some(seconds) = seconds.filter(|s| *s > 0) else {
        return "0min".to_string();
    };

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    match (hours, secs) {
        (0, 0) => format!("{minutes}min"),
        (0, s) => format!("{minutes}min {s}s"),
        (h, 0) => format!("{h}h {minutes}min"),
        (h, s) => format!("{h}h {minutes}min {s}s"),
    }
}

#[must_use]
pub fn progress_bar(current: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return "□".repeat(width);
    }
    let current = current.min(total);
    let filled = width * current / total;
    format!(
        "[{}{}] {}%",
        "■".repeat(filled),
        "□".repeat(width - filled),
        100 * current / total
    )
}

/// Cuts on a character boundary and appends `...` when shortened.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[must_use]
pub const fn kind_emoji(kind: ShowKind) -> &'static str {
    match kind {
        ShowKind::Movie => "🎬",
        ShowKind::Series => "📺",
    }
}

#[must_use]
pub const fn kind_label(kind: ShowKind) -> &'static str {
    match kind {
        ShowKind::Movie => "🎬 Film",
        ShowKind::Series => "📺 Série",
    }
}

/// Title used for the Filemoon copy of an episode: `Title S01E05`.
#[must_use]
pub fn upload_title(show_title: &str, season: i32, episode: i32) -> String {
    format!("{show_title} S{season:02}E{episode:02}")
}

#[must_use]
pub fn show_line(position: u64, show: &Show) -> String {
    format!(
        "{position}. {} <b>{}</b>\n   👁 {} vues | 🆔 <code>{}</code>",
        kind_emoji(show.kind),
        escape(&show.title),
        show.views,
        show.id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size() {
        assert_eq!(file_size(None), "0 B");
        assert_eq!(file_size(Some(0)), "0 B");
        assert_eq!(file_size(Some(512)), "512 B");
        assert_eq!(file_size(Some(1536)), "1.50 KB");
        assert_eq!(file_size(Some(3 * 1024 * 1024 * 1024)), "3.00 GB");
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(None), "0min");
        assert_eq!(duration(Some(45)), "0min 45s");
        assert_eq!(duration(Some(2700)), "45min");
        assert_eq!(duration(Some(5400)), "1h 30min");
        assert_eq!(duration(Some(5430)), "1h 30min 30s");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 0, 4), "□□□□");
        assert_eq!(progress_bar(1, 2, 4), "[■■□□] 50%");
        assert_eq!(progress_bar(5, 2, 4), "[■■■■] 100%");
    }

    #[test]
    fn test_truncate_and_escape() {
        assert_eq!(truncate("court", 10), "court");
        assert_eq!(truncate("épisode final", 7), "épisode...");
        assert_eq!(escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }

    #[test]
    fn test_upload_title() {
        assert_eq!(upload_title("Dark", 1, 5), "Dark S01E05");
        assert_eq!(upload_title("Dune", 0, 1), "Dune S00E01");
    }
}
