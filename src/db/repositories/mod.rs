pub mod bot_session;
pub mod comment;
pub mod episode;
pub mod history;
pub mod season;
pub mod show;
pub mod source;
pub mod stats;
pub mod upload_task;
pub mod user;
pub mod watchlist;

use sea_orm::sea_query::LikeExpr;
use sea_orm::{DbErr, SqlErr};

/// Insert paths return `Ok(None)` when a unique index rejects the row.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `%text%` with the LIKE wildcards in `text` matched literally.
pub(crate) fn contains_pattern(text: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Alias, Expr, Query, SqliteQueryBuilder};

    #[test]
    fn contains_pattern_escapes_wildcards() {
        let sql = Query::select()
            .column(Alias::new("title"))
            .from(Alias::new("shows"))
            .and_where(Expr::col(Alias::new("title")).like(contains_pattern("50%_off\\")))
            .to_string(SqliteQueryBuilder);
        assert!(sql.ends_with(r#"LIKE '%50\%\_off\\%' ESCAPE '\'"#), "{sql}");
    }
}
