use super::ApiError;
use crate::domain::FileId;
use crate::models::ShowKind;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Keeps `(page - 1) * limit` well inside SQLite's signed 64-bit OFFSET.
pub const MAX_PAGE: u64 = 1_000_000;

pub fn validate_id(resource: &str, id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {resource} ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

/// `page` below 1 becomes 1 and is capped at [`MAX_PAGE`]; `limit` below 1
/// falls back to the default and is capped at [`MAX_PAGE_SIZE`].
#[must_use]
pub fn normalize_page(page: Option<i64>, limit: Option<i64>) -> (u64, u64) {
    let page = page
        .filter(|p| *p >= 1)
        .map_or(1, |p| p.unsigned_abs().min(MAX_PAGE));
    let limit = limit
        .filter(|l| *l >= 1)
        .map_or(DEFAULT_PAGE_SIZE, |l| l.unsigned_abs().min(MAX_PAGE_SIZE));
    (page, limit)
}

/// Limits that must fall inside `min..=max` once given.
pub fn validate_limit(limit: Option<u64>, default: u64, min: u64, max: u64) -> Result<u64, ApiError> {
    let limit = limit.unwrap_or(default);
    if !(min..=max).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {min} and {max}"
        )));
    }
    Ok(limit)
}

#[must_use]
pub const fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}

/// Limits silently clamped into `1..=max`.
#[must_use]
pub fn clamp_limit(limit: Option<u64>, default: u64, max: u64) -> u64 {
    limit.unwrap_or(default).clamp(1, max)
}

pub fn validate_search_query(query: &str, min_len: usize, max_len: usize) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    let len = trimmed.chars().count();
    if len < min_len {
        return Err(ApiError::validation(format!(
            "Search query must be at least {min_len} characters"
        )));
    }
    if len > max_len {
        return Err(ApiError::validation(format!(
            "Search query must be {max_len} characters or less"
        )));
    }
    Ok(trimmed)
}

/// Optional `type` parameter; `all` and an empty value mean no filter.
pub fn parse_kind(raw: Option<&str>) -> Result<Option<ShowKind>, ApiError> {
    match raw.map(str::trim) {
        None | Some("" | "all") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(ApiError::validation),
    }
}

pub fn validate_file_id(raw: &str) -> Result<FileId, ApiError> {
    FileId::parse(raw).ok_or_else(|| {
        ApiError::validation("Invalid file_id: only letters, digits, '_' and '-' are allowed")
    })
}

pub fn validate_title(title: &str) -> Result<&str, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    if title.chars().count() > 500 {
        return Err(ApiError::validation("Title must be 500 characters or less"));
    }
    Ok(title)
}

pub fn validate_rating(rating: f64) -> Result<f64, ApiError> {
    if !(0.0..=10.0).contains(&rating) {
        return Err(ApiError::validation(format!(
            "Invalid rating: {rating}. Rating must be between 0 and 10"
        )));
    }
    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page() {
        assert_eq!(normalize_page(None, None), (1, 20));
        assert_eq!(normalize_page(Some(0), Some(0)), (1, 20));
        assert_eq!(normalize_page(Some(-3), Some(-1)), (1, 20));
        assert_eq!(normalize_page(Some(4), Some(500)), (4, 100));
        assert_eq!(normalize_page(Some(2), Some(15)), (2, 15));
        assert_eq!(normalize_page(Some(i64::MAX), Some(100)), (MAX_PAGE, 100));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(u64::MAX, 100), u64::MAX);
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(None, 20, 1, 50).unwrap(), 20);
        assert_eq!(validate_limit(Some(50), 20, 1, 50).unwrap(), 50);
        assert!(validate_limit(Some(0), 20, 1, 50).is_err());
        assert!(validate_limit(Some(51), 20, 1, 50).is_err());
        assert_eq!(clamp_limit(Some(500), 50, 100), 100);
        assert_eq!(clamp_limit(Some(0), 50, 100), 1);
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  Dark ", 2, 100).unwrap(), "Dark");
        assert!(validate_search_query("a", 2, 100).is_err());
        assert!(validate_search_query("   ", 2, 100).is_err());
        assert!(validate_search_query(&"x".repeat(101), 2, 100).is_err());
        assert!(validate_search_query("é!", 2, 100).is_ok());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind(None).unwrap(), None);
        assert_eq!(parse_kind(Some("all")).unwrap(), None);
        assert_eq!(parse_kind(Some("tv")).unwrap(), Some(ShowKind::Series));
        assert!(parse_kind(Some("anime")).is_err());
    }

    #[test]
    fn test_validate_id_and_rating() {
        assert!(validate_id("show", 1).is_ok());
        assert!(validate_id("show", 0).is_err());
        assert!(validate_rating(7.5).is_ok());
        assert!(validate_rating(10.5).is_err());
    }

    #[test]
    fn test_validate_file_id() {
        assert!(validate_file_id("BAACAgQAAx-_9").is_ok());
        assert!(validate_file_id("../secret").is_err());
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("  Dark ").unwrap(), "Dark");
        assert!(validate_title(" ").is_err());
        assert!(validate_title(&"t".repeat(501)).is_err());
    }
}
