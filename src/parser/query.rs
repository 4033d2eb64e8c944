use std::str::FromStr;

use crate::models::ShowKind;

/// Inclusive numeric bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Missing values count as 0, so any lower bound above 0 excludes them.
    #[must_use]
    pub fn contains(&self, value: Option<f64>) -> bool {
        let value = value.unwrap_or(0.0);
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    fn merge(&mut self, other: Self) {
        if other.min.is_some() {
            self.min = other.min;
        }
        if other.max.is_some() {
            self.max = other.max;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub year: NumericRange,
    pub rating: NumericRange,
    /// Minutes.
    pub duration: NumericRange,
    /// Matches when the show carries any of these genres.
    pub genres: Vec<String>,
    pub kind: Option<ShowKind>,
    /// `field:value` pairs compared case-insensitively against text fields.
    pub exact: Vec<(String, String)>,
}

impl SearchFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.year.is_unbounded()
            && self.rating.is_unbounded()
            && self.duration.is_unbounded()
            && self.genres.is_empty()
            && self.kind.is_none()
            && self.exact.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedQuery {
    pub text: String,
    pub filters: SearchFilters,
}

/// Parses `>`, `>=`, `<`, `<=` and `=` prefixes. A bare year pins both bounds;
/// a bare rating or duration is a minimum.
fn parse_range(field: &str, value: &str) -> Option<NumericRange> {
    let (op, number) = ["<=", ">=", "<", ">", "="]
        .iter()
        .find_map(|op| value.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", value));
    let number: f64 = number.trim().parse().ok()?;

    let range = match op {
        ">" | ">=" => NumericRange {
            min: Some(if op == ">" && field == "year" {
                number + 1.0
            } else {
                number
            }),
            max: None,
        },
        "<" | "<=" => NumericRange {
            min: None,
            max: Some(if op == "<" && field == "year" {
                number - 1.0
            } else {
                number
            }),
        },
        "=" => NumericRange {
            min: Some(number),
            max: Some(number),
        },
        _ if field == "year" => NumericRange {
            min: Some(number),
            max: Some(number),
        },
        _ => NumericRange {
            min: Some(number),
            max: None,
        },
    };
    Some(range)
}

/// Splits on whitespace but keeps `"quoted phrases"` together. The flag marks
/// tokens that came from quotes.
fn tokenize(input: &str) -> Vec<(String, bool)> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' if in_quotes => {
                if !current.trim().is_empty() {
                    tokens.push((current.trim().to_string(), true));
                }
                current.clear();
                in_quotes = false;
            }
            '"' => {
                if !current.is_empty() {
                    tokens.push((std::mem::take(&mut current), false));
                }
                in_quotes = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push((std::mem::take(&mut current), false));
                }
            }
            c => current.push(c),
        }
    }

    // An unterminated quote degrades to plain words.
    if in_quotes {
        tokens.extend(
            current
                .split_whitespace()
                .map(|word| (word.to_string(), false)),
        );
    } else if !current.is_empty() {
        tokens.push((current, false));
    }
    tokens
}

/// Parses the advanced search syntax: `type:series genre:drame year:>2010
/// rating:>=7 duration:<90 "exact phrase" free words`.
#[must_use]
pub fn parse_advanced_query(input: &str) -> AdvancedQuery {
    let mut query = AdvancedQuery::default();
    let mut words = Vec::new();

    for (token, quoted) in tokenize(input) {
        if quoted {
            words.push(token);
            continue;
        }

        let Some((field, value)) = token.split_once(':') else {
            words.push(token);
            continue;
        };
        let field = field.to_lowercase();
        if field.is_empty()
            || value.is_empty()
            || !field.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            words.push(token);
            continue;
        }

        match field.as_str() {
            "year" | "rating" | "duration" => match parse_range(&field, value) {
                Some(range) => {
                    let target = match field.as_str() {
                        "year" => &mut query.filters.year,
                        "rating" => &mut query.filters.rating,
                        _ => &mut query.filters.duration,
                    };
                    target.merge(range);
                }
                None => words.push(token),
            },
            "genre" => query
                .filters
                .genres
                .extend(value.split(',').filter(|g| !g.is_empty()).map(str::to_string)),
            "type" | "kind" => match ShowKind::from_str(value) {
                Ok(kind) => query.filters.kind = Some(kind),
                Err(_) => words.push(token),
            },
            _ => query.filters.exact.push((field, value.to_string())),
        }
    }

    query.text = words.join(" ");
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        let q = parse_advanced_query("la casa de papel");
        assert_eq!(q.text, "la casa de papel");
        assert!(q.filters.is_empty());
    }

    #[test]
    fn test_filters_and_text() {
        let q = parse_advanced_query("type:series genre:Drame year:>2010 rating:>=7 dark");
        assert_eq!(q.text, "dark");
        assert_eq!(q.filters.kind, Some(ShowKind::Series));
        assert_eq!(q.filters.genres, vec!["Drame".to_string()]);
        assert_eq!(q.filters.year.min, Some(2011.0));
        assert_eq!(q.filters.rating.min, Some(7.0));
        assert_eq!(q.filters.rating.max, None);
    }

    #[test]
    fn test_quoted_phrase_kept_together() {
        let q = parse_advanced_query("\"breaking bad\" duration:<90 pilot");
        assert_eq!(q.text, "breaking bad pilot");
        assert_eq!(q.filters.duration.max, Some(90.0));
    }

    #[test]
    fn test_bare_year_is_exact() {
        let q = parse_advanced_query("year:2019");
        assert_eq!(q.filters.year.min, Some(2019.0));
        assert_eq!(q.filters.year.max, Some(2019.0));
        assert!(q.text.is_empty());
    }

    #[test]
    fn test_bad_values_fall_back_to_text() {
        let q = parse_advanced_query("year:soon type:cartoon");
        assert_eq!(q.text, "year:soon type:cartoon");
        assert!(q.filters.is_empty());
    }

    #[test]
    fn test_unknown_field_is_exact_match() {
        let q = parse_advanced_query("language:fr");
        assert_eq!(q.filters.exact, vec![("language".to_string(), "fr".to_string())]);
    }

    #[test]
    fn test_range_contains() {
        let range = NumericRange {
            min: Some(7.0),
            max: None,
        };
        assert!(range.contains(Some(8.1)));
        assert!(!range.contains(Some(6.9)));
        assert!(!range.contains(None));
        assert!(NumericRange::default().contains(None));
    }
}
