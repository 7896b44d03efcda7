use chrono::{NaiveDate, NaiveDateTime};

use super::Value;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Parses `"YYYY-MM-DD[ HH:MM[:SS]]"`, `"YYYY-MM-DDTHH:MM:SS"` and the
/// slash-separated variants. Bare numbers are never dates.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = clean_str(s);
    // minimal length + separator check
    if s.len() < 10 || !matches!(s.as_bytes()[4], b'-' | b'/') {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Infers one type for a whole column of raw strings: `Int` if every
/// non-empty cell is an integer, else `Float` if every one is a number,
/// else `Bool` if every one is `true`/`false`, else `Str`. Empty cells are
/// `Null` whatever the column type.
pub fn infer_column(raw: &[String]) -> Vec<Value> {
    let cells: Vec<Option<&str>> = raw
        .iter()
        .map(|s| Some(clean_str(s)).filter(|c| !c.is_empty()))
        .collect();
    let present = || cells.iter().flatten();

    if present().all(|c| c.parse::<i64>().is_ok()) {
        return convert(&cells, |c| c.parse().ok().map(Value::Int));
    }
    if present().all(|c| c.parse::<f64>().is_ok()) {
        return convert(&cells, |c| c.parse().ok().map(Value::Float));
    }
    if present().all(|c| parse_bool(c).is_some()) {
        return convert(&cells, |c| parse_bool(c).map(Value::Bool));
    }
    convert(&cells, |c| Some(Value::Str(c.to_string())))
}

/// Like [`infer_column`], but yields `Timestamp` labels when every non-empty
/// cell parses as a date.
pub fn infer_index(raw: &[String], parse_dates: bool) -> Vec<Value> {
    if parse_dates
        && raw.iter().any(|s| !clean_str(s).is_empty())
        && raw
            .iter()
            .map(|s| clean_str(s))
            .filter(|c| !c.is_empty())
            .all(|c| parse_datetime(c).is_some())
    {
        return raw
            .iter()
            .map(|s| parse_datetime(s).map_or(Value::Null, Value::Timestamp))
            .collect();
    }
    infer_column(raw)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn convert(cells: &[Option<&str>], parse: impl Fn(&str) -> Option<Value>) -> Vec<Value> {
    cells
        .iter()
        .map(|c| c.and_then(&parse).unwrap_or(Value::Null))
        .collect()
}
