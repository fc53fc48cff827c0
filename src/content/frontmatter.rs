//! Front-matter parsing

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::Serialize;

use super::error::{ParseError, ParseErrorKind, Warning};

/// Front-matter delimiter line
pub const DELIMITER: &str = "---";

/// A single front-matter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    /// Coerce a scalar or a list into a list; an empty scalar is an empty list
    pub fn into_list(self) -> Vec<String> {
        match self {
            FieldValue::Text(s) if s.is_empty() => Vec::new(),
            FieldValue::Text(s) => vec![s],
            FieldValue::List(items) => items,
        }
    }
}

/// Validated front-matter of a post
#[derive(Debug, Clone, Serialize)]
pub struct FrontMatter {
    pub layout: String,
    pub title: String,
    /// Parsed timestamp, kept in the offset it was written with
    #[serde(skip)]
    pub date: DateTime<FixedOffset>,
    /// The `date` value exactly as written in the source
    #[serde(rename = "date")]
    pub date_raw: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Unrecognized keys, in source order
    pub extra: IndexMap<String, FieldValue>,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

/// An entry as read from the header, before validation
#[derive(Debug)]
struct Entry {
    value: FieldValue,
    line: usize,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), ParseError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut lines = content.split_inclusive('\n');
        let opening = lines.next().unwrap_or("");
        if trim_line_ending(opening).trim_end() != DELIMITER {
            return Err(ParseError::new(1, ParseErrorKind::MissingFrontMatter));
        }

        let mut offset = opening.len();
        let mut entries: IndexMap<String, Entry> = IndexMap::new();
        let mut current_key: Option<String> = None;

        for (idx, raw_line) in lines.enumerate() {
            // Line 1 is the opening delimiter
            let line_no = idx + 2;
            offset += raw_line.len();
            let line = trim_line_ending(raw_line);

            if line.trim_end() == DELIMITER {
                let front_matter = Self::from_entries(entries)?;
                return Ok((front_matter, &content[offset..]));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(item) = list_item(trimmed) {
                let entry = current_key
                    .as_ref()
                    .and_then(|key| entries.get_mut(key))
                    .ok_or_else(|| malformed(line_no, line))?;
                if matches!(&entry.value, FieldValue::Text(s) if s.is_empty()) {
                    entry.value = FieldValue::List(Vec::new());
                }
                match &mut entry.value {
                    FieldValue::List(items) => items.push(unquote(item, line_no)?),
                    FieldValue::Text(_) => return Err(malformed(line_no, line)),
                }
                continue;
            }

            let (key, value) = split_key_value(line).ok_or_else(|| malformed(line_no, line))?;
            let value = parse_value(value, line_no)?;
            if let Some(previous) = entries.get(key) {
                tracing::debug!(
                    "Front-matter key `{}` on line {} overrides line {}",
                    key,
                    line_no,
                    previous.line
                );
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value,
                    line: line_no,
                },
            );
            current_key = Some(key.to_string());
        }

        Err(ParseError::new(1, ParseErrorKind::UnterminatedFrontMatter))
    }

    fn from_entries(mut entries: IndexMap<String, Entry>) -> Result<Self, ParseError> {
        let layout = take_required(&mut entries, "layout")?.0;
        let title = take_required(&mut entries, "title")?.0;
        let (date_raw, date_line) = take_required(&mut entries, "date")?;
        let date = parse_date(&date_raw).ok_or_else(|| {
            ParseError::new(date_line, ParseErrorKind::InvalidDate(date_raw.clone()))
        })?;

        let categories = entries
            .shift_remove("categories")
            .map(|e| e.value.into_list())
            .unwrap_or_default();
        let tags = entries
            .shift_remove("tags")
            .map(|e| e.value.into_list())
            .unwrap_or_default();

        let mut warnings = Vec::new();
        let mut extra = IndexMap::new();
        for (key, entry) in entries {
            tracing::warn!("Unknown front-matter key `{}` on line {}", key, entry.line);
            warnings.push(Warning::UnknownMetadataKey {
                key: key.clone(),
                line: entry.line,
            });
            extra.insert(key, entry.value);
        }

        Ok(Self {
            layout,
            title,
            date,
            date_raw,
            categories,
            tags,
            extra,
            warnings,
        })
    }
}

fn take_required(
    entries: &mut IndexMap<String, Entry>,
    key: &'static str,
) -> Result<(String, usize), ParseError> {
    let entry = entries
        .shift_remove(key)
        .ok_or_else(|| ParseError::new(1, ParseErrorKind::MissingKey(key)))?;
    match entry.value {
        FieldValue::Text(s) if !s.is_empty() => Ok((s, entry.line)),
        FieldValue::Text(_) => Err(ParseError::new(entry.line, ParseErrorKind::MissingKey(key))),
        FieldValue::List(_) => Err(ParseError::new(
            entry.line,
            ParseErrorKind::MalformedLine(format!("{}: expected a single value", key)),
        )),
    }
}

fn malformed(line_no: usize, line: &str) -> ParseError {
    ParseError::new(line_no, ParseErrorKind::MalformedLine(line.to_string()))
}

fn trim_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

/// `- item` continuation lines of a block list
fn list_item(trimmed: &str) -> Option<&str> {
    if trimmed == "-" {
        return Some("");
    }
    trimmed.strip_prefix("- ").map(str::trim)
}

/// Split `key: value`, where the key is a simple identifier
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    let is_valid_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !is_valid_key || !(value.is_empty() || value.starts_with([' ', '\t'])) {
        return None;
    }
    Some((key, value.trim()))
}

/// Plain values are verbatim; quoted scalars and `[a, b]` lists go through YAML
fn parse_value(value: &str, line_no: usize) -> Result<FieldValue, ParseError> {
    if value.starts_with('[') {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(value).map_err(|_| malformed(line_no, value))?;
        return match parsed {
            serde_yaml::Value::Sequence(items) => Ok(FieldValue::List(
                items.iter().filter_map(scalar_to_string).collect(),
            )),
            _ => Err(malformed(line_no, value)),
        };
    }
    unquote(value, line_no).map(FieldValue::Text)
}

fn unquote(value: &str, line_no: usize) -> Result<String, ParseError> {
    if value.starts_with('"') || value.starts_with('\'') {
        return serde_yaml::from_str::<String>(value).map_err(|_| malformed(line_no, value));
    }
    Ok(value.to_string())
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a date string in the accepted formats; offset-less forms are read as UTC
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let with_offset = [
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S %:z",
        "%Y-%m-%d %H:%M %z",
        "%Y-%m-%d %H:%M %:z",
        "%Y-%m-%dT%H:%M:%S%z",
    ];
    for fmt in with_offset {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for fmt in naive {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_front_matter() {
        let content = r#"---
layout: post
title: NSOperation Subclassing
date: 2021-02-20 10:30:00 +0100
categories: [ios, concurrency]
---

This is the content.
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.layout, "post");
        assert_eq!(fm.title, "NSOperation Subclassing");
        assert_eq!(fm.date_raw, "2021-02-20 10:30:00 +0100");
        assert_eq!(fm.date.offset().local_minus_utc(), 3600);
        assert_eq!(fm.categories, vec!["ios", "concurrency"]);
        assert!(fm.warnings.is_empty());
        assert_eq!(remaining, "\nThis is the content.\n");
    }

    #[test]
    fn test_block_list_and_single_string() {
        let content = r#"---
layout: post
title: Colors
date: 2021-03-01
categories:
  - ios
  - "ui kit"
tags: Notes
---
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.categories, vec!["ios", "ui kit"]);
        assert_eq!(fm.tags, vec!["Notes"]);
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_title_keeps_colons_and_quotes_are_stripped() {
        let content = "---\nlayout: post\ntitle: Swift: the good parts\ndate: 2021-02-20\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, "Swift: the good parts");

        let content = "---\nlayout: post\ntitle: \"Quoted: title\"\ndate: 2021-02-20\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, "Quoted: title");
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let content = "---\nlayout: post\ntitle: First\ntitle: Second\ndate: 2021-02-20\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, "Second");
    }

    #[test]
    fn test_missing_opening_delimiter() {
        let err = FrontMatter::parse("title: Hello\n---\nbody\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingFrontMatter);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unterminated_front_matter() {
        let err = FrontMatter::parse("---\nlayout: post\ntitle: Hello\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedFrontMatter);
    }

    #[test]
    fn test_missing_required_key() {
        let err = FrontMatter::parse("---\nlayout: post\ndate: 2021-02-20\n---\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingKey("title"));
    }

    #[test]
    fn test_invalid_date_reports_line() {
        let err = FrontMatter::parse("---\nlayout: post\ntitle: T\ndate: yesterday\n---\n")
            .unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidDate("yesterday".to_string())
        );
    }

    #[test]
    fn test_malformed_line() {
        let err = FrontMatter::parse("---\nlayout: post\njust some prose\n---\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(matches!(err.kind, ParseErrorKind::MalformedLine(_)));
    }

    #[test]
    fn test_unknown_keys_pass_through_with_warning() {
        let content = "---\nlayout: post\ntitle: T\ndate: 2021-02-20\ncomments: true\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(
            fm.extra.get("comments"),
            Some(&FieldValue::Text("true".to_string()))
        );
        assert_eq!(
            fm.warnings,
            vec![Warning::UnknownMetadataKey {
                key: "comments".to_string(),
                line: 5
            }]
        );
    }

    #[test]
    fn test_crlf_and_bom() {
        let content = "\u{feff}---\r\nlayout: post\r\ntitle: T\r\ndate: 2021-02-20\r\n---\r\nBody\r\n";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, "T");
        assert_eq!(remaining, "Body\r\n");
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2021-02-20T10:00:00+01:00").is_some());
        assert!(parse_date("2021-02-20 10:00:00 -0800").is_some());
        assert!(parse_date("2021-02-20 10:00").is_some());
        assert!(parse_date("2021-02-20").is_some());
        assert!(parse_date("2021-02-30").is_none());
        assert!(parse_date("20/02/2021").is_none());
    }
}
