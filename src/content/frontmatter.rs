//! Front-matter parsing
//!
//! A document may open with a YAML block fenced by `---` lines or a TOML
//! block fenced by `+++` lines. Anything else is body text.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const YAML_FENCE: &str = "---";
const TOML_FENCE: &str = "+++";

/// Errors reported by [`FrontMatter::parse_strict`]
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("front-matter opened with `{0}` is never closed")]
    Unterminated(&'static str),
    #[error("invalid YAML front-matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid TOML front-matter: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A scalar that may appear as a tag
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// Custom deserializer that handles both a single value and a list of values
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<Option<Scalar>>()? {
                // `- ` with nothing after it is an empty tag, kept so `check` can flag it
                vec.push(item.map(Scalar::into_string).unwrap_or_default());
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Front-matter data from a post or page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub layout: Option<String>,
    #[serde(deserialize_with = "string_or_vec", default)]
    pub tags: Vec<String>,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub permalink: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,

    /// Additional custom fields, in declaration order
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

fn default_published() -> bool {
    true
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            title: None,
            layout: None,
            tags: Vec::new(),
            date: None,
            updated: None,
            permalink: None,
            excerpt: None,
            published: true,
            extra: IndexMap::new(),
        }
    }
}

impl FrontMatter {
    /// Parse front-matter from content string, falling back to "no
    /// front-matter" when the block is malformed.
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> anyhow::Result<(Self, &str)> {
        match Self::parse_strict(content) {
            Ok((fm, body)) => Ok((fm.unwrap_or_default(), body)),
            Err(e) => {
                tracing::warn!("Failed to parse front-matter, treating as content: {}", e);
                Ok((FrontMatter::default(), strip_bom(content).trim_start()))
            }
        }
    }

    /// Parse front-matter, reporting malformed blocks as errors.
    /// The front-matter is `None` when the document has no block at all.
    pub fn parse_strict(content: &str) -> Result<(Option<Self>, &str), FrontMatterError> {
        let content = strip_bom(content).trim_start();

        if let Some(rest) = strip_fence(content, YAML_FENCE) {
            return match find_closing(rest, YAML_FENCE) {
                Some((block, body)) => {
                    if block.trim().is_empty() {
                        return Ok((Some(FrontMatter::default()), body));
                    }
                    if !looks_like_yaml(block) {
                        // A markdown horizontal rule, not front-matter
                        return Ok((None, content));
                    }
                    let fm: FrontMatter = serde_yaml::from_str(block)?;
                    Ok((Some(fm), body))
                }
                None => {
                    if first_line_is_key_value(rest) {
                        Err(FrontMatterError::Unterminated(YAML_FENCE))
                    } else {
                        Ok((None, content))
                    }
                }
            };
        }

        if let Some(rest) = strip_fence(content, TOML_FENCE) {
            let (block, body) =
                find_closing(rest, TOML_FENCE).ok_or(FrontMatterError::Unterminated(TOML_FENCE))?;
            let value: toml::Value = toml::from_str(block)?;
            let fm: FrontMatter = stringify_datetimes(value).try_into()?;
            return Ok((Some(fm), body));
        }

        Ok((None, content))
    }

    /// Parse the date string
    pub fn parse_date(&self, tz: Option<chrono_tz::Tz>) -> Option<DateTime<FixedOffset>> {
        self.date.as_deref().and_then(|s| parse_date_string(s, tz))
    }

    /// Parse the updated date string
    pub fn parse_updated(&self, tz: Option<chrono_tz::Tz>) -> Option<DateTime<FixedOffset>> {
        self.updated.as_deref().and_then(|s| parse_date_string(s, tz))
    }
}

fn strip_bom(content: &str) -> &str {
    content.trim_start_matches('\u{feff}')
}

/// Strip an opening fence line, returning what follows it
fn strip_fence<'a>(content: &'a str, fence: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(fence)?;
    let (first_line, after) = match rest.find('\n') {
        Some(pos) => (&rest[..pos], &rest[pos + 1..]),
        None => (rest, ""),
    };
    if first_line.trim().is_empty() {
        Some(after)
    } else {
        None
    }
}

/// Find a closing fence line. Returns (block, body after the fence)
fn find_closing<'a>(rest: &'a str, fence: &str) -> Option<(&'a str, &'a str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            let block = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\n', '\r']);
            return Some((block, body));
        }
        offset += line.len();
    }
    None
}

/// Whether a line has the `key: value` shape of YAML front-matter
fn is_key_value(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    let Some(colon_pos) = trimmed.find(':') else {
        return false;
    };
    let key = &trimmed[..colon_pos];
    let is_valid_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !matches!(key, "http" | "https" | "ftp" | "mailto");
    let after_colon = &trimmed[colon_pos + 1..];
    is_valid_key && (after_colon.is_empty() || after_colon.starts_with(' '))
}

fn looks_like_yaml(block: &str) -> bool {
    block.lines().any(is_key_value)
}

fn first_line_is_key_value(rest: &str) -> bool {
    rest.lines()
        .find(|l| !l.trim().is_empty())
        .map(is_key_value)
        .unwrap_or(false)
}

/// TOML datetimes are their own type; the front-matter model wants strings
fn stringify_datetimes(value: toml::Value) -> toml::Value {
    match value {
        toml::Value::Datetime(dt) => toml::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            toml::Value::Array(items.into_iter().map(stringify_datetimes).collect())
        }
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(k, v)| (k, stringify_datetimes(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Parse a date string in various formats
pub(crate) fn parse_date_string(
    s: &str,
    tz: Option<chrono_tz::Tz>,
) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, tz);
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return localize(d.and_hms_opt(0, 0, 0)?, tz);
        }
    }

    None
}

fn localize(naive: NaiveDateTime, tz: Option<chrono_tz::Tz>) -> Option<DateTime<FixedOffset>> {
    match tz {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|d| d.fixed_offset()),
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|d| d.fixed_offset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
layout: post
title: Hello World
date: 2024-01-15 10:30:00
tags:
  - rust
  - git
---

This is the content.
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Hello World"));
        assert_eq!(fm.layout.as_deref(), Some("post"));
        assert_eq!(fm.tags, vec!["rust", "git"]);
        assert_eq!(remaining, "This is the content.\n");
    }

    #[test]
    fn test_parse_toml_frontmatter() {
        let content = r#"+++
title = "GraphQL validation"
layout = "post"
tags = ["graphql", "validation"]
date = 2019-03-02
+++
Body.
"#;

        let (fm, remaining) = FrontMatter::parse_strict(content).unwrap();
        let fm = fm.unwrap();
        assert_eq!(fm.title.as_deref(), Some("GraphQL validation"));
        assert_eq!(fm.tags, vec!["graphql", "validation"]);
        assert_eq!(fm.date.as_deref(), Some("2019-03-02"));
        assert_eq!(remaining, "Body.\n");
    }

    #[test]
    fn test_parse_single_string_and_numeric_tags() {
        let content = "---\ntitle: Conf\ntags: Notes\n---\nx";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.tags, vec!["Notes"]);

        let content = "---\ntitle: Conf\ntags: [conference, 2019]\n---\nx";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.tags, vec!["conference", "2019"]);
    }

    #[test]
    fn test_empty_tag_item_is_kept() {
        let content = "---\ntitle: T\ntags:\n  - git\n  -\n---\n";
        let (fm, _) = FrontMatter::parse_strict(content).unwrap();
        assert_eq!(fm.unwrap().tags, vec!["git", ""]);
    }

    #[test]
    fn test_extra_fields_keep_order() {
        let content = "---\ntitle: T\nzeta: 1\nalpha: 2\n---\n";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        let keys: Vec<_> = fm.extra.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_no_frontmatter() {
        let (fm, body) = FrontMatter::parse_strict("# Just a heading\n").unwrap();
        assert!(fm.is_none());
        assert_eq!(body, "# Just a heading\n");
    }

    #[test]
    fn test_markdown_separator_not_yaml() {
        let content = r#"
---

Some random text with markdown lists:
- Item 1
- Item 2

---
More content here.
"#;

        let (fm, remaining) = FrontMatter::parse_strict(content).unwrap();
        assert!(fm.is_none());
        assert!(remaining.contains("Some random text"));
    }

    #[test]
    fn test_content_with_url_not_yaml() {
        let content = "---\n\nCheck out https://example.com/path\n\n---\nMore.\n";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, None);
        assert!(remaining.contains("https://example.com"));
    }

    #[test]
    fn test_closing_fence_must_be_whole_line() {
        let content = "---\ntitle: T\nsummary: a---b\n---\n----\nbody";
        let (fm, body) = FrontMatter::parse_strict(content).unwrap();
        assert_eq!(fm.unwrap().extra["summary"], serde_yaml::Value::from("a---b"));
        assert_eq!(body, "----\nbody");
    }

    #[test]
    fn test_unterminated_is_strict_error() {
        let content = "---\ntitle: Forever open\n\nbody";
        let err = FrontMatter::parse_strict(content).unwrap_err();
        assert!(matches!(err, FrontMatterError::Unterminated("---")));

        // the lenient parser keeps everything as body
        let (fm, body) = FrontMatter::parse(content).unwrap();
        assert!(fm.title.is_none());
        assert!(body.starts_with("---"));
    }

    #[test]
    fn test_invalid_yaml_is_strict_error() {
        let content = "---\ntitle: [broken\n---\nbody";
        let err = FrontMatter::parse_strict(content).unwrap_err();
        assert!(matches!(err, FrontMatterError::Yaml(_)));
    }

    #[test]
    fn test_parse_date_formats() {
        let fm = FrontMatter {
            date: Some("2024-01-15 10:30:00".to_string()),
            ..Default::default()
        };
        let dt = fm.parse_date(None).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 10:30");

        let dt = parse_date_string("2024/02/03", None).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-02-03");

        let dt = parse_date_string("2024-02-03T04:05:06+02:00", None).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);

        assert!(parse_date_string("yesterday", None).is_none());
    }

    #[test]
    fn test_parse_date_in_timezone() {
        let dt = parse_date_string("2024-07-01 12:00:00", Some(chrono_tz::Europe::London)).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 3600);
        assert_eq!(dt.format("%H").to_string(), "12");
    }
}
