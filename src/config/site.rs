//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    /// IANA timezone name, empty means local time
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,
    pub permalink: String,

    // Directory
    pub source_dir: String,
    pub public_dir: String,
    pub tag_dir: String,
    pub archive_dir: String,
    #[serde(default)]
    pub skip_render: Vec<String>,

    // Writing
    pub new_post_name: String,
    pub default_layout: String,
    pub render_drafts: bool,
    /// Layout names a document may declare
    pub layouts: Vec<String>,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Listing
    pub per_page: usize,
    pub date_format: String,
    #[serde(default)]
    pub feed: FeedConfig,

    // Linting
    #[serde(default)]
    pub check: CheckConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Quill".to_string(),
            subtitle: String::new(),
            description: String::new(),
            author: "John Doe".to_string(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),
            permalink: ":year/:month/:day/:title/".to_string(),

            source_dir: "source".to_string(),
            public_dir: "public".to_string(),
            tag_dir: "tags".to_string(),
            archive_dir: "archives".to_string(),
            skip_render: Vec::new(),

            new_post_name: ":title.md".to_string(),
            default_layout: "post".to_string(),
            render_drafts: false,
            layouts: vec!["post".to_string(), "page".to_string(), "draft".to_string()],
            highlight: HighlightConfig::default(),

            per_page: 10,
            date_format: "YYYY-MM-DD".to_string(),
            feed: FeedConfig::default(),

            check: CheckConfig::default(),

            extra: IndexMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        if config.per_page == 0 {
            tracing::warn!("per_page must be positive, using 10");
            config.per_page = 10;
        }
        Ok(config)
    }

    /// Resolve the configured timezone, `None` means local time
    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        let name = self.timezone.trim();
        if name.is_empty() {
            return None;
        }
        match name.parse::<chrono_tz::Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                tracing::warn!("Unknown timezone {:?}, using local time", name);
                None
            }
        }
    }

    /// Whether a layout name is one the site knows about
    pub fn is_known_layout(&self, layout: &str) -> bool {
        self.layouts.iter().any(|l| l == layout)
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    /// syntect theme name
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
            line_number: true,
        }
    }
}

/// Atom feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enable: bool,
    pub path: String,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: "atom.xml".to_string(),
            limit: 20,
        }
    }
}

/// Settings for `quill check`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Warn about posts without tags
    pub require_tags: bool,
    /// Resolve internal markdown links
    pub check_links: bool,
    /// Resolve `#fragment` against heading ids
    pub check_anchors: bool,
    /// Glob patterns of link targets to skip
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            require_tags: false,
            check_links: true,
            check_anchors: true,
            ignore: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "Quill");
        assert_eq!(config.default_layout, "post");
        assert_eq!(config.per_page, 10);
        assert!(config.check.check_links);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
author: Test User
per_page: 20
layouts: [post, page, talk]
check:
  require_tags: true
  ignore:
    - "/drafts/**"
github_username: someone
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.author, "Test User");
        assert_eq!(config.per_page, 20);
        assert!(config.is_known_layout("talk"));
        assert!(!config.is_known_layout("draft"));
        assert!(config.check.require_tags);
        assert!(config.check.check_anchors);
        assert_eq!(config.check.ignore, vec!["/drafts/**"]);
        assert!(config.extra.contains_key("github_username"));
    }

    #[test]
    fn test_timezone() {
        let mut config = SiteConfig::default();
        assert!(config.tz().is_none());

        config.timezone = "Europe/London".to_string();
        assert_eq!(config.tz(), Some(chrono_tz::Europe::London));

        config.timezone = "Mars/Olympus".to_string();
        assert!(config.tz().is_none());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "title: [unclosed").unwrap();
        let err = SiteConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("_config.yml"));
    }
}
