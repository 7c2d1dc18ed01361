//! Built-in templates using the Tera template engine
//!
//! The default templates are embedded in the binary; a site needs no theme
//! directory to generate.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers::{format_date, strip_html, truncate};

/// Template renderer with the embedded default templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Content is already rendered HTML; templates escape text with `| escape`
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("default/layout.html")),
            ("index.html", include_str!("default/index.html")),
            ("post.html", include_str!("default/post.html")),
            ("page.html", include_str!("default/page.html")),
            ("archive.html", include_str!("default/archive.html")),
            ("tags.html", include_str!("default/tags.html")),
            ("tag.html", include_str!("default/tag.html")),
            (
                "partials/pager.html",
                include_str!("default/partials/pager.html"),
            ),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("date_format", date_format_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };
    Ok(tera::Value::String(truncate(&s, length, Some(&omission))))
}

/// Tera filter: reformat an RFC 3339 date with a Moment-style format
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "YYYY-MM-DD".to_string(),
    };

    match chrono::DateTime::parse_from_rfc3339(&s) {
        Ok(date) => Ok(tera::Value::String(format_date(&date, &format))),
        // Not a full timestamp, leave it as written
        Err(_) => Ok(tera::Value::String(s)),
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub posts: Vec<PostData>,
    pub tags: Vec<TagData>,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    /// Date formatted with the site's `date_format`
    pub date: String,
    /// RFC 3339 date
    pub date_xml: String,
    pub path: String,
    pub permalink: String,
    pub tags: Vec<TagLink>,
    pub content: String,
    pub excerpt: Option<String>,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    pub title: String,
    pub date: String,
    pub date_xml: String,
    pub path: String,
    pub permalink: String,
    pub content: String,
    pub layout: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub per_page: usize,
    pub total: usize,
    pub current: usize,
    pub current_url: String,
    pub prev: usize,
    pub prev_link: String,
    pub next: usize,
    pub next_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveYearData {
    pub year: i32,
    pub posts: Vec<PostData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagLink {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagData {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub archive_path: String,
    pub tags_path: String,
    /// Empty when the feed is disabled
    pub feed_path: String,
    pub generator: String,
}
