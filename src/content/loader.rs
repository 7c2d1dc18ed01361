//! Content loader - loads posts and pages from source directory

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::markdown::heading_ids;
use super::{FrontMatter, MarkdownRenderer, Page, Post};
use crate::config::SiteConfig;
use crate::Site;

lazy_static! {
    /// `2019-03-02-graphql-rules` style file stems
    static ref DATED_STEM: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})-(.+)$").unwrap();
}

/// Directory holding posts, relative to the source directory
pub const POSTS_DIR: &str = "_posts";
/// Directory holding drafts, relative to the source directory
pub const DRAFTS_DIR: &str = "_drafts";

/// Loads content from the source directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        let renderer = MarkdownRenderer::from_config(&site.config.highlight);
        Self { site, renderer }
    }

    /// Markdown files that hold posts (and drafts when `render_drafts` is on)
    pub fn post_files(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.site.source_dir.join(POSTS_DIR)];
        if self.site.config.render_drafts {
            dirs.push(self.site.source_dir.join(DRAFTS_DIR));
        }

        let mut files: Vec<PathBuf> = dirs
            .iter()
            .filter(|dir| dir.exists())
            .flat_map(|dir| {
                WalkDir::new(dir)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
                    .map(|e| e.into_path())
            })
            .collect();
        files.sort();
        files
    }

    /// Markdown files outside `_`-prefixed directories that are not skipped
    pub fn page_files(&self) -> Vec<PathBuf> {
        let source_dir = &self.site.source_dir;
        if !source_dir.exists() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(source_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_or_special(e.path()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
            .filter(|e| {
                let relative = e.path().strip_prefix(source_dir).unwrap_or(e.path());
                !is_skip_render(&self.site.config, relative)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    /// Load all posts, newest first
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let mut posts = Vec::new();

        for path in self.post_files() {
            match self.load_post(&path) {
                Ok(post) => {
                    if post.published || self.site.config.render_drafts {
                        posts.push(post);
                    } else {
                        tracing::debug!("Skipping unpublished post {:?}", path);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to load post {:?}: {:#}", path, e);
                }
            }
        }

        sort_posts(&mut posts);

        Ok(posts)
    }

    /// Load a single post from a file
    pub fn load_post(&self, path: &Path) -> Result<Post> {
        let config = &self.site.config;
        let tz = config.tz();

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let (fm, body) = FrontMatter::parse(&content)?;

        let stem = file_stem(path);
        let (stem_date, slug) = split_dated_stem(&stem, tz);

        let file_modified = modified_time(path);
        let date = fm
            .parse_date(tz)
            .or(stem_date)
            .or(file_modified)
            .unwrap_or_else(|| Local::now().fixed_offset());
        let updated = fm.parse_updated(tz).or(file_modified);

        let title = fm.title.clone().unwrap_or_else(|| stem.clone());
        let source = self.relative_source(path);

        let route = match fm.permalink.as_deref() {
            Some(custom) => with_root(config, custom),
            None => permalink_path(config, &date, &slug),
        };
        let permalink = format!("{}{}", config.url.trim_end_matches('/'), route);

        let (excerpt_md, full_md) = MarkdownRenderer::split_excerpt(body);
        let content_html = self
            .renderer
            .render(&full_md)
            .with_context(|| format!("Failed to render {:?}", path))?;
        let excerpt_html = match (excerpt_md, fm.excerpt.as_deref()) {
            (Some(md), _) => Some(self.renderer.render(&md)?),
            (None, Some(text)) => Some(self.renderer.render(text)?),
            (None, None) => None,
        };

        let mut post = Post::new(title, date, source);
        post.layout = fm
            .layout
            .clone()
            .unwrap_or_else(|| config.default_layout.clone());
        post.tags = fm.tags;
        post.updated = updated;
        post.raw = body.to_string();
        post.content = content_html;
        post.excerpt = excerpt_html;
        post.full_source = path.to_path_buf();
        post.slug = slug;
        post.path = route;
        post.permalink = permalink;
        post.published = fm.published;
        post.anchors = heading_ids(&full_md);
        post.extra = fm.extra;

        Ok(post)
    }

    /// Load all pages (markdown files outside `_posts`)
    pub fn load_pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();

        for path in self.page_files() {
            match self.load_page(&path) {
                Ok(page) => pages.push(page),
                Err(e) => {
                    tracing::warn!("Failed to load page {:?}: {:#}", path, e);
                }
            }
        }

        Ok(pages)
    }

    /// Load a single page from a file
    pub fn load_page(&self, path: &Path) -> Result<Page> {
        let config = &self.site.config;
        let tz = config.tz();

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let (fm, body) = FrontMatter::parse(&content)?;

        let file_modified = modified_time(path);
        let date = fm
            .parse_date(tz)
            .or(file_modified)
            .unwrap_or_else(|| Local::now().fixed_offset());
        let updated = fm.parse_updated(tz).or(file_modified);

        let title = fm.title.clone().unwrap_or_else(|| file_stem(path));
        let source = self.relative_source(path);

        let route = match fm.permalink.as_deref() {
            Some(custom) => with_root(config, custom),
            None => with_root(config, &page_route(&source)),
        };
        let permalink = format!("{}{}", config.url.trim_end_matches('/'), route);

        let content_html = self
            .renderer
            .render(body)
            .with_context(|| format!("Failed to render {:?}", path))?;

        let mut page = Page::new(title, date, source);
        page.layout = fm.layout.clone().unwrap_or_else(|| "page".to_string());
        page.updated = updated;
        page.raw = body.to_string();
        page.content = content_html;
        page.full_source = path.to_path_buf();
        page.path = route;
        page.permalink = permalink;
        page.anchors = heading_ids(body);
        page.extra = fm.extra;

        Ok(page)
    }

    /// Source path relative to the source dir, with `/` separators
    fn relative_source(&self, path: &Path) -> String {
        relative_source(&self.site.source_dir, path)
    }
}

/// Source path relative to `source_dir`, with `/` separators
pub fn relative_source(source_dir: &Path, path: &Path) -> String {
    path.strip_prefix(source_dir)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sort newest first; equal dates fall back to the source path
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.source.cmp(&b.source)));
}

/// Build the URL path of a post from the configured permalink pattern
pub fn permalink_path(config: &SiteConfig, date: &DateTime<FixedOffset>, slug: &str) -> String {
    let result = config
        .permalink
        .replace(":year", &date.format("%Y").to_string())
        .replace(":i_month", &date.format("%-m").to_string())
        .replace(":i_day", &date.format("%-d").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":hour", &date.format("%H").to_string())
        .replace(":minute", &date.format("%M").to_string())
        .replace(":second", &date.format("%S").to_string())
        .replace(":title", slug)
        .replace(":name", slug)
        .replace(":id", slug);

    with_root(config, &result)
}

/// Route of a page from its relative source path.
/// `about.md` -> `about/`, `docs/index.md` -> `docs/`, `index.md` -> ``
pub fn page_route(source: &str) -> String {
    let without_ext = source
        .strip_suffix(".markdown")
        .or_else(|| source.strip_suffix(".md"))
        .unwrap_or(source);

    if without_ext == "index" {
        String::new()
    } else if let Some(dir) = without_ext.strip_suffix("/index") {
        format!("{}/", dir)
    } else {
        format!("{}/", without_ext)
    }
}

/// Prefix a site-relative path with the configured root
pub fn with_root(config: &SiteConfig, path: &str) -> String {
    format!(
        "{}/{}",
        config.root.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Split a Jekyll-style dated file stem into its date and slug
fn split_dated_stem(stem: &str, tz: Option<chrono_tz::Tz>) -> (Option<DateTime<FixedOffset>>, String) {
    if let Some(caps) = DATED_STEM.captures(stem) {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().unwrap_or(0),
            caps[2].parse().unwrap_or(0),
            caps[3].parse().unwrap_or(0),
        )
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| match tz {
            Some(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|d| d.fixed_offset()),
            None => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|d| d.fixed_offset()),
        });
        if date.is_some() {
            return (date, caps[4].to_string());
        }
    }
    (None, stem.to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

fn modified_time(path: &Path) -> Option<DateTime<FixedOffset>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(|t| DateTime::<Local>::from(t).fixed_offset())
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

/// `_posts`, `_drafts`, `.git` and friends never become pages or assets
pub fn is_hidden_or_special(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('_') || n.starts_with('.'))
        .unwrap_or(false)
}

/// Whether a source-relative path matches a `skip_render` pattern
pub fn is_skip_render(config: &SiteConfig, relative: &Path) -> bool {
    let relative = relative.to_string_lossy().replace('\\', "/");
    config.skip_render.iter().any(|pattern| {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(&relative))
            .unwrap_or_else(|e| {
                tracing::warn!("Invalid skip_render pattern {:?}: {}", pattern, e);
                false
            })
    })
}
