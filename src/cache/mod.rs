//! Cache module for incremental generation
//!
//! Tracks a content hash per source document so that `generate` only
//! rewrites what changed. Any change to `_config.yml` or to the generator
//! version invalidates the whole cache.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::content::{Page, Post};
use crate::generator::routes::{asset_files, output_path};
use crate::Site;

/// Cache directory, relative to the site base directory
pub const CACHE_DIR: &str = ".quill-cache";
const CACHE_FILE: &str = "db.json";

/// Represents a cached entry for a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of everything rendered from the document
    pub content_hash: u64,
    /// Hash of what listing pages show: title, route, date, tags and preview
    pub listing_hash: u64,
    /// Date the post sorts by, empty for pages
    #[serde(default)]
    pub date: String,
    /// Output file, relative to the public directory
    pub output_path: String,
    /// Tags, for deciding which tag pages to rebuild
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CacheEntry {
    pub fn from_post(site: &Site, post: &Post) -> Self {
        let mut listing = DefaultHasher::new();
        post.title.hash(&mut listing);
        post.path.hash(&mut listing);
        post.date.to_rfc3339().hash(&mut listing);
        post.tags.hash(&mut listing);
        // the home page shows the excerpt, or the start of the content
        post.excerpt.as_ref().unwrap_or(&post.content).hash(&mut listing);
        let listing_hash = listing.finish();

        let mut content = DefaultHasher::new();
        listing_hash.hash(&mut content);
        post.raw.hash(&mut content);
        post.layout.hash(&mut content);
        post.excerpt.hash(&mut content);
        post.updated.map(|d| d.to_rfc3339()).hash(&mut content);
        for (key, value) in &post.extra {
            key.hash(&mut content);
            value.hash(&mut content);
        }
        Self {
            content_hash: content.finish(),
            listing_hash,
            date: post.date.to_rfc3339(),
            output_path: relative_output(site, &post.path),
            tags: post.tags.clone(),
        }
    }

    pub fn from_page(site: &Site, page: &Page) -> Self {
        let mut listing = DefaultHasher::new();
        page.title.hash(&mut listing);
        page.path.hash(&mut listing);
        let listing_hash = listing.finish();

        let mut content = DefaultHasher::new();
        listing_hash.hash(&mut content);
        page.raw.hash(&mut content);
        page.layout.hash(&mut content);
        for (key, value) in &page.extra {
            key.hash(&mut content);
            value.hash(&mut content);
        }
        Self {
            content_hash: content.finish(),
            listing_hash,
            date: String::new(),
            output_path: relative_output(site, &page.path),
            tags: Vec::new(),
        }
    }
}

/// Cache database for tracking file changes
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Version of the generator that wrote the cache
    pub generator: String,
    /// Hash of the site config (changes trigger full rebuild)
    pub config_hash: u64,
    /// Cached entries for posts, keyed by source path
    pub posts: HashMap<String, CacheEntry>,
    /// Cached entries for pages, keyed by source path
    pub pages: HashMap<String, CacheEntry>,
    /// Static files copied into the public directory, relative to it
    #[serde(default)]
    pub assets: Vec<String>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 3;

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = cache_path(base_dir);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<CacheDb>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, rebuilding cache"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::default()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create {:?}", cache_dir))?;

        let cache_path = cache_path(base_dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&cache_path, content)
            .with_context(|| format!("Failed to write {:?}", cache_path))?;
        Ok(())
    }

    /// Snapshot of the current site state
    pub fn build(site: &Site, posts: &[Post], pages: &[Page]) -> Result<Self> {
        Ok(Self {
            version: Self::VERSION,
            generator: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: config_hash(site)?,
            posts: posts
                .iter()
                .map(|p| (p.source.clone(), CacheEntry::from_post(site, p)))
                .collect(),
            pages: pages
                .iter()
                .map(|p| (p.source.clone(), CacheEntry::from_page(site, p)))
                .collect(),
            assets: asset_files(site)
                .iter()
                .map(|a| a.to_string_lossy().replace('\\', "/"))
                .collect(),
        })
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.version == 0 || (self.posts.is_empty() && self.pages.is_empty())
    }

    /// Outputs this cache recorded that `current` no longer produces
    pub fn stale_outputs(&self, current: &CacheDb) -> Vec<PathBuf> {
        let live: HashSet<&str> = current
            .posts
            .values()
            .chain(current.pages.values())
            .map(|e| e.output_path.as_str())
            .chain(current.assets.iter().map(String::as_str))
            .collect();

        let mut stale: Vec<PathBuf> = self
            .posts
            .values()
            .chain(self.pages.values())
            .map(|e| e.output_path.as_str())
            .chain(self.assets.iter().map(String::as_str))
            .filter(|output| !live.contains(output))
            .map(PathBuf::from)
            .collect();
        stale.sort();
        stale.dedup();
        stale
    }
}

/// Change detection result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Posts that need regeneration (source path)
    pub changed_posts: Vec<String>,
    /// Pages that need regeneration (source path)
    pub changed_pages: Vec<String>,
    /// Posts that were deleted
    pub deleted_posts: Vec<String>,
    /// Pages that were deleted
    pub deleted_pages: Vec<String>,
    /// Whether every post page needs regeneration (their prev/next links moved)
    pub rebuild_all_posts: bool,
    /// Whether index pages need regeneration
    pub rebuild_index: bool,
    /// Whether archive pages need regeneration
    pub rebuild_archives: bool,
    /// Whether tag pages need regeneration (specific tags or all)
    pub rebuild_tags: RebuildScope,
    /// Whether to regenerate everything (config or generator changed)
    pub full_rebuild: bool,
}

/// Scope of rebuild for tag pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildScope {
    /// No rebuild needed
    None,
    /// Only rebuild specific tags
    Specific(Vec<String>),
    /// Rebuild all
    All,
}

impl ChangeSet {
    /// Create a changeset indicating full rebuild is needed
    pub fn full_rebuild() -> Self {
        Self {
            rebuild_all_posts: true,
            rebuild_index: true,
            rebuild_archives: true,
            rebuild_tags: RebuildScope::All,
            full_rebuild: true,
            ..Self::empty()
        }
    }

    /// Create an empty changeset (no changes)
    pub fn empty() -> Self {
        Self {
            changed_posts: Vec::new(),
            changed_pages: Vec::new(),
            deleted_posts: Vec::new(),
            deleted_pages: Vec::new(),
            rebuild_all_posts: false,
            rebuild_index: false,
            rebuild_archives: false,
            rebuild_tags: RebuildScope::None,
            full_rebuild: false,
        }
    }

    /// Check if any changes were detected
    pub fn has_changes(&self) -> bool {
        self.full_rebuild
            || !self.changed_posts.is_empty()
            || !self.changed_pages.is_empty()
            || !self.deleted_posts.is_empty()
            || !self.deleted_pages.is_empty()
            || self.rebuild_all_posts
            || self.rebuild_index
            || self.rebuild_archives
            || self.rebuild_tags != RebuildScope::None
    }

    /// Whether any post was added, removed or edited
    pub fn posts_changed(&self) -> bool {
        self.full_rebuild || !self.changed_posts.is_empty() || !self.deleted_posts.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if self.full_rebuild {
            return "full rebuild required".to_string();
        }

        let mut parts = Vec::new();
        if !self.changed_posts.is_empty() {
            parts.push(format!("{} posts changed", self.changed_posts.len()));
        }
        if !self.changed_pages.is_empty() {
            parts.push(format!("{} pages changed", self.changed_pages.len()));
        }
        if !self.deleted_posts.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted_posts.len()));
        }
        if !self.deleted_pages.is_empty() {
            parts.push(format!("{} pages deleted", self.deleted_pages.len()));
        }
        if self.rebuild_all_posts {
            parts.push("all post pages".to_string());
        }
        if self.rebuild_index {
            parts.push("index pages".to_string());
        }
        if self.rebuild_archives {
            parts.push("archive pages".to_string());
        }
        match &self.rebuild_tags {
            RebuildScope::None => {}
            RebuildScope::Specific(tags) => parts.push(format!("{} tag pages", tags.len())),
            RebuildScope::All => parts.push("all tag pages".to_string()),
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for file content
pub fn hash_content(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Hash of `_config.yml`, 0 when the site has none
pub fn config_hash(site: &Site) -> Result<u64> {
    let path = site.config_path();
    if !path.exists() {
        return Ok(0);
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(hash_content(&content))
}

/// Compare the cached state with the current one
pub fn detect_changes(cache: &CacheDb, current: &CacheDb) -> ChangeSet {
    if cache.is_empty() {
        tracing::info!("No usable cache, full rebuild required");
        return ChangeSet::full_rebuild();
    }
    if cache.generator != current.generator {
        tracing::info!(
            "Generator changed ({} -> {}), full rebuild required",
            cache.generator,
            current.generator
        );
        return ChangeSet::full_rebuild();
    }
    if cache.config_hash != current.config_hash {
        tracing::info!("Config changed, full rebuild required");
        return ChangeSet::full_rebuild();
    }

    let mut changeset = ChangeSet::empty();
    let mut affected_tags: Vec<String> = Vec::new();

    for (source, entry) in &current.posts {
        match cache.posts.get(source) {
            Some(cached) if cached == entry => {}
            Some(cached) => {
                tracing::debug!("Post changed: {}", source);
                changeset.changed_posts.push(source.clone());
                if cached.date != entry.date {
                    changeset.rebuild_all_posts = true;
                }
                if cached.listing_hash != entry.listing_hash {
                    changeset.rebuild_index = true;
                    changeset.rebuild_archives = true;
                    affected_tags.extend(entry.tags.iter().cloned());
                    affected_tags.extend(cached.tags.iter().cloned());
                }
            }
            None => {
                tracing::debug!("New post: {}", source);
                changeset.changed_posts.push(source.clone());
                affected_tags.extend(entry.tags.iter().cloned());
                changeset.rebuild_index = true;
                changeset.rebuild_archives = true;
            }
        }
    }

    for (source, cached) in &cache.posts {
        if !current.posts.contains_key(source) {
            tracing::debug!("Deleted post: {}", source);
            changeset.deleted_posts.push(source.clone());
            changeset.rebuild_all_posts = true;
            affected_tags.extend(cached.tags.iter().cloned());
            changeset.rebuild_index = true;
            changeset.rebuild_archives = true;
        }
    }

    for (source, entry) in &current.pages {
        if cache.pages.get(source) != Some(entry) {
            tracing::debug!("Page changed: {}", source);
            changeset.changed_pages.push(source.clone());
        }
    }

    for source in cache.pages.keys() {
        if !current.pages.contains_key(source) {
            tracing::debug!("Deleted page: {}", source);
            changeset.deleted_pages.push(source.clone());
        }
    }

    affected_tags.retain(|t| !t.trim().is_empty());
    if !affected_tags.is_empty() {
        affected_tags.sort();
        affected_tags.dedup();
        changeset.rebuild_tags = RebuildScope::Specific(affected_tags);
    }

    changeset.changed_posts.sort();
    changeset.changed_pages.sort();
    changeset.deleted_posts.sort();
    changeset.deleted_pages.sort();

    changeset
}

fn cache_path(base_dir: &Path) -> PathBuf {
    base_dir.join(CACHE_DIR).join(CACHE_FILE)
}

fn relative_output(site: &Site, route: &str) -> String {
    let path = output_path(site, route);
    path.strip_prefix(&site.public_dir)
        .unwrap_or(&path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use tempfile::TempDir;

    fn post(source: &str, raw: &str, tags: &[&str]) -> Post {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let mut p = Post::new(source.to_string(), date, source.to_string());
        p.path = format!("/{}/", source);
        p.raw = raw.to_string();
        p.tags = tags.iter().map(|t| t.to_string()).collect();
        p
    }

    fn snapshot(site: &Site, posts: &[Post]) -> CacheDb {
        CacheDb::build(site, posts, &[]).unwrap()
    }

    #[test]
    fn test_empty_cache_forces_full_rebuild() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let current = snapshot(&site, &[post("a", "x", &[])]);
        assert!(detect_changes(&CacheDb::load(dir.path()), &current).full_rebuild);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let db = snapshot(&site, &[post("a", "x", &["git"])]);
        db.save(dir.path()).unwrap();
        assert!(dir.path().join(".quill-cache/db.json").exists());

        let loaded = CacheDb::load(dir.path());
        assert_eq!(loaded.posts["a"].output_path, "a/index.html");
        assert_eq!(detect_changes(&loaded, &db), ChangeSet::empty());
    }

    #[test]
    fn test_body_edit_refreshes_home_preview() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let old = snapshot(&site, &[post("a", "x", &["git"]), post("b", "y", &[])]);
        let mut edited = post("a", "x2", &["git"]);
        edited.content = "<p>x2</p>".to_string();
        let new = snapshot(&site, &[edited, post("b", "y", &[])]);

        let changes = detect_changes(&old, &new);
        assert_eq!(changes.changed_posts, vec!["a"]);
        assert!(changes.rebuild_index);
        assert!(!changes.rebuild_all_posts);
    }

    #[test]
    fn test_edit_behind_excerpt_keeps_listings() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let mut old_post = post("a", "x", &["git"]);
        old_post.excerpt = Some("<p>intro</p>".to_string());
        old_post.content = "<p>intro</p><p>x</p>".to_string();
        let mut new_post = old_post.clone();
        new_post.raw = "x2".to_string();
        new_post.content = "<p>intro</p><p>x2</p>".to_string();

        let changes = detect_changes(&snapshot(&site, &[old_post]), &snapshot(&site, &[new_post]));
        assert_eq!(changes.changed_posts, vec!["a"]);
        assert!(!changes.rebuild_index);
        assert_eq!(changes.rebuild_tags, RebuildScope::None);
    }

    #[test]
    fn test_date_change_rebuilds_all_posts() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let old = snapshot(&site, &[post("a", "x", &[]), post("b", "y", &[])]);
        let mut moved = post("a", "x", &[]);
        moved.date = moved.date + chrono::Duration::days(3);
        let new = snapshot(&site, &[moved, post("b", "y", &[])]);

        let changes = detect_changes(&old, &new);
        assert!(changes.rebuild_all_posts);
        assert!(changes.rebuild_index);
    }

    #[test]
    fn test_removed_asset_is_stale() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("source/img")).unwrap();
        fs::write(dir.path().join("source/img/a.png"), "a").unwrap();
        fs::write(dir.path().join("source/img/b.png"), "b").unwrap();
        let site = Site::new(dir.path()).unwrap();
        let old = snapshot(&site, &[]);
        assert_eq!(old.assets, vec!["img/a.png", "img/b.png"]);

        fs::remove_file(dir.path().join("source/img/b.png")).unwrap();
        let new = snapshot(&site, &[]);
        assert_eq!(old.stale_outputs(&new), vec![PathBuf::from("img/b.png")]);
    }

    #[test]
    fn test_tag_edit_and_delete() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let old = snapshot(&site, &[post("a", "x", &["git"]), post("b", "y", &["rust"])]);
        let new = snapshot(&site, &[post("a", "x", &["graphql"])]);

        let changes = detect_changes(&old, &new);
        assert_eq!(changes.changed_posts, vec!["a"]);
        assert_eq!(changes.deleted_posts, vec!["b"]);
        assert!(changes.rebuild_index);
        assert_eq!(
            changes.rebuild_tags,
            RebuildScope::Specific(vec![
                "git".to_string(),
                "graphql".to_string(),
                "rust".to_string()
            ])
        );
        assert_eq!(old.stale_outputs(&new), vec![PathBuf::from("b/index.html")]);
    }

    #[test]
    fn test_config_change_forces_full_rebuild() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let old = snapshot(&site, &[post("a", "x", &[])]);

        fs::write(dir.path().join("_config.yml"), "title: Changed\n").unwrap();
        let site = Site::new(dir.path()).unwrap();
        let new = snapshot(&site, &[post("a", "x", &[])]);
        assert!(detect_changes(&old, &new).full_rebuild);
    }
}
