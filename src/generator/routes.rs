//! Every URL path a generation run writes
//!
//! The generator writes exactly these routes; `check` resolves internal
//! links against them and `list route` prints them.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::content::loader::{is_hidden_or_special, is_markdown_file, is_skip_render, with_root};
use crate::content::{collect_tags, Page, Post};
use crate::helpers::normalize_route;
use crate::Site;

/// What a route serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Index into the post list
    Post(usize),
    /// Index into the page list
    Page(usize),
    /// Home page or one of its pagination pages
    Index(usize),
    Archive,
    TagIndex,
    Tag(String),
    Feed,
    SearchIndex,
    /// Static file copied from the source directory
    Asset(PathBuf),
}

impl RouteKind {
    /// Short human description, used in listings and diagnostics
    pub fn describe(&self, posts: &[Post], pages: &[Page]) -> String {
        match self {
            RouteKind::Post(i) => format!("post {}", posts[*i].source),
            RouteKind::Page(i) => format!("page {}", pages[*i].source),
            RouteKind::Index(1) => "home page".to_string(),
            RouteKind::Index(n) => format!("home page {}", n),
            RouteKind::Archive => "archive".to_string(),
            RouteKind::TagIndex => "tag index".to_string(),
            RouteKind::Tag(name) => format!("tag {}", name),
            RouteKind::Feed => "atom feed".to_string(),
            RouteKind::SearchIndex => "search index".to_string(),
            RouteKind::Asset(path) => format!("asset {}", path.display()),
        }
    }
}

/// A URL path (including the site root) and what it serves
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub kind: RouteKind,
}

impl Route {
    fn new(path: String, kind: RouteKind) -> Self {
        Self {
            path: normalize_route(&path),
            kind,
        }
    }
}

/// Number of home pages for a post count
pub fn index_page_count(site: &Site, post_count: usize) -> usize {
    post_count.div_ceil(site.config.per_page.max(1)).max(1)
}

/// Route of the n-th (1-based) home page
pub fn index_route(site: &Site, page_num: usize) -> String {
    if page_num <= 1 {
        with_root(&site.config, "")
    } else {
        with_root(&site.config, &format!("page/{}/", page_num))
    }
}

/// Route of the tag index
pub fn tag_index_route(site: &Site) -> String {
    with_root(&site.config, &format!("{}/", site.config.tag_dir.trim_matches('/')))
}

/// Route of the archive
pub fn archive_route(site: &Site) -> String {
    with_root(
        &site.config,
        &format!("{}/", site.config.archive_dir.trim_matches('/')),
    )
}

/// Collect every route in generation order
pub fn site_routes(site: &Site, posts: &[Post], pages: &[Page]) -> Vec<Route> {
    let config = &site.config;
    let mut routes = Vec::new();

    for n in 1..=index_page_count(site, posts.len()) {
        routes.push(Route::new(index_route(site, n), RouteKind::Index(n)));
    }
    for (i, post) in posts.iter().enumerate() {
        routes.push(Route::new(post.path.clone(), RouteKind::Post(i)));
    }
    for (i, page) in pages.iter().enumerate() {
        routes.push(Route::new(page.path.clone(), RouteKind::Page(i)));
    }
    routes.push(Route::new(archive_route(site), RouteKind::Archive));
    routes.push(Route::new(tag_index_route(site), RouteKind::TagIndex));
    for (tag, _) in collect_tags(posts, &config.root, &config.tag_dir) {
        routes.push(Route::new(tag.path.clone(), RouteKind::Tag(tag.name)));
    }
    if config.feed.enable {
        routes.push(Route::new(with_root(config, &config.feed.path), RouteKind::Feed));
    }
    routes.push(Route::new(
        with_root(config, "search.json"),
        RouteKind::SearchIndex,
    ));
    for asset in asset_files(site) {
        let path = with_root(config, &asset.to_string_lossy().replace('\\', "/"));
        routes.push(Route::new(path, RouteKind::Asset(asset)));
    }

    routes
}

/// Static files under the source directory, relative to it.
/// Markdown is rendered rather than copied unless `skip_render` matches it.
pub fn asset_files(site: &Site) -> Vec<PathBuf> {
    let source_dir = &site.source_dir;
    if !source_dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(source_dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_or_special(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(source_dir).ok()?.to_path_buf();
            if is_markdown_file(&relative) && !is_skip_render(&site.config, &relative) {
                None
            } else {
                Some(relative)
            }
        })
        .collect();
    files.sort();
    files
}

/// File under `public_dir` that a route is written to
pub fn output_path(site: &Site, route: &str) -> PathBuf {
    let root = site.config.root.trim_end_matches('/');
    let relative = route
        .strip_prefix(root)
        .unwrap_or(route)
        .trim_start_matches('/');
    let target = site.public_dir.join(relative);
    if relative.is_empty() || route.ends_with('/') {
        target.join("index.html")
    } else {
        target
    }
}

/// Route for a file already under `public_dir`
pub fn route_for_output(site: &Site, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(&site.public_dir).ok()?;
    let relative = relative.to_string_lossy().replace('\\', "/");
    Some(normalize_route(&with_root(&site.config, &relative)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    fn post(path: &str, tags: &[&str]) -> Post {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let mut p = Post::new("t".to_string(), date, format!("_posts{}.md", path));
        p.path = path.to_string();
        p.tags = tags.iter().map(|t| t.to_string()).collect();
        p
    }

    #[test]
    fn test_site_routes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("source/images")).unwrap();
        fs::create_dir_all(dir.path().join("source/_posts")).unwrap();
        fs::write(dir.path().join("source/images/logo.png"), b"png").unwrap();
        fs::write(dir.path().join("source/_posts/hidden.png"), b"png").unwrap();
        fs::write(dir.path().join("source/about.md"), "about").unwrap();

        let mut site = Site::new(dir.path()).unwrap();
        site.config.per_page = 1;

        let posts = vec![post("/a/", &["git"]), post("/b/", &["Windows SDK"])];
        let routes = site_routes(&site, &posts, &[]);
        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();

        assert!(paths.contains(&"/"));
        assert!(paths.contains(&"/page/2/"));
        assert!(!paths.contains(&"/page/3/"));
        assert!(paths.contains(&"/a/"));
        assert!(paths.contains(&"/archives/"));
        assert!(paths.contains(&"/tags/"));
        assert!(paths.contains(&"/tags/windows-sdk/"));
        assert!(paths.contains(&"/atom.xml"));
        assert!(paths.contains(&"/search.json"));
        assert!(paths.contains(&"/images/logo.png"));
        assert!(!paths.iter().any(|p| p.contains("hidden")));
        assert!(!paths.iter().any(|p| p.contains("about.md")));
    }

    #[test]
    fn test_output_path_strips_root() {
        let dir = TempDir::new().unwrap();
        let mut site = Site::new(dir.path()).unwrap();
        site.config.root = "/blog/".to_string();

        assert_eq!(
            output_path(&site, "/blog/"),
            site.public_dir.join("index.html")
        );
        assert_eq!(
            output_path(&site, "/blog/2020/x/"),
            site.public_dir.join("2020/x/index.html")
        );
        assert_eq!(
            output_path(&site, "/blog/atom.xml"),
            site.public_dir.join("atom.xml")
        );
        assert_eq!(
            route_for_output(&site, &site.public_dir.join("2020/x/index.html")).unwrap(),
            "/blog/2020/x/"
        );
    }
}
