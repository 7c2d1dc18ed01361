//! Generator module - generates static HTML files using built-in Tera templates

pub mod routes;

use anyhow::{Context as _, Result};
use chrono::Datelike;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;

use self::routes::{
    archive_route, asset_files, index_page_count, index_route, output_path, tag_index_route,
};
use crate::cache::{ChangeSet, RebuildScope};
use crate::content::loader::{sort_posts, with_root};
use crate::content::{collect_tags, Page, Post, Tag};
use crate::helpers::{
    absolutize_urls, count_words, date_xml, escape_xml, format_date, full_url_for,
    meta_generator, strip_html, strip_invalid_xml_chars, toc,
};
use crate::templates::{
    ArchiveYearData, ConfigData, NavPost, PageData, PaginationData, PostData, SiteData, TagData,
    TagLink, TemplateRenderer,
};
use crate::Site;

/// Heading depth included in a post's table of contents
const TOC_DEPTH: usize = 3;

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Generate the entire site
    pub fn generate(&self, posts: &[Post], pages: &[Page]) -> Result<()> {
        fs::create_dir_all(&self.site.public_dir)
            .with_context(|| format!("Failed to create {:?}", self.site.public_dir))?;

        let posts = sorted(posts);
        let site_data = self.build_site_data(&posts);
        let config_data = self.build_config_data();

        self.sync_assets()?;
        self.generate_index_pages(&posts, &site_data, &config_data)?;
        for i in 0..posts.len() {
            self.generate_post_page(&posts, i, &site_data, &config_data)?;
        }
        for page in pages {
            self.generate_page(page, &site_data, &config_data)?;
        }
        self.generate_archive_page(&posts, &site_data, &config_data)?;
        self.generate_tag_index(&site_data, &config_data)?;
        self.generate_tag_pages(&posts, &RebuildScope::All, &site_data, &config_data)?;
        self.generate_atom_feed(&posts)?;
        self.generate_search_index(&posts)?;

        tracing::info!(
            "Generated {} posts, {} pages and {} tags",
            posts.len(),
            pages.len(),
            site_data.tags.len()
        );
        Ok(())
    }

    /// Regenerate only what a changeset touches
    pub fn generate_incremental(
        &self,
        posts: &[Post],
        pages: &[Page],
        changeset: &ChangeSet,
    ) -> Result<()> {
        if changeset.full_rebuild {
            return self.generate(posts, pages);
        }

        fs::create_dir_all(&self.site.public_dir)
            .with_context(|| format!("Failed to create {:?}", self.site.public_dir))?;

        let posts = sorted(posts);
        let site_data = self.build_site_data(&posts);
        let config_data = self.build_config_data();

        self.sync_assets()?;

        // Neighbours of a changed post carry its title in their navigation
        let mut post_targets: HashSet<usize> = HashSet::new();
        let all_posts = changeset.rebuild_all_posts;
        for (i, post) in posts.iter().enumerate() {
            if all_posts || changeset.changed_posts.contains(&post.source) {
                post_targets.insert(i);
                if changeset.rebuild_index {
                    post_targets.insert(i.saturating_sub(1));
                    if i + 1 < posts.len() {
                        post_targets.insert(i + 1);
                    }
                }
            }
        }
        let mut post_targets: Vec<usize> = post_targets.into_iter().collect();
        post_targets.sort_unstable();
        for i in &post_targets {
            self.generate_post_page(&posts, *i, &site_data, &config_data)?;
        }

        let mut page_count = 0;
        for page in pages {
            if changeset.changed_pages.contains(&page.source) {
                self.generate_page(page, &site_data, &config_data)?;
                page_count += 1;
            }
        }

        if changeset.rebuild_index {
            self.remove_extra_index_pages(posts.len())?;
            self.generate_index_pages(&posts, &site_data, &config_data)?;
        }
        if changeset.rebuild_archives {
            self.generate_archive_page(&posts, &site_data, &config_data)?;
        }
        if changeset.rebuild_tags != RebuildScope::None {
            self.generate_tag_index(&site_data, &config_data)?;
            self.generate_tag_pages(&posts, &changeset.rebuild_tags, &site_data, &config_data)?;
        }
        if changeset.posts_changed() {
            self.generate_atom_feed(&posts)?;
            self.generate_search_index(&posts)?;
        }

        tracing::info!(
            "Regenerated {} posts and {} pages",
            post_targets.len(),
            page_count
        );
        Ok(())
    }

    /// Delete output files relative to the public directory
    pub fn remove_outputs(&self, outputs: &[PathBuf]) -> Result<()> {
        for relative in outputs {
            self.remove_output(&self.site.public_dir.join(relative))?;
        }
        Ok(())
    }

    fn remove_output(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))?;
        tracing::debug!("Removed: {:?}", path);

        // Drop directories the removal left empty
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == self.site.public_dir || fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self, posts: &[Post]) -> SiteData {
        let config = &self.site.config;
        let tags = collect_tags(posts, &config.root, &config.tag_dir)
            .into_iter()
            .map(|(tag, _)| tag_data(tag))
            .collect();

        SiteData {
            posts: posts.iter().map(|p| self.post_data(p, false)).collect(),
            tags,
            word_count: posts.iter().map(|p| count_words(&p.content)).sum(),
        }
    }

    /// Build config data for templates
    fn build_config_data(&self) -> ConfigData {
        let config = &self.site.config;
        ConfigData {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: with_root(config, ""),
            archive_path: archive_route(&self.site),
            tags_path: tag_index_route(&self.site),
            feed_path: if config.feed.enable {
                with_root(config, &config.feed.path)
            } else {
                String::new()
            },
            generator: meta_generator(),
        }
    }

    fn post_data(&self, post: &Post, with_content: bool) -> PostData {
        let config = &self.site.config;
        let tags = post
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                let tag = Tag::new(t, &config.root, &config.tag_dir);
                TagLink {
                    name: tag.name,
                    path: tag.path,
                }
            })
            .collect();

        PostData {
            title: post.title.clone(),
            date: format_date(&post.date, &config.date_format),
            date_xml: date_xml(&post.date),
            path: post.path.clone(),
            permalink: post.permalink.clone(),
            tags,
            content: if with_content {
                post.content.clone()
            } else {
                String::new()
            },
            excerpt: post.excerpt.clone(),
            word_count: count_words(&post.content),
        }
    }

    /// Create a base context with common variables
    fn base_context(&self, site_data: &SiteData, config_data: &ConfigData) -> Context {
        let mut context = Context::new();
        context.insert("site", site_data);
        context.insert("config", config_data);
        context.insert("page_title", "");
        context.insert("current_year", &chrono::Local::now().year());
        context
    }

    /// Generate index pages with pagination
    fn generate_index_pages(
        &self,
        posts: &[Post],
        site_data: &SiteData,
        config_data: &ConfigData,
    ) -> Result<()> {
        let per_page = self.site.config.per_page.max(1);
        let total_pages = index_page_count(&self.site, posts.len());

        for page_num in 1..=total_pages {
            let start = ((page_num - 1) * per_page).min(posts.len());
            let end = (start + per_page).min(posts.len());
            let page_posts: Vec<PostData> = posts[start..end]
                .iter()
                .map(|p| self.post_data(p, true))
                .collect();

            let pagination = PaginationData {
                per_page,
                total: total_pages,
                current: page_num,
                current_url: index_route(&self.site, page_num),
                prev: page_num.saturating_sub(1),
                prev_link: if page_num > 1 {
                    index_route(&self.site, page_num - 1)
                } else {
                    String::new()
                },
                next: if page_num < total_pages {
                    page_num + 1
                } else {
                    0
                },
                next_link: if page_num < total_pages {
                    index_route(&self.site, page_num + 1)
                } else {
                    String::new()
                },
            };

            let mut context = self.base_context(site_data, config_data);
            context.insert("page_posts", &page_posts);
            context.insert("pagination", &pagination);
            context.insert("is_home", &true);
            context.insert("current_path", &pagination.current_url);

            let html = self.renderer.render("index.html", &context)?;
            self.write_route(&pagination.current_url, &html)?;
        }

        Ok(())
    }

    /// Remove `page/N/` directories beyond the current page count
    fn remove_extra_index_pages(&self, post_count: usize) -> Result<()> {
        let mut n = index_page_count(&self.site, post_count) + 1;
        loop {
            let path = output_path(&self.site, &index_route(&self.site, n));
            if !path.exists() {
                return Ok(());
            }
            self.remove_output(&path)?;
            n += 1;
        }
    }

    /// Generate one post page
    fn generate_post_page(
        &self,
        posts: &[Post],
        i: usize,
        site_data: &SiteData,
        config_data: &ConfigData,
    ) -> Result<()> {
        let post = &posts[i];
        let nav = |p: &Post| NavPost {
            title: p.title.clone(),
            path: p.path.clone(),
        };

        let toc_html = toc(&post.content, TOC_DEPTH);

        let mut context = self.base_context(site_data, config_data);
        context.insert("page_title", &post.title);
        context.insert("post", &self.post_data(post, true));
        context.insert("current_path", &post.path);
        context.insert("show_toc", &!toc_html.is_empty());
        context.insert("toc", &toc_html);
        if let Some(older) = post.older(posts) {
            context.insert("prev_post", &nav(older));
        }
        if let Some(newer) = post.newer(posts) {
            context.insert("next_post", &nav(newer));
        }

        let html = self
            .renderer
            .render("post.html", &context)
            .with_context(|| format!("Failed to render {}", post.source))?;
        self.write_route(&post.path, &html)
    }

    /// Generate one standalone page
    fn generate_page(
        &self,
        page: &Page,
        site_data: &SiteData,
        config_data: &ConfigData,
    ) -> Result<()> {
        let data = PageData {
            title: page.title.clone(),
            date: format_date(&page.date, &self.site.config.date_format),
            date_xml: date_xml(&page.date),
            path: page.path.clone(),
            permalink: page.permalink.clone(),
            content: page.content.clone(),
            layout: page.layout.clone(),
        };

        let mut context = self.base_context(site_data, config_data);
        context.insert("page_title", &page.title);
        context.insert("page", &data);
        context.insert("current_path", &page.path);

        let html = self
            .renderer
            .render("page.html", &context)
            .with_context(|| format!("Failed to render {}", page.source))?;
        self.write_route(&page.path, &html)
    }

    /// Generate archive page
    fn generate_archive_page(
        &self,
        posts: &[Post],
        site_data: &SiteData,
        config_data: &ConfigData,
    ) -> Result<()> {
        let mut years_map: BTreeMap<i32, Vec<PostData>> = BTreeMap::new();
        for post in posts {
            years_map
                .entry(post.date.year())
                .or_default()
                .push(self.post_data(post, false));
        }

        // Newest year first
        let archive_years: Vec<ArchiveYearData> = years_map
            .into_iter()
            .rev()
            .map(|(year, posts)| ArchiveYearData { year, posts })
            .collect();

        let route = archive_route(&self.site);
        let mut context = self.base_context(site_data, config_data);
        context.insert("page_title", "Archives");
        context.insert("archive_years", &archive_years);
        context.insert("current_path", &route);

        let html = self.renderer.render("archive.html", &context)?;
        self.write_route(&route, &html)
    }

    /// Generate the page listing all tags
    fn generate_tag_index(&self, site_data: &SiteData, config_data: &ConfigData) -> Result<()> {
        let route = tag_index_route(&self.site);
        let mut context = self.base_context(site_data, config_data);
        context.insert("page_title", "Tags");
        context.insert("current_path", &route);

        let html = self.renderer.render("tags.html", &context)?;
        self.write_route(&route, &html)
    }

    /// Generate per-tag pages; tags in scope that lost all posts are removed
    fn generate_tag_pages(
        &self,
        posts: &[Post],
        scope: &RebuildScope,
        site_data: &SiteData,
        config_data: &ConfigData,
    ) -> Result<()> {
        let config = &self.site.config;
        let tags = collect_tags(posts, &config.root, &config.tag_dir);

        let wanted: Option<HashSet<String>> = match scope {
            RebuildScope::None => return Ok(()),
            RebuildScope::All => None,
            RebuildScope::Specific(names) => Some(names.iter().map(|n| slug::slugify(n)).collect()),
        };

        let mut count = 0;
        for (tag, indices) in &tags {
            if wanted.as_ref().is_some_and(|w| !w.contains(&tag.slug)) {
                continue;
            }
            let tag_posts: Vec<PostData> = indices
                .iter()
                .map(|&i| self.post_data(&posts[i], false))
                .collect();

            let mut context = self.base_context(site_data, config_data);
            context.insert("page_title", &tag.name);
            context.insert("tag", &tag_data(tag.clone()));
            context.insert("tag_posts", &tag_posts);
            context.insert("current_path", &tag.path);

            let html = self.renderer.render("tag.html", &context)?;
            self.write_route(&tag.path, &html)?;
            count += 1;
        }

        if let Some(wanted) = wanted {
            let live: HashSet<&str> = tags.iter().map(|(t, _)| t.slug.as_str()).collect();
            for slug in wanted.iter().filter(|s| !s.is_empty() && !live.contains(s.as_str())) {
                let gone = Tag::new(slug, &config.root, &config.tag_dir);
                self.remove_output(&output_path(&self.site, &gone.path))?;
            }
        }

        tracing::debug!("Generated {} tag pages", count);
        Ok(())
    }

    /// Generate Atom feed
    fn generate_atom_feed(&self, posts: &[Post]) -> Result<()> {
        let config = &self.site.config;
        if !config.feed.enable {
            return Ok(());
        }

        let feed_route = with_root(config, &config.feed.path);
        let home = full_url_for(config, "");
        let updated = posts
            .iter()
            .map(|p| p.updated.unwrap_or(p.date))
            .max()
            .map(|d| date_xml(&d))
            .unwrap_or_else(|| date_xml(&chrono::Local::now()));

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        if !config.subtitle.is_empty() {
            feed.push_str(&format!(
                "  <subtitle>{}</subtitle>\n",
                escape_xml(&config.subtitle)
            ));
        }
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            escape_xml(&full_url_for(config, &feed_route))
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", escape_xml(&home)));
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!("  <id>{}</id>\n", escape_xml(&home)));
        feed.push_str(&format!(
            "  <author><name>{}</name></author>\n",
            escape_xml(&config.author)
        ));
        feed.push_str("  <generator>quill</generator>\n");

        let base_url = config.url.trim_end_matches('/');
        for post in posts.iter().take(config.feed.limit) {
            let link = escape_xml(&post.permalink);
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            feed.push_str(&format!("    <published>{}</published>\n", date_xml(&post.date)));
            feed.push_str(&format!(
                "    <updated>{}</updated>\n",
                date_xml(&post.updated.unwrap_or(post.date))
            ));
            for tag in post.tags.iter().filter(|t| !t.trim().is_empty()) {
                feed.push_str(&format!(
                    "    <category term=\"{}\"/>\n",
                    escape_xml(tag.trim())
                ));
            }
            let content = post.excerpt.as_ref().unwrap_or(&post.content);
            let content = strip_invalid_xml_chars(&absolutize_urls(content, base_url));
            // "]]>" would end the CDATA section early
            let content = content.replace("]]>", "]]]]><![CDATA[>");
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                content
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        self.write_route(&feed_route, &feed)?;
        tracing::debug!("Generated {}", config.feed.path);
        Ok(())
    }

    /// Generate search index (JSON)
    fn generate_search_index(&self, posts: &[Post]) -> Result<()> {
        let search_data: Vec<serde_json::Value> = posts
            .iter()
            .map(|p| {
                serde_json::json!({
                    "title": p.title,
                    "url": p.path,
                    "date": date_xml(&p.date),
                    "tags": p.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect::<Vec<_>>(),
                    "content": strip_html(&p.content),
                })
            })
            .collect();

        let json = serde_json::to_string_pretty(&search_data)?;
        self.write_route(&with_root(&self.site.config, "search.json"), &json)?;
        tracing::debug!("Generated search.json");
        Ok(())
    }

    /// Copy static files from the source directory, skipping unchanged ones
    pub fn sync_assets(&self) -> Result<()> {
        let mut copied = 0;
        for relative in asset_files(&self.site) {
            let src = self.site.source_dir.join(&relative);
            let dest = self.site.public_dir.join(&relative);
            if is_up_to_date(&src, &dest) {
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create dir {:?}", parent))?;
            }
            fs::copy(&src, &dest).with_context(|| format!("Failed to copy {:?}", src))?;
            copied += 1;
        }
        tracing::debug!("Copied {} assets", copied);
        Ok(())
    }

    /// Write the file a route maps to
    fn write_route(&self, route: &str, contents: &str) -> Result<()> {
        let path = output_path(&self.site, route);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::debug!("Generated: {:?}", path);
        Ok(())
    }
}

fn sorted(posts: &[Post]) -> Vec<Post> {
    let mut posts = posts.to_vec();
    sort_posts(&mut posts);
    posts
}

fn tag_data(tag: Tag) -> TagData {
    TagData {
        name: tag.name,
        slug: tag.slug,
        path: tag.path,
        count: tag.count,
    }
}

/// Destination exists with the same size and is not older than the source
fn is_up_to_date(src: &Path, dest: &Path) -> bool {
    let (Ok(src_meta), Ok(dest_meta)) = (fs::metadata(src), fs::metadata(dest)) else {
        return false;
    };
    if src_meta.len() != dest_meta.len() {
        return false;
    }
    match (src_meta.modified(), dest_meta.modified()) {
        (Ok(src_time), Ok(dest_time)) => dest_time >= src_time,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{detect_changes, CacheDb};
    use crate::content::loader::ContentLoader;
    use tempfile::TempDir;

    fn site_with(files: &[(&str, &str)]) -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    fn load(site: &Site) -> (Vec<Post>, Vec<Page>) {
        let loader = ContentLoader::new(site);
        (loader.load_posts().unwrap(), loader.load_pages().unwrap())
    }

    fn read(site: &Site, relative: &str) -> String {
        fs::read_to_string(site.public_dir.join(relative)).unwrap()
    }

    #[test]
    fn test_generate_full_site() {
        let (_dir, site) = site_with(&[
            ("_config.yml", "title: Notes\nper_page: 1\n"),
            (
                "source/_posts/old.md",
                "---\nlayout: post\ntitle: Old <one>\ndate: 2019-03-02\ntags: [GraphQL]\n---\n## Rules\nBody\n",
            ),
            (
                "source/_posts/new.md",
                "---\nlayout: post\ntitle: New\ndate: 2020-05-04\ntags: [git, \"\"]\n---\nIntro\n<!-- more -->\nRest\n",
            ),
            ("source/about.md", "---\ntitle: About\n---\nMe."),
            ("source/img/logo.png", "png"),
        ]);
        let (posts, pages) = load(&site);
        Generator::new(&site).unwrap().generate(&posts, &pages).unwrap();

        let index = read(&site, "index.html");
        assert!(index.contains("<title>Notes</title>"));
        assert!(index.contains(r#"href="/2020/05/04/new/""#));
        assert!(index.contains(r#"href="/page/2/""#));
        assert!(read(&site, "page/2/index.html").contains("Old &lt;one&gt;"));

        let old = read(&site, "2019/03/02/old/index.html");
        assert!(old.contains(r#"<h2 id="rules">"#));
        assert!(old.contains(r#"class="toc""#));
        assert!(old.contains(r#"href="/2020/05/04/new/""#));
        assert!(old.contains(r#"href="/tags/graphql/""#));

        assert!(read(&site, "about/index.html").contains("Me."));
        assert!(read(&site, "archives/index.html").contains("2019"));
        assert!(read(&site, "tags/index.html").contains(r#"href="/tags/git/""#));
        assert!(read(&site, "tags/git/index.html").contains("New"));
        assert_eq!(read(&site, "img/logo.png"), "png");

        let feed = read(&site, "atom.xml");
        assert!(feed.contains("<title>Old &lt;one&gt;</title>"));
        assert!(feed.contains("http://example.com/2020/05/04/new/"));
        assert!(feed.contains(r#"<category term="git"/>"#));

        let search: serde_json::Value = serde_json::from_str(&read(&site, "search.json")).unwrap();
        assert_eq!(search[0]["url"], "/2020/05/04/new/");
    }

    #[test]
    fn test_generate_empty_site() {
        let (_dir, site) = site_with(&[("_config.yml", "title: Empty\n")]);
        Generator::new(&site).unwrap().generate(&[], &[]).unwrap();
        assert!(read(&site, "index.html").contains("No posts yet."));
        assert!(site.public_dir.join("atom.xml").exists());
        assert!(!site.public_dir.join("page/2/index.html").exists());
    }

    #[test]
    fn test_generate_with_root() {
        let (_dir, site) = site_with(&[
            ("_config.yml", "root: /blog/\nfeed:\n  enable: false\n"),
            ("source/_posts/a.md", "---\ntitle: A\ndate: 2021-01-01\ntags: rust\n---\n"),
        ]);
        let (posts, pages) = load(&site);
        Generator::new(&site).unwrap().generate(&posts, &pages).unwrap();

        let index = read(&site, "index.html");
        assert!(index.contains(r#"href="/blog/2021/01/01/a/""#));
        assert!(index.contains(r#"href="/blog/tags/rust/""#));
        assert!(site.public_dir.join("2021/01/01/a/index.html").exists());
        assert!(!site.public_dir.join("atom.xml").exists());
    }

    #[test]
    fn test_incremental_tag_removal() {
        let (dir, site) = site_with(&[
            ("source/_posts/a.md", "---\ntitle: A\ndate: 2021-01-01\ntags: [git]\n---\n"),
            ("source/_posts/b.md", "---\ntitle: B\ndate: 2021-01-02\n---\n"),
        ]);
        let generator = Generator::new(&site).unwrap();
        let (posts, pages) = load(&site);
        generator.generate(&posts, &pages).unwrap();
        let before = CacheDb::build(&site, &posts, &pages).unwrap();
        assert!(site.public_dir.join("tags/git/index.html").exists());

        fs::write(
            dir.path().join("source/_posts/a.md"),
            "---\ntitle: A renamed\ndate: 2021-01-01\ntags: [rust]\n---\n",
        )
        .unwrap();
        let (posts, pages) = load(&site);
        let after = CacheDb::build(&site, &posts, &pages).unwrap();
        let changes = detect_changes(&before, &after);
        generator
            .generate_incremental(&posts, &pages, &changes)
            .unwrap();

        assert!(!site.public_dir.join("tags/git").exists());
        assert!(read(&site, "tags/rust/index.html").contains("A renamed"));
        // b's navigation names its neighbour
        assert!(read(&site, "2021/01/02/b/index.html").contains("A renamed"));
    }
}
