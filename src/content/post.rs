//! Post and Page models

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Post title
    pub title: String,

    /// Layout name from the front-matter
    pub layout: String,

    /// Post tags, in the order they were written
    pub tags: Vec<String>,

    /// Publication date
    pub date: DateTime<FixedOffset>,

    /// Last updated date
    pub updated: Option<DateTime<FixedOffset>>,

    /// Raw markdown body
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Rendered excerpt (before `<!-- more -->`)
    pub excerpt: Option<String>,

    /// Source file path, relative to the source directory
    pub source: String,

    /// Full source file path
    pub full_source: PathBuf,

    /// File stem, the post's identifier
    pub slug: String,

    /// URL path, starting with the site root
    pub path: String,

    /// Full permalink URL
    pub permalink: String,

    /// Whether the post is published
    pub published: bool,

    /// Heading ids present in the rendered content
    pub anchors: Vec<String>,

    /// Custom front-matter fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Post {
    /// Create a new post with minimal required fields
    pub fn new(title: String, date: DateTime<FixedOffset>, source: String) -> Self {
        let slug = slug::slugify(&title);
        Self {
            title,
            layout: "post".to_string(),
            tags: Vec::new(),
            date,
            updated: None,
            raw: String::new(),
            content: String::new(),
            excerpt: None,
            full_source: PathBuf::from(&source),
            source,
            slug,
            path: String::new(),
            permalink: String::new(),
            published: true,
            anchors: Vec::new(),
            extra: IndexMap::new(),
        }
    }

    /// Get the newer neighbour in a newest-first list
    pub fn newer<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.source == self.source)?;
        pos.checked_sub(1).map(|i| &posts[i])
    }

    /// Get the older neighbour in a newest-first list
    pub fn older<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.source == self.source)?;
        posts.get(pos + 1)
    }
}

/// A standalone page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub layout: String,
    pub date: DateTime<FixedOffset>,
    pub updated: Option<DateTime<FixedOffset>>,
    pub raw: String,
    pub content: String,
    pub source: String,
    pub full_source: PathBuf,
    pub path: String,
    pub permalink: String,
    pub anchors: Vec<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Page {
    /// Create a new page with minimal required fields
    pub fn new(title: String, date: DateTime<FixedOffset>, source: String) -> Self {
        Self {
            title,
            layout: "page".to_string(),
            date,
            updated: None,
            raw: String::new(),
            content: String::new(),
            full_source: PathBuf::from(&source),
            source,
            path: String::new(),
            permalink: String::new(),
            anchors: Vec::new(),
            extra: IndexMap::new(),
        }
    }
}

/// A tag with the posts carrying it
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub count: usize,
}

impl Tag {
    pub fn new(name: &str, root: &str, tag_dir: &str) -> Self {
        let slug = slug::slugify(name);
        let path = format!(
            "{}/{}/{}/",
            root.trim_end_matches('/'),
            tag_dir.trim_matches('/'),
            slug
        );
        Self {
            name: name.to_string(),
            slug,
            path,
            count: 0,
        }
    }
}

/// Group posts by tag, skipping blank tags. Tags are ordered by name.
pub fn collect_tags(posts: &[Post], root: &str, tag_dir: &str) -> Vec<(Tag, Vec<usize>)> {
    let mut by_slug: IndexMap<String, (Tag, Vec<usize>)> = IndexMap::new();

    for (i, post) in posts.iter().enumerate() {
        for name in &post.tags {
            let name = name.trim();
            if name.is_empty() || slug::slugify(name).is_empty() {
                continue;
            }
            let tag = Tag::new(name, root, tag_dir);
            let entry = by_slug
                .entry(tag.slug.clone())
                .or_insert_with(|| (tag, Vec::new()));
            // A post listing the same tag twice counts once
            if entry.1.last() != Some(&i) {
                entry.1.push(i);
                entry.0.count += 1;
            }
        }
    }

    let mut tags: Vec<_> = by_slug.into_values().collect();
    tags.sort_by(|a, b| a.0.name.to_lowercase().cmp(&b.0.name.to_lowercase()));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(source: &str, tags: &[&str]) -> Post {
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .unwrap();
        let mut p = Post::new(source.to_string(), date, source.to_string());
        p.tags = tags.iter().map(|t| t.to_string()).collect();
        p
    }

    #[test]
    fn test_neighbours() {
        let posts = vec![post("c", &[]), post("b", &[]), post("a", &[])];
        assert_eq!(posts[1].newer(&posts).unwrap().source, "c");
        assert_eq!(posts[1].older(&posts).unwrap().source, "a");
        assert!(posts[0].newer(&posts).is_none());
        assert!(posts[2].older(&posts).is_none());
    }

    #[test]
    fn test_tag_path() {
        let tag = Tag::new("Windows SDK", "/blog/", "tags");
        assert_eq!(tag.slug, "windows-sdk");
        assert_eq!(tag.path, "/blog/tags/windows-sdk/");
    }

    #[test]
    fn test_collect_tags() {
        let posts = vec![
            post("one", &["git", "Rust", ""]),
            post("two", &["rust", "git", "git"]),
            post("three", &["graphql"]),
        ];
        let tags = collect_tags(&posts, "/", "tags");
        let names: Vec<_> = tags.iter().map(|(t, _)| t.name.as_str()).collect();
        assert_eq!(names, vec!["git", "graphql", "Rust"]);

        let (git, git_posts) = &tags[0];
        assert_eq!(git.count, 2);
        assert_eq!(git_posts, &vec![0, 1]);

        // "Rust" and "rust" share a slug
        assert_eq!(tags[2].0.count, 2);
    }
}
