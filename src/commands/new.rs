//! Create a new post or page

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::init::default_scaffold;
use crate::content::loader::{is_markdown_file, DRAFTS_DIR, POSTS_DIR};
use crate::Site;

/// Create a new post/page/draft and return its path
pub fn create_post(site: &Site, title: &str, layout: &str, path: Option<&str>) -> Result<PathBuf> {
    let title = title.trim();
    if title.is_empty() {
        anyhow::bail!("A title is required");
    }

    let now = Local::now();
    let slug = slug::slugify(title);

    if path.is_none() && slug.is_empty() {
        anyhow::bail!(
            "Title {:?} gives an empty file name, pass one with --path",
            title
        );
    }

    let file_path = match (layout, path) {
        (_, Some(p)) => {
            let p = p.trim_start_matches('/');
            let relative = Path::new(p);
            if p.is_empty()
                || !relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)))
            {
                anyhow::bail!("Path {:?} must stay inside its folder", p);
            }
            let p = if is_markdown_file(relative) {
                p.to_string()
            } else {
                format!("{}.md", p)
            };
            match layout {
                "draft" => site.source_dir.join(DRAFTS_DIR).join(p),
                "page" => site.source_dir.join(p),
                _ => site.source_dir.join(POSTS_DIR).join(p),
            }
        }
        ("page", None) => site.source_dir.join(&slug).join("index.md"),
        ("draft", None) => site
            .source_dir
            .join(DRAFTS_DIR)
            .join(post_file_name(&site.config.new_post_name, &slug, &now)),
        (_, None) => site
            .source_dir
            .join(POSTS_DIR)
            .join(post_file_name(&site.config.new_post_name, &slug, &now)),
    };

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let scaffold_path = site.base_dir.join("scaffolds").join(format!("{}.md", layout));
    let scaffold = if scaffold_path.exists() {
        fs::read_to_string(&scaffold_path)
            .with_context(|| format!("Failed to read {:?}", scaffold_path))?
    } else {
        default_scaffold(layout).to_string()
    };

    let content = scaffold
        .replace("{{ title }}", &yaml_scalar(title))
        .replace("{{ layout }}", layout)
        .replace("{{ date }}", &now.format("%Y-%m-%d %H:%M:%S").to_string());

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(&file_path, content).with_context(|| format!("Failed to write {:?}", file_path))?;

    tracing::info!("Created {} {:?}", layout, file_path);
    Ok(file_path)
}

/// Run the new command with the default layout unless one is given
pub fn run(site: &Site, title: &str, layout: Option<&str>) -> Result<PathBuf> {
    let layout = layout.unwrap_or(&site.config.default_layout);
    create_post(site, title, layout, None)
}

/// Expand a `new_post_name` pattern such as `:year-:month-:day-:title.md`
fn post_file_name(pattern: &str, slug: &str, now: &DateTime<Local>) -> String {
    let name = pattern
        .replace(":title", slug)
        .replace(":year", &now.format("%Y").to_string())
        .replace(":i_month", &now.format("%-m").to_string())
        .replace(":i_day", &now.format("%-d").to_string())
        .replace(":month", &now.format("%m").to_string())
        .replace(":day", &now.format("%d").to_string());
    if name.ends_with(".md") || name.ends_with(".markdown") {
        name
    } else {
        format!("{}.md", name)
    }
}

/// Quote a title when YAML would otherwise misread it
fn yaml_scalar(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(s) => s.trim_end().to_string(),
        Err(_) => value.to_string(),
    }
}
