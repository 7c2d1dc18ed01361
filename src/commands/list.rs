//! List site content

use anyhow::Result;

use crate::content::collect_tags;
use crate::content::loader::ContentLoader;
use crate::generator::routes::site_routes;
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    let loader = ContentLoader::new(site);

    match content_type {
        "post" | "posts" => {
            let posts = loader.load_posts()?;
            println!("Posts ({}):", posts.len());
            for post in posts {
                let draft = if post.published { "" } else { " (draft)" };
                println!(
                    "  {} - {} [{}]{}",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    post.source,
                    draft
                );
            }
        }
        "page" | "pages" => {
            let pages = loader.load_pages()?;
            println!("Pages ({}):", pages.len());
            for page in pages {
                println!("  {} [{}]", page.title, page.source);
            }
        }
        "tag" | "tags" => {
            let posts = loader.load_posts()?;
            let mut tags = collect_tags(&posts, &site.config.root, &site.config.tag_dir);
            tags.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
            println!("Tags ({}):", tags.len());
            for (tag, indices) in tags {
                println!("  {} ({}) {}", tag.name, indices.len(), tag.path);
            }
        }
        "route" | "routes" => {
            let posts = loader.load_posts()?;
            let pages = loader.load_pages()?;
            let routes = site_routes(site, &posts, &pages);
            println!("Routes ({}):", routes.len());
            for route in routes {
                println!("  {} -> {}", route.path, route.kind.describe(&posts, &pages));
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, page, tag, route",
                content_type
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_types() {
        let dir = TempDir::new().unwrap();
        crate::commands::init::init_site(dir.path()).unwrap();
        let site = Site::new(dir.path()).unwrap();

        for kind in ["post", "pages", "tag", "routes"] {
            run(&site, kind).unwrap();
        }
        assert!(run(&site, "category").is_err());
    }
}
