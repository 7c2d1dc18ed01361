//! Generate static files

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::cache::{self, CacheDb, ChangeSet};
use crate::content::loader::ContentLoader;
use crate::generator::Generator;
use crate::Site;

/// Quiet period before a burst of file events triggers a rebuild
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Generate the static site (with incremental support)
pub fn run(site: &Site) -> Result<()> {
    run_with_options(site, false)
}

/// Generate, ignoring the cache when `force` is set
pub fn run_with_options(site: &Site, force: bool) -> Result<()> {
    let start = Instant::now();

    let loader = ContentLoader::new(site);
    let posts = loader.load_posts()?;
    let pages = loader.load_pages()?;
    tracing::info!("Loaded {} posts and {} pages", posts.len(), pages.len());

    let cached = CacheDb::load(&site.base_dir);
    let current = CacheDb::build(site, &posts, &pages)?;

    let changeset = if force || !site.public_dir.exists() {
        tracing::info!(
            "Full generation (force={}, output_missing={})",
            force,
            !site.public_dir.exists()
        );
        ChangeSet::full_rebuild()
    } else {
        cache::detect_changes(&cached, &current)
    };

    let generator = Generator::new(site)?;

    // Outputs of deleted or moved documents
    let stale = cached.stale_outputs(&current);
    if !stale.is_empty() {
        tracing::info!("Removing {} stale outputs", stale.len());
        generator.remove_outputs(&stale)?;
    }

    if !changeset.has_changes() {
        generator.sync_assets()?;
        tracing::info!(
            "No changes detected, completed in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        return Ok(());
    }

    tracing::info!("Changes detected: {}", changeset.summary());
    generator.generate_incremental(&posts, &pages, &changeset)?;

    current.save(&site.base_dir)?;

    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Block watching the source directory and `_config.yml`, regenerating
/// after each burst of changes. `on_generated` sees every result.
pub fn watch<F>(site: &Site, mut on_generated: F) -> Result<()>
where
    F: FnMut(&Result<()>),
{
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;

    if site.source_dir.exists() {
        debouncer
            .watcher()
            .watch(&site.source_dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {:?}", site.source_dir))?;
        tracing::debug!("Watching: {:?}", site.source_dir);
    }
    let config_path = site.config_path();
    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", config_path))?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    // The site is reopened on every rebuild so config edits take effect
    let base_dir = site.base_dir.clone();
    for result in rx {
        match result {
            Ok(events) => {
                let relevant: Vec<&DebouncedEvent> =
                    events.iter().filter(|e| is_relevant(&e.path)).collect();
                if relevant.is_empty() {
                    continue;
                }
                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }
                let generated = Site::new(&base_dir).and_then(|site| run(&site));
                if let Err(e) = &generated {
                    tracing::error!("Generation failed: {:#}", e);
                }
                on_generated(&generated);
            }
            Err(e) => tracing::error!("Watch error: {:?}", e),
        }
    }

    Ok(())
}

/// Editor swap files and VCS metadata never trigger a rebuild
fn is_relevant(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains("/.git/")
        && !path_str.ends_with(".DS_Store")
        && !path_str.ends_with('~')
        && !path_str.ends_with(".swp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(Path::new("/site/source/_posts/a.md")));
        assert!(!is_relevant(Path::new("/site/source/.git/index")));
        assert!(!is_relevant(Path::new("/site/source/_posts/a.md~")));
        assert!(!is_relevant(Path::new("/site/source/_posts/.a.md.swp")));
    }

    #[test]
    fn test_incremental_run_removes_deleted_post() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("source/_posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("a.md"), "---\ntitle: A\ndate: 2020-01-01\n---\nA").unwrap();
        fs::write(posts.join("b.md"), "---\ntitle: B\ndate: 2020-01-02\n---\nB").unwrap();

        let site = Site::new(dir.path()).unwrap();
        run(&site).unwrap();
        assert!(dir.path().join(".quill-cache/db.json").exists());
        let a_out = site.public_dir.join("2020/01/01/a/index.html");
        assert!(a_out.exists());

        fs::remove_file(posts.join("a.md")).unwrap();
        run(&site).unwrap();
        assert!(!a_out.exists());
        assert!(!site.public_dir.join("2020/01/01").exists());
        let index = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(!index.contains("/2020/01/01/a/"));
        assert!(index.contains("/2020/01/02/b/"));
    }
}
