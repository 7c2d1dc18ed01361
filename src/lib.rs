//! quill: a small Hexo-style static blog generator with a front-matter linter
//!
//! Posts live under `source/_posts` as Markdown with a YAML (or TOML)
//! front-matter block declaring `layout`, `title` and `tags`. The crate
//! loads them, renders them through built-in Tera templates into `public/`,
//! and checks that every post honours the front-matter contract and that
//! every internal link resolves.

pub mod cache;
pub mod check;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "_config.yml";

/// A site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Source directory
    pub source_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Open a site, reading `_config.yml` when it exists
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let source_dir = base_dir.join(&config.source_dir);
        let public_dir = base_dir.join(&config.public_dir);
        Self {
            config,
            base_dir,
            source_dir,
            public_dir,
        }
    }

    /// Path of the configuration file
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Initialize a new site in the base directory
    pub fn init(&self) -> Result<()> {
        commands::init::init_site(&self.base_dir)
    }

    /// Generate the static site, incrementally when the cache allows
    pub fn generate(&self) -> Result<()> {
        commands::generate::run(self)
    }

    /// Remove generated output and the cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a new post with the default layout
    pub fn new_post(&self, title: &str, layout: Option<&str>) -> Result<PathBuf> {
        commands::new::run(self, title, layout)
    }

    /// Lint posts and links
    pub fn check(&self) -> Result<check::Report> {
        check::run(self)
    }
}

