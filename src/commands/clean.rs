//! Clean the public directory

use anyhow::{Context, Result};
use std::fs;

use crate::cache::CACHE_DIR;
use crate::Site;

/// Remove the public directory and the generation cache
pub fn run(site: &Site) -> Result<()> {
    for dir in [site.public_dir.clone(), site.base_dir.join(CACHE_DIR)] {
        if dir.exists() {
            fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {:?}", dir))?;
            tracing::info!("Deleted: {:?}", dir);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("public/a")).unwrap();
        fs::create_dir_all(dir.path().join(".quill-cache")).unwrap();
        fs::create_dir_all(dir.path().join("source")).unwrap();

        let site = Site::new(dir.path()).unwrap();
        site.clean().unwrap();
        assert!(!dir.path().join("public").exists());
        assert!(!dir.path().join(".quill-cache").exists());
        assert!(dir.path().join("source").exists());

        // nothing left to clean is fine
        site.clean().unwrap();
    }
}
