//! Initialize a new site

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::content::loader::{DRAFTS_DIR, POSTS_DIR};
use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# Site
title: Quill
subtitle: ''
description: ''
author: John Doe
language: en
timezone: ''

# URL
## url is the origin only; put any sub-path in root
url: http://example.com
root: /
permalink: :year/:month/:day/:title/

# Directory
source_dir: source
public_dir: public
tag_dir: tags
archive_dir: archives
skip_render: []

# Writing
new_post_name: :title.md
default_layout: post
render_drafts: false
layouts: [post, page, draft]
highlight:
  enable: true
  theme: base16-ocean.dark
  line_number: true

# Listing
per_page: 10
date_format: YYYY-MM-DD
feed:
  enable: true
  path: atom.xml
  limit: 20

# quill check
check:
  require_tags: false
  check_links: true
  check_anchors: true
  ignore: []
"#;

const POST_SCAFFOLD: &str = r#"---
layout: {{ layout }}
title: {{ title }}
date: {{ date }}
tags:
---
"#;

const PAGE_SCAFFOLD: &str = r#"---
layout: {{ layout }}
title: {{ title }}
date: {{ date }}
---
"#;

const DRAFT_SCAFFOLD: &str = r#"---
layout: {{ layout }}
title: {{ title }}
tags:
---
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{:?} already exists, refusing to overwrite", config_path);
    }

    for dir in [
        target_dir.join("source").join(POSTS_DIR),
        target_dir.join("source").join(DRAFTS_DIR),
        target_dir.join("scaffolds"),
    ] {
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;

    let scaffolds = target_dir.join("scaffolds");
    fs::write(scaffolds.join("post.md"), POST_SCAFFOLD)?;
    fs::write(scaffolds.join("page.md"), PAGE_SCAFFOLD)?;
    fs::write(scaffolds.join("draft.md"), DRAFT_SCAFFOLD)?;

    let now = chrono::Local::now();
    let sample_post = format!(
        r#"---
layout: post
title: Hello World
date: {}
tags: [quill]
---

Welcome to your new blog. This is the first post; edit or delete it.
<!-- more -->

## Writing

```bash
$ quill new "My New Post"
```

Every post needs a `layout` and a `title` in its front-matter.
Tags are optional.

## Checking

```bash
$ quill check
```

The linter reports posts with a missing title or layout and internal
links that point nowhere, like a link back to [the top](#writing).

## Publishing

```bash
$ quill generate
$ quill server
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    let sample_path = target_dir
        .join("source")
        .join(POSTS_DIR)
        .join("hello-world.md");
    fs::write(&sample_path, sample_post)
        .with_context(|| format!("Failed to write {:?}", sample_path))?;

    tracing::info!("Initialized site in {:?}", target_dir);
    Ok(())
}

/// Built-in scaffold for a layout
pub(crate) fn default_scaffold(layout: &str) -> &'static str {
    match layout {
        "page" => PAGE_SCAFFOLD,
        "draft" => DRAFT_SCAFFOLD,
        _ => POST_SCAFFOLD,
    }
}
