//! Content module - handles posts, pages, and content processing

mod frontmatter;
pub mod loader;
pub mod markdown;
mod post;

pub use frontmatter::{FrontMatter, FrontMatterError};
pub use markdown::{heading_ids, MarkdownRenderer};
pub use post::{collect_tags, Page, Post, Tag};
