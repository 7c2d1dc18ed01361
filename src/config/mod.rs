//! Configuration module

mod site;

pub use site::CheckConfig;
pub use site::FeedConfig;
pub use site::HighlightConfig;
pub use site::SiteConfig;
