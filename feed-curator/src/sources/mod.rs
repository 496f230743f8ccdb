pub mod catalog;
pub mod rss_feed;

pub use catalog::{SourceCatalog, SourceSpec};
pub use rss_feed::RssFeedSource;
