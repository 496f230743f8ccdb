use crate::traits::Enricher;
use crate::types::{CuratorError, Result};
use crate::utils::text::{clean_text, truncate_chars};
use crate::Fetcher;
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

pub const BODY_MAX_CHARS: usize = 15_000;

const ROOT_SELECTORS: [&str; 4] = ["article", "main", "[role='main']", "body"];
const BLOCK_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, pre, blockquote";

/// Downloads article pages and keeps the readable text blocks of the main content
pub struct HttpEnricher {
    fetcher: Fetcher,
    roots: Vec<Selector>,
    blocks: Selector,
}

impl HttpEnricher {
    pub fn new(fetcher: Fetcher) -> Result<Self> {
        let roots = ROOT_SELECTORS.iter().map(|s| parse_selector(s)).collect::<Result<Vec<_>>>()?;
        let blocks = parse_selector(BLOCK_SELECTOR)?;
        Ok(Self { fetcher, roots, blocks })
    }

    /// Text of the first content root found, one cleaned block per line
    pub fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        let root = self.roots.iter().find_map(|selector| document.select(selector).next())?;

        let text = root
            .select(&self.blocks)
            .map(|block| clean_text(&block.text().collect::<Vec<_>>().join(" ")))
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            None
        } else {
            Some(truncate_chars(&text, BODY_MAX_CHARS))
        }
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn fetch_body(&self, url: &str) -> Result<Option<String>> {
        let document = self.fetcher.fetch(url).await?;
        let body = self.extract(&document.body);
        debug!(
            "Extracted {} chars from {}",
            body.as_ref().map(|b| b.chars().count()).unwrap_or(0),
            url
        );
        Ok(body)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CuratorError::Parse(format!("invalid selector {}: {:?}", selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchConfig;

    fn enricher() -> HttpEnricher {
        HttpEnricher::new(Fetcher::new(FetchConfig::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_article_root_preferred_over_chrome() {
        let html = r#"<html><body>
            <nav><ul><li>Home</li><li>About</li></ul></nav>
            <article>
              <h1>Pinning in async Rust</h1>
              <p>Self-referential <b>futures</b> need a stable address.</p>
              <pre>let fut = Box::pin(work());</pre>
            </article>
            <footer><p>Copyright</p></footer>
        </body></html>"#;

        let text = enricher().extract(html).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Pinning in async Rust");
        assert!(lines[1].starts_with("Self-referential futures"));
        assert!(text.contains("Box::pin"));
        assert!(!text.contains("Home"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_falls_back_to_body() {
        let text = enricher().extract("<html><body><p>Only a paragraph.</p></body></html>").unwrap();
        assert_eq!(text, "Only a paragraph.");
    }

    #[test]
    fn test_page_without_blocks_yields_none() {
        assert!(enricher().extract("<html><body><div>   </div></body></html>").is_none());
    }
}
