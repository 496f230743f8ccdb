use crate::article::SourceProfile;
use crate::types::{Domain, Result, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One feed the collector pulls for a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
    pub weight: f64,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub technology: Option<String>,
}

impl SourceSpec {
    pub fn profile(&self) -> SourceProfile {
        SourceProfile {
            name: self.name.clone(),
            weight: self.weight,
            kind: self.kind,
            focus: self.focus.clone(),
            technology: self.technology.clone(),
        }
    }
}

/// Per-domain list of feeds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceCatalog {
    pub domains: BTreeMap<Domain, Vec<SourceSpec>>,
}

impl SourceCatalog {
    /// Uses the JSON file at `path` when given, the built-in catalog otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading source catalog from {}", path.display());
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn for_domain(&self, domain: Domain) -> &[SourceSpec] {
        self.domains.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn builtin() -> Self {
        let mut domains = BTreeMap::new();

        domains.insert(
            Domain::Frontend,
            vec![
                source("Josh W. Comeau", "https://www.joshwcomeau.com/rss.xml", 9.0, SourceKind::DeepDive, "patterns", Some("react")),
                source("Overreacted", "https://overreacted.io/rss.xml", 9.0, SourceKind::Expert, "internals", Some("react")),
                source("LogRocket React", "https://blog.logrocket.com/tag/react/feed/", 8.0, SourceKind::Blog, "tutorials", Some("react")),
                source("Vue.js Blog", "https://blog.vuejs.org/feed.rss", 10.0, SourceKind::Official, "releases", Some("vue")),
                source("Angular Blog", "https://blog.angular.io/feed", 10.0, SourceKind::Official, "releases", Some("angular")),
                source("Svelte Blog", "https://svelte.dev/blog/rss.xml", 10.0, SourceKind::Official, "releases", Some("svelte")),
                source("Ahmad Shadeed", "https://ishadeed.com/feed.xml", 9.0, SourceKind::DeepDive, "features", Some("css")),
                source("Modern CSS", "https://moderncss.dev/feed/", 9.0, SourceKind::Expert, "features", Some("css")),
                source("web.dev", "https://web.dev/feed.xml", 9.0, SourceKind::Official, "standards", None),
                source("Turborepo", "https://turbo.build/blog/rss.xml", 9.0, SourceKind::Official, "releases", Some("tooling")),
                source("Cypress", "https://www.cypress.io/blog/rss.xml", 9.0, SourceKind::Official, "practices", Some("testing")),
                source("SpeedCurve", "https://speedcurve.com/blog/rss/", 8.0, SourceKind::Expert, "optimization", Some("performance")),
                source("Smashing Magazine", "https://www.smashingmagazine.com/feed/", 9.0, SourceKind::Community, "tutorials", None),
            ],
        );

        domains.insert(
            Domain::Backend,
            vec![
                source("Rust Blog", "https://blog.rust-lang.org/feed.xml", 10.0, SourceKind::Official, "releases", Some("rust")),
                source("This Week in Rust", "https://this-week-in-rust.org/rss.xml", 9.0, SourceKind::Community, "ecosystem", Some("rust")),
                source("Baby Steps", "https://smallcultfollowing.com/babysteps/atom.xml", 8.0, SourceKind::CoreTeam, "internals", Some("rust")),
                source("fasterthanli.me", "https://fasterthanli.me/index.xml", 8.0, SourceKind::Expert, "internals", Some("rust")),
                source("Go Blog", "https://go.dev/blog/feed.atom", 10.0, SourceKind::Official, "releases", Some("go")),
                source("Ardan Labs", "https://www.ardanlabs.com/blog/index.xml", 9.0, SourceKind::Expert, "patterns", Some("go")),
                source("Real Python", "https://realpython.com/atom.xml", 9.0, SourceKind::Blog, "advanced", Some("python")),
                source("Python Insider", "https://blog.python.org/feeds/posts/default", 10.0, SourceKind::Official, "releases", Some("python")),
                source("Inside Java", "https://inside.java/feed.xml", 10.0, SourceKind::Official, "releases", Some("java")),
                source(".NET Blog", "https://devblogs.microsoft.com/dotnet/feed/", 10.0, SourceKind::Official, "releases", Some("dotnet")),
                source("Andrew Lock", "https://andrewlock.net/rss/", 9.0, SourceKind::Mvp, "patterns", Some("dotnet")),
                source("2ality", "https://2ality.com/feeds/posts.atom", 9.0, SourceKind::Expert, "features", Some("nodejs")),
                source("Kubernetes Blog", "https://kubernetes.io/feed.xml", 10.0, SourceKind::Official, "releases", Some("devops")),
                source("CNCF", "https://www.cncf.io/feed/", 9.0, SourceKind::Foundation, "ecosystem", Some("devops")),
                source("PostgreSQL News", "https://www.postgresql.org/news.rss", 10.0, SourceKind::Official, "releases", Some("databases")),
                source("AWS News Blog", "https://aws.amazon.com/blogs/aws/feed/", 9.0, SourceKind::Official, "features", Some("cloud")),
            ],
        );

        domains.insert(
            Domain::Ai,
            vec![
                source("arXiv cs.AI", "https://arxiv.org/rss/cs.AI", 10.0, SourceKind::Research, "advanced", Some("research")),
                source("Google Research", "https://blog.research.google/feeds/posts/default", 10.0, SourceKind::Research, "advanced", Some("research")),
                source("Lil'Log", "https://lilianweng.github.io/index.xml", 9.0, SourceKind::Expert, "internals", Some("llms")),
                source("Hugging Face", "https://huggingface.co/blog/feed.xml", 9.0, SourceKind::Community, "ecosystem", Some("llms")),
                source("MLflow", "https://mlflow.org/blog/atom.xml", 9.0, SourceKind::Official, "practices", Some("mlops")),
                source("Neptune.ai", "https://neptune.ai/blog/rss", 8.0, SourceKind::Blog, "practices", Some("mlops")),
                source("PyImageSearch", "https://www.pyimagesearch.com/feed/", 8.0, SourceKind::Blog, "tutorials", Some("computer_vision")),
                source("KDnuggets", "https://www.kdnuggets.com/feed", 8.0, SourceKind::Community, "tutorials", Some("data_science")),
            ],
        );

        domains.insert(
            Domain::General,
            vec![
                source("GitHub Blog", "https://github.blog/feed/", 9.0, SourceKind::Official, "features", None),
                source("Stack Overflow Blog", "https://stackoverflow.blog/feed/", 9.0, SourceKind::Community, "practices", None),
                source("InfoQ", "https://www.infoq.com/feed", 9.0, SourceKind::Community, "practices", None),
                source("The New Stack", "https://thenewstack.io/feed/", 8.0, SourceKind::Community, "ecosystem", None),
                source("Krebs on Security", "https://krebsonsecurity.com/feed/", 8.0, SourceKind::Expert, "security", None),
            ],
        );

        Self { domains }
    }
}

fn source(name: &str, url: &str, weight: f64, kind: SourceKind, focus: &str, technology: Option<&str>) -> SourceSpec {
    SourceSpec {
        name: name.to_string(),
        url: url.to_string(),
        weight,
        kind,
        focus: Some(focus.to_string()),
        technology: technology.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;
    use crate::utils::url::is_http_url;

    #[test]
    fn test_every_domain_has_sources() {
        let catalog = SourceCatalog::builtin();
        for domain in Domain::ALL {
            assert!(!catalog.for_domain(domain).is_empty(), "{} has no sources", domain);
        }
    }

    #[test]
    fn test_builtin_entries_are_well_formed() {
        let lexicon = Lexicon::builtin().unwrap();
        let catalog = SourceCatalog::builtin();
        for (domain, sources) in &catalog.domains {
            for spec in sources {
                assert!(is_http_url(&spec.url), "{}", spec.url);
                assert!((0.0..=10.0).contains(&spec.weight));
                if let Some(technology) = &spec.technology {
                    assert!(lexicon.has_technology(*domain, technology), "{} unknown in {}", technology, domain);
                }
            }
        }
    }

    #[test]
    fn test_catalog_json_uses_kind_names() {
        let json = r#"{"backend": [{"name": "Rust Blog", "url": "https://blog.rust-lang.org/feed.xml", "weight": 10, "kind": "core-team", "technology": "rust"}],
                       "ai": [{"name": "Papers", "url": "https://example.org/rss", "weight": 7, "kind": "newsletter"}]}"#;
        let catalog: SourceCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.for_domain(Domain::Backend)[0].kind, SourceKind::CoreTeam);
        assert_eq!(catalog.for_domain(Domain::Ai)[0].kind, SourceKind::Other);
        assert!(catalog.for_domain(Domain::Frontend).is_empty());
    }
}
