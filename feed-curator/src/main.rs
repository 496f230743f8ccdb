use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use feed_curator::sources::{RssFeedSource, SourceCatalog};
use feed_curator::traits::{ArticleCache, ArticleSource, PostStore, TextCompletion};
use feed_curator::{
    CurationPipeline, Curator, CuratorConfig, Domain, EnrichedArticle, Fetcher, GeminiClient, HttpEnricher, Lexicon,
    MockCompletion, PostRecord, RawArticle, RunOptions, SqliteStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "feed-curator", version, about = "Curate technical articles into post drafts for review")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, curate, generate and queue a post for one domain
    Run {
        #[arg(long)]
        domain: Domain,
        #[arg(long)]
        target: Option<usize>,
        /// Ignore cached articles and do not write the cache
        #[arg(long)]
        no_cache: bool,
        /// Stop after curation
        #[arg(long)]
        dry_run: bool,
    },
    /// Curate a JSON list of raw articles without touching the network
    Curate {
        #[arg(long)]
        domain: Domain,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        target: Option<usize>,
    },
    /// List posts awaiting review
    Pending,
    /// List approved posts
    Approved,
    Approve {
        id: i64,
    },
    Publish {
        id: i64,
    },
    Delete {
        id: i64,
    },
    Edit {
        id: i64,
        #[arg(long)]
        content: String,
    },
    CacheStats,
    PurgeCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = CuratorConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Run {
            domain,
            target,
            no_cache,
            dry_run,
        } => {
            let options = RunOptions {
                target_count: target.unwrap_or(config.target_count),
                use_cache: !no_cache,
                dry_run,
            };
            run(config, domain, options).await
        }
        Commands::Curate { domain, input, target } => curate(config, domain, input, target),
        Commands::Pending => {
            let store = open_store(&config).await?;
            print_posts("pending", &store.list_pending().await?);
            Ok(())
        }
        Commands::Approved => {
            let store = open_store(&config).await?;
            print_posts("approved", &store.list_approved().await?);
            Ok(())
        }
        Commands::Approve { id } => {
            open_store(&config).await?.approve(id).await?;
            println!("Post {} approved", id);
            Ok(())
        }
        Commands::Publish { id } => {
            open_store(&config).await?.mark_published(id).await?;
            println!("Post {} marked as published", id);
            Ok(())
        }
        Commands::Delete { id } => {
            open_store(&config).await?.delete_post(id).await?;
            println!("Post {} deleted", id);
            Ok(())
        }
        Commands::Edit { id, content } => {
            open_store(&config).await?.update_content(id, &content).await?;
            println!("Post {} updated", id);
            Ok(())
        }
        Commands::CacheStats => {
            let stats = open_store(&config).await?.cache_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Commands::PurgeCache => {
            let purged = open_store(&config).await?.purge_expired().await?;
            println!("Purged {} expired entries", purged);
            Ok(())
        }
    }
}

async fn open_store(config: &CuratorConfig) -> Result<SqliteStore> {
    SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))
}

async fn run(config: CuratorConfig, domain: Domain, options: RunOptions) -> Result<()> {
    let lexicon = Arc::new(Lexicon::load(config.lexicon_path.as_deref()).context("failed to load lexicon")?);
    let catalog = SourceCatalog::load(config.sources_path.as_deref()).context("failed to load source catalog")?;
    let fetcher = Fetcher::new(config.fetch.clone())?;

    let sources: Vec<Arc<dyn ArticleSource>> = catalog
        .for_domain(domain)
        .iter()
        .map(|spec| Arc::new(RssFeedSource::from_spec(spec, fetcher.clone())) as Arc<dyn ArticleSource>)
        .collect();
    if sources.is_empty() {
        bail!("no sources configured for {}", domain);
    }

    let completion: Arc<dyn TextCompletion> = if options.dry_run {
        Arc::new(MockCompletion::new(""))
    } else {
        Arc::new(GeminiClient::new(config.generation.clone()).context("generation client unavailable")?)
    };

    let store = Arc::new(open_store(&config).await?);
    let enricher = Arc::new(HttpEnricher::new(fetcher)?);
    let curator = Curator::new(config, lexicon, enricher, completion, store.clone(), store);

    info!("Running {} with {} sources", domain, sources.len());
    let report = curator.run(domain, &sources, &options).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        bail!(report.message.unwrap_or_else(|| "run failed".to_string()));
    }
    Ok(())
}

fn curate(config: CuratorConfig, domain: Domain, input: PathBuf, target: Option<usize>) -> Result<()> {
    let raw = std::fs::read_to_string(&input).with_context(|| format!("failed to read {}", input.display()))?;
    let articles: Vec<RawArticle> =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a list of articles", input.display()))?;

    let lexicon = Arc::new(Lexicon::load(config.lexicon_path.as_deref()).context("failed to load lexicon")?);
    let pipeline = CurationPipeline::new(lexicon, &config);

    let enriched = articles
        .into_iter()
        .map(|article| {
            let content = article.content.clone();
            EnrichedArticle::from_extraction(article, Ok(content))
        })
        .collect();

    let outcome = pipeline.curate(domain, enriched, target.unwrap_or(config.target_count));

    println!("Selected {} of {} articles for {}", outcome.selected.len(), outcome.stats.input, domain);
    for article in &outcome.selected {
        println!(
            "{:>6.1} {:>6.1}  {:<16} {}",
            article.quality_score(),
            article.hybrid_score,
            article.primary_technology(),
            article.title()
        );
        info!("{}", pipeline.scorer().explain(&article.categorized.scored));
    }
    println!("Rejections: {}", outcome.rejections);
    for recommendation in &outcome.validation.recommendations {
        println!("Note: {}", recommendation);
    }
    Ok(())
}

fn print_posts(label: &str, posts: &[PostRecord]) {
    if posts.is_empty() {
        println!("No {} posts", label);
        return;
    }
    for post in posts {
        println!(
            "#{} [{}] {} - {} sources, generated {}",
            post.id,
            post.domain,
            post.status,
            post.sources.len(),
            post.generated_at.format("%Y-%m-%d %H:%M")
        );
        println!("{}\n", post.content);
    }
}
