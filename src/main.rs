use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sentiment_harvester::config::{FetcherKind, PipelineConfig};
use sentiment_harvester::controller::{CrawlController, CrawlSettings};
use sentiment_harvester::corpus::CorpusStore;
use sentiment_harvester::curator::Curator;
use sentiment_harvester::fetcher::{AnyFetcher, ChromeFetcher, HttpFetcher};
use sentiment_harvester::labeler::Labeler;
use sentiment_harvester::server;
use sentiment_harvester::training::{self, ClassifierArtifact, TrainingParams};

#[derive(Debug, Parser)]
#[command(
    name = "sentiment-harvester",
    version,
    about = "Crawl product reviews, curate a balanced corpus, train and serve a sentiment classifier"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crawl review pages and append them to the corpus
    Crawl(CrawlArgs),
    /// Dedup the corpus and top up synthetic Negative/Neutral records
    Curate(CurateArgs),
    /// Label the corpus and train the classifier artifact
    Train,
    /// Crawl, curate and train in one go
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        curate: CurateArgs,
    },
    /// Serve predictions from a trained artifact
    Serve {
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

#[derive(Debug, Args)]
struct CrawlArgs {
    /// File with one product URL per line
    #[arg(long, value_name = "FILE")]
    products: Option<PathBuf>,

    /// Maximum review pages per product
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// `chrome` or `http`
    #[arg(long)]
    fetcher: Option<FetcherKind>,
}

#[derive(Debug, Args)]
struct CurateArgs {
    /// Synthetic records per balanced class
    #[arg(long, value_name = "N")]
    target: Option<usize>,
}

impl CrawlArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(products) = self.products {
            config.products_file = Some(products);
        }
        if let Some(pages) = self.pages {
            config.pages_per_product = pages;
        }
        if let Some(fetcher) = self.fetcher {
            config.fetcher = fetcher;
        }
    }
}

impl CurateArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(target) = self.target {
            config.target_balance_count = target;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env();

    match cli.command {
        Command::Crawl(args) => {
            args.apply(&mut config);
            crawl(&config).await
        }
        Command::Curate(args) => {
            args.apply(&mut config);
            curate(&config)
        }
        Command::Train => train(&config),
        Command::Run { crawl: crawl_args, curate: curate_args } => {
            crawl_args.apply(&mut config);
            curate_args.apply(&mut config);
            crawl(&config).await?;
            curate(&config)?;
            train(&config)
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            serve(&config).await
        }
    }
}

async fn crawl(config: &PipelineConfig) -> Result<()> {
    let targets = config.products().context("Failed to read products file")?;
    let fetcher = match config.fetcher {
        FetcherKind::Chrome => {
            info!("🕵️ Launching stealth Chrome...");
            AnyFetcher::Chrome(ChromeFetcher::launch(config.page_load_timeout).context("Failed to launch Chrome")?)
        }
        FetcherKind::Http => AnyFetcher::Http(HttpFetcher::new(config.page_load_timeout)?),
    };

    let store = CorpusStore::new(&config.corpus_file);
    let settings = CrawlSettings {
        pages_per_product: config.pages_per_product,
        page_delay: config.page_delay,
    };
    CrawlController::new(&fetcher, &store, settings)
        .crawl_all(&targets)
        .await
        .context("Crawl stopped on a corpus write failure")?;

    info!("🎉 DONE! Saved to {}", store.path().display());
    Ok(())
}

fn curate(config: &PipelineConfig) -> Result<()> {
    let store = CorpusStore::new(&config.corpus_file);
    let records = store.load()?;

    let (curated, _) = Curator::new(rand::thread_rng()).curate(records, config.target_balance_count);
    store.rewrite(&curated).context("Failed to rewrite corpus")?;

    info!("✅ Curated corpus written to {}", store.path().display());
    Ok(())
}

fn train(config: &PipelineConfig) -> Result<()> {
    let records = CorpusStore::new(&config.corpus_file).load()?;
    let labeled = Labeler::default().label_all(records);

    let outcome = training::train(&labeled, TrainingParams::default())?;
    outcome
        .artifact
        .save(&config.vectorizer_file, &config.model_file)
        .context("Failed to save classifier artifact")?;

    info!(
        "💾 Saved {} and {}",
        config.vectorizer_file.display(),
        config.model_file.display()
    );
    Ok(())
}

async fn serve(config: &PipelineConfig) -> Result<()> {
    info!("⏳ Loading model...");
    let artifact = ClassifierArtifact::load(&config.vectorizer_file, &config.model_file)
        .context("Run `sentiment-harvester train` first")?;
    info!("✅ Model loaded successfully!");

    server::serve(artifact, &config.bind_addr).await
}
