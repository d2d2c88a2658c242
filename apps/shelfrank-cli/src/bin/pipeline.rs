use std::env;
use std::path::Path;
use std::time::Duration;

use shelfrank_core::artifact::read_csv;
use shelfrank_core::config::{resolve_with_base, Config};
use shelfrank_core::types::{BookFeatureRow, Category, PaperFeatureRow};
use shelfrank_embed::resolve_embedder;
use shelfrank_index::{ArtifactStore, Strategy, Trainer};
use shelfrank_pipeline::{CatalogEndpoints, Cleaner, DataLayout, FeatureBuilder, Ingestor, PageLimits};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|clean|features|train|all>", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, _args) = parse_args();
    let base = env::current_dir()?;
    let data_root: String = config.get("data.root").unwrap_or_else(|_| "data".to_string());
    let layout = DataLayout::new(resolve_with_base(&base, data_root));

    match cmd.as_str() {
        "ingest" => run_ingest(&config, &layout)?,
        "clean" => run_clean(&config, &layout)?,
        "features" => run_features(&layout)?,
        "train" => run_train(&config, &base, &layout)?,
        "all" => {
            run_clean(&config, &layout)?;
            run_features(&layout)?;
            run_train(&config, &base, &layout)?;
        }
        other => {
            eprintln!("Unknown command '{}'. Expected ingest|clean|features|train|all", other);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_ingest(config: &Config, layout: &DataLayout) -> anyhow::Result<()> {
    let endpoints = CatalogEndpoints {
        books: config
            .get("ingestion.books_endpoint")
            .unwrap_or_else(|_| "https://www.googleapis.com/books/v1/volumes".to_string()),
        papers: config
            .get("ingestion.papers_endpoint")
            .unwrap_or_else(|_| "https://api.semanticscholar.org/graph/v1/paper/search".to_string()),
        api_key: env::var("BOOKS_API_KEY").ok(),
    };
    let limits = PageLimits {
        books_page_size: config.get("ingestion.books_page_size").unwrap_or(40),
        books_max_start: config.get("ingestion.books_max_start").unwrap_or(80),
        papers_page_size: config.get("ingestion.papers_page_size").unwrap_or(100),
        papers_max_results: config.get("ingestion.papers_max_results").unwrap_or(300),
        throttle: Duration::from_millis(config.get("ingestion.throttle_ms").unwrap_or(800)),
    };
    let book_topics: Vec<String> = config.get("ingestion.book_topics").unwrap_or_default();
    let paper_topics: Vec<String> = config.get("ingestion.paper_topics").unwrap_or_default();

    println!("Catalog ingestion\n=================");
    let artifact = Ingestor::new(layout, endpoints, limits)?.run(&book_topics, &paper_topics)?;
    println!("✅ Ingested {} raw books, {} raw papers", artifact.books, artifact.papers);
    Ok(())
}

fn run_clean(config: &Config, layout: &DataLayout) -> anyhow::Result<()> {
    let book_topics: Vec<String> = config.get("ingestion.book_topics").unwrap_or_default();
    let artifact = Cleaner::new(layout, book_topics).run()?;
    println!("✅ Cleaned tables: {} books, {} papers", artifact.books_rows, artifact.papers_rows);
    Ok(())
}

fn run_features(layout: &DataLayout) -> anyhow::Result<()> {
    let artifact = FeatureBuilder::new(layout).run()?;
    println!("✅ Feature tables written:");
    println!("  {}", artifact.books_path.display());
    println!("  {}", artifact.papers_path.display());
    Ok(())
}

fn run_train(config: &Config, base: &Path, layout: &DataLayout) -> anyhow::Result<()> {
    let models_dir: String = config.get("data.models_dir").unwrap_or_else(|_| "models".to_string());
    let store = ArtifactStore::new(resolve_with_base(base, models_dir));
    let strategy: Strategy = config
        .get::<String>("index.strategy")
        .unwrap_or_else(|_| "lexical".to_string())
        .parse()?;
    let max_features: usize = config.get("index.max_features").unwrap_or(5000);

    let books: Vec<BookFeatureRow> = read_csv(&layout.feature_books())?;
    let papers: Vec<PaperFeatureRow> = read_csv(&layout.feature_papers())?;
    let book_texts: Vec<String> = books.iter().map(|r| r.combined_text.clone()).collect();
    let paper_texts: Vec<String> = papers.iter().map(|r| r.combined_text.clone()).collect();

    match strategy {
        Strategy::Lexical => {
            let trainer = Trainer::lexical(store, max_features);
            train_both(&trainer, &book_texts, &paper_texts)?;
            report(trainer.store());
        }
        Strategy::Dense => {
            let endpoint: String = config.get("embedding.endpoint").unwrap_or_default();
            let model: String = config.get("embedding.model").unwrap_or_default();
            let dim: usize = config.get("embedding.dim").unwrap_or(384);
            let embedder = resolve_embedder(&endpoint, &model, dim)?;
            let trainer = Trainer::dense(store, &*embedder, model);
            train_both(&trainer, &book_texts, &paper_texts)?;
            report(trainer.store());
        }
    }
    Ok(())
}

fn train_both(trainer: &Trainer<'_>, book_texts: &[String], paper_texts: &[String]) -> anyhow::Result<()> {
    let trained_books = trainer.train(Category::Books, book_texts)?;
    let trained_papers = trainer.train(Category::Papers, paper_texts)?;
    println!(
        "✅ Training complete (books: {}, papers: {})",
        if trained_books { "trained" } else { "kept existing" },
        if trained_papers { "trained" } else { "kept existing" },
    );
    Ok(())
}

fn report(store: &ArtifactStore) {
    for category in [Category::Books, Category::Papers] {
        println!("  {} model:  {}", category, store.model_path(category).display());
        println!("  {} matrix: {}", category, store.matrix_path(category).display());
    }
    println!("\n💡 To query, use: cargo run --bin shelfrank-rank '<query>'");
}
