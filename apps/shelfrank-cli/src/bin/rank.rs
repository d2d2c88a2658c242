use std::env;

use shelfrank_core::config::{resolve_with_base, Config};
use shelfrank_core::traits::Embedder;
use shelfrank_embed::resolve_embedder;
use shelfrank_index::{ArtifactStore, Strategy};
use shelfrank_pipeline::DataLayout;
use shelfrank_rank::Ranker;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [k_books] [k_papers]", args[0]);
        eprintln!("Example: {} 'machine learning in healthcare' 5 5", args[0]);
        std::process::exit(1);
    }
    let query = &args[1];
    let k_books: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5);
    let k_papers: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(5);

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let base = env::current_dir()?;
    let data_root: String = config.get("data.root").unwrap_or_else(|_| "data".to_string());
    let models_dir: String = config.get("data.models_dir").unwrap_or_else(|_| "models".to_string());
    let layout = DataLayout::new(resolve_with_base(&base, data_root));
    let store = ArtifactStore::new(resolve_with_base(&base, models_dir));

    let strategy: Strategy = config
        .get::<String>("index.strategy")
        .unwrap_or_else(|_| "lexical".to_string())
        .parse()?;
    let embedder: Option<Box<dyn Embedder>> = match strategy {
        Strategy::Lexical => None,
        Strategy::Dense => {
            let endpoint: String = config.get("embedding.endpoint").unwrap_or_default();
            let model: String = config.get("embedding.model").unwrap_or_default();
            let dim: usize = config.get("embedding.dim").unwrap_or(384);
            Some(resolve_embedder(&endpoint, &model, dim)?)
        }
    };

    let ranker = Ranker::load(&store, &layout.feature_books(), &layout.feature_papers(), embedder)?;
    let result = ranker.rank(query, k_books, k_papers)?;

    println!("\n🔍 Recommendations for \"{}\"", result.query);
    println!("\nTop books:");
    if result.top_books.is_empty() {
        println!("  (none)");
    }
    for (i, item) in result.top_books.iter().enumerate() {
        println!(
            "  {}. {} by {} ({})  final={:.4} sim={:.4}",
            i + 1,
            item.title,
            item.authors,
            item.year,
            item.final_score,
            item.sim_score
        );
        if !item.url.is_empty() {
            println!("     🔗 {}", item.url);
        }
    }
    println!("\nTop papers:");
    if result.top_papers.is_empty() {
        println!("  (none)");
    }
    for (i, item) in result.top_papers.iter().enumerate() {
        println!(
            "  {}. {} by {} ({})  final={:.4} sim={:.4}",
            i + 1,
            item.title,
            item.authors,
            item.year,
            item.final_score,
            item.sim_score
        );
        if !item.url.is_empty() {
            println!("     🔗 {}", item.url);
        }
    }
    Ok(())
}
