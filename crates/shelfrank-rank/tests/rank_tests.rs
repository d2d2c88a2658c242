use std::path::PathBuf;
use tempfile::TempDir;

use shelfrank_core::artifact::write_csv_atomic;
use shelfrank_core::types::{BookFeatureRow, Category, PaperFeatureRow};
use shelfrank_core::Error;
use shelfrank_embed::HashEmbedder;
use shelfrank_index::{ArtifactStore, Trainer};
use shelfrank_rank::{Ranker, BOOK_WEIGHTS, PAPER_WEIGHTS};

fn book(title: &str, combined_text: &str, rating: f64, recency: f64, page: f64) -> BookFeatureRow {
    BookFeatureRow {
        title: title.to_string(),
        authors: "Some Author".to_string(),
        published_date: "2020".to_string(),
        preview_link: format!("https://books.example/{}", title.to_lowercase().replace(' ', "-")),
        rating_score: rating,
        recency_score: recency,
        page_score: page,
        combined_text: combined_text.to_string(),
        ..Default::default()
    }
}

fn paper(title: &str, combined_text: &str, citations: f64, recency: f64) -> PaperFeatureRow {
    PaperFeatureRow {
        title: title.to_string(),
        authors: "Doe, J.".to_string(),
        year: "2021".to_string(),
        url: format!("https://papers.example/{}", title.to_lowercase().replace(' ', "-")),
        citations_score: citations,
        recency_score: recency,
        combined_text: combined_text.to_string(),
        ..Default::default()
    }
}

/// Writes both feature tables and trains a lexical index for each category.
fn setup(books: &[BookFeatureRow], papers: &[PaperFeatureRow]) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let books_csv = tmp.path().join("books_features.csv");
    let papers_csv = tmp.path().join("papers_features.csv");
    write_csv_atomic(&books_csv, books).unwrap();
    write_csv_atomic(&papers_csv, papers).unwrap();
    let trainer = Trainer::lexical(ArtifactStore::new(tmp.path().join("models")), 5000);
    let book_texts: Vec<String> = books.iter().map(|b| b.combined_text.clone()).collect();
    let paper_texts: Vec<String> = papers.iter().map(|p| p.combined_text.clone()).collect();
    trainer.train(Category::Books, &book_texts).unwrap();
    trainer.train(Category::Papers, &paper_texts).unwrap();
    (tmp, books_csv, papers_csv)
}

fn store_for(tmp: &TempDir) -> ArtifactStore {
    ArtifactStore::new(tmp.path().join("models"))
}

#[test]
fn weight_sets_sum_to_one() {
    assert!((BOOK_WEIGHTS.sum() - 1.0).abs() < 1e-9);
    assert!((PAPER_WEIGHTS.sum() - 1.0).abs() < 1e-9);
}

#[test]
fn lexical_overlap_drives_the_ranking() {
    let books = vec![
        book("Neural Networks Explained", "neural networks explained deep learning", 0.1, 0.0, 0.0),
        book("Gardening Monthly", "tomatoes soil compost gardening", 0.9, 0.9, 0.9),
    ];
    let papers = vec![paper("Survey of Deep Learning", "survey deep learning neural networks", 0.5, 0.5)];
    let (tmp, books_csv, papers_csv) = setup(&books, &papers);

    let ranker = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let result = ranker.rank("deep neural networks", 2, 1).expect("rank");

    assert_eq!(result.top_books[0].title, "Neural Networks Explained");
    assert!(result.top_books[0].sim_score > 0.0);
    assert_eq!(result.top_papers[0].title, "Survey of Deep Learning");
    assert_eq!(result.query, "deep neural networks");
}

#[test]
fn zero_overlap_falls_back_to_secondary_signals() {
    // identical sim (0) everywhere; rating_score [0.2, 0.9, 0.5] must order
    // the books [two, three, one]
    let books = vec![
        book("Book One", "alpha bravo charlie", 0.2, 0.0, 0.0),
        book("Book Two", "delta echo foxtrot", 0.9, 0.0, 0.0),
        book("Book Three", "golf hotel india", 0.5, 0.0, 0.0),
    ];
    let papers = vec![paper("Paper", "juliet kilo lima", 0.0, 0.0)];
    let (tmp, books_csv, papers_csv) = setup(&books, &papers);

    let ranker = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let result = ranker.rank("zzz unmatched zzz", 3, 1).expect("rank");

    let titles: Vec<&str> = result.top_books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Book Two", "Book Three", "Book One"]);
    for b in &result.top_books {
        assert_eq!(b.sim_score, 0.0);
    }
}

#[test]
fn requesting_more_than_the_table_holds_returns_the_table() {
    let books = vec![
        book("A", "one", 0.1, 0.0, 0.0),
        book("B", "two", 0.2, 0.0, 0.0),
        book("C", "three", 0.3, 0.0, 0.0),
        book("D", "four", 0.4, 0.0, 0.0),
    ];
    let papers = vec![paper("P", "paper text", 0.0, 0.0)];
    let (tmp, books_csv, papers_csv) = setup(&books, &papers);

    let ranker = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let result = ranker.rank("anything", 10, 10).expect("rank");
    assert_eq!(result.top_books.len(), 4);
    assert_eq!(result.top_papers.len(), 1);
}

#[test]
fn ranking_is_deterministic_and_ties_keep_row_order() {
    let books = vec![
        book("First In Table", "aaa bbb", 0.5, 0.0, 0.0),
        book("Second In Table", "ccc ddd", 0.5, 0.0, 0.0),
        book("Third In Table", "eee fff", 0.5, 0.0, 0.0),
    ];
    let papers = vec![paper("P", "ggg hhh", 0.0, 0.0)];
    let (tmp, books_csv, papers_csv) = setup(&books, &papers);

    let ranker = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let first = ranker.rank("no overlap here zz", 3, 1).expect("rank");
    let second = ranker.rank("no overlap here zz", 3, 1).expect("rank");

    let titles: Vec<&str> = first.top_books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["First In Table", "Second In Table", "Third In Table"]);
    assert_eq!(first.top_books, second.top_books);
    assert_eq!(first.top_papers, second.top_papers);
}

#[test]
fn empty_query_is_valid() {
    let books = vec![book("Only Book", "words here", 0.4, 0.2, 0.1)];
    let papers = vec![paper("Only Paper", "other words", 0.3, 0.6)];
    let (tmp, books_csv, papers_csv) = setup(&books, &papers);

    let ranker = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let result = ranker.rank("", 1, 1).expect("empty query ranks");
    assert_eq!(result.top_books.len(), 1);
    assert_eq!(result.top_books[0].sim_score, 0.0);
    let expected = PAPER_WEIGHTS.citations * 0.3 + PAPER_WEIGHTS.recency * 0.6;
    assert!((result.top_papers[0].final_score - expected).abs() < 1e-12);
}

#[test]
fn missing_category_degrades_to_empty_results() {
    let tmp = TempDir::new().unwrap();
    let books = vec![book("Solo", "solo text", 0.5, 0.5, 0.5)];
    let books_csv = tmp.path().join("books_features.csv");
    let papers_csv = tmp.path().join("papers_features.csv");
    write_csv_atomic(&books_csv, &books).unwrap();
    // no papers table, no papers artifacts
    let trainer = Trainer::lexical(ArtifactStore::new(tmp.path().join("models")), 5000);
    trainer.train(Category::Books, &["solo text".to_string()]).unwrap();

    let ranker = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let result = ranker.rank("solo", 3, 3).expect("rank");
    assert_eq!(result.top_books.len(), 1);
    assert!(result.top_papers.is_empty());
}

#[test]
fn no_loadable_category_is_missing_artifact() {
    let tmp = TempDir::new().unwrap();
    let err = Ranker::load(
        &store_for(&tmp),
        &tmp.path().join("books_features.csv"),
        &tmp.path().join("papers_features.csv"),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingArtifact { .. }));
}

#[test]
fn stale_matrix_against_rebuilt_table_is_fatal() {
    let books = vec![
        book("A", "apple banana", 0.1, 0.0, 0.0),
        book("B", "cherry date", 0.2, 0.0, 0.0),
    ];
    let papers = vec![paper("P", "some paper", 0.0, 0.0)];
    let (tmp, books_csv, papers_csv) = setup(&books, &papers);

    // the feature table grows a row without retraining
    let mut grown = books.clone();
    grown.push(book("C", "elderberry fig", 0.3, 0.0, 0.0));
    write_csv_atomic(&books_csv, &grown).unwrap();

    let err = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).unwrap_err();
    assert!(matches!(
        err,
        Error::ArtifactMismatch {
            category: Category::Books,
            matrix_rows: 2,
            table_rows: 3,
        }
    ));
}

#[test]
fn dense_strategy_round_trips_through_the_same_provider() {
    let tmp = TempDir::new().unwrap();
    let books = vec![
        book("Dense Target", "unique embedding target text", 0.0, 0.0, 0.0),
        book("Dense Other", "completely different words", 0.0, 0.0, 0.0),
    ];
    let papers = vec![paper("Dense Paper", "paper embedding text", 0.0, 0.0)];
    let books_csv = tmp.path().join("books_features.csv");
    let papers_csv = tmp.path().join("papers_features.csv");
    write_csv_atomic(&books_csv, &books).unwrap();
    write_csv_atomic(&papers_csv, &papers).unwrap();

    let embedder = HashEmbedder::new(128);
    let trainer = Trainer::dense(
        ArtifactStore::new(tmp.path().join("models")),
        &embedder,
        "hash-128",
    );
    let book_texts: Vec<String> = books.iter().map(|b| b.combined_text.clone()).collect();
    let paper_texts: Vec<String> = papers.iter().map(|p| p.combined_text.clone()).collect();
    trainer.train(Category::Books, &book_texts).unwrap();
    trainer.train(Category::Papers, &paper_texts).unwrap();

    let ranker = Ranker::load(
        &store_for(&tmp),
        &books_csv,
        &papers_csv,
        Some(Box::new(HashEmbedder::new(128))),
    )
    .expect("load");
    let result = ranker.rank("unique embedding target text", 2, 1).expect("rank");
    assert_eq!(result.top_books[0].title, "Dense Target");
    assert!(result.top_books[0].sim_score > result.top_books[1].sim_score);

    // dense ranking without a provider for the query side must fail as a
    // provider error, not silently refit
    let no_provider = Ranker::load(&store_for(&tmp), &books_csv, &papers_csv, None).expect("load");
    let err = no_provider.rank("anything", 1, 1).unwrap_err();
    assert!(matches!(err, Error::Provider(_)));
}
