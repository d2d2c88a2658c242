use serde_json::json;
use std::fs;
use tempfile::TempDir;

use shelfrank_core::artifact::read_csv;
use shelfrank_core::types::{BookFeatureRow, BookRow, PaperFeatureRow, PaperRow};
use shelfrank_core::Error;
use shelfrank_pipeline::features::{extract_year, min_max_scale};
use shelfrank_pipeline::{Cleaner, DataLayout, FeatureBuilder};

fn write_raw_books(layout: &DataLayout, records: serde_json::Value) {
    let path = layout.raw_books();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec(&records).unwrap()).unwrap();
}

fn write_raw_papers(layout: &DataLayout, records: serde_json::Value) {
    let path = layout.raw_papers();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec(&records).unwrap()).unwrap();
}

#[test]
fn clean_books_filters_dedups_and_defaults() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    write_raw_books(
        &layout,
        json!([
            {"volumeInfo": {
                "title": "Machine Learning Basics",
                "authors": ["A. Author", "B. Author"],
                "description": "An introduction.",
                "pageCount": 320,
                "averageRating": 4.0,
                "publishedDate": "2019-04-01"
            }},
            // duplicate title, first wins
            {"volumeInfo": {"title": "Machine Learning Basics", "pageCount": 100, "description": "machine learning again"}},
            // no keyword match anywhere
            {"volumeInfo": {"title": "French Cooking", "description": "Recipes.", "pageCount": 200}},
            // keyword in description, missing rating and date
            {"volumeInfo": {"title": "Applied Statistics", "description": "covers machine learning too", "pageCount": 150}},
            // non-positive page count is discarded
            {"volumeInfo": {"title": "Pamphlet on Machine Learning", "pageCount": 0}},
            // record without volumeInfo is skipped, not fatal
            {"id": "junk"}
        ]),
    );
    write_raw_papers(&layout, json!([]));

    let cleaner = Cleaner::new(&layout, vec!["machine learning".to_string()]);
    let written = cleaner.clean_books().expect("clean books");
    assert_eq!(written, 2);

    let rows: Vec<BookRow> = read_csv(&layout.cleaned_books()).expect("read cleaned");
    assert_eq!(rows[0].title, "Machine Learning Basics");
    assert_eq!(rows[0].authors, "A. Author, B. Author");
    assert_eq!(rows[0].avg_rating, Some(4.0));
    assert_eq!(rows[1].title, "Applied Statistics");
    assert_eq!(rows[1].avg_rating, None);
    assert_eq!(rows[1].published_date, "");
}

#[test]
fn clean_papers_joins_authors_and_defaults_missing_fields() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    write_raw_papers(
        &layout,
        json!([
            {
                "searchQuery": "transformers",
                "title": "Attention Is All You Need",
                "abstract": "We propose the Transformer.",
                "authors": [{"name": "Vaswani"}, {"name": "Shazeer"}],
                "year": 2017,
                "citationCount": 90000,
                "venue": "NeurIPS",
                "url": "https://example.org/attention"
            },
            {"title": "No Metadata At All"},
            {"title": "Attention Is All You Need", "year": 2018}
        ]),
    );

    let cleaner = Cleaner::new(&layout, vec![]);
    let written = cleaner.clean_papers().expect("clean papers");
    assert_eq!(written, 2, "duplicate title dropped");

    let rows: Vec<PaperRow> = read_csv(&layout.cleaned_papers()).expect("read cleaned");
    assert_eq!(rows[0].authors, "Vaswani, Shazeer");
    assert_eq!(rows[0].year, "2017");
    assert_eq!(rows[0].citations, 90000);
    assert_eq!(rows[1].year, "");
    assert_eq!(rows[1].citations, 0);
}

#[test]
fn cleaning_missing_source_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    let cleaner = Cleaner::new(&layout, vec![]);
    let err = cleaner.clean_books().unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
    assert!(!layout.cleaned_books().exists(), "no partial output");
}

#[test]
fn min_max_scale_bounds_and_missing() {
    let scaled = min_max_scale(&[Some(2000.0), None, Some(2020.0), Some(2010.0)]);
    assert_eq!(scaled, vec![0.0, 0.0, 1.0, 0.5]);
    for s in &scaled {
        assert!((0.0..=1.0).contains(s));
    }
}

#[test]
fn min_max_scale_degenerate_columns_are_zero() {
    assert_eq!(min_max_scale(&[None, None]), vec![0.0, 0.0]);
    assert_eq!(min_max_scale(&[Some(3.0), Some(3.0)]), vec![0.0, 0.0]);
    assert_eq!(min_max_scale(&[]), Vec::<f64>::new());
}

#[test]
fn extract_year_handles_both_date_shapes() {
    assert_eq!(extract_year("2019-04-01"), Some(2019.0));
    assert_eq!(extract_year("1999"), Some(1999.0));
    assert_eq!(extract_year("circa 2005, reprint"), Some(2005.0));
    assert_eq!(extract_year("n.d."), None);
    assert_eq!(extract_year(""), None);
}

fn seed_cleaned_tables(layout: &DataLayout) {
    let books = vec![
        BookRow {
            title: "Old Classic".into(),
            authors: "Someone".into(),
            description: "A Classic! Text.".into(),
            categories: "Computers".into(),
            published_date: "2000".into(),
            avg_rating: Some(3.0),
            page_count: 100,
            ..Default::default()
        },
        BookRow {
            title: "New Hit".into(),
            description: "Fresh take".into(),
            published_date: "2020-01-15".into(),
            avg_rating: None,
            page_count: 300,
            ..Default::default()
        },
        BookRow {
            title: "Middle Child".into(),
            published_date: "2010".into(),
            avg_rating: Some(5.0),
            page_count: 200,
            ..Default::default()
        },
    ];
    shelfrank_core::artifact::write_csv_atomic(&layout.cleaned_books(), &books).unwrap();
    let papers = vec![
        PaperRow {
            search_query: "ml".into(),
            title: "Paper A".into(),
            abstract_text: "About things; nice.".into(),
            authors: "X, Y".into(),
            year: "2015".into(),
            citations: 10,
            ..Default::default()
        },
        PaperRow {
            title: "Paper B".into(),
            year: "".into(),
            citations: 0,
            ..Default::default()
        },
    ];
    shelfrank_core::artifact::write_csv_atomic(&layout.cleaned_papers(), &papers).unwrap();
}

#[test]
fn feature_tables_have_bounded_scores_and_clean_text() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    seed_cleaned_tables(&layout);

    FeatureBuilder::new(&layout).run().expect("features");

    let books: Vec<BookFeatureRow> = read_csv(&layout.feature_books()).expect("read books");
    assert_eq!(books.len(), 3);
    for b in &books {
        for s in [b.recency_score, b.rating_score, b.page_score] {
            assert!((0.0..=1.0).contains(&s), "score out of bounds: {s}");
        }
        assert_eq!(b.combined_text, b.combined_text.to_lowercase());
        assert!(!b.combined_text.contains("  "));
        assert!(!b.combined_text.contains('!'));
    }
    // missing rating scores 0 and sits outside the min/max
    assert_eq!(books[1].rating_score, 0.0);
    // valid ratings span [3,5] -> [0,1]
    assert_eq!(books[0].rating_score, 0.0);
    assert_eq!(books[2].rating_score, 1.0);
    // recency over [2000,2020]
    assert_eq!(books[0].recency_score, 0.0);
    assert_eq!(books[1].recency_score, 1.0);
    assert_eq!(books[2].recency_score, 0.5);

    let papers: Vec<PaperFeatureRow> = read_csv(&layout.feature_papers()).expect("read papers");
    assert_eq!(papers.len(), 2);
    // missing year scores 0; the single valid year makes a constant column
    assert_eq!(papers[0].recency_score, 0.0);
    assert_eq!(papers[1].recency_score, 0.0);
    // citations [10, 0] -> [1, 0]
    assert_eq!(papers[0].citations_score, 1.0);
    assert_eq!(papers[1].citations_score, 0.0);
    assert!(papers[0].combined_text.starts_with("ml paper a"));
}

#[test]
fn feature_building_is_idempotent_from_raw_columns() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    seed_cleaned_tables(&layout);

    let builder = FeatureBuilder::new(&layout);
    builder.run().expect("first run");
    let first = fs::read_to_string(layout.feature_books()).unwrap();
    builder.run().expect("second run");
    let second = fs::read_to_string(layout.feature_books()).unwrap();
    assert_eq!(first, second, "re-running from the same cleaned table is a no-op");
}

#[test]
fn empty_cleaned_table_produces_empty_feature_table() {
    let tmp = TempDir::new().unwrap();
    let layout = DataLayout::new(tmp.path());
    shelfrank_core::artifact::write_csv_atomic::<BookRow>(&layout.cleaned_books(), &[]).unwrap();
    shelfrank_core::artifact::write_csv_atomic::<PaperRow>(&layout.cleaned_papers(), &[]).unwrap();

    FeatureBuilder::new(&layout).run().expect("features on empty input");
    let books: Vec<BookFeatureRow> = read_csv(&layout.feature_books()).expect("read");
    assert!(books.is_empty());
}
