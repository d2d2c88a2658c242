//! Feature building: cleaned tables → feature tables carrying the
//! normalized signals and the combined searchable text. Scores are always
//! re-derived from the raw columns, so the stage is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tracing::{info, warn};

use shelfrank_core::artifact::{read_csv, write_csv_atomic};
use shelfrank_core::error::Result;
use shelfrank_core::text;
use shelfrank_core::types::{BookFeatureRow, BookRow, PaperFeatureRow, PaperRow};

use crate::DataLayout;

static RE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{4})").expect("invalid RE_YEAR"));

/// Min-max scale one column to [0,1]. Rows without a valid value score 0
/// and do not participate in the min/max. A column with no valid values, or
/// a constant one, scales to 0 everywhere.
pub fn min_max_scale(values: &[Option<f64>]) -> Vec<f64> {
    let valid: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if valid.is_empty() {
        return vec![0.0; values.len()];
    }
    let min = valid.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = valid.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let range = max - min;
    if range == 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| v.map_or(0.0, |x| (x - min) / range))
        .collect()
}

/// Publication year from a date-ish string: the leading four digits of a
/// `YYYY-MM-DD` or bare `YYYY` match.
pub fn extract_year(raw: &str) -> Option<f64> {
    let m = RE_YEAR.find(raw)?;
    m.as_str().get(..4)?.parse::<f64>().ok()
}

pub struct FeaturesArtifact {
    pub books_path: PathBuf,
    pub papers_path: PathBuf,
}

pub struct FeatureBuilder {
    in_books: PathBuf,
    in_papers: PathBuf,
    out_books: PathBuf,
    out_papers: PathBuf,
}

impl FeatureBuilder {
    pub fn new(layout: &DataLayout) -> Self {
        Self {
            in_books: layout.cleaned_books(),
            in_papers: layout.cleaned_papers(),
            out_books: layout.feature_books(),
            out_papers: layout.feature_papers(),
        }
    }

    pub fn run(&self) -> Result<FeaturesArtifact> {
        let books = self.build_book_features()?;
        let papers = self.build_paper_features()?;
        info!("feature tables written: {} books, {} papers", books, papers);
        Ok(FeaturesArtifact {
            books_path: self.out_books.clone(),
            papers_path: self.out_papers.clone(),
        })
    }

    pub fn build_book_features(&self) -> Result<usize> {
        let rows: Vec<BookRow> = read_csv(&self.in_books)?;
        let years: Vec<Option<f64>> = rows.iter().map(|r| extract_year(&r.published_date)).collect();
        let ratings: Vec<Option<f64>> = rows.iter().map(|r| r.avg_rating).collect();
        let pages: Vec<Option<f64>> = rows
            .iter()
            .map(|r| (r.page_count > 0).then_some(r.page_count as f64))
            .collect();
        if !rows.is_empty() && years.iter().all(Option::is_none) {
            warn!("no parseable publication years; recency_score is 0 for all books");
        }
        let recency = min_max_scale(&years);
        let rating = min_max_scale(&ratings);
        let page = min_max_scale(&pages);
        let out: Vec<BookFeatureRow> = rows
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let combined_text = text::combine([
                    r.title.as_str(),
                    r.description.as_str(),
                    r.categories.as_str(),
                    r.authors.as_str(),
                ]);
                BookFeatureRow {
                    title: r.title,
                    authors: r.authors,
                    description: r.description,
                    categories: r.categories,
                    publisher: r.publisher,
                    published_date: r.published_date,
                    avg_rating: r.avg_rating,
                    page_count: r.page_count,
                    preview_link: r.preview_link,
                    recency_score: recency[i],
                    rating_score: rating[i],
                    page_score: page[i],
                    combined_text,
                }
            })
            .collect();
        write_csv_atomic(&self.out_books, &out)?;
        Ok(out.len())
    }

    pub fn build_paper_features(&self) -> Result<usize> {
        let rows: Vec<PaperRow> = read_csv(&self.in_papers)?;
        let years: Vec<Option<f64>> = rows.iter().map(|r| r.year.trim().parse::<f64>().ok()).collect();
        let citations: Vec<Option<f64>> = rows.iter().map(|r| Some(r.citations as f64)).collect();
        if !rows.is_empty() && years.iter().all(Option::is_none) {
            warn!("no parseable years; recency_score is 0 for all papers");
        }
        let recency = min_max_scale(&years);
        let citations_scaled = min_max_scale(&citations);
        let out: Vec<PaperFeatureRow> = rows
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let combined_text = text::combine([
                    r.search_query.as_str(),
                    r.title.as_str(),
                    r.abstract_text.as_str(),
                    r.authors.as_str(),
                ]);
                PaperFeatureRow {
                    search_query: r.search_query,
                    title: r.title,
                    abstract_text: r.abstract_text,
                    authors: r.authors,
                    year: r.year,
                    citations: r.citations,
                    venue: r.venue,
                    url: r.url,
                    recency_score: recency[i],
                    citations_score: citations_scaled[i],
                    combined_text,
                }
            })
            .collect();
        write_csv_atomic(&self.out_papers, &out)?;
        Ok(out.len())
    }
}
