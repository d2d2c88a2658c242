//! Cleaning: raw ingested collections → flat cleaned tables.
//!
//! Category-specific filters run here (book keyword allow-list, positive
//! page counts), duplicates are dropped by title, and missing source fields
//! become empty/zero defaults instead of failing the row. An unreadable
//! source file aborts the stage with no output written.

use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

use shelfrank_core::artifact::{read_json, write_csv_atomic};
use shelfrank_core::error::Result;
use shelfrank_core::types::{BookRow, PaperRow};

use crate::DataLayout;

pub struct CleaningArtifact {
    pub books_path: PathBuf,
    pub papers_path: PathBuf,
    pub books_rows: usize,
    pub papers_rows: usize,
}

pub struct Cleaner {
    raw_books: PathBuf,
    raw_papers: PathBuf,
    out_books: PathBuf,
    out_papers: PathBuf,
    book_keywords: Vec<String>,
}

impl Cleaner {
    /// `book_keywords` is the allow-list for book titles/descriptions; an
    /// empty list keeps everything.
    pub fn new(layout: &DataLayout, book_keywords: Vec<String>) -> Self {
        Self {
            raw_books: layout.raw_books(),
            raw_papers: layout.raw_papers(),
            out_books: layout.cleaned_books(),
            out_papers: layout.cleaned_papers(),
            book_keywords: book_keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn run(&self) -> Result<CleaningArtifact> {
        let papers_rows = self.clean_papers()?;
        let books_rows = self.clean_books()?;
        info!("cleaning complete: {} books, {} papers", books_rows, papers_rows);
        Ok(CleaningArtifact {
            books_path: self.out_books.clone(),
            papers_path: self.out_papers.clone(),
            books_rows,
            papers_rows,
        })
    }

    pub fn clean_books(&self) -> Result<usize> {
        let raw: Vec<Value> = read_json(&self.raw_books)?;
        let mut mapped = Vec::new();
        for item in &raw {
            let Some(volume) = item.get("volumeInfo") else {
                warn!("book record without volumeInfo, skipping");
                continue;
            };
            let title = str_field(volume, "title");
            let description = str_field(volume, "description");
            if !self.matches_keywords(&title, &description) {
                continue;
            }
            mapped.push(BookRow {
                title,
                authors: join_strings(volume, "authors"),
                description,
                categories: join_strings(volume, "categories"),
                publisher: str_field(volume, "publisher"),
                published_date: str_field(volume, "publishedDate"),
                avg_rating: volume.get("averageRating").and_then(Value::as_f64),
                page_count: volume.get("pageCount").and_then(Value::as_i64).unwrap_or(0),
                preview_link: str_field(volume, "previewLink"),
            });
        }
        let deduped = dedup_by_title(mapped, |r: &BookRow| r.title.clone());
        let rows: Vec<BookRow> = deduped.into_iter().filter(|r| r.page_count > 0).collect();
        write_csv_atomic(&self.out_books, &rows)?;
        info!("cleaned books written to {}", self.out_books.display());
        Ok(rows.len())
    }

    pub fn clean_papers(&self) -> Result<usize> {
        let raw: Vec<Value> = read_json(&self.raw_papers)?;
        let mut mapped = Vec::new();
        for item in &raw {
            mapped.push(PaperRow {
                search_query: str_field(item, "searchQuery"),
                title: str_field(item, "title"),
                abstract_text: str_field(item, "abstract"),
                authors: join_author_names(item),
                year: item
                    .get("year")
                    .and_then(Value::as_i64)
                    .map(|y| y.to_string())
                    .unwrap_or_default(),
                citations: item.get("citationCount").and_then(Value::as_i64).unwrap_or(0),
                venue: str_field(item, "venue"),
                url: str_field(item, "url"),
            });
        }
        let rows = dedup_by_title(mapped, |r: &PaperRow| r.title.clone());
        write_csv_atomic(&self.out_papers, &rows)?;
        info!("cleaned papers written to {}", self.out_papers.display());
        Ok(rows.len())
    }

    fn matches_keywords(&self, title: &str, description: &str) -> bool {
        if self.book_keywords.is_empty() {
            return true;
        }
        let title = title.to_lowercase();
        let description = description.to_lowercase();
        self.book_keywords
            .iter()
            .any(|k| title.contains(k) || description.contains(k))
    }
}

/// Drop rows whose natural key (title) was already seen; first wins.
fn dedup_by_title<T>(rows: Vec<T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|r| seen.insert(key(r))).collect()
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `", "`-joined plain string array field (book authors, categories).
fn join_strings(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

/// Paper authors arrive as `[{"name": ...}, ...]`.
fn join_author_names(item: &Value) -> String {
    item.get("authors")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(|x| x.get("name").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}
