//! Catalog ingestion: paginated fetches from the books and papers catalog
//! APIs into one raw JSON collection per category. Records are stored
//! verbatim; all interpretation happens in the cleaning stage.

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use shelfrank_core::artifact::write_json_atomic;
use shelfrank_core::error::{Error, Result};

use crate::DataLayout;

const PAPER_FIELDS: &str = "title,abstract,authors,url,year,citationCount,venue";

/// Where the catalogs live. `api_key` is appended to book requests when set.
pub struct CatalogEndpoints {
    pub books: String,
    pub papers: String,
    pub api_key: Option<String>,
}

/// Pagination bounds per category plus the inter-request throttle.
pub struct PageLimits {
    pub books_page_size: usize,
    pub books_max_start: usize,
    pub papers_page_size: usize,
    pub papers_max_results: usize,
    pub throttle: Duration,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            books_page_size: 40,
            books_max_start: 80,
            papers_page_size: 100,
            papers_max_results: 300,
            throttle: Duration::from_millis(800),
        }
    }
}

pub struct IngestionArtifact {
    pub books_path: PathBuf,
    pub papers_path: PathBuf,
    pub books: usize,
    pub papers: usize,
}

pub struct Ingestor {
    http: reqwest::blocking::Client,
    endpoints: CatalogEndpoints,
    limits: PageLimits,
    out_books: PathBuf,
    out_papers: PathBuf,
}

impl Ingestor {
    pub fn new(layout: &DataLayout, endpoints: CatalogEndpoints, limits: PageLimits) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoints,
            limits,
            out_books: layout.raw_books(),
            out_papers: layout.raw_papers(),
        })
    }

    /// Fetch both catalogs, then persist both collections. Nothing is
    /// written until every fetch has succeeded, so a failed run leaves no
    /// partial artifact.
    pub fn run(&self, book_queries: &[String], paper_queries: &[String]) -> Result<IngestionArtifact> {
        info!(
            "starting ingestion: {} book queries, {} paper queries",
            book_queries.len(),
            paper_queries.len()
        );
        let books = self.fetch_books(book_queries)?;
        let papers = self.fetch_papers(paper_queries)?;
        write_json_atomic(&self.out_books, &books)?;
        write_json_atomic(&self.out_papers, &papers)?;
        info!(
            "ingestion complete: {} books -> {}, {} papers -> {}",
            books.len(),
            self.out_books.display(),
            papers.len(),
            self.out_papers.display()
        );
        Ok(IngestionArtifact {
            books_path: self.out_books.clone(),
            papers_path: self.out_papers.clone(),
            books: books.len(),
            papers: papers.len(),
        })
    }

    fn fetch_books(&self, queries: &[String]) -> Result<Vec<Value>> {
        let pages_per_query = self.limits.books_max_start.div_ceil(self.limits.books_page_size);
        let pb = progress_bar((queries.len() * pages_per_query) as u64);
        let mut all_books = Vec::new();
        for query in queries {
            let scoped = format!("intitle:\"{query}\"");
            let mut start = 0;
            while start < self.limits.books_max_start {
                let mut params = vec![
                    ("q".to_string(), scoped.clone()),
                    ("maxResults".to_string(), self.limits.books_page_size.to_string()),
                    ("startIndex".to_string(), start.to_string()),
                ];
                if let Some(key) = &self.endpoints.api_key {
                    params.push(("key".to_string(), key.clone()));
                }
                let data: Value = self
                    .http
                    .get(&self.endpoints.books)
                    .query(&params)
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .map_err(|e| Error::unavailable(&self.endpoints.books, e))?
                    .json()
                    .map_err(|e| Error::unavailable(&self.endpoints.books, format!("corrupt response: {e}")))?;
                let items = data.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
                debug!("fetched {} books for '{}' at startIndex {}", items.len(), query, start);
                all_books.extend(items);
                pb.inc(1);
                std::thread::sleep(self.limits.throttle);
                start += self.limits.books_page_size;
            }
        }
        pb.finish_and_clear();
        info!("books catalog fetched: {} raw records", all_books.len());
        Ok(all_books)
    }

    fn fetch_papers(&self, queries: &[String]) -> Result<Vec<Value>> {
        let mut all_papers = Vec::new();
        for query in queries {
            let mut offset = 0;
            while offset < self.limits.papers_max_results {
                let params = vec![
                    ("query".to_string(), query.clone()),
                    ("limit".to_string(), self.limits.papers_page_size.to_string()),
                    ("offset".to_string(), offset.to_string()),
                    ("fields".to_string(), PAPER_FIELDS.to_string()),
                ];
                let resp = self
                    .http
                    .get(&self.endpoints.papers)
                    .query(&params)
                    .send()
                    .map_err(|e| Error::unavailable(&self.endpoints.papers, e))?;
                if !resp.status().is_success() {
                    warn!("papers catalog returned {} for '{}', moving on", resp.status(), query);
                    break;
                }
                let data: Value = resp
                    .json()
                    .map_err(|e| Error::unavailable(&self.endpoints.papers, format!("corrupt response: {e}")))?;
                let items = data.get("data").and_then(Value::as_array).cloned().unwrap_or_default();
                if items.is_empty() {
                    debug!("no papers for '{}' at offset {}", query, offset);
                    break;
                }
                for mut item in items {
                    // Remember which query surfaced the paper; it feeds combined_text.
                    if let Some(obj) = item.as_object_mut() {
                        obj.insert("searchQuery".to_string(), Value::String(query.clone()));
                    }
                    all_papers.push(item);
                }
                offset += self.limits.papers_page_size;
                std::thread::sleep(self.limits.throttle);
            }
        }
        info!("papers catalog fetched: {} raw records", all_papers.len());
        Ok(all_papers)
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({per_sec})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
