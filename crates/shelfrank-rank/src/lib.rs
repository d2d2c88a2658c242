//! shelfrank-rank
//!
//! Ranking/Prediction: loads a category's fitted model, matrix, and feature
//! table into an immutable handle, scores every item for a query as a
//! weighted blend of cosine similarity and the precomputed signals, and
//! returns the top-K per category. Read-only over the loaded handle, so
//! concurrent ranking over the same artifacts is safe; a rebuild replaces
//! the whole handle rather than mutating it.

use std::cmp::Ordering;
use std::path::Path;
use tracing::{info, warn};

use shelfrank_core::artifact::read_csv;
use shelfrank_core::error::{Error, Result};
use shelfrank_core::traits::Embedder;
use shelfrank_core::types::{
    BookFeatureRow, Category, PaperFeatureRow, RankedItem, Recommendations,
};
use shelfrank_index::{ArtifactStore, SimilarityMatrix, SimilarityModel};

/// Blend weights for books. Design constants; the set sums to 1.0.
pub struct BookWeights {
    pub sim: f64,
    pub rating: f64,
    pub recency: f64,
    pub pages: f64,
}

pub const BOOK_WEIGHTS: BookWeights = BookWeights {
    sim: 0.55,
    rating: 0.25,
    recency: 0.15,
    pages: 0.05,
};

impl BookWeights {
    pub fn sum(&self) -> f64 {
        self.sim + self.rating + self.recency + self.pages
    }
}

/// Blend weights for papers. Design constants; the set sums to 1.0.
pub struct PaperWeights {
    pub sim: f64,
    pub citations: f64,
    pub recency: f64,
}

pub const PAPER_WEIGHTS: PaperWeights = PaperWeights {
    sim: 0.60,
    citations: 0.30,
    recency: 0.10,
};

impl PaperWeights {
    pub fn sum(&self) -> f64 {
        self.sim + self.citations + self.recency
    }
}

/// One loaded generation for one category: fitted model plus its row-aligned
/// matrix. Immutable after construction.
struct CategoryIndex {
    model: SimilarityModel,
    matrix: SimilarityMatrix,
}

impl CategoryIndex {
    fn sims(&self, query: &str, embedder: Option<&dyn Embedder>, category: Category) -> Result<Vec<f32>> {
        let q = self.model.vectorize(query, embedder)?;
        q.score_rows(&self.matrix, category)
    }
}

/// The loaded-artifact handle the ranking entrypoint runs against.
/// Construct once at service start (or on first use) and replace wholesale
/// after a rebuild.
pub struct Ranker {
    books: Option<(CategoryIndex, Vec<BookFeatureRow>)>,
    papers: Option<(CategoryIndex, Vec<PaperFeatureRow>)>,
    embedder: Option<Box<dyn Embedder>>,
}

impl std::fmt::Debug for Ranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ranker")
            .field("books", &self.books.is_some())
            .field("papers", &self.papers.is_some())
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

impl Ranker {
    /// Load both categories. A category missing either half of its
    /// model+matrix pair, or its feature table, degrades to empty results
    /// for that category; when no category is loadable the call fails with
    /// `MissingArtifact`. A matrix/table row-count mismatch is fatal: those
    /// artifacts are from different generations.
    pub fn load(
        store: &ArtifactStore,
        books_table: &Path,
        papers_table: &Path,
        embedder: Option<Box<dyn Embedder>>,
    ) -> Result<Self> {
        let books = load_category::<BookFeatureRow>(store, Category::Books, books_table)?;
        let papers = load_category::<PaperFeatureRow>(store, Category::Papers, papers_table)?;
        if books.is_none() && papers.is_none() {
            return Err(Error::missing(
                Category::Books,
                "no category has a complete artifact set",
            ));
        }
        Ok(Self {
            books,
            papers,
            embedder,
        })
    }

    /// Rank every indexed item against `query` and return the top `k_books`
    /// and `k_papers` per category. An empty query is valid and simply
    /// scores 0 similarity everywhere; asking for more items than a table
    /// holds returns the whole table.
    pub fn rank(&self, query: &str, k_books: usize, k_papers: usize) -> Result<Recommendations> {
        info!("ranking query '{}' (top {} books, top {} papers)", query, k_books, k_papers);
        let top_books = match &self.books {
            Some((index, rows)) => {
                let sims = index.sims(query, self.embedder.as_deref(), Category::Books)?;
                rank_books(rows, &sims, k_books)
            }
            None => Vec::new(),
        };
        let top_papers = match &self.papers {
            Some((index, rows)) => {
                let sims = index.sims(query, self.embedder.as_deref(), Category::Papers)?;
                rank_papers(rows, &sims, k_papers)
            }
            None => Vec::new(),
        };
        Ok(Recommendations {
            query: query.to_string(),
            top_books,
            top_papers,
        })
    }
}

fn load_category<T: serde::de::DeserializeOwned>(
    store: &ArtifactStore,
    category: Category,
    table: &Path,
) -> Result<Option<(CategoryIndex, Vec<T>)>> {
    if !store.artifacts_exist(category) {
        warn!("{category} similarity artifacts missing, serving empty results for the category");
        return Ok(None);
    }
    if !table.exists() {
        warn!(
            "{category} feature table missing at {}, serving empty results for the category",
            table.display()
        );
        return Ok(None);
    }
    let (model, matrix) = store.load(category)?;
    let rows: Vec<T> = read_csv(table)?;
    if matrix.row_count() != rows.len() {
        return Err(Error::ArtifactMismatch {
            category,
            matrix_rows: matrix.row_count(),
            table_rows: rows.len(),
        });
    }
    Ok(Some((CategoryIndex { model, matrix }, rows)))
}

fn rank_books(rows: &[BookFeatureRow], sims: &[f32], k: usize) -> Vec<RankedItem> {
    let mut scored: Vec<(usize, f64, f64)> = rows
        .iter()
        .zip(sims)
        .enumerate()
        .map(|(i, (r, &sim))| {
            let sim = f64::from(sim);
            let final_score = BOOK_WEIGHTS.sim * sim
                + BOOK_WEIGHTS.rating * r.rating_score
                + BOOK_WEIGHTS.recency * r.recency_score
                + BOOK_WEIGHTS.pages * r.page_score;
            (i, sim, final_score)
        })
        .collect();
    sort_scored(&mut scored);
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(i, sim_score, final_score)| {
            let r = &rows[i];
            RankedItem {
                title: r.title.clone(),
                authors: r.authors.clone(),
                year: r.published_date.clone(),
                url: r.preview_link.clone(),
                sim_score,
                final_score,
            }
        })
        .collect()
}

fn rank_papers(rows: &[PaperFeatureRow], sims: &[f32], k: usize) -> Vec<RankedItem> {
    let mut scored: Vec<(usize, f64, f64)> = rows
        .iter()
        .zip(sims)
        .enumerate()
        .map(|(i, (r, &sim))| {
            let sim = f64::from(sim);
            let final_score = PAPER_WEIGHTS.sim * sim
                + PAPER_WEIGHTS.citations * r.citations_score
                + PAPER_WEIGHTS.recency * r.recency_score;
            (i, sim, final_score)
        })
        .collect();
    sort_scored(&mut scored);
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(i, sim_score, final_score)| {
            let r = &rows[i];
            RankedItem {
                title: r.title.clone(),
                authors: r.authors.clone(),
                year: r.year.clone(),
                url: r.url.clone(),
                sim_score,
                final_score,
            }
        })
        .collect()
}

/// Descending by final score. The sort is stable, so ties keep original row
/// order and identical inputs always produce identical result lists.
fn sort_scored(scored: &mut [(usize, f64, f64)]) {
    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
}
