//! shelfrank-index
//!
//! Indexing/Training: fits a text-similarity model over each category's
//! `combined_text` column and persists the fitted model plus the row-aligned
//! item matrix. Two strategies share one artifact format: sparse lexical
//! TF-IDF and dense provider embeddings.

pub mod artifact;
pub mod dense;
pub mod tfidf;

pub use artifact::{ArtifactStore, QueryVector, SimilarityMatrix, SimilarityModel, Strategy, Trainer};
pub use dense::{DenseMatrix, DenseModelSpec};
pub use tfidf::{SparseMatrix, SparseVec, TfidfModel};
