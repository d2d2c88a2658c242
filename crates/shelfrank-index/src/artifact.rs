//! Artifact store for similarity indexes: one fitted model plus one
//! row-aligned matrix per category, the skip-if-exists training gate, and
//! query-side vectorization through the same fitted model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use shelfrank_core::artifact::{read_json, write_json_atomic};
use shelfrank_core::error::{Error, Result};
use shelfrank_core::traits::Embedder;
use shelfrank_core::types::Category;

use crate::dense::{self, DenseMatrix, DenseModelSpec};
use crate::tfidf::{SparseMatrix, SparseVec, TfidfModel};

/// Which similarity strategy a deployment runs. Chosen once per deployment;
/// never mixed within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Lexical,
    Dense,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lexical" => Ok(Strategy::Lexical),
            "dense" => Ok(Strategy::Dense),
            other => Err(Error::InvalidConfig(format!("unknown index strategy '{other}'"))),
        }
    }
}

/// A fitted, serializable text-similarity model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum SimilarityModel {
    Lexical(TfidfModel),
    Dense(DenseModelSpec),
}

/// The item matrix belonging to a fitted model. Row *i* refers to row *i*
/// of the category's feature table from the same generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SimilarityMatrix {
    Sparse(SparseMatrix),
    Dense(DenseMatrix),
}

impl SimilarityMatrix {
    pub fn row_count(&self) -> usize {
        match self {
            SimilarityMatrix::Sparse(m) => m.row_count(),
            SimilarityMatrix::Dense(m) => m.row_count(),
        }
    }
}

/// A query vectorized through a fitted model.
pub enum QueryVector {
    Sparse(SparseVec),
    Dense(Vec<f32>),
}

impl SimilarityModel {
    /// Vectorize a query through the fitted model. Dense models need the
    /// embedding provider that produced the matrix.
    pub fn vectorize(&self, query: &str, embedder: Option<&dyn Embedder>) -> Result<QueryVector> {
        match self {
            SimilarityModel::Lexical(m) => Ok(QueryVector::Sparse(m.transform(query))),
            SimilarityModel::Dense(spec) => {
                let embedder = embedder.ok_or_else(|| {
                    Error::Provider(format!(
                        "no embedding provider configured for dense model '{}'",
                        spec.model
                    ))
                })?;
                let mut rows = embedder.embed_batch(&[query.to_string()])?;
                let mut v = rows
                    .pop()
                    .ok_or_else(|| Error::Provider("provider returned no embedding for the query".to_string()))?;
                if v.len() != spec.dim {
                    return Err(Error::Provider(format!(
                        "query embedding has dim {}, matrix was built with {}",
                        v.len(),
                        spec.dim
                    )));
                }
                dense::l2_normalize(&mut v);
                Ok(QueryVector::Dense(v))
            }
        }
    }
}

impl QueryVector {
    /// Cosine similarity against every matrix row. Rows and the query are
    /// unit-norm (or zero), so the dot product is the cosine.
    pub fn score_rows(&self, matrix: &SimilarityMatrix, category: Category) -> Result<Vec<f32>> {
        match (self, matrix) {
            (QueryVector::Sparse(q), SimilarityMatrix::Sparse(m)) => {
                Ok(m.rows.iter().map(|r| q.dot(r)).collect())
            }
            (QueryVector::Dense(q), SimilarityMatrix::Dense(m)) => {
                Ok(m.rows.iter().map(|r| dense::dot(q, r)).collect())
            }
            _ => Err(Error::missing(
                category,
                "model and matrix strategies disagree; retrain the category",
            )),
        }
    }
}

/// Persisted locations of model+matrix pairs, one per category, under one
/// models directory.
pub struct ArtifactStore {
    models_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn model_path(&self, category: Category) -> PathBuf {
        self.models_dir.join(format!("{category}_model.json"))
    }

    pub fn matrix_path(&self, category: Category) -> PathBuf {
        self.models_dir.join(format!("{category}_matrix.json"))
    }

    /// The two-state training gate: a category is complete when both halves
    /// of its model+matrix pair are on disk.
    pub fn artifacts_exist(&self, category: Category) -> bool {
        self.model_path(category).exists() && self.matrix_path(category).exists()
    }

    pub fn save(
        &self,
        category: Category,
        model: &SimilarityModel,
        matrix: &SimilarityMatrix,
    ) -> Result<()> {
        write_json_atomic(&self.model_path(category), model)?;
        write_json_atomic(&self.matrix_path(category), matrix)
    }

    /// Load a category's pair. Absence of either half is `MissingArtifact`;
    /// a pair whose halves come from different strategies is rejected
    /// rather than served.
    pub fn load(&self, category: Category) -> Result<(SimilarityModel, SimilarityMatrix)> {
        let model_path = self.model_path(category);
        let matrix_path = self.matrix_path(category);
        if !model_path.exists() {
            return Err(Error::missing(category, format!("model file {}", model_path.display())));
        }
        if !matrix_path.exists() {
            return Err(Error::missing(category, format!("matrix file {}", matrix_path.display())));
        }
        let model: SimilarityModel = read_json(&model_path)?;
        let matrix: SimilarityMatrix = read_json(&matrix_path)?;
        let consistent = matches!(
            (&model, &matrix),
            (SimilarityModel::Lexical(_), SimilarityMatrix::Sparse(_))
                | (SimilarityModel::Dense(_), SimilarityMatrix::Dense(_))
        );
        if !consistent {
            return Err(Error::missing(
                category,
                "model and matrix strategies disagree; retrain the category",
            ));
        }
        Ok((model, matrix))
    }
}

/// Fits and persists one category's similarity index, skipping categories
/// whose artifact pair already exists.
pub struct Trainer<'a> {
    store: ArtifactStore,
    strategy: Strategy,
    max_features: usize,
    embedder: Option<&'a dyn Embedder>,
    provider_model: String,
}

impl<'a> Trainer<'a> {
    pub fn lexical(store: ArtifactStore, max_features: usize) -> Self {
        Self {
            store,
            strategy: Strategy::Lexical,
            max_features,
            embedder: None,
            provider_model: String::new(),
        }
    }

    pub fn dense(store: ArtifactStore, embedder: &'a dyn Embedder, provider_model: impl Into<String>) -> Self {
        Self {
            store,
            strategy: Strategy::Dense,
            max_features: 0,
            embedder: Some(embedder),
            provider_model: provider_model.into(),
        }
    }

    /// Fit and persist one category. Returns false when the existing
    /// artifact pair was kept.
    pub fn train(&self, category: Category, texts: &[String]) -> Result<bool> {
        if self.store.artifacts_exist(category) {
            info!("{category} similarity artifacts already exist, skipping training");
            return Ok(false);
        }
        let (model, matrix) = match self.strategy {
            Strategy::Lexical => {
                let (model, matrix) = TfidfModel::fit(texts, self.max_features);
                (SimilarityModel::Lexical(model), SimilarityMatrix::Sparse(matrix))
            }
            Strategy::Dense => {
                let embedder = self.embedder.ok_or_else(|| {
                    Error::Provider("dense strategy requires an embedding provider".to_string())
                })?;
                let (spec, matrix) = dense::build(embedder, &self.provider_model, texts)?;
                (SimilarityModel::Dense(spec), SimilarityMatrix::Dense(matrix))
            }
        };
        self.store.save(category, &model, &matrix)?;
        info!("trained {category} index: {} rows", matrix.row_count());
        Ok(true)
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}
