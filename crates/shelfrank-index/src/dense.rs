//! Dense embedding index: fixed-dimension provider embeddings, one
//! L2-normalized row per item.

use serde::{Deserialize, Serialize};

use shelfrank_core::error::{Error, Result};
use shelfrank_core::traits::Embedder;

/// The "model" half of a dense artifact pair: enough to rebuild the query
/// side (which provider model, which dimension) without re-reading the
/// matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseModelSpec {
    pub model: String,
    pub dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseMatrix {
    pub dim: usize,
    pub rows: Vec<Vec<f32>>,
}

impl DenseMatrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}

/// Dot product of unit-norm vectors, i.e. their cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn build(
    embedder: &dyn Embedder,
    model_name: &str,
    texts: &[String],
) -> Result<(DenseModelSpec, DenseMatrix)> {
    let mut rows = embedder.embed_batch(texts)?;
    for row in &mut rows {
        if row.len() != embedder.dim() {
            return Err(Error::Provider(format!(
                "provider returned a {}-dim vector, expected {}",
                row.len(),
                embedder.dim()
            )));
        }
        l2_normalize(row);
    }
    let spec = DenseModelSpec {
        model: model_name.to_string(),
        dim: embedder.dim(),
    };
    let matrix = DenseMatrix {
        dim: embedder.dim(),
        rows,
    };
    Ok((spec, matrix))
}
