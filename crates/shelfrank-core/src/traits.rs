use crate::error::Result;

/// Produces fixed-dimension embeddings for batches of texts. Implementations
/// live in `shelfrank-embed`; the dense indexing strategy and query
/// vectorization are written against this trait only.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
