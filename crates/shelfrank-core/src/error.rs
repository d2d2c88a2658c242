//! Error taxonomy shared by every pipeline stage and the ranking engine.

use thiserror::Error;

use crate::types::Category;

#[derive(Debug, Error)]
pub enum Error {
    /// A stage input is missing or unreadable: a raw collection file, a
    /// cleaned table, or a catalog endpoint. Fatal for the stage; no partial
    /// output is written.
    #[error("source unavailable: {origin}: {reason}")]
    SourceUnavailable { origin: String, reason: String },

    /// Similarity matrix and feature table disagree on row count. The two
    /// artifacts are from different generations and must not be served.
    #[error("artifact mismatch for {category}: matrix has {matrix_rows} rows, feature table has {table_rows}")]
    ArtifactMismatch {
        category: Category,
        matrix_rows: usize,
        table_rows: usize,
    },

    /// A category's model, matrix, or feature table is absent at load time.
    #[error("missing artifact for {category}: {what}")]
    MissingArtifact { category: Category, what: String },

    /// An external embedding provider call failed or timed out.
    #[error("embedding provider failure: {0}")]
    Provider(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn unavailable(origin: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Error::SourceUnavailable {
            origin: origin.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn missing(category: Category, what: impl Into<String>) -> Self {
        Error::MissingArtifact {
            category,
            what: what.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
