//! In-memory tables loaded once at startup from flat-file artifacts.

pub mod embeddings;
pub mod places;

pub use embeddings::{EmbeddingLayout, EmbeddingStore, MissingCell};
pub use places::{PlaceDirectory, PlaceLookup};

/// Errors raised while loading an artifact
///
/// Any of these aborts startup; none of them is handled per request.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

pub type LoadResult<T> = Result<T, LoadError>;
