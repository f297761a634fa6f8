pub mod recommender;
pub mod similarity;

pub use recommender::{RecommendError, Recommender, TOP_K};
