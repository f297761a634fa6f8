mod place;
mod prediction;

pub use place::{Place, Rating};
pub use prediction::{
    PredictionInput, PredictionOutput, PredictionRequest, PredictionResponse,
    RecommendationRequest, RecommendationResponse,
};
