use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::middleware::request_id::RequestId;
use crate::models::{
    PredictionRequest, PredictionResponse, RecommendationRequest, RecommendationResponse,
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Model-server prediction endpoint
///
/// Accepts `{"data": {"names": [...], "ndarray": [IDs, Ratings]}}` and answers
/// with the recommended cells in `data.ndarray`.
pub async fn predict(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> AppResult<Json<PredictionResponse>> {
    let Json(request) = payload?;

    tracing::info!(
        request_id = %request_id,
        features = ?request.data.names,
        "Processing prediction request"
    );

    let cells = state.recommender.predict(&request.data.ndarray)?;

    tracing::info!(
        request_id = %request_id,
        recommended = cells.len(),
        "Prediction completed"
    );

    Ok(Json(PredictionResponse::from(cells)))
}

/// Plain JSON recommendation endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Json(request) = payload?;

    tracing::info!(
        request_id = %request_id,
        places = request.ids.len(),
        "Processing recommendation request"
    );

    let recommendations = state
        .recommender
        .recommend(&request.ids, &request.ratings)?;

    Ok(Json(RecommendationResponse { recommendations }))
}
