use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Model-server payloads
// ============================================================================

/// Request body of the model-server prediction endpoint
///
/// `data.ndarray` holds the two feature columns positionally: place IDs
/// first, ratings second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRequest {
    pub data: PredictionInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionInput {
    #[serde(default)]
    pub names: Vec<String>,
    pub ndarray: Vec<Vec<Value>>,
}

impl PredictionRequest {
    /// Builds a request from place IDs and their ratings
    pub fn new(ids: &[String], ratings: &[f64]) -> Self {
        Self {
            data: PredictionInput {
                names: vec!["feature-1".to_string(), "feature-2".to_string()],
                ndarray: vec![
                    ids.iter().cloned().map(Value::from).collect(),
                    ratings.iter().copied().map(Value::from).collect(),
                ],
            },
        }
    }
}

/// Response body of the model-server prediction endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub data: PredictionOutput,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionOutput {
    #[serde(default)]
    pub names: Vec<String>,
    pub ndarray: Vec<String>,
}

impl From<Vec<String>> for PredictionResponse {
    fn from(cells: Vec<String>) -> Self {
        Self {
            data: PredictionOutput {
                names: Vec::new(),
                ndarray: cells,
            },
            meta: Map::new(),
        }
    }
}

// ============================================================================
// Plain JSON payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationRequest {
    pub ids: Vec<String>,
    pub ratings: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    /// Grid cells ordered by ascending similarity; the last is the best match
    pub recommendations: Vec<String>,
}
