use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::models::{Place, Rating};
use crate::services::similarity::cosine_similarity;
use crate::store::{EmbeddingStore, MissingCell, PlaceDirectory, PlaceLookup};

/// Number of grid cells returned per recommendation
pub const TOP_K: usize = 5;

/// Error types for the recommender
#[derive(Debug, Error, PartialEq)]
pub enum RecommendError {
    #[error("Got {ids} place IDs but {ratings} ratings")]
    InputLengthMismatch { ids: usize, ratings: usize },

    #[error("None of the given place IDs is a known place")]
    NoResolvedPlaces,

    #[error(transparent)]
    MissingCell(#[from] MissingCell),

    #[error("Invalid prediction payload: {0}")]
    InvalidPayload(String),
}

/// Recommends grid cells in another city from a user's rated places
///
/// Both tables are injected at construction and only read afterwards, so a
/// single instance can serve concurrent requests.
pub struct Recommender<P = PlaceDirectory> {
    places: P,
    embeddings: EmbeddingStore,
}

impl<P: PlaceLookup> Recommender<P> {
    pub fn new(places: P, embeddings: EmbeddingStore) -> Self {
        Self { places, embeddings }
    }

    pub fn embeddings(&self) -> &EmbeddingStore {
        &self.embeddings
    }

    /// Returns up to [`TOP_K`] grid cells outside the user's city, ordered by
    /// ascending cosine similarity to the user's profile (the last entry is
    /// the closest match).
    ///
    /// `place_ids` and `ratings` correspond positionally. IDs that are not in
    /// the place directory are dropped. The user's city is the city of the
    /// first ID that resolves.
    #[instrument(skip_all, fields(places = place_ids.len()))]
    pub fn recommend(
        &self,
        place_ids: &[String],
        ratings: &[f64],
    ) -> Result<Vec<String>, RecommendError> {
        if place_ids.len() != ratings.len() {
            return Err(RecommendError::InputLengthMismatch {
                ids: place_ids.len(),
                ratings: ratings.len(),
            });
        }

        let resolved = self.places.lookup(place_ids);
        let visits: Vec<(&Place, Rating)> = place_ids
            .iter()
            .zip(ratings)
            .filter_map(|(id, &rating)| {
                resolved.get(id).map(|place| {
                    (
                        place,
                        Rating {
                            place_id: id.clone(),
                            rating,
                        },
                    )
                })
            })
            .collect();

        let Some((first, _)) = visits.first() else {
            return Err(RecommendError::NoResolvedPlaces);
        };
        let city = first.city.as_str();

        if visits.iter().any(|(place, _)| place.city != city) {
            tracing::warn!(
                city = %city,
                "Rated places span several cities; using the first resolved city"
            );
        }

        tracing::debug!(
            resolved = visits.len(),
            dropped = place_ids.len() - visits.len(),
            city = %city,
            "Resolved rated places"
        );

        let cell_ratings = average_by_cell(&visits);
        let user_vector = self.user_vector(&cell_ratings)?;

        let marker = city.chars().next();
        let mut scored: Vec<(&str, f64)> = self
            .embeddings
            .iter()
            .filter(|(cell, _)| !marker.is_some_and(|m| contains_marker(cell, m)))
            .map(|(cell, vector)| (cell, cosine_similarity(user_vector.view(), vector)))
            .collect();

        // Stable: equal scores keep artifact order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let start = scored.len().saturating_sub(TOP_K);
        let recommendations: Vec<String> = scored[start..]
            .iter()
            .map(|(cell, _)| cell.to_string())
            .collect();

        tracing::debug!(
            candidates = scored.len(),
            returned = recommendations.len(),
            "Ranked candidate cells"
        );

        Ok(recommendations)
    }

    /// Model-server entry point: `features` is `[IDs, Ratings]`
    ///
    /// IDs may be strings or integers. Ratings may be numbers or numeric
    /// strings.
    pub fn predict(&self, features: &[Vec<Value>]) -> Result<Vec<String>, RecommendError> {
        let (ids, ratings) = parse_features(features)?;
        self.recommend(&ids, &ratings)
    }

    /// Sum of cell embeddings weighted by the user's mean rating per cell
    fn user_vector(&self, cell_ratings: &BTreeMap<&str, f64>) -> Result<Array1<f64>, MissingCell> {
        let cells: Vec<&str> = cell_ratings.keys().copied().collect();
        let weights: Array1<f64> = cell_ratings.values().copied().collect();
        let stacked: Array2<f64> = self.embeddings.stack(&cells[..])?;

        Ok(stacked.t().dot(&weights))
    }
}

/// Mean rating per grid cell
fn average_by_cell<'a>(visits: &[(&'a Place, Rating)]) -> BTreeMap<&'a str, f64> {
    let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (place, rating) in visits {
        let entry = totals.entry(place.grid_cell.as_str()).or_insert((0.0, 0));
        entry.0 += rating.rating;
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(cell, (sum, count))| (cell, sum / count as f64))
        .collect()
}

/// Whether a cell ID carries a city's first letter. Cell IDs do not store
/// the city as a field, so the letter is matched anywhere in the ID.
fn contains_marker(cell: &str, marker: char) -> bool {
    cell.chars().any(|c| c.eq_ignore_ascii_case(&marker))
}

fn parse_features(features: &[Vec<Value>]) -> Result<(Vec<String>, Vec<f64>), RecommendError> {
    let [ids, ratings] = features else {
        return Err(RecommendError::InvalidPayload(format!(
            "expected 2 feature columns, got {}",
            features.len()
        )));
    };

    let ids = ids
        .iter()
        .map(|value| match value {
            Value::String(id) => Ok(id.clone()),
            Value::Number(id) => Ok(id.to_string()),
            other => Err(RecommendError::InvalidPayload(format!(
                "place ID must be a string or integer, got {}",
                other
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ratings = ratings
        .iter()
        .map(|value| {
            let rating = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            rating.filter(|r| r.is_finite()).ok_or_else(|| {
                RecommendError::InvalidPayload(format!("rating must be numeric, got {}", value))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((ids, ratings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::places::MockPlaceLookup;
    use serde_json::json;
    use std::collections::HashMap;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn create_test_recommender() -> Recommender {
        let places = PlaceDirectory::from_places(vec![
            Place::new("P1", "New York", "N5"),
            Place::new("P2", "New York", "N6"),
            Place::new("P3", "New York", "N5"),
            Place::new("P4", "London", "LO3"),
            Place::new("P5", "New York", "N404"),
        ]);

        let embeddings = EmbeddingStore::from_rows(vec![
            ("N5".to_string(), vec![1.0, 0.0, 0.0]),
            ("N6".to_string(), vec![0.0, 1.0, 0.0]),
            ("N7".to_string(), vec![1.0, 1.0, 0.0]),
            ("LO1".to_string(), vec![1.0, 0.0, 0.1]),
            ("LO2".to_string(), vec![0.0, 1.0, 0.1]),
            ("LO3".to_string(), vec![1.0, 1.0, 0.0]),
            ("LO4".to_string(), vec![-1.0, 0.0, 0.0]),
            ("LO5".to_string(), vec![0.0, 0.0, 1.0]),
            ("LO6".to_string(), vec![0.9, 0.2, 0.0]),
        ])
        .unwrap();

        Recommender::new(places, embeddings)
    }

    fn similarity_of(recommender: &Recommender, user: &Array1<f64>, cell: &str) -> f64 {
        cosine_similarity(user.view(), recommender.embeddings().vector(cell).unwrap())
    }

    #[test]
    fn test_length_mismatch() {
        let recommender = create_test_recommender();
        let result = recommender.recommend(&ids(&["P1", "P2"]), &[4.0]);
        assert_eq!(
            result,
            Err(RecommendError::InputLengthMismatch { ids: 2, ratings: 1 })
        );
    }

    #[test]
    fn test_no_resolved_places() {
        let recommender = create_test_recommender();
        let result = recommender.recommend(&ids(&["X1", "X2"]), &[4.0, 2.0]);
        assert_eq!(result, Err(RecommendError::NoResolvedPlaces));
    }

    #[test]
    fn test_empty_input_has_no_resolved_places() {
        let recommender = create_test_recommender();
        let result = recommender.recommend(&[], &[]);
        assert_eq!(result, Err(RecommendError::NoResolvedPlaces));
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let recommender = create_test_recommender();
        let with_unknown = recommender
            .recommend(&ids(&["X1", "P1", "P2"]), &[1.0, 4.0, 2.0])
            .unwrap();
        let without = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();
        assert_eq!(with_unknown, without);
    }

    #[test]
    fn test_missing_cell() {
        let recommender = create_test_recommender();
        let result = recommender.recommend(&ids(&["P5"]), &[3.0]);
        assert_eq!(
            result,
            Err(RecommendError::MissingCell(MissingCell("N404".to_string())))
        );
    }

    #[test]
    fn test_excludes_home_city_and_limits_to_top_k() {
        let recommender = create_test_recommender();
        let result = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();

        assert_eq!(result.len(), TOP_K);
        assert!(result.iter().all(|cell| cell.starts_with("LO")));
    }

    #[test]
    fn test_sorted_ascending_with_best_last() {
        let recommender = create_test_recommender();
        let result = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();

        // 4 * N5 + 2 * N6
        let user = Array1::from(vec![4.0, 2.0, 0.0]);
        let scores: Vec<f64> = result
            .iter()
            .map(|cell| similarity_of(&recommender, &user, cell))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));

        let worst_kept = scores[0];
        let excluded: Vec<&str> = ["LO1", "LO2", "LO3", "LO4", "LO5", "LO6"]
            .into_iter()
            .filter(|cell| !result.iter().any(|r| r == cell))
            .collect();
        assert_eq!(excluded, vec!["LO4"]);
        assert!(similarity_of(&recommender, &user, "LO4") <= worst_kept);
    }

    #[test]
    fn test_same_cell_ratings_are_averaged() {
        let places = PlaceDirectory::from_places(vec![
            Place::new("A", "New York", "N5"),
            Place::new("B", "New York", "N5"),
        ]);
        let visits: Vec<(&Place, Rating)> = ["A", "B"]
            .iter()
            .zip([4.0, 2.0])
            .map(|(id, rating)| {
                (
                    places.get(id).unwrap(),
                    Rating {
                        place_id: id.to_string(),
                        rating,
                    },
                )
            })
            .collect();

        let averages = average_by_cell(&visits);

        assert_eq!(averages.len(), 1);
        assert_eq!(averages["N5"], 3.0);
    }

    #[test]
    fn test_averaging_changes_best_match() {
        let recommender = create_test_recommender();
        // N5 averages to 3 and N6 is 3, so the profile points along [1, 1, 0].
        // Summing instead of averaging would favour LO6.
        let result = recommender
            .recommend(&ids(&["P1", "P3", "P2"]), &[4.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(result.last().map(String::as_str), Some("LO3"));
    }

    #[test]
    fn test_zero_rating_does_not_fail() {
        let recommender = create_test_recommender();
        let result = recommender.recommend(&ids(&["P1"]), &[0.0]).unwrap();

        // Every similarity is 0, so artifact order decides
        assert_eq!(result, ids(&["LO2", "LO3", "LO4", "LO5", "LO6"]));
    }

    #[test]
    fn test_idempotent() {
        let recommender = create_test_recommender();
        let first = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();
        let second = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_first_resolved_city_wins() {
        let recommender = create_test_recommender();
        let result = recommender
            .recommend(&ids(&["X1", "P4", "P1"]), &[5.0, 4.0, 2.0])
            .unwrap();

        // London is excluded, so only New York cells remain
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|cell| cell.starts_with('N')));
    }

    #[test]
    fn test_lowercase_cell_ids() {
        let places = PlaceDirectory::from_places(vec![
            Place::new("P1", "New York", "n5"),
            Place::new("P2", "New York", "n6"),
        ]);
        let embeddings = EmbeddingStore::from_rows(vec![
            ("n5".to_string(), vec![1.0, 0.0]),
            ("n6".to_string(), vec![0.0, 1.0]),
            ("l3".to_string(), vec![1.0, 1.0]),
        ])
        .unwrap();
        let recommender = Recommender::new(places, embeddings);

        let result = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();

        assert_eq!(result, ids(&["l3"]));
    }

    #[test]
    fn test_with_mock_lookup() {
        let mut lookup = MockPlaceLookup::new();
        lookup
            .expect_lookup()
            .times(1)
            .returning(|_| {
                HashMap::from([("P9".to_string(), Place::new("P9", "London", "LO1"))])
            });

        let embeddings = EmbeddingStore::from_rows(vec![
            ("LO1".to_string(), vec![1.0, 0.0]),
            ("N1".to_string(), vec![0.0, 1.0]),
            ("N2".to_string(), vec![1.0, 0.5]),
        ])
        .unwrap();
        let recommender = Recommender::new(lookup, embeddings);

        let result = recommender.recommend(&ids(&["P9"]), &[5.0]).unwrap();

        assert_eq!(result, ids(&["N1", "N2"]));
    }

    #[test]
    fn test_predict_matches_recommend() {
        let recommender = create_test_recommender();
        let features = vec![vec![json!("P1"), json!("P2")], vec![json!(4), json!("2")]];

        let predicted = recommender.predict(&features).unwrap();
        let recommended = recommender
            .recommend(&ids(&["P1", "P2"]), &[4.0, 2.0])
            .unwrap();

        assert_eq!(predicted, recommended);
    }

    #[test]
    fn test_parse_features_id_types() {
        let features = vec![vec![json!("101742583391038750118")], vec![json!(4.5)]];
        let (ids, ratings) = parse_features(&features).unwrap();
        assert_eq!(ids, vec!["101742583391038750118".to_string()]);
        assert_eq!(ratings, vec![4.5]);

        let features = vec![vec![json!(42)], vec![json!(1)]];
        let (ids, _) = parse_features(&features).unwrap();
        assert_eq!(ids, vec!["42".to_string()]);
    }

    #[test]
    fn test_parse_features_wrong_shape() {
        let features = vec![vec![json!("P1")]];
        assert!(matches!(
            parse_features(&features),
            Err(RecommendError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_parse_features_bad_rating() {
        let features = vec![vec![json!("P1")], vec![json!("great")]];
        assert!(matches!(
            parse_features(&features),
            Err(RecommendError::InvalidPayload(_))
        ));

        let features = vec![vec![json!("P1")], vec![json!(null)]];
        assert!(matches!(
            parse_features(&features),
            Err(RecommendError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_contains_marker_ignores_case() {
        assert!(contains_marker("N12", 'N'));
        assert!(contains_marker("n12", 'N'));
        assert!(!contains_marker("LO12", 'N'));
    }
}
