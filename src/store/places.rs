use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::models::Place;

use super::{LoadError, LoadResult};

/// Resolves place identifiers to their city and grid cell
///
/// Unknown identifiers are simply absent from the result.
#[cfg_attr(test, mockall::automock)]
pub trait PlaceLookup: Send + Sync {
    fn lookup(&self, place_ids: &[String]) -> HashMap<String, Place>;
}

/// Read-only table of known places keyed by place ID
#[derive(Debug, Clone, Default)]
pub struct PlaceDirectory {
    places: HashMap<String, Place>,
}

impl PlaceDirectory {
    /// Builds a directory from already parsed places
    ///
    /// When a place ID occurs more than once the first row is kept.
    pub fn from_places(places: impl IntoIterator<Item = Place>) -> Self {
        let mut table = HashMap::new();
        for place in places {
            if table.contains_key(&place.place_id) {
                tracing::warn!(place_id = %place.place_id, "Duplicate place row ignored");
                continue;
            }
            table.insert(place.place_id.clone(), place);
        }
        Self { places: table }
    }

    /// Loads the directory from a CSV file
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let directory = Self::from_reader(file)?;

        tracing::info!(
            path = %path.display(),
            places = directory.len(),
            "Loaded place directory"
        );

        Ok(directory)
    }

    /// Loads the directory from CSV data with a header row
    ///
    /// Requires the `gPlusPlaceId`, `city` and `Grid` columns; other columns
    /// are ignored.
    pub fn from_reader(reader: impl Read) -> LoadResult<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut places = Vec::new();

        for (row, record) in reader.deserialize::<Place>().enumerate() {
            let place = record?;
            if place.city.is_empty() {
                return Err(LoadError::Invalid(format!(
                    "place {} on data row {} has an empty city",
                    place.place_id,
                    row + 1
                )));
            }
            places.push(place);
        }

        Ok(Self::from_places(places))
    }

    pub fn get(&self, place_id: &str) -> Option<&Place> {
        self.places.get(place_id)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl PlaceLookup for PlaceDirectory {
    fn lookup(&self, place_ids: &[String]) -> HashMap<String, Place> {
        place_ids
            .iter()
            .filter_map(|id| self.places.get(id))
            .map(|place| (place.place_id.clone(), place.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACES_CSV: &str = "\
,gPlusPlaceId,city,Grid,name
0,101742583391038750118,New York,N12,Joe's Pizza
1,100574642292837870712,New York,N13,Katz's
2,103000000000000000001,London,LO4,Dishoom
";

    #[test]
    fn test_from_reader_ignores_extra_columns() {
        let directory = PlaceDirectory::from_reader(PLACES_CSV.as_bytes()).unwrap();

        assert_eq!(directory.len(), 3);
        let place = directory.get("103000000000000000001").unwrap();
        assert_eq!(place.city, "London");
        assert_eq!(place.grid_cell, "LO4");
    }

    #[test]
    fn test_from_reader_missing_column() {
        let csv = "gPlusPlaceId,city\nP1,London\n";
        let result = PlaceDirectory::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(LoadError::Csv(_))));
    }

    #[test]
    fn test_from_reader_rejects_empty_city() {
        let csv = "gPlusPlaceId,city,Grid\nP1,,N1\n";
        let result = PlaceDirectory::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_place_keeps_first_row() {
        let directory = PlaceDirectory::from_places(vec![
            Place::new("P1", "New York", "N1"),
            Place::new("P1", "London", "LO1"),
        ]);

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get("P1").unwrap().grid_cell, "N1");
    }

    #[test]
    fn test_lookup_drops_unknown_ids() {
        let directory = PlaceDirectory::from_reader(PLACES_CSV.as_bytes()).unwrap();
        let ids = vec![
            "101742583391038750118".to_string(),
            "unknown".to_string(),
        ];

        let found = directory.lookup(&ids);

        assert_eq!(found.len(), 1);
        assert_eq!(found["101742583391038750118"].grid_cell, "N12");
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = PlaceDirectory::from_path("/nonexistent/places_final.csv");
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
