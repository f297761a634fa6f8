use serde::{Deserialize, Serialize};

/// A known establishment and the grid cell it falls into
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    /// Opaque place identifier
    #[serde(rename = "gPlusPlaceId")]
    pub place_id: String,
    /// City the place belongs to, e.g. "New York" or "London"
    pub city: String,
    /// Grid cell identifier
    #[serde(rename = "Grid")]
    pub grid_cell: String,
}

impl Place {
    /// Creates a new place
    pub fn new(
        place_id: impl Into<String>,
        city: impl Into<String>,
        grid_cell: impl Into<String>,
    ) -> Self {
        Self {
            place_id: place_id.into(),
            city: city.into(),
            grid_cell: grid_cell.into(),
        }
    }
}

/// A single user rating for a place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub place_id: String,
    pub rating: f64,
}
