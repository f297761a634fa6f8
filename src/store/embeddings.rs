use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use serde::Deserialize;

use super::{LoadError, LoadResult};

/// A grid cell was referenced that has no embedding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No embedding for grid cell {0}")]
pub struct MissingCell(pub String);

/// Orientation of the serialized embedding table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingLayout {
    /// One row per grid cell
    #[default]
    Continuous,
    /// One column per grid cell; transposed on load
    Discrete,
}

/// Row or column label of a split table. pandas writes integer labels for
/// unnamed dimensions and string labels for grid cells.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Label {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(text) => write!(f, "{}", text),
            Label::Number(number) => write!(f, "{}", number),
        }
    }
}

/// A table in pandas' `orient="split"` JSON form
#[derive(Debug, Deserialize)]
struct SplitTable {
    index: Vec<Label>,
    columns: Vec<Label>,
    data: Vec<Vec<f64>>,
}

/// Read-only table of grid cell embeddings
///
/// Cells keep the order they had in the artifact; that order is the
/// tie-break order when ranking.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    cells: Vec<String>,
    positions: HashMap<String, usize>,
    vectors: Array2<f64>,
}

impl EmbeddingStore {
    /// Builds a store from `(cell, vector)` rows
    pub fn from_rows(rows: Vec<(String, Vec<f64>)>) -> LoadResult<Self> {
        let dimension = rows.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut cells = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len() * dimension);

        for (cell, vector) in rows {
            if vector.len() != dimension {
                return Err(LoadError::Invalid(format!(
                    "embedding for {} has {} values, expected {}",
                    cell,
                    vector.len(),
                    dimension
                )));
            }
            cells.push(cell);
            values.extend(vector);
        }

        let vectors = Array2::from_shape_vec((cells.len(), dimension), values)
            .map_err(|e| LoadError::Invalid(e.to_string()))?;

        Self::new(cells, vectors)
    }

    /// Loads the store from a JSON split table on disk
    pub fn from_path(path: impl AsRef<Path>, layout: EmbeddingLayout) -> LoadResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let store = Self::from_reader(std::io::BufReader::new(file), layout)?;

        tracing::info!(
            path = %path.display(),
            layout = ?layout,
            cells = store.len(),
            dimension = store.dimension(),
            "Loaded embedding store"
        );

        Ok(store)
    }

    /// Loads the store from JSON split-table data
    pub fn from_reader(reader: impl Read, layout: EmbeddingLayout) -> LoadResult<Self> {
        let table: SplitTable = serde_json::from_reader(reader)?;

        if table.data.len() != table.index.len() {
            return Err(LoadError::Invalid(format!(
                "table has {} index labels but {} rows",
                table.index.len(),
                table.data.len()
            )));
        }

        let width = table.columns.len();
        let mut values = Vec::with_capacity(table.data.len() * width);
        for (label, row) in table.index.iter().zip(table.data) {
            if row.len() != width {
                return Err(LoadError::Invalid(format!(
                    "row {} has {} values, expected {}",
                    label,
                    row.len(),
                    width
                )));
            }
            values.extend(row);
        }

        let matrix = Array2::from_shape_vec((table.index.len(), width), values)
            .map_err(|e| LoadError::Invalid(e.to_string()))?;

        match layout {
            EmbeddingLayout::Continuous => {
                let cells = table.index.iter().map(Label::to_string).collect();
                Self::new(cells, matrix)
            }
            EmbeddingLayout::Discrete => {
                let cells = table.columns.iter().map(Label::to_string).collect();
                let transposed = matrix.reversed_axes().as_standard_layout().into_owned();
                Self::new(cells, transposed)
            }
        }
    }

    fn new(cells: Vec<String>, vectors: Array2<f64>) -> LoadResult<Self> {
        if cells.is_empty() || vectors.ncols() == 0 {
            return Err(LoadError::Invalid("embedding table is empty".to_string()));
        }

        let mut positions = HashMap::with_capacity(cells.len());
        for (position, cell) in cells.iter().enumerate() {
            if positions.insert(cell.clone(), position).is_some() {
                return Err(LoadError::Invalid(format!("duplicate grid cell {}", cell)));
            }
        }

        Ok(Self {
            cells,
            positions,
            vectors,
        })
    }

    /// Returns the embedding of a grid cell
    pub fn vector(&self, cell: &str) -> Result<ArrayView1<'_, f64>, MissingCell> {
        self.positions
            .get(cell)
            .map(|&position| self.vectors.row(position))
            .ok_or_else(|| MissingCell(cell.to_string()))
    }

    /// Stacks the embeddings of the given cells into a `cells × dimension` matrix
    pub fn stack<S: AsRef<str>>(&self, cells: &[S]) -> Result<Array2<f64>, MissingCell> {
        let positions = cells
            .iter()
            .map(|cell| {
                let cell = cell.as_ref();
                self.positions
                    .get(cell)
                    .copied()
                    .ok_or_else(|| MissingCell(cell.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.vectors.select(Axis(0), &positions))
    }

    /// All grid cells in artifact order
    pub fn all_cells(&self) -> &[String] {
        &self.cells
    }

    /// Iterates `(cell, vector)` pairs in artifact order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f64>)> {
        self.cells
            .iter()
            .map(String::as_str)
            .zip(self.vectors.rows())
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
