//! Header lookup and sheet layout.

use carcupid_model::{cell_at, Cell, Grid, Row};
use std::collections::HashMap;

/// Row index of the header within a dataset sheet.
pub const HEADER_ROW: usize = 1;

/// First body row. Rows between the header and here are sheet preamble.
pub const BODY_OFFSET: usize = 13;

/// Normalize a column name for lookup.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Column name → position, built from a header row.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    /// Index a header row. Later duplicates overwrite earlier ones.
    pub fn from_header(header: &[Cell]) -> Self {
        let mut positions = HashMap::with_capacity(header.len());
        for (i, cell) in header.iter().enumerate() {
            positions.insert(normalize_header(&cell.to_text()), i);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&normalize_header(name)).copied()
    }

    /// Read the named column from `row`; unknown columns read as absent.
    pub fn get<'a>(&self, row: &'a [Cell], name: &str) -> &'a Cell {
        cell_at(row, self.position(name))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A loaded sheet split into header and body.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Header cells as displayed
    pub headers: Vec<String>,
    pub index: HeaderIndex,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Split a grid using the standard sheet layout.
    pub fn from_grid(grid: Grid) -> Self {
        Self::with_layout(grid, HEADER_ROW, BODY_OFFSET)
    }

    /// Split a grid with an explicit header row and body offset.
    pub fn with_layout(grid: Grid, header_row: usize, body_offset: usize) -> Self {
        let header: Row = grid.get(header_row).cloned().unwrap_or_default();
        let headers = header.iter().map(Cell::to_text).collect();
        let index = HeaderIndex::from_header(&header);
        let rows = grid.into_iter().skip(body_offset).collect();

        Self {
            headers,
            index,
            rows,
        }
    }
}
