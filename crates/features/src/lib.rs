//! Feature extraction for vehicle scoring.
//!
//! Provides pure functions for turning spreadsheet rows into scoring inputs:
//! - Header indexing and dataset layout
//! - Numeric coercion of loosely-typed cells
//! - Min-max normalization and per-dataset range statistics
//! - Categorical classification (body, fuel, drive, transmission, bands)

pub mod categories;
pub mod coerce;
pub mod columns;
pub mod header;
pub mod normalize;
pub mod stats;

pub use categories::{
    BodyType, Category, DoorCount, DriveType, FuelType, HorsepowerBand, PriceBand, SeatCount,
    Transmission,
};
pub use coerce::{num, parse_city_highway, strict_number};
pub use columns::VehicleColumns;
pub use header::{normalize_header, Dataset, HeaderIndex, BODY_OFFSET, HEADER_ROW};
pub use normalize::{clamp01, norm};
pub use stats::{economy_value, Range, RangeStats};

use carcupid_model::Cell;

/// Count list entries in a free-text feature cell.
///
/// Entries are separated by commas, semicolons or newlines; blank entries
/// are ignored.
pub fn count_feature_tokens(cell: &Cell) -> usize {
    cell.to_text()
        .split(|c| matches!(c, ',' | ';' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .count()
}
