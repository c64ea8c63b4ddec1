//! Per-dataset range statistics for normalization.

use crate::coerce::{num, parse_city_highway};
use crate::columns::VehicleColumns;
use crate::normalize::norm;
use carcupid_model::{cell_at, Cell};

/// Observed (min, max) of one attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Default for Range {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Range {
    /// Nothing observed yet. Normalizes everything to 0.
    pub const EMPTY: Range = Range {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Widen the range to include `v`. Zero counts as a missing value.
    pub fn observe(&mut self, v: f64) {
        if v != 0.0 {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    pub fn norm(&self, v: f64) -> f64 {
        norm(v, self.min, self.max)
    }

    pub fn is_observed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Ranges of the seven normalized attributes across a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeStats {
    pub horsepower: Range,
    pub price: Range,
    pub cargo: Range,
    pub tow: Range,
    pub length: Range,
    pub wheelbase: Range,
    pub economy: Range,
}

impl RangeStats {
    /// Single pass over every body row.
    pub fn compute(rows: &[Vec<Cell>], columns: &VehicleColumns) -> Self {
        let mut stats = Self::default();
        for row in rows {
            stats.horsepower.observe(num(cell_at(row, columns.horsepower)));
            stats.price.observe(num(cell_at(row, columns.msrp)));
            stats.cargo.observe(num(cell_at(row, columns.cargo)));
            stats.tow.observe(num(cell_at(row, columns.tow)));
            stats.length.observe(num(cell_at(row, columns.length)));
            stats.wheelbase.observe(num(cell_at(row, columns.wheelbase)));
            stats.economy.observe(economy_value(row, columns));
        }
        stats
    }
}

/// Combined fuel economy, falling back to the city/highway mean.
pub fn economy_value(row: &[Cell], columns: &VehicleColumns) -> f64 {
    let combined = num(cell_at(row, columns.mpg_combined));
    if combined != 0.0 {
        return combined;
    }
    parse_city_highway(&cell_at(row, columns.mpg_city_highway).to_text()).unwrap_or(0.0)
}
