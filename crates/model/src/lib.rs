//! Core domain model for CarCupid vehicle matching.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `Cell` / `Row` / `Grid`: the loosely-typed spreadsheet data
//! - `Trait`: the six compatibility axes
//! - `TraitScores` / `WeightVector`: per-vehicle scores and user weights
//! - `ScoredVehicle` / `CompatibilityResult`: scoring and ranking output
//! - `ListingItem` / `VinDecode`: records from the listings API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Unknown trait: {0}")]
    UnknownTrait(String),
}

/// A single spreadsheet cell.
///
/// Sheets return strings for most cells, but cached or hand-written grids
/// may carry numbers, booleans or nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Number(f64),
    Text(String),
    #[default]
    Null,
}

static ABSENT: Cell = Cell::Null;

impl Cell {
    /// Render the cell the way it reads on screen. Absent cells are empty.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One spreadsheet row, positionally aligned to the header row.
pub type Row = Vec<Cell>;

/// A full two-dimensional sheet as returned by a tabular source.
pub type Grid = Vec<Row>;

/// Read the cell at `pos`, treating unknown columns and short rows as absent.
pub fn cell_at(row: &[Cell], pos: Option<usize>) -> &Cell {
    pos.and_then(|p| row.get(p)).unwrap_or(&ABSENT)
}

/// One of the six compatibility axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trait {
    Family,
    Sport,
    Economy,
    Premium,
    Utility,
    TechEco,
}

impl Trait {
    /// All traits in display order. Ties in rankings keep this order.
    pub const ALL: [Trait; 6] = [
        Trait::Family,
        Trait::Sport,
        Trait::Economy,
        Trait::Premium,
        Trait::Utility,
        Trait::TechEco,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Family => "Family",
            Self::Sport => "Sport",
            Self::Economy => "Economy",
            Self::Premium => "Premium",
            Self::Utility => "Utility",
            Self::TechEco => "TechEco",
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Trait {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();
        match key.as_str() {
            "family" => Ok(Self::Family),
            "sport" => Ok(Self::Sport),
            "economy" => Ok(Self::Economy),
            "premium" => Ok(Self::Premium),
            "utility" => Ok(Self::Utility),
            "techeco" => Ok(Self::TechEco),
            _ => Err(ModelError::UnknownTrait(s.to_string())),
        }
    }
}

/// Per-vehicle trait scores.
///
/// While scoring, the fields act as unbounded accumulators; `clamped()`
/// produces the final [0, 100] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraitScores {
    pub family: f64,
    pub sport: f64,
    pub economy: f64,
    pub premium: f64,
    pub utility: f64,
    pub tech_eco: f64,
}

impl TraitScores {
    pub fn get(&self, t: Trait) -> f64 {
        match t {
            Trait::Family => self.family,
            Trait::Sport => self.sport,
            Trait::Economy => self.economy,
            Trait::Premium => self.premium,
            Trait::Utility => self.utility,
            Trait::TechEco => self.tech_eco,
        }
    }

    fn slot(&mut self, t: Trait) -> &mut f64 {
        match t {
            Trait::Family => &mut self.family,
            Trait::Sport => &mut self.sport,
            Trait::Economy => &mut self.economy,
            Trait::Premium => &mut self.premium,
            Trait::Utility => &mut self.utility,
            Trait::TechEco => &mut self.tech_eco,
        }
    }

    /// Add `delta` to one trait accumulator.
    pub fn add(&mut self, t: Trait, delta: f64) {
        *self.slot(t) += delta;
    }

    /// Apply a list of fixed deltas.
    pub fn apply(&mut self, deltas: &[(Trait, f64)]) {
        for &(t, delta) in deltas {
            self.add(t, delta);
        }
    }

    /// Clamp every field to [0, 100].
    pub fn clamped(&self) -> Self {
        let clamp = |v: f64| v.clamp(0.0, 100.0);
        Self {
            family: clamp(self.family),
            sport: clamp(self.sport),
            economy: clamp(self.economy),
            premium: clamp(self.premium),
            utility: clamp(self.utility),
            tech_eco: clamp(self.tech_eco),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::ALL.iter().map(move |&t| (t, self.get(t)))
    }

    /// Traits sorted by score, highest first. Equal scores keep display order.
    pub fn ranked(&self) -> Vec<(Trait, f64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries
    }
}

/// User-controlled weights, one per trait, each in [0, 1].
///
/// Weights need not sum to one; `normalized()` rescales them when consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeightVector {
    pub family: f64,
    pub sport: f64,
    pub economy: f64,
    pub premium: f64,
    pub utility: f64,
    pub tech_eco: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            family: 0.4,
            sport: 0.0,
            economy: 0.3,
            premium: 0.0,
            utility: 0.0,
            tech_eco: 0.3,
        }
    }
}

impl WeightVector {
    /// All weights zero.
    pub fn zero() -> Self {
        Self {
            family: 0.0,
            sport: 0.0,
            economy: 0.0,
            premium: 0.0,
            utility: 0.0,
            tech_eco: 0.0,
        }
    }

    pub fn get(&self, t: Trait) -> f64 {
        match t {
            Trait::Family => self.family,
            Trait::Sport => self.sport,
            Trait::Economy => self.economy,
            Trait::Premium => self.premium,
            Trait::Utility => self.utility,
            Trait::TechEco => self.tech_eco,
        }
    }

    /// Set one weight, clamped to the slider range [0, 1].
    pub fn set(&mut self, t: Trait, value: f64) {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        match t {
            Trait::Family => self.family = value,
            Trait::Sport => self.sport = value,
            Trait::Economy => self.economy = value,
            Trait::Premium => self.premium = value,
            Trait::Utility => self.utility = value,
            Trait::TechEco => self.tech_eco = value,
        }
    }

    pub fn with(mut self, t: Trait, value: f64) -> Self {
        self.set(t, value);
        self
    }

    pub fn sum(&self) -> f64 {
        Trait::ALL.iter().map(|&t| self.get(t)).sum()
    }

    /// Rescale to sum to one. A non-positive sum yields all zeros.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        if sum > 0.0 {
            Self {
                family: self.family / sum,
                sport: self.sport / sum,
                economy: self.economy / sum,
                premium: self.premium / sum,
                utility: self.utility / sum,
                tech_eco: self.tech_eco / sum,
            }
        } else {
            Self::zero()
        }
    }
}

/// Scorer output for one vehicle row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredVehicle {
    /// Make, model, year and trim
    pub title: String,

    /// Clamped trait scores
    pub scores: TraitScores,

    /// The two highest traits, e.g. "Family + Economy"
    pub top: String,
}

/// A vehicle ranked against the user's weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub title: String,
    pub scores: TraitScores,
    pub top: String,

    /// Weighted match in [0, 1]
    pub compatibility: f64,
}

/// Field readers for listings API payloads.
///
/// The API is loose about types (years and prices arrive as numbers or
/// strings), so a field of the wrong type reads as `None` instead of
/// rejecting the whole record.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s
                .chars()
                .filter(|c| !matches!(c, '$' | ','))
                .collect::<String>()
                .trim()
                .parse::<f64>()
                .ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(to_number(&Value::deserialize(d)?))
    }

    pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(to_number(&Value::deserialize(d)?)
            .filter(|n| n.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(n))
            .map(|n| n as i32))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn record<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(Value::deserialize(d)?).ok())
    }
}

/// Price information attached to a retail listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailListing {
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Vehicle identity from the listings API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInfo {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, deserialize_with = "lenient::year", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One listing from the listings API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingItem {
    #[serde(default, deserialize_with = "lenient::record", skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<VehicleInfo>,
    #[serde(default, deserialize_with = "lenient::record", skip_serializing_if = "Option::is_none")]
    pub retail_listing: Option<RetailListing>,
}

impl ListingItem {
    pub fn make(&self) -> &str {
        self.vehicle.as_ref().and_then(|v| v.make.as_deref()).unwrap_or("")
    }

    pub fn model(&self) -> &str {
        self.vehicle.as_ref().and_then(|v| v.model.as_deref()).unwrap_or("")
    }

    pub fn price(&self) -> f64 {
        self.retail_listing
            .as_ref()
            .and_then(|r| r.price)
            .unwrap_or(0.0)
    }
}

/// Result of decoding a single VIN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VinDecode {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_deserialization() {
        let row: Row = serde_json::from_str(r#"["Ford", 2024, true, null]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Cell::Text("Ford".into()),
                Cell::Number(2024.0),
                Cell::Bool(true),
                Cell::Null
            ]
        );
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(Cell::Number(45000.0).to_text(), "45000");
        assert_eq!(Cell::Number(2.5).to_text(), "2.5");
        assert_eq!(Cell::Null.to_text(), "");
        assert_eq!(Cell::Bool(false).to_text(), "false");
    }

    #[test]
    fn test_cell_at_out_of_range() {
        let row: Row = vec!["a".into()];
        assert!(cell_at(&row, Some(5)).is_absent());
        assert!(cell_at(&row, None).is_absent());
        assert_eq!(cell_at(&row, Some(0)).to_text(), "a");
    }

    #[test]
    fn test_trait_from_str() {
        assert_eq!("family".parse::<Trait>(), Ok(Trait::Family));
        assert_eq!("TechEco".parse::<Trait>(), Ok(Trait::TechEco));
        assert_eq!("tech_eco".parse::<Trait>(), Ok(Trait::TechEco));
        assert!(matches!("speed".parse::<Trait>(), Err(ModelError::UnknownTrait(_))));
    }

    #[test]
    fn test_scores_serialize_with_trait_names() {
        let scores = TraitScores {
            tech_eco: 12.0,
            ..Default::default()
        };
        let json = serde_json::to_value(scores).unwrap();
        assert_eq!(json["TechEco"], 12.0);
        assert_eq!(json["Family"], 0.0);
    }

    #[test]
    fn test_scores_clamped() {
        let scores = TraitScores {
            family: -20.0,
            sport: 250.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(scores.family, 0.0);
        assert_eq!(scores.sport, 100.0);
    }

    #[test]
    fn test_ranked_keeps_display_order_on_ties() {
        let scores = TraitScores {
            economy: 30.0,
            utility: 30.0,
            ..Default::default()
        };
        let ranked: Vec<Trait> = scores.ranked().into_iter().map(|(t, _)| t).collect();
        assert_eq!(&ranked[..3], &[Trait::Economy, Trait::Utility, Trait::Family]);
    }

    #[test]
    fn test_weights_normalized() {
        let w = WeightVector::default().normalized();
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert_eq!(WeightVector::zero().normalized(), WeightVector::zero());
    }

    #[test]
    fn test_weight_set_clamps() {
        let w = WeightVector::zero().with(Trait::Sport, 3.0).with(Trait::Utility, -1.0);
        assert_eq!(w.sport, 1.0);
        assert_eq!(w.utility, 0.0);
    }

    #[test]
    fn test_listing_item_camel_case() {
        let item: ListingItem = serde_json::from_str(
            r#"{"vehicle":{"vin":"X","year":2024,"make":"Ford","model":"F-150"},"retailListing":{"price":51000}}"#,
        )
        .unwrap();
        assert_eq!(item.make(), "Ford");
        assert_eq!(item.model(), "F-150");
        assert_eq!(item.price(), 51000.0);
    }

    #[test]
    fn test_listing_fields_tolerate_loose_types() {
        let items: Vec<ListingItem> = serde_json::from_str(
            r#"[
                {"vehicle":{"year":"2024","make":"Ford","model":"F-150"},"retailListing":{"price":51000}},
                {"vehicle":{"year":2023,"make":"Toyota","model":"Prius"},"retailListing":{"price":"$29,000"}},
                {"vehicle":{"year":"soon","make":"BMW","model":330},"retailListing":{"price":null}},
                {"vehicle":"unknown","retailListing":"n/a"}
            ]"#,
        )
        .unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].vehicle.as_ref().unwrap().year, Some(2024));
        assert_eq!(items[1].price(), 29000.0);
        assert_eq!(items[2].vehicle.as_ref().unwrap().year, None);
        assert_eq!(items[2].model(), "330");
        assert_eq!(items[2].price(), 0.0);
        assert_eq!(items[3], ListingItem::default());
    }
}
