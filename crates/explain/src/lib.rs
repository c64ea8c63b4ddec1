//! Explanation generation for vehicle matches.
//!
//! Converts scores and rankings into human-readable output suitable for
//! display in the CLI: match summaries, trait bars, dataset row cards and
//! brand/model tallies for listings.

use carcupid_model::{Cell, CompatibilityResult, Trait, TraitScores};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The two highest traits joined for display, e.g. "Family + Economy".
pub fn top_two_label(scores: &TraitScores) -> String {
    scores
        .ranked()
        .iter()
        .take(2)
        .map(|(t, _)| t.label())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Compatibility as a whole percentage.
pub fn percent(compatibility: f64) -> u32 {
    if !compatibility.is_finite() || compatibility <= 0.0 {
        return 0;
    }
    (compatibility * 100.0).round() as u32
}

/// One-line description of what a high trait score means.
pub fn trait_blurb(t: Trait) -> &'static str {
    match t {
        Trait::Family => "room for people and their gear",
        Trait::Sport => "quick, engaging and fun to drive",
        Trait::Economy => "cheap to buy and cheap to run",
        Trait::Premium => "upscale, well-equipped and refined",
        Trait::Utility => "built to haul, tow and go anywhere",
        Trait::TechEco => "electrified and efficient",
    }
}

/// A single trait score rendered as a bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitBar {
    pub label: String,
    pub value: f64,
    /// Bar width in percent of the track
    pub width: u32,
}

/// A structured explanation of one ranked vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// What the two strongest traits mean
    pub detail: String,

    /// Compatibility percentage
    pub percent: u32,

    pub bars: Vec<TraitBar>,
}

/// Build the display card for a ranked vehicle.
pub fn explain_result(result: &CompatibilityResult) -> Explanation {
    let ranked = result.scores.ranked();
    let detail = ranked
        .iter()
        .take(2)
        .map(|(t, _)| format!("{}: {}", t.label(), trait_blurb(*t)))
        .collect::<Vec<_>>()
        .join("; ");

    let bars = result
        .scores
        .iter()
        .map(|(t, value)| TraitBar {
            label: t.label().to_string(),
            value,
            width: value.round().clamp(0.0, 100.0) as u32,
        })
        .collect();

    Explanation {
        summary: format!("{}% match: {}", percent(result.compatibility), result.top),
        detail,
        percent: percent(result.compatibility),
        bars,
    }
}

/// Render a bar of `width` percent using `cells` characters.
pub fn render_bar(width: u32, cells: usize) -> String {
    let filled = ((width.min(100) as usize) * cells + 50) / 100;
    format!("{}{}", "#".repeat(filled), ".".repeat(cells - filled))
}

/// A dataset row shown as title plus its non-empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCard {
    pub title: String,
    pub fields: Vec<(String, String)>,
}

/// Pair each non-empty cell with its header. A blank title shows as "Model".
pub fn row_card(headers: &[String], row: &[Cell], title: &str) -> RowCard {
    let fields = headers
        .iter()
        .enumerate()
        .filter_map(|(i, header)| {
            let text = row.get(i).map(Cell::to_text).unwrap_or_default();
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some((header.clone(), text.to_string()))
            }
        })
        .collect();

    RowCard {
        title: if title.trim().is_empty() {
            "Model".to_string()
        } else {
            title.to_string()
        },
        fields,
    }
}

/// Listing count for one make/model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCount {
    pub make: String,
    pub model: String,
    pub count: usize,
}

/// Brand and model counts over a set of listings or decoded VINs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTally {
    /// Brands by count, highest first
    pub brands: Vec<(String, usize)>,
    /// Models grouped by make (ascending), highest count first
    pub models: Vec<ModelCount>,
}

impl MarketTally {
    /// Tally (make, model) pairs. Blank makes are skipped; blank models
    /// count toward the brand only.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut brands: Vec<(String, usize)> = Vec::new();
        let mut brand_slots: HashMap<String, usize> = HashMap::new();
        let mut models: Vec<ModelCount> = Vec::new();
        let mut model_slots: HashMap<(String, String), usize> = HashMap::new();

        for (make, model) in pairs {
            let make = make.as_ref().trim();
            let model = model.as_ref().trim();
            if make.is_empty() {
                continue;
            }

            let slot = *brand_slots.entry(make.to_string()).or_insert_with(|| {
                brands.push((make.to_string(), 0));
                brands.len() - 1
            });
            brands[slot].1 += 1;

            if !model.is_empty() {
                let key = (make.to_string(), model.to_string());
                let slot = *model_slots.entry(key).or_insert_with(|| {
                    models.push(ModelCount {
                        make: make.to_string(),
                        model: model.to_string(),
                        count: 0,
                    });
                    models.len() - 1
                });
                models[slot].count += 1;
            }
        }

        brands.sort_by(|a, b| b.1.cmp(&a.1));
        models.sort_by(|a, b| {
            if a.make == b.make {
                b.count.cmp(&a.count)
            } else {
                a.make
                    .to_lowercase()
                    .cmp(&b.make.to_lowercase())
                    .then_with(|| a.make.cmp(&b.make))
            }
        });

        Self { brands, models }
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }
}
