//! Per-row trait scoring.

use crate::rules::TraitRule;
use carcupid_explain::top_two_label;
use carcupid_features::{
    clamp01, count_feature_tokens, economy_value, num, strict_number, BodyType, Category, Dataset,
    DoorCount, DriveType, FuelType, HorsepowerBand, PriceBand, RangeStats, SeatCount,
    Transmission, VehicleColumns,
};
use carcupid_model::{cell_at, Cell, ScoredVehicle, Trait, TraitScores};

/// Feature-list entries at which the feature signal saturates.
pub const MAX_FEATURES: f64 = 50.0;

/// Scores rows of one dataset load.
///
/// Holds the resolved column positions and the range statistics of the
/// full body, so rows scored after scoping still normalize against the
/// whole sheet.
#[derive(Debug, Clone)]
pub struct Scorer {
    columns: VehicleColumns,
    stats: RangeStats,
}

impl Scorer {
    pub fn new(columns: VehicleColumns, stats: RangeStats) -> Self {
        Self { columns, stats }
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        let columns = VehicleColumns::resolve(&dataset.index);
        let stats = RangeStats::compute(&dataset.rows, &columns);
        tracing::debug!(
            rows = dataset.rows.len(),
            price_observed = stats.price.is_observed(),
            "Computed range statistics"
        );
        Self { columns, stats }
    }

    pub fn columns(&self) -> &VehicleColumns {
        &self.columns
    }

    pub fn stats(&self) -> &RangeStats {
        &self.stats
    }

    fn cell<'a>(&self, row: &'a [Cell], pos: Option<usize>) -> &'a Cell {
        cell_at(row, pos)
    }

    fn text(&self, row: &[Cell], pos: Option<usize>) -> String {
        self.cell(row, pos).to_text()
    }

    /// Score one row into clamped trait scores.
    pub fn score_row(&self, row: &[Cell]) -> ScoredVehicle {
        let scores = self.trait_scores(row);
        ScoredVehicle {
            title: vehicle_title(row, &self.columns),
            top: top_two_label(&scores),
            scores,
        }
    }

    pub fn score_rows<'a, I>(&self, rows: I) -> Vec<ScoredVehicle>
    where
        I: IntoIterator<Item = &'a Vec<Cell>>,
    {
        rows.into_iter().map(|row| self.score_row(row)).collect()
    }

    fn trait_scores(&self, row: &[Cell]) -> TraitScores {
        let cols = &self.columns;
        let stats = &self.stats;
        let mut acc = TraitScores::default();

        if let Some(body) = BodyType::classify(&self.text(row, cols.body)) {
            acc.apply(body.deltas());
        }
        if let Some(fuel) = FuelType::classify(&self.text(row, cols.fuel)) {
            acc.apply(fuel.deltas());
        }

        let hp = num(self.cell(row, cols.horsepower));
        if let Some(band) = HorsepowerBand::from_hp(hp) {
            acc.apply(band.deltas());
        }

        let price_norm = stats.price.norm(num(self.cell(row, cols.msrp)));
        acc.apply(PriceBand::from_norm(price_norm).deltas());

        if let Some(drive) = DriveType::classify(&self.text(row, cols.drive)) {
            acc.apply(drive.deltas());
        }
        if let Some(doors) = DoorCount::from_count(strict_number(self.cell(row, cols.doors))) {
            acc.apply(doors.deltas());
        }
        if let Some(seats) = SeatCount::from_count(strict_number(self.cell(row, cols.seats))) {
            acc.apply(seats.deltas());
        }

        let cargo = stats.cargo.norm(num(self.cell(row, cols.cargo)));
        acc.add(Trait::Family, cargo * 20.0);
        acc.add(Trait::Utility, cargo * 20.0);

        // Torque is normalized against the horsepower range.
        let torque = stats.horsepower.norm(num(self.cell(row, cols.torque)));
        acc.add(Trait::Sport, torque * 15.0);
        acc.add(Trait::Utility, torque * 10.0);

        if let Some(trans) = Transmission::classify(&self.text(row, cols.transmission)) {
            acc.apply(trans.deltas());
        }

        let tow = stats.tow.norm(num(self.cell(row, cols.tow)));
        acc.add(Trait::Utility, tow * 30.0);
        acc.add(Trait::Family, tow * 5.0);

        let length = stats.length.norm(num(self.cell(row, cols.length)));
        let wheelbase = stats.wheelbase.norm(num(self.cell(row, cols.wheelbase)));
        let shortness = 1.0 - length;
        acc.add(Trait::Economy, shortness * 10.0);
        acc.add(Trait::TechEco, shortness * 5.0);
        acc.add(Trait::Family, length * 10.0);
        acc.add(Trait::Premium, length * 10.0);
        acc.add(Trait::Utility, length * 5.0);
        acc.add(Trait::Family, wheelbase * 5.0);
        acc.add(Trait::Premium, wheelbase * 5.0);

        let economy = stats.economy.norm(economy_value(row, cols));
        acc.add(Trait::Economy, economy * 40.0);
        acc.add(Trait::TechEco, economy * 10.0);

        let feature_count: usize = cols
            .feature_lists
            .iter()
            .map(|&i| count_feature_tokens(self.cell(row, Some(i))))
            .sum();
        let features = clamp01(feature_count as f64 / MAX_FEATURES);
        acc.add(Trait::Premium, features * 20.0);
        acc.add(Trait::TechEco, features * 15.0);
        acc.add(Trait::Family, features * 10.0);

        acc.clamped()
    }
}

/// Make, model, year and trim joined by spaces, skipping blanks.
pub fn vehicle_title(row: &[Cell], columns: &VehicleColumns) -> String {
    [columns.make, columns.model, columns.year, columns.trim]
        .iter()
        .map(|&pos| cell_at(row, pos).to_text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use carcupid_features::{HeaderIndex, Range};
    use carcupid_model::Row;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const HEADER: [&str; 15] = [
        "Make",
        "Model",
        "Year",
        "Trim",
        "Body Type",
        "Fuel Type",
        "Horsepower (hp)",
        "Base MSRP",
        "Drive Type",
        "Doors",
        "Total Seating",
        "Transmission",
        "Maximum Towing Capacity (lbs)",
        "EPA Combined MPG",
        "Packages",
    ];

    fn columns() -> VehicleColumns {
        let header: Row = HEADER.iter().map(|&h| Cell::from(h)).collect();
        VehicleColumns::resolve(&HeaderIndex::from_header(&header))
    }

    #[allow(clippy::too_many_arguments)]
    fn row(
        body: &str,
        fuel: &str,
        hp: &str,
        msrp: &str,
        drive: &str,
        seats: &str,
        trans: &str,
        tow: &str,
    ) -> Row {
        vec![
            "Toyota".into(),
            "Prius".into(),
            Cell::Number(2024.0),
            " LE ".into(),
            body.into(),
            fuel.into(),
            hp.into(),
            msrp.into(),
            drive.into(),
            "4".into(),
            seats.into(),
            trans.into(),
            tow.into(),
            "50".into(),
            "".into(),
        ]
    }

    fn stats() -> RangeStats {
        RangeStats {
            horsepower: Range::new(150.0, 600.0),
            price: Range::new(28_000.0, 90_000.0),
            tow: Range::new(1_000.0, 13_000.0),
            economy: Range::new(15.0, 57.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_title_skips_blank_tokens() {
        let cols = columns();
        let mut r = row("Sedan", "", "", "", "", "", "", "");
        assert_eq!(vehicle_title(&r, &cols), "Toyota Prius 2024 LE");
        r[3] = "".into();
        assert_eq!(vehicle_title(&r, &cols), "Toyota Prius 2024");
    }

    #[test]
    fn test_hybrid_sedan_is_family_and_economy() {
        let scorer = Scorer::new(columns(), stats());
        let scored = scorer.score_row(&row(
            "Sedan",
            "Hybrid",
            "196",
            "$28,000",
            "Front-Wheel Drive",
            "5",
            "Automatic",
            "",
        ));
        let top: Vec<Trait> = scored.scores.ranked().iter().take(2).map(|(t, _)| *t).collect();
        assert!(top.contains(&Trait::Family), "top two was {top:?}");
        assert!(top.contains(&Trait::Economy), "top two was {top:?}");
        assert_eq!(scored.top, "Economy + Family");
    }

    #[test]
    fn test_more_towing_never_lowers_utility() {
        let scorer = Scorer::new(columns(), stats());
        let low = scorer.score_row(&row("Pickup", "Gas", "400", "60000", "4WD", "5", "Automatic", "1000"));
        let high = scorer.score_row(&row("Pickup", "Gas", "400", "60000", "4WD", "5", "Automatic", "13000"));
        assert!(high.scores.utility >= low.scores.utility);
        assert!(high.scores.utility > low.scores.utility);
    }

    #[test]
    fn test_missing_columns_score_without_panicking() {
        let scorer = Scorer::new(VehicleColumns::default(), RangeStats::default());
        let scored = scorer.score_row(&[]);
        assert_eq!(scored.title, "");
        // Blank horsepower reads as 0 (modest band), blank price as budget,
        // and an unobserved length range as fully short.
        assert_eq!(scored.scores.economy, 40.0);
        assert_eq!(scored.scores.tech_eco, 5.0);
        assert_eq!(scored.scores.family, 0.0);
    }

    #[test]
    fn test_feature_lists_raise_premium() {
        let scorer = Scorer::new(columns(), stats());
        let plain = row("Sedan", "Gas", "200", "60000", "", "5", "", "");
        let mut loaded = plain.clone();
        loaded[14] = (0..60).map(|i| format!("Feature {i}")).collect::<Vec<_>>().join(", ").into();
        let a = scorer.score_row(&plain).scores;
        let b = scorer.score_row(&loaded).scores;
        assert_eq!(b.premium - a.premium, 20.0);
        assert!((b.tech_eco - a.tech_eco - 15.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_scores_stay_in_bounds(
            hp in prop::num::f64::ANY,
            msrp in prop::num::f64::ANY,
            tow in prop::num::f64::ANY,
            body in prop::sample::select(vec!["Sedan", "Coupe", "Van", "Pickup", "SUV", "Wagon", ""]),
            fuel in prop::sample::select(vec!["Electric", "Hybrid", "Diesel", ""]),
        ) {
            let scorer = Scorer::new(columns(), stats());
            let r = row(body, fuel, &hp.to_string(), &msrp.to_string(), "AWD", "2", "Manual", &tow.to_string());
            let scored = scorer.score_row(&r);
            for (_, v) in scored.scores.iter() {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_extreme_horsepower_is_clamped() {
        let scorer = Scorer::new(columns(), stats());
        let scored = scorer.score_row(&row(
            "Coupe",
            "Electric",
            "1000000",
            "90000",
            "Rear",
            "2",
            "Dual-clutch",
            "",
        ));
        for (_, v) in scored.scores.iter() {
            assert!((0.0..=100.0).contains(&v));
        }
        assert_eq!(scored.scores.sport, 100.0);
    }
}
