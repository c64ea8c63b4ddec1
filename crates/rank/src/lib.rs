//! Trait scoring and compatibility ranking for vehicles.
//!
//! Takes rows from a loaded dataset, scores each on the six trait axes and
//! orders them by how well they match the user's trait weights.

pub mod rules;
pub mod scorer;

pub use rules::TraitRule;
pub use scorer::{vehicle_title, Scorer, MAX_FEATURES};

use carcupid_model::{CompatibilityResult, ScoredVehicle, Trait, TraitScores, WeightVector};

/// Weighted match of `scores` against `weights`, in [0, 1].
///
/// Weights are normalized to sum to one first; all-zero weights match
/// nothing.
pub fn compatibility(scores: &TraitScores, weights: &WeightVector) -> f64 {
    let normalized = weights.normalized();
    weighted(scores, &normalized)
}

fn weighted(scores: &TraitScores, normalized: &WeightVector) -> f64 {
    Trait::ALL
        .iter()
        .map(|&t| normalized.get(t) * scores.get(t))
        .sum::<f64>()
        / 100.0
}

/// Rank scored vehicles by compatibility, best first.
///
/// The sort is stable: equal matches keep their input order.
pub fn rank(scored: Vec<ScoredVehicle>, weights: &WeightVector) -> Vec<CompatibilityResult> {
    let normalized = weights.normalized();

    let mut results: Vec<CompatibilityResult> = scored
        .into_iter()
        .map(|vehicle| CompatibilityResult {
            compatibility: weighted(&vehicle.scores, &normalized),
            title: vehicle.title,
            scores: vehicle.scores,
            top: vehicle.top,
        })
        .collect();

    results.sort_by(|a, b| {
        b.compatibility
            .partial_cmp(&a.compatibility)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::debug!(vehicles = results.len(), "Ranked vehicles");

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn vehicle(title: &str, family: f64, sport: f64) -> ScoredVehicle {
        ScoredVehicle {
            title: title.to_string(),
            scores: TraitScores {
                family,
                sport,
                ..Default::default()
            },
            top: String::new(),
        }
    }

    #[test]
    fn test_rank_orders_by_compatibility() {
        let weights = WeightVector::zero().with(Trait::Sport, 1.0);
        let ranked = rank(
            vec![vehicle("van", 90.0, 0.0), vehicle("coupe", 10.0, 80.0)],
            &weights,
        );
        let titles: Vec<_> = ranked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["coupe", "van"]);
        assert!((ranked[0].compatibility - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank(
            vec![vehicle("a", 50.0, 0.0), vehicle("b", 50.0, 0.0), vehicle("c", 50.0, 0.0)],
            &WeightVector::default(),
        );
        let titles: Vec<_> = ranked.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_weights_match_nothing() {
        let ranked = rank(vec![vehicle("a", 100.0, 100.0)], &WeightVector::zero());
        assert_eq!(ranked[0].compatibility, 0.0);
    }

    #[test]
    fn test_default_weights() {
        let scores = TraitScores {
            family: 100.0,
            economy: 50.0,
            tech_eco: 0.0,
            ..Default::default()
        };
        // 0.4 * 100 + 0.3 * 50 = 55
        assert!((compatibility(&scores, &WeightVector::default()) - 0.55).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_scaling_weights_is_invariant(
            w in prop::array::uniform6(0.0f64..=1.0),
            s in prop::array::uniform6(0.0f64..=100.0),
            k in 0.01f64..=1.0,
        ) {
            let scores = TraitScores {
                family: s[0], sport: s[1], economy: s[2], premium: s[3], utility: s[4], tech_eco: s[5],
            };
            let weights = WeightVector {
                family: w[0], sport: w[1], economy: w[2], premium: w[3], utility: w[4], tech_eco: w[5],
            };
            let scaled = WeightVector {
                family: w[0] * k, sport: w[1] * k, economy: w[2] * k,
                premium: w[3] * k, utility: w[4] * k, tech_eco: w[5] * k,
            };
            let a = compatibility(&scores, &weights);
            let b = compatibility(&scores, &scaled);
            prop_assert!((a - b).abs() < 1e-9);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&a));
        }
    }
}
