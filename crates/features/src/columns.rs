//! Dataset column names and their resolved positions.

use crate::header::HeaderIndex;

pub const MAKE: &str = "make";
pub const MODEL: &str = "model";
pub const YEAR: &str = "year";
pub const TRIM: &str = "trim";
pub const BODY_TYPE: &str = "body type";
pub const FUEL_TYPE: &str = "fuel type";
pub const HORSEPOWER: &str = "horsepower (hp)";
pub const BASE_MSRP: &str = "base msrp";
pub const DRIVE_TYPE: &str = "drive type";
pub const DOORS: &str = "doors";
pub const SEATING: &str = "total seating";
pub const CARGO: &str = "cargo capacity (cu ft)";
pub const TOWING: &str = "maximum towing capacity (lbs)";
pub const LENGTH: &str = "length (in)";
pub const WHEELBASE: &str = "wheelbase (in)";
pub const MPG_COMBINED: &str = "epa combined mpg";
pub const MPG_CITY_HIGHWAY: &str = "epa city/highway mpg";
pub const TRANSMISSION: &str = "transmission";
pub const TORQUE: &str = "torque (ft-lbs)";

/// Free-text columns whose list entries count toward the feature score.
pub const FEATURE_LISTS: [&str; 5] = [
    "safety features",
    "packages",
    "exterior options",
    "interior options",
    "mechanical options",
];

/// Positions of every column the scorer reads. `None` means the sheet lacks it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleColumns {
    pub make: Option<usize>,
    pub model: Option<usize>,
    pub year: Option<usize>,
    pub trim: Option<usize>,
    pub body: Option<usize>,
    pub fuel: Option<usize>,
    pub horsepower: Option<usize>,
    pub msrp: Option<usize>,
    pub drive: Option<usize>,
    pub doors: Option<usize>,
    pub seats: Option<usize>,
    pub cargo: Option<usize>,
    pub tow: Option<usize>,
    pub length: Option<usize>,
    pub wheelbase: Option<usize>,
    pub mpg_combined: Option<usize>,
    pub mpg_city_highway: Option<usize>,
    pub transmission: Option<usize>,
    pub torque: Option<usize>,
    /// Only feature columns present in the sheet
    pub feature_lists: Vec<usize>,
}

impl VehicleColumns {
    pub fn resolve(index: &HeaderIndex) -> Self {
        Self {
            make: index.position(MAKE),
            model: index.position(MODEL),
            year: index.position(YEAR),
            trim: index.position(TRIM),
            body: index.position(BODY_TYPE),
            fuel: index.position(FUEL_TYPE),
            horsepower: index.position(HORSEPOWER),
            msrp: index.position(BASE_MSRP),
            drive: index.position(DRIVE_TYPE),
            doors: index.position(DOORS),
            seats: index.position(SEATING),
            cargo: index.position(CARGO),
            tow: index.position(TOWING),
            length: index.position(LENGTH),
            wheelbase: index.position(WHEELBASE),
            mpg_combined: index.position(MPG_COMBINED),
            mpg_city_highway: index.position(MPG_CITY_HIGHWAY),
            transmission: index.position(TRANSMISSION),
            torque: index.position(TORQUE),
            feature_lists: FEATURE_LISTS
                .iter()
                .filter_map(|name| index.position(name))
                .collect(),
        }
    }
}
