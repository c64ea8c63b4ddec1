//! Categorical classification of vehicle attributes.
//!
//! Each free-text attribute is classified into exactly one variant (or none).
//! Matching is case-insensitive substring containment, and the first variant
//! in `RULES` order wins, so "minivan" is a `Van` and never double-counts.

/// A text-classified vehicle attribute.
pub trait Category: Sized + Copy + 'static {
    /// Variants and the substrings that select them, in priority order.
    const RULES: &'static [(Self, &'static [&'static str])];

    fn classify(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        Self::RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
            .map(|(variant, _)| *variant)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    Sedan,
    Coupe,
    Hatchback,
    Suv,
    Pickup,
    Van,
    Wagon,
}

impl Category for BodyType {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (Self::Sedan, &["sedan"]),
        (Self::Coupe, &["coupe", "convertible"]),
        (Self::Hatchback, &["hatch"]),
        (Self::Suv, &["suv", "crossover"]),
        (Self::Pickup, &["pickup", "truck"]),
        (Self::Van, &["minivan", "van"]),
        (Self::Wagon, &["wagon"]),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuelType {
    Electric,
    PlugIn,
    Hybrid,
    Diesel,
}

impl Category for FuelType {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (Self::Electric, &["electric"]),
        (Self::PlugIn, &["plug-in"]),
        (Self::Hybrid, &["hybrid"]),
        (Self::Diesel, &["diesel"]),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveType {
    Front,
    Rear,
    AllWheel,
}

impl Category for DriveType {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (Self::Front, &["front"]),
        (Self::Rear, &["rear"]),
        (Self::AllWheel, &["all", "awd", "4wd", "4x4"]),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transmission {
    Manual,
    DualClutch,
    Cvt,
    Automatic,
}

impl Category for Transmission {
    const RULES: &'static [(Self, &'static [&'static str])] = &[
        (Self::Manual, &["manual"]),
        (Self::DualClutch, &["dual", "dct"]),
        (Self::Cvt, &["cvt"]),
        (Self::Automatic, &["automatic"]),
    ];
}

/// Horsepower buckets: [0,150), [150,250), [250,400), [400,∞).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorsepowerBand {
    Modest,
    Moderate,
    Strong,
    Performance,
}

impl HorsepowerBand {
    /// Negative values fall in no band.
    pub fn from_hp(hp: f64) -> Option<Self> {
        if hp >= 400.0 {
            Some(Self::Performance)
        } else if hp >= 250.0 {
            Some(Self::Strong)
        } else if hp >= 150.0 {
            Some(Self::Moderate)
        } else if hp >= 0.0 {
            Some(Self::Modest)
        } else {
            None
        }
    }
}

/// Price position within the dataset, from the normalized MSRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceBand {
    Budget,
    Mainstream,
    Upscale,
    Luxury,
}

impl PriceBand {
    pub fn from_norm(p: f64) -> Self {
        if p <= 0.25 {
            Self::Budget
        } else if p <= 0.5 {
            Self::Mainstream
        } else if p <= 0.85 {
            Self::Upscale
        } else {
            Self::Luxury
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorCount {
    Two,
    Four,
    FivePlus,
}

impl DoorCount {
    pub fn from_count(count: Option<f64>) -> Option<Self> {
        match count? {
            n if n == 2.0 => Some(Self::Two),
            n if n == 4.0 => Some(Self::Four),
            n if n >= 5.0 => Some(Self::FivePlus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeatCount {
    Two,
    Four,
    Five,
    SixPlus,
}

impl SeatCount {
    pub fn from_count(count: Option<f64>) -> Option<Self> {
        match count? {
            n if n == 2.0 => Some(Self::Two),
            n if n == 4.0 => Some(Self::Four),
            n if n == 5.0 => Some(Self::Five),
            n if n >= 6.0 => Some(Self::SixPlus),
            _ => None,
        }
    }
}
