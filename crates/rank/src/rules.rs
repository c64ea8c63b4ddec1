//! Fixed trait deltas for each categorical variant.

use carcupid_features::{
    BodyType, DoorCount, DriveType, FuelType, HorsepowerBand, PriceBand, SeatCount, Transmission,
};
use carcupid_model::Trait::{self, Economy, Family, Premium, Sport, TechEco, Utility};

/// A classified attribute that contributes fixed amounts to trait scores.
pub trait TraitRule {
    fn deltas(&self) -> &'static [(Trait, f64)];
}

impl TraitRule for BodyType {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Sedan => &[(Family, 15.0), (Economy, 10.0), (Premium, 5.0)],
            Self::Coupe => &[(Sport, 25.0), (Premium, 10.0), (Family, -10.0)],
            Self::Hatchback => &[(Economy, 20.0), (Family, 10.0)],
            Self::Suv => &[(Family, 25.0), (Utility, 10.0), (Premium, 5.0)],
            Self::Pickup => &[(Utility, 30.0), (Family, -10.0), (Sport, 5.0)],
            Self::Van => &[(Family, 30.0), (Utility, 15.0), (Sport, -20.0)],
            Self::Wagon => &[(Family, 20.0), (Economy, 10.0)],
        }
    }
}

impl TraitRule for FuelType {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Electric => &[(TechEco, 40.0), (Economy, 20.0), (Premium, 10.0)],
            Self::PlugIn => &[(TechEco, 35.0), (Economy, 15.0)],
            Self::Hybrid => &[(TechEco, 25.0), (Economy, 20.0)],
            Self::Diesel => &[(Utility, 10.0), (Economy, 10.0)],
        }
    }
}

impl TraitRule for DriveType {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Front => &[(Economy, 10.0), (Family, 5.0)],
            Self::Rear => &[(Sport, 15.0), (Premium, 5.0)],
            Self::AllWheel => &[(Utility, 15.0), (Family, 10.0), (Sport, 5.0)],
        }
    }
}

impl TraitRule for Transmission {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Manual => &[(Sport, 15.0), (Economy, 5.0)],
            Self::DualClutch => &[(Sport, 20.0), (Premium, 5.0)],
            Self::Cvt => &[(Economy, 10.0), (Sport, -5.0)],
            Self::Automatic => &[(Family, 5.0), (Premium, 5.0)],
        }
    }
}

impl TraitRule for HorsepowerBand {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Modest => &[(Economy, 15.0)],
            Self::Moderate => &[(Sport, 10.0)],
            Self::Strong => &[(Sport, 25.0), (Premium, 10.0)],
            Self::Performance => &[(Sport, 40.0), (Premium, 15.0), (Economy, -10.0)],
        }
    }
}

impl TraitRule for PriceBand {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Budget => &[(Economy, 15.0)],
            Self::Mainstream => &[(Economy, 5.0), (Premium, 10.0)],
            Self::Upscale => &[(Premium, 25.0), (TechEco, 5.0)],
            Self::Luxury => &[(Premium, 40.0), (TechEco, 10.0), (Economy, -10.0)],
        }
    }
}

impl TraitRule for DoorCount {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Two => &[(Sport, 10.0), (Family, -10.0)],
            Self::Four => &[(Family, 10.0), (Economy, 5.0)],
            Self::FivePlus => &[(Family, 15.0), (Utility, 5.0)],
        }
    }
}

impl TraitRule for SeatCount {
    fn deltas(&self) -> &'static [(Trait, f64)] {
        match self {
            Self::Two => &[(Sport, 10.0), (Family, -20.0)],
            Self::Four => &[(Sport, 5.0)],
            Self::Five => &[(Family, 15.0), (Economy, 5.0)],
            Self::SixPlus => &[(Family, 30.0), (Utility, 10.0)],
        }
    }
}
