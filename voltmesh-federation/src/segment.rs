use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::FederationError;

/// Synergy assumed for any pair not listed in [`SYNERGY_PAIRS`], including a
/// segment paired with itself.
pub const DEFAULT_SYNERGY: f64 = 0.40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Segment {
    EnergyGrid,
    Transportation,
    SmartCity,
    FleetLogistics,
    Manufacturing,
    BatteryStorage,
    Retail,
    Telecommunications,
    Insurance,
    Healthcare,
}

impl Segment {
    pub const ALL: [Segment; 10] = [
        Segment::EnergyGrid,
        Segment::Transportation,
        Segment::SmartCity,
        Segment::FleetLogistics,
        Segment::Manufacturing,
        Segment::BatteryStorage,
        Segment::Retail,
        Segment::Telecommunications,
        Segment::Insurance,
        Segment::Healthcare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::EnergyGrid => "energy-grid",
            Segment::Transportation => "transportation",
            Segment::SmartCity => "smart-city",
            Segment::FleetLogistics => "fleet-logistics",
            Segment::Manufacturing => "manufacturing",
            Segment::BatteryStorage => "battery-storage",
            Segment::Retail => "retail",
            Segment::Telecommunications => "telecommunications",
            Segment::Insurance => "insurance",
            Segment::Healthcare => "healthcare",
        }
    }

    /// Multiplier on the base local-improvement rate.
    pub fn improvement_multiplier(&self) -> f64 {
        match self {
            Segment::EnergyGrid => 1.20,
            Segment::Transportation | Segment::BatteryStorage => 1.15,
            Segment::SmartCity | Segment::FleetLogistics => 1.10,
            Segment::Manufacturing => 1.05,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Segment::ALL
            .into_iter()
            .find(|segment| segment.as_str() == normalized)
            .ok_or_else(|| FederationError::UnknownSegment(s.to_owned()))
    }
}

/// Curated high-synergy pairs. Lookups are symmetric.
pub const SYNERGY_PAIRS: [(Segment, Segment, f64); 14] = [
    (Segment::EnergyGrid, Segment::Transportation, 0.90),
    (Segment::EnergyGrid, Segment::BatteryStorage, 0.95),
    (Segment::EnergyGrid, Segment::SmartCity, 0.85),
    (Segment::Transportation, Segment::FleetLogistics, 0.90),
    (Segment::Transportation, Segment::SmartCity, 0.80),
    (Segment::BatteryStorage, Segment::Transportation, 0.85),
    (Segment::FleetLogistics, Segment::Retail, 0.75),
    (Segment::Manufacturing, Segment::BatteryStorage, 0.80),
    (Segment::Manufacturing, Segment::FleetLogistics, 0.70),
    (Segment::SmartCity, Segment::Telecommunications, 0.80),
    (Segment::Insurance, Segment::Transportation, 0.75),
    (Segment::Insurance, Segment::FleetLogistics, 0.70),
    (Segment::Telecommunications, Segment::EnergyGrid, 0.70),
    (Segment::Healthcare, Segment::SmartCity, 0.70),
];

pub fn synergy(a: Segment, b: Segment) -> f64 {
    SYNERGY_PAIRS
        .iter()
        .find(|(x, y, _)| (*x == a && *y == b) || (*x == b && *y == a))
        .map(|(_, _, score)| *score)
        .unwrap_or(DEFAULT_SYNERGY)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningMode {
    Federated,
    Transfer,
    Continual,
    MetaLearning,
    Reinforcement,
    Collaborative,
}

impl LearningMode {
    pub const ALL: [LearningMode; 6] = [
        LearningMode::Federated,
        LearningMode::Transfer,
        LearningMode::Continual,
        LearningMode::MetaLearning,
        LearningMode::Reinforcement,
        LearningMode::Collaborative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LearningMode::Federated => "federated",
            LearningMode::Transfer => "transfer",
            LearningMode::Continual => "continual",
            LearningMode::MetaLearning => "meta-learning",
            LearningMode::Reinforcement => "reinforcement",
            LearningMode::Collaborative => "collaborative",
        }
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningMode {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        LearningMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| FederationError::UnknownMode(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synergy_is_symmetric() {
        for a in Segment::ALL {
            for b in Segment::ALL {
                assert_eq!(synergy(a, b), synergy(b, a));
            }
        }
        assert_eq!(synergy(Segment::Transportation, Segment::EnergyGrid), 0.90);
        assert_eq!(synergy(Segment::Retail, Segment::Healthcare), DEFAULT_SYNERGY);
        assert_eq!(synergy(Segment::EnergyGrid, Segment::EnergyGrid), DEFAULT_SYNERGY);
    }

    #[test]
    fn synergy_pairs_are_unique() {
        for (i, (a, b, _)) in SYNERGY_PAIRS.iter().enumerate() {
            assert_ne!(a, b);
            for (c, d, _) in SYNERGY_PAIRS.iter().skip(i + 1) {
                assert!(!((a == c && b == d) || (a == d && b == c)));
            }
        }
    }

    #[test]
    fn parses_segments_and_modes() {
        assert_eq!("energy_grid".parse::<Segment>().unwrap(), Segment::EnergyGrid);
        assert_eq!("Meta-Learning".parse::<LearningMode>().unwrap(), LearningMode::MetaLearning);
        assert!(matches!(
            "aerospace".parse::<Segment>(),
            Err(FederationError::UnknownSegment(_))
        ));
        assert!(matches!(
            "unsupervised".parse::<LearningMode>(),
            Err(FederationError::UnknownMode(_))
        ));
    }
}
