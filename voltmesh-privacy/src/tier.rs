use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::PrivacyError;

/// Graduated protection levels, weakest first. The derived ordering is used
/// when an agreement demands a minimum tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivacyTier {
    Public,
    Aggregated,
    Differential,
    Homomorphic,
    SecureMpc,
}

impl PrivacyTier {
    pub const ALL: [PrivacyTier; 5] = [
        PrivacyTier::Public,
        PrivacyTier::Aggregated,
        PrivacyTier::Differential,
        PrivacyTier::Homomorphic,
        PrivacyTier::SecureMpc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyTier::Public => "public",
            PrivacyTier::Aggregated => "aggregated",
            PrivacyTier::Differential => "differential",
            PrivacyTier::Homomorphic => "homomorphic",
            PrivacyTier::SecureMpc => "secure-mpc",
        }
    }
}

impl fmt::Display for PrivacyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyTier {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        PrivacyTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
            .ok_or_else(|| PrivacyError::UnknownTier(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("secure_mpc".parse::<PrivacyTier>().unwrap(), PrivacyTier::SecureMpc);
        assert_eq!(" Differential ".parse::<PrivacyTier>().unwrap(), PrivacyTier::Differential);
        assert!(matches!(
            "quantum".parse::<PrivacyTier>(),
            Err(PrivacyError::UnknownTier(_))
        ));
    }

    #[test]
    fn tiers_are_ordered_by_strength() {
        assert!(PrivacyTier::Public < PrivacyTier::Aggregated);
        assert!(PrivacyTier::Homomorphic < PrivacyTier::SecureMpc);
    }
}
