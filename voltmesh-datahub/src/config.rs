use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct HubConfig {
    /// Pairs must score strictly above this to exchange packets.
    pub collaboration_threshold: f64,
    /// Multiplies `ln(n + 1)` in the collaboration score.
    pub network_bonus: f64,
    pub recipient_weight: f64,
    pub collaboration_weight: f64,
    pub network_weight: f64,
    /// Pairs above this are listed as strong in analytics.
    pub strong_pair_threshold: f64,
    pub default_purpose: String,
    /// Seed for privacy-transform randomness; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            collaboration_threshold: 0.3,
            network_bonus: 0.05,
            recipient_weight: 0.1,
            collaboration_weight: 0.15,
            network_weight: 0.05,
            strong_pair_threshold: 0.7,
            default_purpose: "analysis".to_owned(),
            seed: None,
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> HubResult<()> {
        if !(0.0..=1.0).contains(&self.collaboration_threshold) {
            return Err(HubError::InvalidConfig(
                "collaboration-threshold must be within [0, 1]".into(),
            ));
        }
        if self.network_bonus < 0.0 {
            return Err(HubError::InvalidConfig("network-bonus must be >= 0".into()));
        }
        if self.default_purpose.trim().is_empty() {
            return Err(HubError::InvalidConfig("default-purpose must not be empty".into()));
        }
        Ok(())
    }
}
