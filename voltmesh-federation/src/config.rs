use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    aggregation::{AdaptivePolicy, AggregationStrategy},
    error::{FederationError, FederationResult},
    simulation::SeedPolicy,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FederationConfig {
    pub network: NetworkConfig,
    pub registry: RegistryConfig,
    pub learning: LearningConfig,
}

impl FederationConfig {
    pub fn seeded(seed: u64) -> Self {
        let mut config = Self::default();
        config.registry.seed = Some(seed);
        config
    }

    pub fn validate(&self) -> FederationResult<()> {
        let invalid = |reason: &str| Err(FederationError::InvalidConfig(reason.to_owned()));
        let network = &self.network;
        let constants = [
            network.metcalfe_k,
            network.reeds_k,
            network.sarnoff_k,
            network.odlyzko_k,
            network.synergy_scale,
            network.diversity_weight,
        ];
        if constants.iter().any(|k| !(k.is_finite() && *k >= 0.0)) {
            return invalid("network-value constants must be finite and >= 0");
        }
        if self.network.reeds_exponent_cap == 0 || self.network.reeds_exponent_cap > 62 {
            return invalid("reeds-exponent-cap must be within 1..=62");
        }
        if self.registry.tensor_shapes.is_empty() {
            return invalid("at least one tensor shape is required");
        }
        if self
            .registry
            .tensor_shapes
            .values()
            .any(|shape| shape.is_empty() || shape.contains(&0))
        {
            return invalid("tensor shapes must be non-empty with positive dimensions");
        }
        let connection_max = self.registry.connection_base + self.registry.connection_synergy_weight;
        if self.registry.connection_base < 0.0 || connection_max > 1.0 {
            return invalid("connection probability must stay within [0, 1]");
        }
        if !(self.registry.initial_weight_std >= 0.0 && self.learning.delta_std >= 0.0) {
            return invalid("standard deviations must be >= 0");
        }
        if !(self.learning.learning_rate > 0.0 && self.learning.learning_rate.is_finite()) {
            return invalid("learning-rate must be positive");
        }
        if self.learning.reputation_step < 0.0 {
            return invalid("reputation-step must be >= 0");
        }
        if self.learning.max_nodes_per_round == Some(0) {
            return invalid("max-nodes-per-round must be positive when set");
        }
        Ok(())
    }
}

/// Constants of the network-value laws.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct NetworkConfig {
    pub metcalfe_k: f64,
    pub reeds_k: f64,
    pub sarnoff_k: f64,
    pub odlyzko_k: f64,
    /// Reed's law uses `2^min(n, cap)` so large networks do not overflow.
    pub reeds_exponent_cap: u32,
    pub synergy_scale: f64,
    pub diversity_weight: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            metcalfe_k: 2.0,
            reeds_k: 1.5,
            sarnoff_k: 0.8,
            odlyzko_k: 1.2,
            reeds_exponent_cap: 20,
            synergy_scale: 0.1,
            diversity_weight: 0.05,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct RegistryConfig {
    pub connection_base: f64,
    pub connection_synergy_weight: f64,
    /// Seed for connection formation; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub tensor_shapes: BTreeMap<String, Vec<usize>>,
    pub initial_weight_std: f64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            connection_base: 0.3,
            connection_synergy_weight: 0.4,
            seed: None,
            tensor_shapes: BTreeMap::from([
                ("encoder".to_owned(), vec![16, 8]),
                ("attention".to_owned(), vec![8, 8]),
                ("head".to_owned(), vec![8, 4]),
            ]),
            initial_weight_std: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct LearningConfig {
    pub base_improvement: f64,
    pub connection_bonus: f64,
    pub reputation_bonus: f64,
    pub learning_rate: f64,
    pub delta_std: f64,
    pub accuracy_gain: f64,
    /// Rounds whose network effect exceeds this raise participant reputation.
    pub reputation_threshold: f64,
    pub reputation_step: f64,
    pub adaptive: AdaptivePolicy,
    pub variance_damping: f64,
    pub default_strategy: AggregationStrategy,
    pub seed_policy: SeedPolicy,
    pub max_nodes_per_round: Option<usize>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            base_improvement: 0.02,
            connection_bonus: 0.002,
            reputation_bonus: 0.05,
            learning_rate: 0.01,
            delta_std: 0.01,
            accuracy_gain: 0.02,
            reputation_threshold: 0.1,
            reputation_step: 0.01,
            adaptive: AdaptivePolicy::default(),
            variance_damping: 0.1,
            default_strategy: AggregationStrategy::Adaptive,
            seed_policy: SeedPolicy::NodeDerived,
            max_nodes_per_round: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        FederationConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_dimension_shapes() {
        let mut config = FederationConfig::default();
        config
            .registry
            .tensor_shapes
            .insert("broken".into(), vec![4, 0]);
        assert!(matches!(
            config.validate(),
            Err(FederationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_negative_or_non_finite_network_constants() {
        for broken in [
            NetworkConfig {
                metcalfe_k: -10.0,
                ..NetworkConfig::default()
            },
            NetworkConfig {
                synergy_scale: f64::NAN,
                ..NetworkConfig::default()
            },
            NetworkConfig {
                odlyzko_k: f64::INFINITY,
                ..NetworkConfig::default()
            },
        ] {
            let config = FederationConfig {
                network: broken,
                ..FederationConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(FederationError::InvalidConfig(_))
            ));
        }

        let mut config = FederationConfig::default();
        config.learning.learning_rate = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let config: FederationConfig =
            serde_json::from_str(r#"{"learning": {"learning-rate": 0.05}}"#).unwrap();
        assert_eq!(config.learning.learning_rate, 0.05);
        assert_eq!(config.learning.reputation_step, 0.01);
        assert_eq!(config.network.metcalfe_k, 2.0);
    }
}
