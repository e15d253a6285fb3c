use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{
    config::NetworkConfig,
    node::Node,
    segment::{synergy, Segment},
    update::NetworkUpdate,
};

/// Records considered by [`NetworkEffectEngine::emergence_potential`].
const EMERGENCE_WINDOW: usize = 10;
const SMOOTHING_WINDOW: usize = 3;

/// Breakdown of the value of a node set. `sarnoff` is reported alongside the
/// other laws but does not contribute to `total`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkValue {
    pub total: f64,
    pub metcalfe: f64,
    pub reeds: f64,
    pub sarnoff: f64,
    pub odlyzko: f64,
    pub synergy_bonus: f64,
    pub quality_multiplier: f64,
    pub diversity_bonus: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergenceLevel {
    High,
    Medium,
    #[default]
    Low,
}

impl EmergenceLevel {
    pub fn for_score(score: f64) -> Self {
        if score > 0.7 {
            EmergenceLevel::High
        } else if score > 0.4 {
            EmergenceLevel::Medium
        } else {
            EmergenceLevel::Low
        }
    }
}

impl fmt::Display for EmergenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EmergenceLevel::High => "High",
            EmergenceLevel::Medium => "Medium",
            EmergenceLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencePotential {
    pub score: f64,
    pub acceleration: f64,
    pub complexity: f64,
    pub diversity: f64,
    pub label: EmergenceLevel,
}

/// Stateless scoring over registry snapshots and round history.
#[derive(Clone, Debug, Default)]
pub struct NetworkEffectEngine {
    config: NetworkConfig,
}

impl NetworkEffectEngine {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn network_value<'a>(&self, nodes: impl IntoIterator<Item = &'a Node>) -> NetworkValue {
        let mut count = 0usize;
        let mut reputation_sum = 0.0;
        let mut per_segment: BTreeMap<Segment, usize> = BTreeMap::new();
        let mut capabilities: BTreeSet<&str> = BTreeSet::new();
        for node in nodes {
            count += 1;
            reputation_sum += node.reputation;
            *per_segment.entry(node.segment).or_default() += 1;
            capabilities.extend(node.capabilities.iter().map(String::as_str));
        }
        if count <= 1 {
            return NetworkValue::default();
        }

        let n = count as f64;
        let cfg = &self.config;
        let exponent = count.min(cfg.reeds_exponent_cap as usize) as i32;
        let metcalfe = cfg.metcalfe_k * n * (n - 1.0) / 2.0;
        let reeds = cfg.reeds_k * (2f64.powi(exponent) - n - 1.0).max(0.0);
        let sarnoff = cfg.sarnoff_k * n;
        let odlyzko = cfg.odlyzko_k * n * n.ln();

        let segments: Vec<(Segment, usize)> = per_segment.into_iter().collect();
        let mut synergy_bonus = 0.0;
        for (i, (a, count_a)) in segments.iter().enumerate() {
            for (b, count_b) in &segments[i + 1..] {
                synergy_bonus +=
                    synergy(*a, *b) * (*count_a as f64) * (*count_b as f64) * cfg.synergy_scale;
            }
        }

        let quality_multiplier = 0.5 + 0.5 * (reputation_sum / n);
        let diversity_bonus = cfg.diversity_weight * capabilities.len() as f64;
        let total =
            (metcalfe + reeds + odlyzko) * quality_multiplier + synergy_bonus + diversity_bonus;

        NetworkValue {
            total,
            metcalfe,
            reeds,
            sarnoff,
            odlyzko,
            synergy_bonus,
            quality_multiplier,
            diversity_bonus,
        }
    }

    /// Needs at least three records; fewer yields the all-zero `Low` result.
    pub fn emergence_potential(&self, history: &[NetworkUpdate]) -> EmergencePotential {
        if history.len() < 3 {
            return EmergencePotential::default();
        }
        let recent = &history[history.len().saturating_sub(EMERGENCE_WINDOW)..];
        let performance: Vec<f64> = recent
            .iter()
            .map(|update| update.validation.global_accuracy)
            .collect();
        let smoothed = trailing_mean(&performance, SMOOTHING_WINDOW);
        let acceleration = match smoothed.as_slice() {
            [.., a, b, c] => c - 2.0 * b + a,
            _ => 0.0,
        };

        let (complexity, diversity) = match recent.last() {
            Some(latest) => (
                latest.topology.node_count as f64 * latest.topology.connection_density,
                latest.topology.active_segments as f64 / Segment::ALL.len() as f64,
            ),
            None => (0.0, 0.0),
        };

        let score = 0.4 * acceleration.max(0.0)
            + 0.3 * (complexity / 100.0).min(1.0)
            + 0.3 * diversity;
        EmergencePotential {
            score,
            acceleration,
            complexity,
            diversity,
            label: EmergenceLevel::for_score(score),
        }
    }
}

fn trailing_mean(series: &[f64], window: usize) -> Vec<f64> {
    (0..series.len())
        .map(|end| {
            let start = (end + 1).saturating_sub(window);
            let slice = &series[start..=end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
