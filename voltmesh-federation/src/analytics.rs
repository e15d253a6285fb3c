use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{node::Node, registry::topology_of, segment::Segment, update::NetworkUpdate};

/// Length of `recent_effect_trend`.
pub const TREND_WINDOW: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl Distribution {
    /// Population statistics; all zero for an empty slice.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyAnalytics {
    pub total_nodes: usize,
    pub total_connections: usize,
    pub connection_density: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalytics {
    pub per_segment_accuracy: BTreeMap<Segment, f64>,
    pub overall_avg: f64,
    pub variance: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningAnalytics {
    pub active_tasks: usize,
    pub completed_rounds: usize,
    /// Network-effect scores of the most recent rounds, oldest first.
    pub recent_effect_trend: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthAnalytics {
    pub reputation_distribution: Distribution,
    pub contribution_distribution: Distribution,
    /// `1 / (1 + stddev(recent_effect_trend))`.
    pub stability: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EcosystemAnalytics {
    pub topology: TopologyAnalytics,
    pub performance: PerformanceAnalytics,
    pub learning: LearningAnalytics,
    pub health: HealthAnalytics,
}

impl EcosystemAnalytics {
    pub fn compute(nodes: &[Node], active_tasks: usize, history: &[NetworkUpdate]) -> Self {
        let topology = topology_of(nodes);

        let mut by_segment: BTreeMap<Segment, Vec<f64>> = BTreeMap::new();
        for node in nodes {
            by_segment.entry(node.segment).or_default().push(node.accuracy());
        }
        let per_segment_accuracy = by_segment
            .into_iter()
            .map(|(segment, values)| (segment, Distribution::from_values(&values).mean))
            .collect();
        let accuracies: Vec<f64> = nodes.iter().map(Node::accuracy).collect();
        let accuracy = Distribution::from_values(&accuracies);

        let recent_effect_trend: Vec<f64> = history
            [history.len().saturating_sub(TREND_WINDOW)..]
            .iter()
            .map(|update| update.network_effect_score)
            .collect();
        let trend = Distribution::from_values(&recent_effect_trend);

        let reputations: Vec<f64> = nodes.iter().map(|n| n.reputation).collect();
        let contributions: Vec<f64> = nodes.iter().map(|n| n.contribution_score).collect();

        Self {
            topology: TopologyAnalytics {
                total_nodes: topology.node_count,
                total_connections: topology.connection_count,
                connection_density: topology.connection_density,
            },
            performance: PerformanceAnalytics {
                per_segment_accuracy,
                overall_avg: accuracy.mean,
                variance: accuracy.std_dev.powi(2),
            },
            learning: LearningAnalytics {
                active_tasks,
                completed_rounds: history.len(),
                recent_effect_trend,
            },
            health: HealthAnalytics {
                reputation_distribution: Distribution::from_values(&reputations),
                contribution_distribution: Distribution::from_values(&contributions),
                stability: 1.0 / (1.0 + trend.std_dev),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_summary() {
        let d = Distribution::from_values(&[1.0, 3.0]);
        assert_eq!(d, Distribution { min: 1.0, max: 3.0, mean: 2.0, std_dev: 1.0 });
        assert_eq!(Distribution::from_values(&[]), Distribution::default());
    }

    #[test]
    fn empty_ecosystem_is_stable() {
        let analytics = EcosystemAnalytics::compute(&[], 0, &[]);
        assert_eq!(analytics.health.stability, 1.0);
        assert_eq!(analytics.topology.total_nodes, 0);
        assert!(analytics.learning.recent_effect_trend.is_empty());
    }
}
