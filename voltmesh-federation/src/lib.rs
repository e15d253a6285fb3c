//! Federated coordination and network-effect engine.
//!
//! A [`FederatedCoordinator`] owns a [`NodeRegistry`] of participants grouped
//! by industry [`Segment`], creates learning tasks scoped to segments, and
//! executes discrete rounds: simulate per-node local updates, aggregate them
//! with a selectable strategy, apply the result to every participant, and
//! append a [`NetworkUpdate`] to the audit history. The
//! [`NetworkEffectEngine`] scores the value of the node set and the
//! emergence potential of the history. Training and topology discovery are
//! simulated with seeded formulas.

pub mod aggregation;
pub mod analytics;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod network_effect;
pub mod node;
pub mod orchestrator;
pub mod registry;
pub mod segment;
pub mod simulation;
pub mod task;
pub mod tensor;
pub mod update;

pub use aggregation::{
    aggregator_for, AdaptivePolicy, AggregationKind, AggregationStrategy, Aggregator,
    Contribution,
};
pub use analytics::{Distribution, EcosystemAnalytics};
pub use api::ApiResponse;
pub use config::{FederationConfig, LearningConfig, NetworkConfig, RegistryConfig};
pub use coordinator::FederatedCoordinator;
pub use error::{FederationError, FederationResult};
pub use network_effect::{EmergenceLevel, EmergencePotential, NetworkEffectEngine, NetworkValue};
pub use node::{Node, NodeId};
pub use orchestrator::{LearningNetworkOrchestrator, NetworkReport, RoundReport, TaskCreated};
pub use registry::{
    ConnectionPolicy, NodeRegistry, RegistrationResult, SeededConnections, ThresholdConnections,
};
pub use segment::{synergy, LearningMode, Segment};
pub use simulation::{LocalUpdate, SeedPolicy};
pub use task::{ConvergenceCriteria, ConvergenceStatus, LearningTask, TaskId, TaskSpec};
pub use tensor::{ParameterBundle, Tensor};
pub use update::{NetworkUpdate, TopologySnapshot, UpdateId, ValidationResults};
