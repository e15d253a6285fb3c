use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};
use voltmesh_datahub::{
    AccessFilters, CrossSegmentDataHub, DataHubOrchestrator, DataSchema, HubAnalytics, HubError,
    ParticipantRegistered, ShareOutcome, ShareRequest,
};
use voltmesh_federation::{
    ApiResponse, ConvergenceStatus, EcosystemAnalytics, FederatedCoordinator, FederationError,
    LearningMode, LearningNetworkOrchestrator, NetworkReport, RegistrationResult, RoundReport,
    Segment, TaskCreated, TaskSpec,
};
use voltmesh_privacy::{PrivacyEngine, PrivacyError, PrivacyTier};
use voltmesh_telemetry::{TelemetryError, TelemetryHandle};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Federation(#[from] FederationError),
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Privacy(#[from] PrivacyError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// `(id, segment, capabilities, learning modes)` of the demo fleet.
const FLEET: [(&str, &str, &[&str], &[&str]); 8] = [
    ("grid-operator-north", "energy-grid", &["load-forecasting", "v2g"], &["federated", "transfer"]),
    ("metro-bus-depot", "transportation", &["route-planning", "fast-charging"], &["federated"]),
    ("battery-hub-east", "battery-storage", &["degradation-modelling", "v2g"], &["federated", "transfer"]),
    ("smart-city-lab", "smart-city", &["traffic-sensing"], &["federated", "collaborative"]),
    ("last-mile-vans", "fleet-logistics", &["route-planning", "telematics"], &["federated"]),
    ("mall-chargers", "retail", &["occupancy"], &["collaborative"]),
    ("edge-telco", "telecommunications", &["edge-compute"], &["federated"]),
    ("mobility-insurer", "insurance", &["risk-scoring"], &["transfer"]),
];

/// `(id, segment, capabilities, preferred tier)` of the demo hub participants.
const HUB_PARTICIPANTS: [(&str, &str, &[&str], &str); 4] = [
    ("utility-grid", "energy-grid", &["load-curves"], "differential"),
    ("fleet-operator", "transportation", &["charging-sessions"], "aggregated"),
    ("retail-network", "retail", &["site-occupancy"], "public"),
    ("insurer", "insurance", &["claims"], "homomorphic"),
];

#[derive(Clone, Debug, Serialize)]
pub struct TaskRun {
    pub task: TaskCreated,
    pub rounds: Vec<ApiResponse<RoundReport>>,
    pub convergence: ConvergenceStatus,
}

#[derive(Clone, Debug, Serialize)]
pub struct LearningDemoReport {
    pub registrations: Vec<RegistrationResult>,
    pub tasks: Vec<TaskRun>,
    pub analytics: EcosystemAnalytics,
    pub network: NetworkReport,
    pub counters: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccessSummary {
    pub requestor: String,
    pub packets: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct HubDemoReport {
    pub registrations: Vec<ParticipantRegistered>,
    pub shares: Vec<ApiResponse<ShareOutcome>>,
    pub accesses: Vec<AccessSummary>,
    pub analytics: HubAnalytics,
    pub counters: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DemoReport {
    pub learning: LearningDemoReport,
    pub hub: HubDemoReport,
}

/// Runs the learning-network and data-hub flows against fresh in-memory
/// state built from one [`Config`].
pub struct DemoService {
    config: Config,
    telemetry: TelemetryHandle,
}

impl DemoService {
    pub fn new(config: Config, telemetry: TelemetryHandle) -> Self {
        Self { config, telemetry }
    }

    pub fn run(&self) -> Result<DemoReport, ServiceError> {
        Ok(DemoReport {
            learning: self.run_learning()?,
            hub: self.run_hub()?,
        })
    }

    pub fn run_learning(&self) -> Result<LearningDemoReport, ServiceError> {
        let telemetry = TelemetryHandle::default();
        let coordinator = FederatedCoordinator::new(self.config.federation.clone())?
            .with_telemetry(telemetry.clone());
        let orchestrator = LearningNetworkOrchestrator::from_coordinator(coordinator);

        let mut registrations = Vec::with_capacity(FLEET.len());
        for (id, segment, capabilities, modes) in FLEET {
            registrations.push(orchestrator.register_node(id, segment, capabilities, modes)?);
        }

        let specs = [
            TaskSpec::new(
                LearningMode::Federated,
                "charging demand forecasting",
                [
                    Segment::EnergyGrid,
                    Segment::Transportation,
                    Segment::BatteryStorage,
                    Segment::SmartCity,
                    Segment::FleetLogistics,
                ],
            )
            .with_privacy(PrivacyTier::Differential),
            TaskSpec::new(
                LearningMode::Transfer,
                "battery degradation",
                [Segment::BatteryStorage, Segment::EnergyGrid],
            ),
            // no healthcare nodes exist, so every round reports an error
            TaskSpec::new(
                LearningMode::Reinforcement,
                "ambulance dispatch",
                [Segment::Healthcare],
            ),
        ];

        let mut tasks = Vec::with_capacity(specs.len());
        for spec in specs {
            let spec = match self.config.demo.strategy {
                Some(strategy) => spec.with_strategy(strategy),
                None => spec,
            };
            let created = orchestrator.create_task_with(spec)?;
            let rounds: Vec<ApiResponse<RoundReport>> = (0..self.config.demo.rounds)
                .map(|_| orchestrator.execute_round_response(created.task_id.as_str()))
                .collect();
            let failed = rounds.iter().filter(|round| !round.is_ok()).count();
            if failed > 0 {
                warn!(task = %created.task_id, failed, "some rounds did not run");
            }
            let convergence = orchestrator
                .coordinator()
                .convergence_status(&created.task_id)?;
            tasks.push(TaskRun {
                task: created,
                rounds,
                convergence,
            });
        }

        let counters = self.absorb(&telemetry)?;
        info!(
            nodes = registrations.len(),
            tasks = tasks.len(),
            "learning demo finished"
        );
        Ok(LearningDemoReport {
            registrations,
            tasks,
            analytics: orchestrator.ecosystem_analytics(),
            network: orchestrator.network_report(),
            counters,
        })
    }

    pub fn run_hub(&self) -> Result<HubDemoReport, ServiceError> {
        let telemetry = TelemetryHandle::default();
        let privacy = PrivacyEngine::new(self.config.privacy.clone())?;
        let hub = CrossSegmentDataHub::new(self.config.hub.clone(), privacy)?
            .with_telemetry(telemetry.clone());
        hub.register_schema(
            DataSchema::new("grid-load-sharing", Segment::EnergyGrid, PrivacyTier::Differential)
                .with_data_types(["load-curve", "tariff"])
                .with_retention_days(90),
        );
        let orchestrator = DataHubOrchestrator::from_hub(hub);

        let mut registrations = Vec::with_capacity(HUB_PARTICIPANTS.len());
        for (id, segment, capabilities, tier) in HUB_PARTICIPANTS {
            registrations.push(orchestrator.register_participant(id, segment, capabilities, tier)?);
        }

        let load_curve = json!({
            "feeder": "north-7",
            "peak_kw": [410.0, 455.5, 498.2, 430.1],
            "tariff_eur_kwh": 0.21,
        });
        let sessions = json!({
            "sessions": 1284.0,
            "energy_mwh": 36.4,
            "avg_dwell_min": 41.0,
        });

        let mut shares = Vec::new();
        shares.push(ApiResponse::from(orchestrator.hub().share_data(
            &"utility-grid".into(),
            ShareRequest::new(
                load_curve,
                [Segment::Transportation, Segment::Retail],
                PrivacyTier::Public,
            )
            .under_agreement("grid-load-sharing"),
        )));
        shares.push(orchestrator.share_data_response(
            "fleet-operator",
            sessions.clone(),
            &["energy-grid", "insurance"],
            "secure-mpc",
        ));
        shares.push(orchestrator.share_data_response(
            "unknown-operator",
            sessions,
            &["retail"],
            "public",
        ));

        let mut accesses = Vec::new();
        for (requestor, ..) in HUB_PARTICIPANTS {
            let outcome = orchestrator.access_data(requestor, &AccessFilters::default())?;
            accesses.push(AccessSummary {
                requestor: requestor.to_owned(),
                packets: outcome.packets.len(),
            });
        }

        let counters = self.absorb(&telemetry)?;
        info!(
            participants = registrations.len(),
            shares = shares.len(),
            "data hub demo finished"
        );
        Ok(HubDemoReport {
            registrations,
            shares,
            accesses,
            analytics: orchestrator.network_analytics(),
            counters,
        })
    }

    /// Flush a per-flow handle and fold its counters into the service handle.
    fn absorb(&self, flow: &TelemetryHandle) -> Result<BTreeMap<String, u64>, ServiceError> {
        let snapshot = flow.flush();
        for (name, value) in &snapshot.counters {
            self.telemetry.record_counter(name, *value)?;
        }
        for (name, series) in &snapshot.series {
            self.telemetry.record_sample(name, series.mean)?;
        }
        Ok(snapshot.counters)
    }
}
