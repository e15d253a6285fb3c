use std::str::FromStr;

use serde_json::Value;
use voltmesh_federation::{ApiResponse, Segment};
use voltmesh_privacy::{PrivacyEngine, PrivacyTier};

use crate::{
    analytics::HubAnalytics,
    config::HubConfig,
    error::HubResult,
    hub::{AccessOutcome, CrossSegmentDataHub, ShareOutcome, ShareRequest},
    packet::AccessFilters,
    participant::{ParticipantId, ParticipantRegistered},
};

/// String-keyed façade over a [`CrossSegmentDataHub`].
pub struct DataHubOrchestrator {
    hub: CrossSegmentDataHub,
}

impl DataHubOrchestrator {
    pub fn new(config: HubConfig, privacy: PrivacyEngine) -> HubResult<Self> {
        Ok(Self::from_hub(CrossSegmentDataHub::new(config, privacy)?))
    }

    pub fn from_hub(hub: CrossSegmentDataHub) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &CrossSegmentDataHub {
        &self.hub
    }

    pub fn register_participant(
        &self,
        participant_id: &str,
        segment: &str,
        capabilities: &[&str],
        privacy_level: &str,
    ) -> HubResult<ParticipantRegistered> {
        let segment = Segment::from_str(segment)?;
        let tier = PrivacyTier::from_str(privacy_level)?;
        self.hub.register_participant(
            participant_id,
            segment,
            capabilities.iter().map(|c| (*c).to_owned()),
            tier,
        )
    }

    pub fn share_data(
        &self,
        sender: &str,
        payload: Value,
        target_segments: &[&str],
        privacy_level: &str,
    ) -> HubResult<ShareOutcome> {
        let tier = privacy_level.parse::<PrivacyTier>()?;
        let request = ShareRequest::new(payload, parse_segments(target_segments)?, tier);
        self.hub.share_data(&ParticipantId::from(sender), request)
    }

    pub fn share_data_response(
        &self,
        sender: &str,
        payload: Value,
        target_segments: &[&str],
        privacy_level: &str,
    ) -> ApiResponse<ShareOutcome> {
        self.share_data(sender, payload, target_segments, privacy_level)
            .into()
    }

    pub fn access_data(&self, requestor: &str, filters: &AccessFilters) -> HubResult<AccessOutcome> {
        self.hub.access_data(&ParticipantId::from(requestor), filters)
    }

    pub fn access_data_response(
        &self,
        requestor: &str,
        filters: &AccessFilters,
    ) -> ApiResponse<AccessOutcome> {
        self.access_data(requestor, filters).into()
    }

    pub fn network_analytics(&self) -> HubAnalytics {
        self.hub.network_analytics()
    }
}

fn parse_segments(segments: &[&str]) -> HubResult<Vec<Segment>> {
    segments
        .iter()
        .map(|segment| Segment::from_str(segment).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::HubError;

    fn orchestrator() -> DataHubOrchestrator {
        DataHubOrchestrator::new(
            HubConfig {
                seed: Some(4),
                ..HubConfig::default()
            },
            PrivacyEngine::default(),
        )
        .unwrap()
    }

    #[test]
    fn unknown_names_surface_as_errors() {
        let hub = orchestrator();
        assert!(matches!(
            hub.register_participant("u1", "moon-base", &[], "public"),
            Err(HubError::Federation(_))
        ));
        assert!(matches!(
            hub.register_participant("u1", "energy-grid", &[], "quantum"),
            Err(HubError::Privacy(_))
        ));
    }

    #[test]
    fn unknown_sender_becomes_error_envelope() {
        let hub = orchestrator();
        let response = hub.share_data_response("ghost", json!({"kwh": 1.0}), &["retail"], "public");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"error": "sender ghost is not a registered participant"}));
    }
}
