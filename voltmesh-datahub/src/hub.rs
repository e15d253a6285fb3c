use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use voltmesh_federation::{synergy, Segment};
use voltmesh_privacy::{ContentHash, PrivacyEngine, PrivacyTier};
use voltmesh_telemetry::{TelemetryConfig, TelemetryHandle};

use crate::{
    analytics::HubAnalytics,
    collaboration::CollaborationMatrix,
    config::HubConfig,
    error::{HubError, HubResult},
    packet::{AccessFilters, PacketId, PacketMetadata, PacketView, SharedDataPacket},
    participant::{Participant, ParticipantId, ParticipantRegistered},
    schema::{AgreementId, DataSchema},
};

const PARTICIPANTS_REGISTERED: &str = "hub.participants_registered";
const PACKETS_SHARED: &str = "hub.packets_shared";
const PACKETS_ACCESSED: &str = "hub.packets_accessed";
const SAMPLE_SHARING_BENEFIT: &str = "hub.sharing_benefit";

#[derive(Clone, Debug, PartialEq)]
pub struct ShareRequest {
    pub payload: Value,
    pub target_segments: BTreeSet<Segment>,
    pub privacy_level: PrivacyTier,
    pub agreement: Option<AgreementId>,
}

impl ShareRequest {
    pub fn new(
        payload: Value,
        target_segments: impl IntoIterator<Item = Segment>,
        privacy_level: PrivacyTier,
    ) -> Self {
        Self {
            payload,
            target_segments: target_segments.into_iter().collect(),
            privacy_level,
            agreement: None,
        }
    }

    pub fn under_agreement(mut self, agreement: impl Into<String>) -> Self {
        self.agreement = Some(AgreementId(agreement.into()));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareOutcome {
    pub packet_id: PacketId,
    pub content_hash: String,
    /// Tier actually applied, after any agreement floor.
    pub privacy_level: PrivacyTier,
    pub eligible_recipients: Vec<ParticipantId>,
    pub sharing_benefit: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessOutcome {
    pub requestor: ParticipantId,
    pub packets: Vec<PacketView>,
}

/// Lock order: participants, collaboration, packets.
pub struct CrossSegmentDataHub {
    config: HubConfig,
    privacy: PrivacyEngine,
    rng: Mutex<ChaCha20Rng>,
    participants: RwLock<BTreeMap<ParticipantId, Participant>>,
    collaboration: RwLock<CollaborationMatrix>,
    schemas: DashMap<AgreementId, DataSchema>,
    packets: RwLock<Vec<SharedDataPacket>>,
    telemetry: TelemetryHandle,
}

impl CrossSegmentDataHub {
    pub fn new(config: HubConfig, privacy: PrivacyEngine) -> HubResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Ok(Self {
            config,
            privacy,
            rng: Mutex::new(rng),
            participants: RwLock::new(BTreeMap::new()),
            collaboration: RwLock::new(CollaborationMatrix::new()),
            schemas: DashMap::new(),
            packets: RwLock::new(Vec::new()),
            telemetry: TelemetryHandle::from_config(TelemetryConfig::sample("voltmesh-datahub")),
        })
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryHandle) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    pub fn register_participant(
        &self,
        id: impl Into<ParticipantId>,
        segment: Segment,
        capabilities: impl IntoIterator<Item = String>,
        privacy_level: PrivacyTier,
    ) -> HubResult<ParticipantRegistered> {
        let id = id.into();
        let mut participants = self.participants.write();
        if participants.contains_key(&id) {
            return Err(HubError::DuplicateParticipant(id));
        }
        let network_size = participants.len() + 1;
        let size_bonus = self.config.network_bonus * ((network_size + 1) as f64).ln();

        let mut collaboration = self.collaboration.write();
        let mut collaboration_scores = BTreeMap::new();
        for (other_id, other) in participants.iter() {
            let score = (synergy(segment, other.segment) + size_bonus).clamp(0.0, 1.0);
            collaboration.set(&id, other_id, score);
            collaboration_scores.insert(other_id.clone(), score);
        }
        drop(collaboration);

        participants.insert(
            id.clone(),
            Participant {
                id: id.clone(),
                segment,
                capabilities: capabilities.into_iter().collect(),
                privacy_level,
                registered_at: Utc::now(),
            },
        );
        drop(participants);

        self.telemetry.record_counter(PARTICIPANTS_REGISTERED, 1)?;
        info!(participant = %id, segment = %segment, network_size, "registered hub participant");
        Ok(ParticipantRegistered {
            participant_id: id,
            segment,
            network_size,
            collaboration_scores,
        })
    }

    pub fn register_schema(&self, schema: DataSchema) -> AgreementId {
        let id = schema.agreement_id.clone();
        debug!(agreement = %id, tier = %schema.required_privacy, "registered data-sharing agreement");
        self.schemas.insert(id.clone(), schema);
        id
    }

    pub fn schema(&self, id: &AgreementId) -> Option<DataSchema> {
        self.schemas.get(id).map(|entry| entry.value().clone())
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants.read().get(id).cloned()
    }

    pub fn collaboration_score(&self, a: &ParticipantId, b: &ParticipantId) -> Option<f64> {
        self.collaboration.read().score(a, b)
    }

    pub fn share_data(&self, sender: &ParticipantId, request: ShareRequest) -> HubResult<ShareOutcome> {
        let participants = self.participants.read();
        let source = participants
            .get(sender)
            .ok_or_else(|| HubError::UnregisteredSender(sender.clone()))?;
        if request.target_segments.is_empty() {
            return Err(HubError::NoTargetSegments);
        }

        let tier = match &request.agreement {
            Some(agreement) => {
                let schema = self
                    .schemas
                    .get(agreement)
                    .ok_or_else(|| HubError::UnknownAgreement(agreement.clone()))?;
                if schema.segment != source.segment {
                    return Err(HubError::AgreementSegmentMismatch {
                        agreement: agreement.clone(),
                        agreement_segment: schema.segment,
                        sender_segment: source.segment,
                    });
                }
                schema.effective_tier(request.privacy_level)
            }
            None => request.privacy_level,
        };

        let content_hash = ContentHash::of_json(&request.payload)?;
        let metadata = PacketMetadata::describe(&request.payload)?;
        let protected = {
            let mut rng = self.rng.lock();
            self.privacy.protect(&request.payload, tier, &mut *rng)?
        };

        let collaboration = self.collaboration.read();
        let mut eligible_recipients = Vec::new();
        let mut collaboration_sum = 0.0;
        for (id, participant) in participants.iter() {
            if id == sender || !request.target_segments.contains(&participant.segment) {
                continue;
            }
            let score = collaboration.score(sender, id).unwrap_or(0.0);
            if score > self.config.collaboration_threshold {
                eligible_recipients.push(id.clone());
                collaboration_sum += score;
            }
        }
        drop(collaboration);

        let network_size = participants.len();
        let sharing_benefit = self.config.recipient_weight * eligible_recipients.len() as f64
            + self.config.collaboration_weight * collaboration_sum
            + self.config.network_weight * (network_size as f64).ln();

        let mut packets = self.packets.write();
        let packet_id = PacketId::for_sequence(packets.len() as u64 + 1);
        packets.push(SharedDataPacket::new(
            packet_id.clone(),
            sender.clone(),
            source.segment,
            request.target_segments,
            content_hash,
            tier,
            request.agreement,
            metadata,
            protected,
        ));
        drop(packets);
        drop(participants);

        self.telemetry.record_counter(PACKETS_SHARED, 1)?;
        self.telemetry.record_sample(SAMPLE_SHARING_BENEFIT, sharing_benefit)?;
        info!(
            packet = %packet_id,
            sender = %sender,
            tier = %tier,
            recipients = eligible_recipients.len(),
            sharing_benefit,
            "shared data packet"
        );
        Ok(ShareOutcome {
            packet_id,
            content_hash: content_hash.to_hex(),
            privacy_level: tier,
            eligible_recipients,
            sharing_benefit,
        })
    }

    /// Every returned packet gets an entry appended to its access log.
    pub fn access_data(
        &self,
        requestor: &ParticipantId,
        filters: &AccessFilters,
    ) -> HubResult<AccessOutcome> {
        let participants = self.participants.read();
        let accessor = participants
            .get(requestor)
            .ok_or_else(|| HubError::UnregisteredRequestor(requestor.clone()))?;
        let collaboration = self.collaboration.read();
        let purpose = filters
            .purpose
            .clone()
            .unwrap_or_else(|| self.config.default_purpose.clone());
        let now = Utc::now();

        let mut packets = self.packets.write();
        let mut views = Vec::new();
        for packet in packets.iter_mut() {
            if &packet.sender == requestor
                || !packet.target_segments.contains(&accessor.segment)
                || !filters.matches(packet)
            {
                continue;
            }
            let score = collaboration.score(&packet.sender, requestor).unwrap_or(0.0);
            if score <= self.config.collaboration_threshold {
                continue;
            }
            if let Some(agreement) = &packet.agreement {
                let Some(schema) = self.schemas.get(agreement) else {
                    continue;
                };
                if !schema.permits(requestor) || schema.is_expired(packet.shared_at, now) {
                    continue;
                }
            }
            packet.record_access(requestor.clone(), purpose.clone());
            views.push(packet.view());
        }
        drop(packets);

        self.telemetry.record_counter(PACKETS_ACCESSED, views.len() as u64)?;
        info!(requestor = %requestor, packets = views.len(), purpose = %purpose, "accessed shared data");
        Ok(AccessOutcome {
            requestor: requestor.clone(),
            packets: views,
        })
    }

    /// Copies of every packet including access logs, in share order.
    pub fn packets(&self) -> Vec<SharedDataPacket> {
        self.packets.read().clone()
    }

    pub fn network_analytics(&self) -> HubAnalytics {
        let participants = self.participants.read();
        let collaboration = self.collaboration.read();
        let packets = self.packets.read();
        HubAnalytics::compute(
            participants.values(),
            &collaboration,
            &packets,
            self.schemas.len(),
            self.config.strong_pair_threshold,
        )
    }
}
