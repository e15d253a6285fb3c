use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use voltmesh_federation::Segment;
use voltmesh_privacy::PrivacyTier;

use crate::{
    collaboration::CollaborationMatrix,
    packet::SharedDataPacket,
    participant::{Participant, ParticipantId},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollaborationPair {
    pub a: ParticipantId,
    pub b: ParticipantId,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HubAnalytics {
    pub total_participants: usize,
    pub participants_per_segment: BTreeMap<Segment, usize>,
    pub total_packets: usize,
    pub packets_by_tier: BTreeMap<PrivacyTier, usize>,
    pub total_accesses: usize,
    pub agreements: usize,
    pub mean_collaboration: f64,
    /// Strongest first.
    pub strong_pairs: Vec<CollaborationPair>,
}

impl HubAnalytics {
    pub fn compute<'a>(
        participants: impl IntoIterator<Item = &'a Participant>,
        collaboration: &CollaborationMatrix,
        packets: &[SharedDataPacket],
        agreements: usize,
        strong_threshold: f64,
    ) -> Self {
        let mut participants_per_segment = BTreeMap::new();
        let mut total_participants = 0;
        for participant in participants {
            total_participants += 1;
            *participants_per_segment.entry(participant.segment).or_insert(0) += 1;
        }

        let mut packets_by_tier = BTreeMap::new();
        for packet in packets {
            *packets_by_tier.entry(packet.privacy_level).or_insert(0) += 1;
        }

        let mut strong_pairs: Vec<CollaborationPair> = collaboration
            .iter()
            .filter(|(_, _, score)| *score > strong_threshold)
            .map(|(a, b, score)| CollaborationPair {
                a: a.clone(),
                b: b.clone(),
                score,
            })
            .collect();
        strong_pairs.sort_by(|x, y| y.score.total_cmp(&x.score));

        Self {
            total_participants,
            participants_per_segment,
            total_packets: packets.len(),
            packets_by_tier,
            total_accesses: packets.iter().map(|p| p.access_log().len()).sum(),
            agreements,
            mean_collaboration: collaboration.mean(),
            strong_pairs,
        }
    }
}
