use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use voltmesh_federation::Segment;
use voltmesh_privacy::{ContentHash, PrivacyTier};

use crate::{participant::ParticipantId, schema::AgreementId};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId(pub String);

impl PacketId {
    pub fn for_sequence(sequence: u64) -> Self {
        Self(format!("packet-{sequence:06}"))
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketMetadata {
    /// Size of the original payload's JSON encoding.
    pub size_bytes: usize,
    pub field_count: usize,
}

impl PacketMetadata {
    pub fn describe(payload: &Value) -> serde_json::Result<Self> {
        Ok(Self {
            size_bytes: serde_json::to_vec(payload)?.len(),
            field_count: match payload {
                Value::Object(map) => map.len(),
                Value::Array(items) => items.len(),
                Value::Null => 0,
                _ => 1,
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub accessor: ParticipantId,
    pub accessed_at: DateTime<Utc>,
    pub purpose: String,
}

/// A privacy-transformed payload held by the hub.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SharedDataPacket {
    pub id: PacketId,
    pub sender: ParticipantId,
    pub source_segment: Segment,
    pub target_segments: BTreeSet<Segment>,
    /// Hash of the payload before transformation.
    pub content_hash: ContentHash,
    pub privacy_level: PrivacyTier,
    pub agreement: Option<AgreementId>,
    pub metadata: PacketMetadata,
    pub payload: Value,
    pub shared_at: DateTime<Utc>,
    access_log: Vec<AccessEntry>,
}

impl SharedDataPacket {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: PacketId,
        sender: ParticipantId,
        source_segment: Segment,
        target_segments: BTreeSet<Segment>,
        content_hash: ContentHash,
        privacy_level: PrivacyTier,
        agreement: Option<AgreementId>,
        metadata: PacketMetadata,
        payload: Value,
    ) -> Self {
        Self {
            id,
            sender,
            source_segment,
            target_segments,
            content_hash,
            privacy_level,
            agreement,
            metadata,
            payload,
            shared_at: Utc::now(),
            access_log: Vec::new(),
        }
    }

    /// Append-only; there is no way to remove entries.
    pub(crate) fn record_access(&mut self, accessor: ParticipantId, purpose: String) {
        self.access_log.push(AccessEntry {
            accessor,
            accessed_at: Utc::now(),
            purpose,
        });
    }

    pub fn access_log(&self) -> &[AccessEntry] {
        &self.access_log
    }

    pub fn view(&self) -> PacketView {
        PacketView {
            packet_id: self.id.clone(),
            sender: self.sender.clone(),
            source_segment: self.source_segment,
            privacy_level: self.privacy_level,
            content_hash: self.content_hash.to_hex(),
            metadata: self.metadata.clone(),
            payload: self.payload.clone(),
            shared_at: self.shared_at,
        }
    }
}

/// What a requestor receives: the packet without its access log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PacketView {
    pub packet_id: PacketId,
    pub sender: ParticipantId,
    pub source_segment: Segment,
    pub privacy_level: PrivacyTier,
    pub content_hash: String,
    pub metadata: PacketMetadata,
    pub payload: Value,
    pub shared_at: DateTime<Utc>,
}

/// Optional narrowing for `access_data`; all-`None` matches everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessFilters {
    pub source_segment: Option<Segment>,
    pub privacy_level: Option<PrivacyTier>,
    pub since: Option<DateTime<Utc>>,
    pub purpose: Option<String>,
}

impl AccessFilters {
    pub fn matches(&self, packet: &SharedDataPacket) -> bool {
        self.source_segment.map_or(true, |s| s == packet.source_segment)
            && self.privacy_level.map_or(true, |t| t == packet.privacy_level)
            && self.since.map_or(true, |since| packet.shared_at >= since)
    }
}
