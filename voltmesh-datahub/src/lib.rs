//! Cross-segment data hub.
//!
//! Participants from different industry segments register with the hub,
//! which keeps a symmetric collaboration score for every pair. Payloads are
//! shared through the privacy engine at a chosen tier and may be bound to a
//! data-sharing agreement; recipients pull matching packets and every pull
//! is appended to the packet's access log.

pub mod analytics;
pub mod collaboration;
pub mod config;
pub mod error;
pub mod hub;
pub mod orchestrator;
pub mod packet;
pub mod participant;
pub mod schema;

pub use analytics::{CollaborationPair, HubAnalytics};
pub use collaboration::CollaborationMatrix;
pub use config::HubConfig;
pub use error::{HubError, HubResult};
pub use hub::{AccessOutcome, CrossSegmentDataHub, ShareOutcome, ShareRequest};
pub use orchestrator::DataHubOrchestrator;
pub use packet::{AccessEntry, AccessFilters, PacketId, PacketMetadata, PacketView, SharedDataPacket};
pub use participant::{Participant, ParticipantId, ParticipantRegistered};
pub use schema::{AgreementId, DataSchema};
