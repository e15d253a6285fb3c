use thiserror::Error;
use voltmesh_federation::{FederationError, Segment};
use voltmesh_privacy::PrivacyError;
use voltmesh_telemetry::TelemetryError;

use crate::{participant::ParticipantId, schema::AgreementId};

pub type HubResult<T> = Result<T, HubError>;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("participant {0} is already registered")]
    DuplicateParticipant(ParticipantId),
    #[error("sender {0} is not a registered participant")]
    UnregisteredSender(ParticipantId),
    #[error("requestor {0} is not a registered participant")]
    UnregisteredRequestor(ParticipantId),
    #[error("unknown data-sharing agreement {0}")]
    UnknownAgreement(AgreementId),
    #[error("agreement {agreement} covers {agreement_segment} data, sender is in {sender_segment}")]
    AgreementSegmentMismatch {
        agreement: AgreementId,
        agreement_segment: Segment,
        sender_segment: Segment,
    },
    #[error("a share needs at least one target segment")]
    NoTargetSegments,
    #[error("hub configuration invalid: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Federation(#[from] FederationError),
    #[error(transparent)]
    Privacy(#[from] PrivacyError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
