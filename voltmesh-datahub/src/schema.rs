use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use voltmesh_federation::Segment;
use voltmesh_privacy::PrivacyTier;

use crate::participant::ParticipantId;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgreementId(pub String);

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgreementId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Data-sharing agreement that packets may be bound to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DataSchema {
    pub agreement_id: AgreementId,
    pub segment: Segment,
    pub data_types: Vec<String>,
    /// Minimum tier; weaker requests are raised to it.
    pub required_privacy: PrivacyTier,
    /// Empty means any participant that otherwise qualifies.
    #[serde(default)]
    pub permitted_accessors: BTreeSet<ParticipantId>,
    pub retention_days: u32,
}

impl DataSchema {
    pub fn new(agreement_id: impl Into<String>, segment: Segment, required_privacy: PrivacyTier) -> Self {
        Self {
            agreement_id: AgreementId(agreement_id.into()),
            segment,
            data_types: Vec::new(),
            required_privacy,
            permitted_accessors: BTreeSet::new(),
            retention_days: 30,
        }
    }

    pub fn with_data_types<I, S>(mut self, data_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_types = data_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_accessors<I>(mut self, accessors: I) -> Self
    where
        I: IntoIterator<Item = ParticipantId>,
    {
        self.permitted_accessors = accessors.into_iter().collect();
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn effective_tier(&self, requested: PrivacyTier) -> PrivacyTier {
        requested.max(self.required_privacy)
    }

    pub fn permits(&self, accessor: &ParticipantId) -> bool {
        self.permitted_accessors.is_empty() || self.permitted_accessors.contains(accessor)
    }

    /// A packet shared at `shared_at` is expired once its full retention
    /// period has elapsed.
    pub fn is_expired(&self, shared_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - shared_at >= Duration::days(i64::from(self.retention_days))
    }
}
